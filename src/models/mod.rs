//! Data Models
//!
//! Data structures shared by services, commands and the presentation layer.

pub mod analysis;
pub mod chat;
pub mod dashboard;
pub mod response;
pub mod settings;

pub use analysis::*;
pub use chat::*;
pub use dashboard::*;
pub use response::*;
pub use settings::*;
