//! Commands
//!
//! Entry points for the presentation layer. Each command takes the shared
//! `AppState` and returns a `CommandResponse`; failures travel in the
//! response, never as `Err`.

pub mod analysis;
pub mod chat;
pub mod health;
pub mod init;
pub mod settings;

pub use analysis::*;
pub use chat::*;
pub use health::*;
pub use init::*;
pub use settings::*;
