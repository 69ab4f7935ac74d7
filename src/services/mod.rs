//! Services
//!
//! Business logic for the application: the model gateway and the two
//! orchestrators that drive it. Commands call into these through `AppState`.

pub mod analysis;
pub mod chat;
pub mod gateway;

pub use analysis::{AnalysisOrchestrator, ANALYSIS_FAILED_MESSAGE};
pub use chat::{ChatOrchestrator, ChatSnapshot};
pub use gateway::{GatewayConfig, LlmGateway, ModelGateway};
