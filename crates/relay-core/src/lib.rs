//! Domain layer for relay.
//!
//! Holds the data model shared by the transcript reader, the assistant
//! executor and the turn orchestrator, plus the traits that separate them.

pub mod config;
pub mod error;
pub mod permission;
pub mod session;
pub mod turn;

// Re-export common types
pub use config::RelayConfig;
pub use error::RelayError;
pub use permission::PermissionMode;
pub use turn::{TurnExecutor, TurnOptions};
