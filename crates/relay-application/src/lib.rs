//! Application layer for relay.
//!
//! Coordinates the assistant executor, the transcript store and the
//! established-session tracker on behalf of a chat front-end.

pub mod approval;
pub mod chat;
pub mod liveness;
pub mod orchestrator;

pub use approval::{ApprovalRequest, CONTINUATION_PROMPT, format_denials};
pub use chat::{ChatId, ChatSession, ChatStatus, UserId};
pub use liveness::{LivenessGuard, LivenessSignal};
pub use orchestrator::{TurnOrchestrator, TurnOutcome};
