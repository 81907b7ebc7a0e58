//! Session domain: data model, established-session tracking and the
//! transcript store interface.

pub mod model;
pub mod repository;
pub mod state;

pub use model::{
    PREVIEW_MAX_CHARS, PermissionDenial, ProjectInfo, SessionRecord, SessionSummary, TurnFailure,
    TurnResult,
};
pub use repository::TranscriptRepository;
pub use state::SessionStateTracker;
