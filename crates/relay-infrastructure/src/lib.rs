pub mod config_service;
pub mod fs_transcript_repository;
pub mod paths;
pub mod project_path;
pub mod transcript;

pub use crate::config_service::ConfigService;
pub use crate::fs_transcript_repository::FsTranscriptRepository;
pub use crate::paths::RelayPaths;
pub use crate::project_path::{decode_project_path, encode_project_path};
