//! Transcript store trait.
//!
//! Defines read access to the assistant's on-disk transcripts.

use super::model::{ProjectInfo, SessionSummary};
use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// Read-only view of the assistant's per-project, per-session transcript files.
///
/// Results are recomputed on every call and always reflect the current state
/// on disk. A missing store root yields empty results, not an error.
#[async_trait]
pub trait TranscriptRepository: Send + Sync {
    /// Lists every project that holds at least one transcript.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ProjectInfo>)`: Projects sorted by key
    /// - `Err(_)`: The store root exists but could not be listed
    async fn list_projects(&self) -> Result<Vec<ProjectInfo>>;

    /// Lists session summaries of a project, most recently modified first.
    ///
    /// # Arguments
    ///
    /// * `project_key` - Encoded project directory name
    /// * `limit` - Maximum number of transcript files to consider
    ///
    /// Transcripts without any user message are left out, so fewer than
    /// `limit` summaries may be returned.
    async fn list_sessions(&self, project_key: &str, limit: usize) -> Result<Vec<SessionSummary>>;

    /// Locates the project that owns a session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some((project_key, working_directory)))`: Transcript found
    /// - `Ok(None)`: No project holds a transcript with this id
    async fn find_session(&self, session_id: &str) -> Result<Option<(String, PathBuf)>>;
}
