//! Filesystem-backed [`TranscriptRepository`].
//!
//! Reads the assistant's transcript store directly. Nothing is cached and
//! nothing is ever written.

use crate::project_path::decode_project_path;
use crate::transcript::{TranscriptSummarizer, user_record_cwd};
use async_trait::async_trait;
use relay_core::error::Result;
use relay_core::session::{ProjectInfo, SessionSummary, TranscriptRepository};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

const TRANSCRIPT_EXTENSION: &str = "jsonl";

/// Transcript store rooted at a directory of per-project folders.
///
/// Directory structure:
/// ```text
/// root/
/// ├── -Users-me-code-app/
/// │   ├── 3f1c...-uuid.jsonl
/// │   └── 9a2b...-uuid.jsonl
/// └── -tmp-scratch/
///     └── ...
/// ```
#[derive(Debug, Clone)]
pub struct FsTranscriptRepository {
    root: PathBuf,
}

impl FsTranscriptRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Sorted names of the project directories under the root.
    async fn project_keys(&self) -> Result<Vec<String>> {
        if !is_dir(&self.root).await {
            return Ok(Vec::new());
        }

        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            // Follows symlinks, unlike `DirEntry::file_type`.
            if !is_dir(&entry.path()).await {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                keys.push(name.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }

    /// Transcript files of one project together with their modification times.
    async fn transcripts_in(&self, project_dir: &Path) -> Result<Vec<(PathBuf, SystemTime)>> {
        let mut transcripts = Vec::new();
        let mut entries = fs::read_dir(project_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(TRANSCRIPT_EXTENSION) {
                continue;
            }
            let metadata = match fs::metadata(&path).await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("Skipping transcript {}: {}", path.display(), e);
                    continue;
                }
            };
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            transcripts.push((path, modified));
        }
        Ok(transcripts)
    }

    async fn summarize_file(&self, path: &Path) -> Option<SessionSummary> {
        let session_id = path.file_stem()?.to_str()?.to_string();
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Failed to open transcript {}: {}", path.display(), e);
                return None;
            }
        };

        let mut summarizer = TranscriptSummarizer::new();
        let mut lines = BufReader::new(file).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => summarizer.feed_line(&line),
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read transcript {}: {}", path.display(), e);
                    return None;
                }
            }
        }
        summarizer.finish(session_id)
    }

    /// Working directory recorded by the first user record that has one.
    async fn recorded_cwd(&self, path: &Path) -> Option<PathBuf> {
        let file = match fs::File::open(path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Failed to open transcript {}: {}", path.display(), e);
                return None;
            }
        };

        let mut lines = BufReader::new(file).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if let Some(cwd) = user_record_cwd(&line) {
                        return Some(cwd);
                    }
                }
                Ok(None) => return None,
                Err(e) => {
                    tracing::debug!("Stopped reading transcript {}: {}", path.display(), e);
                    return None;
                }
            }
        }
    }
}

#[async_trait]
impl TranscriptRepository for FsTranscriptRepository {
    async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        let mut projects = Vec::new();
        for key in self.project_keys().await? {
            let project_dir = self.root.join(&key);
            let session_count = match self.transcripts_in(&project_dir).await {
                Ok(transcripts) => transcripts.len(),
                Err(e) => {
                    tracing::warn!("Skipping project {}: {}", key, e);
                    continue;
                }
            };
            if session_count == 0 {
                continue;
            }
            projects.push(ProjectInfo {
                resolved_path: decode_project_path(&key),
                project_key: key,
                session_count,
            });
        }
        Ok(projects)
    }

    async fn list_sessions(&self, project_key: &str, limit: usize) -> Result<Vec<SessionSummary>> {
        if !is_plain_name(project_key) {
            return Ok(Vec::new());
        }
        let project_dir = self.root.join(project_key);
        if !is_dir(&project_dir).await {
            return Ok(Vec::new());
        }

        let mut transcripts = match self.transcripts_in(&project_dir).await {
            Ok(transcripts) => transcripts,
            Err(e) => {
                tracing::warn!("Failed to list sessions of {}: {}", project_key, e);
                return Ok(Vec::new());
            }
        };
        transcripts.sort_by(|a, b| b.1.cmp(&a.1));
        transcripts.truncate(limit);

        let mut summaries = Vec::with_capacity(transcripts.len());
        for (path, _) in transcripts {
            if let Some(summary) = self.summarize_file(&path).await {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    }

    async fn find_session(&self, session_id: &str) -> Result<Option<(String, PathBuf)>> {
        if !is_plain_name(session_id) {
            return Ok(None);
        }
        let file_name = format!("{session_id}.{TRANSCRIPT_EXTENSION}");

        for key in self.project_keys().await? {
            let candidate = self.root.join(&key).join(&file_name);
            let is_file = fs::metadata(&candidate)
                .await
                .map(|metadata| metadata.is_file())
                .unwrap_or(false);
            if !is_file {
                continue;
            }

            let working_directory = match self.recorded_cwd(&candidate).await {
                Some(cwd) => cwd,
                None => decode_project_path(&key),
            };
            tracing::debug!("Found session {} in project {}", session_id, key);
            return Ok(Some((key, working_directory)));
        }
        Ok(None)
    }
}

async fn is_dir(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|metadata| metadata.is_dir())
        .unwrap_or(false)
}

/// Rejects names that would escape the store root.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_transcript(root: &Path, project: &str, session: &str, lines: &[&str]) -> PathBuf {
        let dir = root.join(project);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{session}.jsonl"));
        std::fs::write(&path, lines.join("\n")).unwrap();
        path
    }

    #[tokio::test]
    async fn test_missing_root_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FsTranscriptRepository::new(temp_dir.path().join("absent"));

        assert!(repo.list_projects().await.unwrap().is_empty());
        assert!(repo.list_sessions("-x", 10).await.unwrap().is_empty());
        assert!(repo.find_session("abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_projects_without_transcripts_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("-empty-project")).unwrap();
        std::fs::write(temp_dir.path().join("-empty-project").join("notes.txt"), "x").unwrap();
        write_transcript(temp_dir.path(), "-b-proj", "s1", &[]);
        write_transcript(temp_dir.path(), "-a-proj", "s2", &[]);
        write_transcript(temp_dir.path(), "-a-proj", "s3", &[]);

        let repo = FsTranscriptRepository::new(temp_dir.path());
        let projects = repo.list_projects().await.unwrap();

        let keys: Vec<&str> = projects.iter().map(|p| p.project_key.as_str()).collect();
        assert_eq!(keys, vec!["-a-proj", "-b-proj"]);
        assert_eq!(projects[0].session_count, 2);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let repo = FsTranscriptRepository::new(temp_dir.path().join("store"));

        assert!(repo.list_sessions("..", 10).await.unwrap().is_empty());
        assert!(repo.find_session("../secret").await.unwrap().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_projects_and_transcripts_are_listed() {
        let temp_dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        let real = write_transcript(
            elsewhere.path(),
            "-real",
            "linked",
            &[r#"{"type":"user","message":{"content":"via link"}}"#],
        );

        let store = temp_dir.path().join("store");
        std::fs::create_dir_all(store.join("-files")).unwrap();
        std::os::unix::fs::symlink(elsewhere.path().join("-real"), store.join("-dir-link")).unwrap();
        std::os::unix::fs::symlink(&real, store.join("-files").join("file-link.jsonl")).unwrap();

        let repo = FsTranscriptRepository::new(&store);
        let keys: Vec<String> = repo
            .list_projects()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.project_key)
            .collect();
        assert_eq!(keys, vec!["-dir-link", "-files"]);

        let sessions = repo.list_sessions("-files", 10).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].session_id, "file-link");
        assert_eq!(sessions[0].first_message_preview, "via link");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_project_lists_no_sessions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        write_transcript(temp_dir.path(), "-locked", "s1", &[]);
        let locked = temp_dir.path().join("-locked");
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let readable_anyway = std::fs::read_dir(&locked).is_ok();

        let repo = FsTranscriptRepository::new(temp_dir.path());
        let result = repo.list_sessions("-locked", 10).await;
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users can read the directory regardless of its mode.
        if !readable_anyway {
            assert!(result.unwrap().is_empty());
        }
    }

    #[test]
    fn test_is_plain_name() {
        assert!(is_plain_name("-Users-me-app"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("a/b"));
    }
}
