//! Turn orchestration for chats.
//!
//! This module provides the `TurnOrchestrator`, which sits between a chat
//! front-end and the assistant. It owns the per-chat conversation state,
//! runs turns through a [`TurnExecutor`], keeps approval requests for denied
//! tool calls, and browses the transcript store for projects and sessions.

use crate::approval::{ApprovalRequest, CONTINUATION_PROMPT};
use crate::chat::{ChatId, ChatSession, ChatStatus, UserId};
use crate::liveness::{DEFAULT_LIVENESS_INTERVAL, LivenessGuard, LivenessSignal};
use relay_core::config::RelayConfig;
use relay_core::error::{RelayError, Result};
use relay_core::session::{
    ProjectInfo, SessionRecord, SessionStateTracker, SessionSummary, TranscriptRepository,
    TurnResult,
};
use relay_core::{TurnExecutor, TurnOptions};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Length of a complete session id; shorter ids are treated as prefixes.
pub const FULL_SESSION_ID_LEN: usize = 36;

/// How many recent sessions a prefix is matched against.
pub const PREFIX_SEARCH_LIMIT: usize = 50;

/// Result of one turn as seen by the chat layer.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub result: TurnResult,
    /// Set when the assistant asked for permissions; already registered as pending.
    pub approval: Option<ApprovalRequest>,
}

/// Drives conversation turns for any number of chats.
///
/// Turns and approval answers are refused for users outside the configured
/// allow-list.
///
/// # Thread Safety
///
/// All state sits behind `tokio::sync::RwLock`s that are never held across a
/// turn, so turns of different chats run concurrently. Turns of the same chat
/// must be serialized by the caller.
pub struct TurnOrchestrator {
    executor: Arc<dyn TurnExecutor>,
    transcripts: Arc<dyn TranscriptRepository>,
    sessions: SessionStateTracker,
    chats: RwLock<HashMap<ChatId, ChatSession>>,
    pending_approvals: RwLock<HashMap<String, ApprovalRequest>>,
    options: RwLock<TurnOptions>,
    config: RelayConfig,
    liveness: Option<Arc<dyn LivenessSignal>>,
    liveness_interval: Duration,
}

impl TurnOrchestrator {
    /// Creates a new `TurnOrchestrator`.
    ///
    /// # Arguments
    ///
    /// * `executor` - Runs assistant turns
    /// * `transcripts` - Read access to the transcript store
    /// * `sessions` - Established-session tracker shared with the executor
    /// * `config` - Seeds run options, the default working directory and the user allow-list
    pub fn new(
        executor: Arc<dyn TurnExecutor>,
        transcripts: Arc<dyn TranscriptRepository>,
        sessions: SessionStateTracker,
        config: &RelayConfig,
    ) -> Self {
        Self {
            executor,
            transcripts,
            sessions,
            chats: RwLock::new(HashMap::new()),
            pending_approvals: RwLock::new(HashMap::new()),
            options: RwLock::new(TurnOptions::from_config(config)),
            config: config.clone(),
            liveness: None,
            liveness_interval: DEFAULT_LIVENESS_INTERVAL,
        }
    }

    /// Pulses `signal` while turns run.
    pub fn with_liveness(mut self, signal: Arc<dyn LivenessSignal>, interval: Duration) -> Self {
        self.liveness = Some(signal);
        self.liveness_interval = interval;
        self
    }

    // -- access --------------------------------------------------------------

    pub fn is_user_allowed(&self, user_id: UserId) -> bool {
        self.config.is_user_allowed(user_id)
    }

    fn authorize(&self, user_id: UserId) -> Result<()> {
        if self.is_user_allowed(user_id) {
            return Ok(());
        }
        tracing::warn!("Rejected request from user {}", user_id);
        Err(RelayError::Unauthorized { user_id })
    }

    // -- turns ---------------------------------------------------------------

    /// Sends a user prompt in the chat's current session.
    pub async fn send_prompt(
        &self,
        user_id: UserId,
        chat_id: ChatId,
        prompt: &str,
    ) -> Result<TurnOutcome> {
        self.authorize(user_id)?;
        let chat = self.chat(chat_id).await;
        let options = self.options().await;
        tracing::info!(
            "Chat {} sent: {}",
            chat_id,
            prompt.chars().take(80).collect::<String>()
        );

        let result = self
            .run_turn(
                chat_id,
                prompt,
                &chat.session_id,
                &options,
                &chat.working_directory,
            )
            .await;
        Ok(self
            .finish_turn(chat_id, &chat.session_id, &chat.working_directory, result)
            .await)
    }

    /// Approves a pending request and runs the continuation turn.
    ///
    /// Returns `None` if the id is unknown or was already answered.
    pub async fn approve(
        &self,
        user_id: UserId,
        approval_id: &str,
    ) -> Result<Option<TurnOutcome>> {
        self.authorize(user_id)?;
        let Some(request) = self.pending_approvals.write().await.remove(approval_id) else {
            return Ok(None);
        };
        tracing::info!(
            "Approval {} granted for chat {} ({})",
            request.id,
            request.chat_id,
            request.permission_mode
        );

        let options = self
            .options()
            .await
            .with_permission_mode(request.permission_mode);
        let result = self
            .run_turn(
                request.chat_id,
                CONTINUATION_PROMPT,
                &request.session_id,
                &options,
                &request.working_directory,
            )
            .await;
        Ok(Some(
            self.finish_turn(
                request.chat_id,
                &request.session_id,
                &request.working_directory,
                result,
            )
            .await,
        ))
    }

    /// Discards a pending request. Returns false if it did not exist.
    pub async fn deny(&self, user_id: UserId, approval_id: &str) -> Result<bool> {
        self.authorize(user_id)?;
        let removed = self.pending_approvals.write().await.remove(approval_id);
        if let Some(request) = &removed {
            tracing::info!("Approval {} denied for chat {}", request.id, request.chat_id);
        }
        Ok(removed.is_some())
    }

    /// Pending requests of a chat, in no particular order.
    pub async fn pending_approvals(&self, chat_id: ChatId) -> Vec<ApprovalRequest> {
        self.pending_approvals
            .read()
            .await
            .values()
            .filter(|request| request.chat_id == chat_id)
            .cloned()
            .collect()
    }

    async fn run_turn(
        &self,
        chat_id: ChatId,
        prompt: &str,
        session_id: &str,
        options: &TurnOptions,
        working_directory: &Path,
    ) -> TurnResult {
        let _liveness = self
            .liveness
            .as_ref()
            .map(|signal| LivenessGuard::start(signal.clone(), chat_id, self.liveness_interval));

        self.executor
            .execute(prompt, session_id, options, working_directory)
            .await
    }

    async fn finish_turn(
        &self,
        chat_id: ChatId,
        session_id: &str,
        working_directory: &Path,
        result: TurnResult,
    ) -> TurnOutcome {
        if let Some(failure) = &result.failure {
            tracing::warn!("Turn for chat {} failed: {}", chat_id, failure);
        }
        if !result.needs_approval() {
            return TurnOutcome {
                result,
                approval: None,
            };
        }

        let request = ApprovalRequest::new(
            chat_id,
            session_id,
            working_directory,
            result.permission_denials.clone(),
        );
        tracing::info!(
            "Chat {} needs approval {} for {} tool call(s)",
            chat_id,
            request.id,
            request.denials.len()
        );
        self.pending_approvals
            .write()
            .await
            .insert(request.id.clone(), request.clone());
        TurnOutcome {
            result,
            approval: Some(request),
        }
    }

    // -- conversation state --------------------------------------------------

    /// Returns the chat's state, creating it on first use.
    pub async fn chat(&self, chat_id: ChatId) -> ChatSession {
        self.update_chat(chat_id, |chat| chat.clone()).await
    }

    async fn update_chat<R>(&self, chat_id: ChatId, f: impl FnOnce(&mut ChatSession) -> R) -> R {
        let mut chats = self.chats.write().await;
        let chat = chats
            .entry(chat_id)
            .or_insert_with(|| ChatSession::new(self.config.default_working_directory.clone()));
        f(chat)
    }

    /// Starts a new conversation and returns its session id.
    pub async fn new_conversation(&self, chat_id: ChatId) -> String {
        let (previous, current) = self
            .update_chat(chat_id, |chat| {
                let previous = chat.restart();
                (previous, chat.session_id.clone())
            })
            .await;
        self.sessions.forget(&previous).await;
        tracing::debug!("Chat {} reset: {} -> {}", chat_id, previous, current);
        current
    }

    pub async fn session_record(&self, chat_id: ChatId) -> SessionRecord {
        let chat = self.chat(chat_id).await;
        SessionRecord {
            established: self.sessions.is_established(&chat.session_id).await,
            session_id: chat.session_id,
            working_directory: chat.working_directory,
            project_key: chat.project_key,
        }
    }

    pub async fn status(&self, chat_id: ChatId) -> ChatStatus {
        let chat = self.chat(chat_id).await;
        let options = self.options().await;
        ChatStatus {
            working_directory: chat.working_directory,
            project_key: chat.project_key,
            session_id: chat.session_id,
            model: options.model,
            max_budget_usd: options.max_budget_usd,
        }
    }

    // -- run options ---------------------------------------------------------

    /// Options used for the next turn.
    pub async fn options(&self) -> TurnOptions {
        self.options.read().await.clone()
    }

    pub async fn set_model(&self, model: impl Into<String>) {
        let model = model.into();
        tracing::info!("Model set to {}", model);
        self.options.write().await.model = model;
    }

    pub async fn set_budget(&self, max_budget_usd: Option<String>) {
        tracing::info!("Budget cap set to {:?}", max_budget_usd);
        self.options.write().await.max_budget_usd = max_budget_usd;
    }

    // -- projects and sessions -----------------------------------------------

    pub async fn list_projects(&self) -> Result<Vec<ProjectInfo>> {
        self.transcripts.list_projects().await
    }

    /// Recent sessions of the chat's project; empty when no project is selected.
    pub async fn list_sessions(
        &self,
        chat_id: ChatId,
        limit: usize,
    ) -> Result<Vec<SessionSummary>> {
        let Some(project_key) = self.chat(chat_id).await.project_key else {
            return Ok(Vec::new());
        };
        self.transcripts.list_sessions(&project_key, limit).await
    }

    /// Makes `project` the chat's project and starts a new session in it.
    pub async fn select_project(&self, chat_id: ChatId, project: &ProjectInfo) -> ChatSession {
        let chat = self
            .update_chat(chat_id, |chat| {
                chat.project_key = Some(project.project_key.clone());
                chat.working_directory = project.resolved_path.clone();
                chat.restart();
                chat.clone()
            })
            .await;
        tracing::info!(
            "Chat {} switched to project {}",
            chat_id,
            project.resolved_path.display()
        );
        chat
    }

    /// Selects a project by 1-based listing number or by substring.
    ///
    /// A number outside the listing selects nothing. Any other query picks
    /// the first project whose decoded path or key contains it.
    pub async fn switch_project(
        &self,
        chat_id: ChatId,
        query: &str,
    ) -> Result<Option<ProjectInfo>> {
        let query = query.trim();
        let projects = self.list_projects().await?;

        let found = match query.parse::<i64>() {
            Ok(number) => number
                .checked_sub(1)
                .and_then(|index| usize::try_from(index).ok())
                .and_then(|index| projects.get(index))
                .cloned(),
            Err(_) => projects
                .into_iter()
                .find(|p| {
                    p.resolved_path.to_string_lossy().contains(query)
                        || p.project_key.contains(query)
                }),
        };

        if let Some(project) = &found {
            self.select_project(chat_id, project).await;
        }
        Ok(found)
    }

    /// Continues a session picked from a listing.
    pub async fn resume_session(&self, chat_id: ChatId, summary: &SessionSummary) -> ChatSession {
        self.sessions.mark_established(&summary.session_id).await;
        let chat = self
            .update_chat(chat_id, |chat| {
                chat.session_id = summary.session_id.clone();
                if let Some(cwd) = summary
                    .working_directory
                    .as_ref()
                    .filter(|cwd| !cwd.as_os_str().is_empty())
                {
                    chat.working_directory = cwd.clone();
                }
                chat.clone()
            })
            .await;
        tracing::info!("Chat {} resumed session {}", chat_id, summary.session_id);
        chat
    }

    /// Continues a session given its id or an id prefix.
    ///
    /// A prefix is expanded against the most recent sessions of the chat's
    /// project. Returns `None` when no transcript with the id exists.
    pub async fn resume_by_id(
        &self,
        chat_id: ChatId,
        id_or_prefix: &str,
    ) -> Result<Option<SessionRecord>> {
        let id_or_prefix = id_or_prefix.trim();
        if id_or_prefix.is_empty() {
            return Ok(None);
        }

        let mut session_id = id_or_prefix.to_string();
        if session_id.len() < FULL_SESSION_ID_LEN {
            let recent = self.list_sessions(chat_id, PREFIX_SEARCH_LIMIT).await?;
            if let Some(summary) = recent.iter().find(|s| s.session_id.starts_with(id_or_prefix)) {
                session_id = summary.session_id.clone();
            }
        }

        let Some((project_key, working_directory)) =
            self.transcripts.find_session(&session_id).await?
        else {
            tracing::debug!("Session {} not found in transcript store", session_id);
            return Ok(None);
        };

        self.sessions.mark_established(&session_id).await;
        self.update_chat(chat_id, |chat| {
            chat.session_id = session_id.clone();
            chat.project_key = Some(project_key.clone());
            chat.working_directory = working_directory.clone();
        })
        .await;
        tracing::info!("Chat {} resumed session {}", chat_id, session_id);

        Ok(Some(SessionRecord {
            session_id,
            established: true,
            working_directory,
            project_key: Some(project_key),
        }))
    }
}
