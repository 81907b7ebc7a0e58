//! Periodic "still working" signal shown while a turn runs.

use crate::chat::ChatId;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default interval between two pulses.
pub const DEFAULT_LIVENESS_INTERVAL: Duration = Duration::from_secs(5);

/// Front-end hook that tells a chat the assistant is still working
/// (a typing indicator, a spinner, ...).
#[async_trait]
pub trait LivenessSignal: Send + Sync {
    async fn pulse(&self, chat_id: ChatId);
}

/// Pulses a [`LivenessSignal`] until dropped.
///
/// The first pulse is sent immediately.
#[derive(Debug)]
pub struct LivenessGuard {
    token: CancellationToken,
}

impl LivenessGuard {
    pub fn start(signal: Arc<dyn LivenessSignal>, chat_id: ChatId, interval: Duration) -> Self {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            biased;
                            _ = cancelled.cancelled() => break,
                            _ = signal.pulse(chat_id) => {}
                        }
                    }
                }
            }
            tracing::trace!("Liveness signal for chat {} stopped", chat_id);
        });

        Self { token }
    }
}

impl Drop for LivenessGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
