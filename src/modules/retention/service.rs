use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::configs::RedisCache;
use crate::modules::conversation::repository::ConversationRepository;
use crate::modules::message::repository::MessageRepository;

const SWEEP_LOCK_KEY: &str = "retention:sweep:lock";

#[derive(Debug, Clone)]
pub struct RetentionConfig {
    pub sweep_interval: Duration,
    pub lock_ttl_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(300),
            // shorter than the interval so a crashed holder frees the lock
            // before the next cycle
            lock_ttl_secs: 270,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Idle,
    Scanning,
    Deleting,
}

#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: u64,
    pub failed: usize,
}

/// Periodically removes messages that have outlived their conversation's
/// auto-delete policy. Exactly one instance sweeps cluster-wide; the
/// others find the Redis lock taken and skip the cycle.
pub struct RetentionSweeper<R, M>
where
    R: ConversationRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    conversation_repo: Arc<R>,
    message_repo: Arc<M>,
    config: RetentionConfig,
    phase: Arc<RwLock<SweepPhase>>,
    holder: String,
}

impl<R, M> RetentionSweeper<R, M>
where
    R: ConversationRepository + Send + Sync + 'static,
    M: MessageRepository + Send + Sync + 'static,
{
    pub fn new(conversation_repo: Arc<R>, message_repo: Arc<M>, config: RetentionConfig) -> Self {
        RetentionSweeper {
            conversation_repo,
            message_repo,
            config,
            phase: Arc::new(RwLock::new(SweepPhase::Idle)),
            holder: Uuid::now_v7().to_string(),
        }
    }

    pub async fn phase(&self) -> SweepPhase {
        *self.phase.read().await
    }

    async fn set_phase(&self, phase: SweepPhase) {
        *self.phase.write().await = phase;
    }

    /// One full sweep. Policies are read once up front; a conversation
    /// whose policy changes afterwards is protected by the delete
    /// statement re-checking it. Failures are per-conversation: one bad
    /// delete is logged and the rest of the cycle continues.
    pub async fn run_cycle(&self) -> SweepReport {
        self.set_phase(SweepPhase::Scanning).await;

        let candidates = match self.conversation_repo.find_retention_candidates().await {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::error!(error = %err, "retention scan failed");
                self.set_phase(SweepPhase::Idle).await;
                return SweepReport { scanned: 0, deleted: 0, failed: 1 };
            }
        };

        self.set_phase(SweepPhase::Deleting).await;

        let now = chrono::Utc::now();
        let mut report = SweepReport { scanned: candidates.len(), ..Default::default() };

        for candidate in &candidates {
            let cutoff = now - chrono::Duration::days(candidate.auto_delete_days as i64);

            match self.message_repo.delete_expired(&candidate.id, cutoff).await {
                Ok(deleted) => {
                    if deleted > 0 {
                        tracing::info!(
                            conversation_id = %candidate.id,
                            deleted,
                            days = candidate.auto_delete_days,
                            "expired messages removed"
                        );
                    }
                    report.deleted += deleted;
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        conversation_id = %candidate.id,
                        error = %err,
                        "retention delete failed, will retry next cycle"
                    );
                }
            }
        }

        self.set_phase(SweepPhase::Idle).await;

        report
    }

    pub fn start(self, cache: Arc<RedisCache>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.sweep_interval);
            tracing::info!(
                interval_secs = self.config.sweep_interval.as_secs(),
                "retention sweeper started"
            );

            loop {
                interval.tick().await;

                let acquired = match cache
                    .try_lock(SWEEP_LOCK_KEY, &self.holder, self.config.lock_ttl_secs)
                    .await
                {
                    Ok(acquired) => acquired,
                    Err(err) => {
                        tracing::warn!(error = %err, "sweep lock unavailable, skipping cycle");
                        continue;
                    }
                };

                if !acquired {
                    tracing::debug!("another instance holds the sweep lock");
                    continue;
                }

                let report = self.run_cycle().await;
                tracing::info!(
                    scanned = report.scanned,
                    deleted = report.deleted,
                    failed = report.failed,
                    "retention sweep finished"
                );

                if let Err(err) = cache.unlock(SWEEP_LOCK_KEY, &self.holder).await {
                    tracing::warn!(error = %err, "failed to release sweep lock, TTL will expire it");
                }
            }
        })
    }
}
