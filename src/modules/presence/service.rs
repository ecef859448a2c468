/// Presence over Redis, polling model.
///
/// Redis key schema:
/// - `presence:{user_id}` -> "1" (TTL 120s), refreshed by each heartbeat
/// - `last_seen:{user_id}` -> RFC 3339 timestamp of the latest heartbeat
///
/// There is no disconnect event: a user is online exactly while their
/// presence key has not expired.
use deadpool_redis::redis;
use uuid::Uuid;

use crate::api::error;
use crate::modules::presence::model::PresenceInfo;

/// A heartbeat within this window counts as online.
const PRESENCE_TTL: u64 = 120;

const PRESENCE_PREFIX: &str = "presence:";
const LAST_SEEN_PREFIX: &str = "last_seen:";

#[derive(Clone)]
pub struct PresenceService {
    pool: deadpool_redis::Pool,
}

impl PresenceService {
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }

    /// Refreshes the online flag and advances last_seen in one round-trip.
    pub async fn heartbeat(&self, user_id: Uuid) -> Result<(), error::SystemError> {
        let mut conn = self.pool.get().await?;
        let presence_key = format!("{PRESENCE_PREFIX}{user_id}");
        let last_seen_key = format!("{LAST_SEEN_PREFIX}{user_id}");
        let now = chrono::Utc::now().to_rfc3339();

        redis::pipe()
            .set_ex(&presence_key, "1", PRESENCE_TTL)
            .set(&last_seen_key, &now)
            .query_async::<()>(&mut *conn)
            .await?;
        Ok(())
    }

    /// Never fails: a Redis hiccup reads as "offline, last seen unknown"
    /// so conversation views keep rendering.
    pub async fn status(&self, user_id: Uuid) -> PresenceInfo {
        match self.try_status(user_id).await {
            Ok(info) => info,
            Err(err) => {
                log::warn!("Presence lookup for user {user_id} degraded: {err}");
                PresenceInfo {
                    user_id,
                    is_online: false,
                    last_seen: None,
                }
            }
        }
    }

    async fn try_status(&self, user_id: Uuid) -> Result<PresenceInfo, error::SystemError> {
        let mut conn = self.pool.get().await?;
        let (is_online, last_seen): (bool, Option<String>) = redis::pipe()
            .exists(format!("{PRESENCE_PREFIX}{user_id}"))
            .get(format!("{LAST_SEEN_PREFIX}{user_id}"))
            .query_async(&mut *conn)
            .await?;

        Ok(PresenceInfo {
            user_id,
            is_online,
            last_seen,
        })
    }

    /// Batch status with pipelined reads. Degrades like `status`.
    pub async fn status_batch(&self, user_ids: &[Uuid]) -> Vec<PresenceInfo> {
        match self.try_status_batch(user_ids).await {
            Ok(infos) => infos,
            Err(err) => {
                log::warn!("Batch presence lookup degraded: {err}");
                user_ids
                    .iter()
                    .map(|&user_id| PresenceInfo {
                        user_id,
                        is_online: false,
                        last_seen: None,
                    })
                    .collect()
            }
        }
    }

    async fn try_status_batch(
        &self,
        user_ids: &[Uuid],
    ) -> Result<Vec<PresenceInfo>, error::SystemError> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.pool.get().await?;

        let mut exists_pipe = redis::pipe();
        for user_id in user_ids {
            exists_pipe.exists(format!("{PRESENCE_PREFIX}{user_id}"));
        }
        let online_flags: Vec<bool> = exists_pipe.query_async(&mut *conn).await?;

        // last_seen is the latest heartbeat, so it is reported for online
        // users as well.
        let mut seen_pipe = redis::pipe();
        for user_id in user_ids {
            seen_pipe.get(format!("{LAST_SEEN_PREFIX}{user_id}"));
        }
        let last_seens: Vec<Option<String>> = seen_pipe.query_async(&mut *conn).await?;

        Ok(user_ids
            .iter()
            .zip(online_flags)
            .zip(last_seens)
            .map(|((&user_id, is_online), last_seen)| PresenceInfo {
                user_id,
                is_online,
                last_seen,
            })
            .collect())
    }
}
