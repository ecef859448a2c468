use deadpool_redis::{redis, redis::AsyncCommands, Runtime};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{api::error, ENV};

pub async fn connect_database() -> Result<PgPool, error::SystemError> {
    let database_url = &ENV.database_url;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .acquire_slow_threshold(std::time::Duration::from_secs(3))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Thin wrapper around the Redis pool. Holds the ephemeral state this service
/// keeps outside Postgres: presence keys and the retention sweep lock.
#[derive(Clone)]
pub struct RedisCache {
    pool: deadpool_redis::Pool,
}

impl RedisCache {
    pub async fn new() -> Result<Self, error::SystemError> {
        let mut cfg = deadpool_redis::Config::from_url(&ENV.redis_url);
        cfg.pool = Some(deadpool_redis::PoolConfig { max_size: 16, ..Default::default() });
        let pool = cfg.create_pool(Some(Runtime::Tokio1))?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> deadpool_redis::Pool {
        self.pool.clone()
    }

    /// SET NX EX; returns true when this holder acquired the lock.
    pub async fn try_lock(
        &self,
        key: &str,
        holder: &str,
        ttl_secs: u64,
    ) -> Result<bool, error::SystemError> {
        let mut conn = self.pool.get().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(holder)
            .arg("NX")
            .arg("EX")
            .arg(ttl_secs)
            .query_async(&mut *conn)
            .await?;
        Ok(reply.is_some())
    }

    /// Release the lock if this holder still owns it. The get-then-del pair is
    /// not atomic; the TTL bounds the damage if the holder dies in between.
    pub async fn unlock(&self, key: &str, holder: &str) -> Result<(), error::SystemError> {
        let mut conn = self.pool.get().await?;
        let current: Option<String> = conn.get(key).await?;
        if current.as_deref() == Some(holder) {
            conn.del::<_, ()>(key).await?;
        }
        Ok(())
    }
}
