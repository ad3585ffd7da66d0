//! Pluggable session persistence.
//! The storage contract any backend must satisfy: load, store, destroy,
//! keyed by the opaque session id. Backends provide their own concurrency
//! safety; records for distinct sids never cross-contaminate. Concurrent
//! store calls for the same sid are last-writer-wins.

use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::principal::SessionRecord;
use crate::config::RedisConfig;

#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>>;
    async fn store(&self, sid: &str, record: &SessionRecord) -> Result<()>;
    async fn destroy(&self, sid: &str) -> Result<()>;
}

/// Default in-process backend.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().get(sid).cloned())
    }

    async fn store(&self, sid: &str, record: &SessionRecord) -> Result<()> {
        self.sessions.write().insert(sid.to_string(), record.clone());
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<()> {
        self.sessions.write().remove(sid);
        Ok(())
    }
}

/// Redis-backed sessions for multi-process deployments. Records are stored
/// as JSON under `thingamabob:session:<sid>`.
pub struct RedisBackend {
    conn: redis::aio::ConnectionManager,
}

impl RedisBackend {
    /// Connect using a parsed `redis://host:port/databaseIndex` descriptor.
    /// Failures here are fatal at startup, not surfaced per request.
    pub async fn connect(cfg: &RedisConfig) -> Result<Self> {
        let url = format!("redis://{}:{}/{}", cfg.host, cfg.port, cfg.database);
        let client = redis::Client::open(url.as_str())
            .with_context(|| format!("invalid redis target {}:{}", cfg.host, cfg.port))?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .with_context(|| format!("while connecting to redis at {}:{}", cfg.host, cfg.port))?;
        Ok(Self { conn })
    }

    fn key(sid: &str) -> String {
        format!("thingamabob:session:{sid}")
    }
}

#[async_trait]
impl SessionBackend for RedisBackend {
    async fn load(&self, sid: &str) -> Result<Option<SessionRecord>> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(Self::key(sid)).await.context("session load")?;
        match raw {
            Some(payload) => Ok(Some(
                serde_json::from_str(&payload).context("session decode")?,
            )),
            None => Ok(None),
        }
    }

    async fn store(&self, sid: &str, record: &SessionRecord) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let payload = serde_json::to_string(record).context("session encode")?;
        let _: () = conn
            .set(Self::key(sid), payload)
            .await
            .context("session store")?;
        Ok(())
    }

    async fn destroy(&self, sid: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.conn.clone();
        let _: () = conn.del(Self::key(sid)).await.context("session destroy")?;
        Ok(())
    }
}
