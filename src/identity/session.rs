//! Session lifecycle over a pluggable backend: opaque ids, get-or-create
//! semantics, CSRF token minting and the double-submit check.

use anyhow::{anyhow, Result};
use base64::Engine;
use std::sync::Arc;

use super::backend::SessionBackend;
use super::principal::SessionRecord;

/// 256-bit random token, base64url without padding.
pub fn random_token() -> Result<String> {
    let mut buf = [0u8; 32];
    getrandom::getrandom(&mut buf).map_err(|e| anyhow!(e.to_string()))?;
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
}

/// A session as seen by one request: the opaque id plus a snapshot of the
/// persisted record. `fresh` marks sessions created for this request, whose
/// id still has to be handed back to the client.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub record: SessionRecord,
    pub fresh: bool,
}

#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn SessionBackend>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn SessionBackend>) -> Self {
        Self { backend }
    }

    /// Look up the session for a presented cookie value, creating an empty one
    /// when the cookie is absent or unknown. Fails only on backend I/O.
    pub async fn get_or_create(&self, presented: Option<&str>) -> Result<Session> {
        if let Some(sid) = presented {
            if let Some(record) = self.backend.load(sid).await? {
                return Ok(Session {
                    id: sid.to_string(),
                    record,
                    fresh: false,
                });
            }
        }
        Ok(Session {
            id: random_token()?,
            record: SessionRecord::default(),
            fresh: true,
        })
    }

    pub async fn save(&self, session: &Session) -> Result<()> {
        self.backend.store(&session.id, &session.record).await
    }

    /// Destroying an absent session is not an error.
    pub async fn destroy(&self, sid: &str) -> Result<()> {
        self.backend.destroy(sid).await
    }

    /// The session's CSRF token, minting and persisting one on first use.
    pub async fn ensure_csrf(&self, session: &mut Session) -> Result<String> {
        if let Some(token) = &session.record.csrf {
            return Ok(token.clone());
        }
        let token = random_token()?;
        session.record.csrf = Some(token.clone());
        self.backend.store(&session.id, &session.record).await?;
        Ok(token)
    }

    /// Double-submit check: the header token must match the session's stored
    /// token. A session without a minted token rejects everything.
    pub fn csrf_matches(session: &Session, provided: Option<&str>) -> bool {
        match (&session.record.csrf, provided) {
            (Some(expected), Some(got)) => expected == got,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::MemoryBackend;

    fn manager() -> SessionManager {
        SessionManager::new(Arc::new(MemoryBackend::default()))
    }

    #[test]
    fn tokens_are_distinct() {
        let a = random_token().unwrap();
        let b = random_token().unwrap();
        assert_ne!(a, b);
        assert!(a.len() >= 43); // 32 bytes base64url
    }

    #[tokio::test]
    async fn unknown_sid_yields_a_fresh_session() {
        let sm = manager();
        let session = sm.get_or_create(Some("stale-cookie")).await.unwrap();
        assert!(session.fresh);
        assert_ne!(session.id, "stale-cookie");
        assert_eq!(session.record, SessionRecord::default());
    }

    #[tokio::test]
    async fn ensure_csrf_persists_and_is_stable() {
        let sm = manager();
        let mut session = sm.get_or_create(None).await.unwrap();
        let token = sm.ensure_csrf(&mut session).await.unwrap();
        assert_eq!(sm.ensure_csrf(&mut session).await.unwrap(), token);

        // A later request with the same sid sees the same token.
        let reloaded = sm.get_or_create(Some(&session.id)).await.unwrap();
        assert!(!reloaded.fresh);
        assert_eq!(reloaded.record.csrf.as_deref(), Some(token.as_str()));

        assert!(SessionManager::csrf_matches(&reloaded, Some(&token)));
        assert!(!SessionManager::csrf_matches(&reloaded, Some("forged")));
        assert!(!SessionManager::csrf_matches(&reloaded, None));
    }

    #[tokio::test]
    async fn destroy_then_get_or_create_starts_clean() {
        let sm = manager();
        let mut session = sm.get_or_create(None).await.unwrap();
        session.record.logged_in = true;
        session.record.username = Some("admin".to_string());
        sm.save(&session).await.unwrap();

        sm.destroy(&session.id).await.unwrap();
        let after = sm.get_or_create(Some(&session.id)).await.unwrap();
        assert!(after.fresh);
        assert!(!after.record.logged_in);
    }
}
