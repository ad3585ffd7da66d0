//! Authentication service: login, logout and status over the session manager
//! and the user directory.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::session::{Session, SessionManager};
use crate::error::{AppError, AppResult};
use crate::security::UserDirectory;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Wire shape for login/logout/status responses. `username` and `roles` are
/// omitted entirely when not logged in.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
}

impl AuthStatus {
    pub fn logged_out() -> Self {
        Self {
            logged_in: false,
            username: None,
            roles: None,
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    directory: Arc<UserDirectory>,
    sessions: SessionManager,
}

impl AuthService {
    pub fn new(directory: Arc<UserDirectory>, sessions: SessionManager) -> Self {
        Self {
            directory,
            sessions,
        }
    }

    /// Verify credentials and mark the session logged in. Unknown-user and
    /// wrong-password failures are indistinguishable to the caller; the CSRF
    /// token already bound to the session survives the login.
    pub async fn login(&self, session: &mut Session, req: &LoginRequest) -> AppResult<AuthStatus> {
        let Some(user) = self.directory.verify(&req.username, &req.password) else {
            return Err(AppError::Auth);
        };
        session.record.logged_in = true;
        session.record.username = Some(user.username.clone());
        session.record.roles = user.roles.clone();
        self.sessions.save(session).await?;
        info!(username = %user.username, "login");
        Ok(AuthStatus {
            logged_in: true,
            username: Some(user.username.clone()),
            roles: Some(user.roles.clone()),
        })
    }

    /// Destroy the session unconditionally. Idempotent: logging out a session
    /// that never logged in, or was already destroyed, succeeds.
    pub async fn logout(&self, session: &Session) -> AppResult<AuthStatus> {
        self.sessions.destroy(&session.id).await?;
        info!("logout");
        Ok(AuthStatus::logged_out())
    }

    /// Report the session's authentication state without mutating it.
    pub fn status(&self, session: &Session) -> AuthStatus {
        match session.record.principal() {
            Some(p) => AuthStatus {
                logged_in: true,
                username: Some(p.username),
                roles: Some(p.roles),
            },
            None => AuthStatus::logged_out(),
        }
    }
}
