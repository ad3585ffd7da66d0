use serde::{Deserialize, Serialize};

/// Authenticated caller identity derived from a session record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Typed session attribute bag persisted by a `SessionBackend`.
/// Absent or default-valued fields model "unauthenticated" explicitly;
/// there is no duck-typed attribute casting anywhere downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionRecord {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    /// Anti-forgery token bound to this session, if one has been minted.
    #[serde(default)]
    pub csrf: Option<String>,
}

impl SessionRecord {
    /// The logged-in identity, or `None` when the record does not establish one.
    pub fn principal(&self) -> Option<Principal> {
        if !self.logged_in {
            return None;
        }
        let username = self.username.clone()?;
        Some(Principal {
            username,
            roles: self.roles.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_requires_logged_in_and_username() {
        assert_eq!(SessionRecord::default().principal(), None);

        let half = SessionRecord {
            logged_in: true,
            ..Default::default()
        };
        assert_eq!(half.principal(), None);

        let full = SessionRecord {
            logged_in: true,
            username: Some("admin".to_string()),
            roles: vec!["admin".to_string()],
            csrf: None,
        };
        let principal = full.principal().unwrap();
        assert_eq!(principal.username, "admin");
        assert_eq!(principal.roles, vec!["admin".to_string()]);
    }
}
