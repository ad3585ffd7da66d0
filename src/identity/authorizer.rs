//! Role-based authorization gate.

use super::principal::{Principal, SessionRecord};
use crate::error::{AppError, AppResult};

/// Gate a request on "is this session logged in" and, when `required` is
/// non-empty, on a non-empty intersection between the session's roles and
/// `required`. A session with roles [admin, user] satisfies a requirement of
/// [admin]. No required roles means any authenticated session passes.
pub fn authorize(record: &SessionRecord, required: &[&str]) -> AppResult<Principal> {
    let Some(principal) = record.principal() else {
        return Err(AppError::Auth);
    };
    if !required.is_empty()
        && !required
            .iter()
            .any(|r| principal.roles.iter().any(|held| held == r))
    {
        return Err(AppError::Auth);
    }
    Ok(principal)
}
