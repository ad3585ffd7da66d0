//! User directory and credential verification.
//! Passwords are held as Argon2 PHC strings and verified with the argon2
//! crate's constant-time comparison. Lookups for unknown usernames still run
//! a verification pass against a throwaway hash so the unknown-user and
//! wrong-password paths do comparable work.

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub roles: Vec<String>,
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else {
        false
    }
}

/// Static user directory, read-only at request time. Usernames are unique.
pub struct UserDirectory {
    users: HashMap<String, User>,
    // Verified against when the username is unknown, to equalize timing.
    dummy_hash: String,
}

impl UserDirectory {
    pub fn new(users: Vec<User>) -> Result<Self> {
        let dummy_hash = hash_password("well-known-decoy")?;
        let mut map = HashMap::with_capacity(users.len());
        for user in users {
            if map.insert(user.username.clone(), user).is_some() {
                return Err(anyhow!("duplicate username in user directory"));
            }
        }
        Ok(Self {
            users: map,
            dummy_hash,
        })
    }

    /// Directory matching the original deployment: admin/admin with roles
    /// [admin, user] and user/user with role [user], hashed at startup.
    pub fn with_default_users() -> Result<Self> {
        Self::new(vec![
            User {
                username: "admin".to_string(),
                password_hash: hash_password("admin")?,
                roles: vec!["admin".to_string(), "user".to_string()],
            },
            User {
                username: "user".to_string(),
                password_hash: hash_password("user")?,
                roles: vec!["user".to_string()],
            },
        ])
    }

    /// Exact-match credential check. Returns `None` for both unknown usernames
    /// and wrong passwords, after an Argon2 pass either way.
    pub fn verify(&self, username: &str, password: &str) -> Option<&User> {
        match self.users.get(username) {
            Some(user) => verify_password(&user.password_hash, password).then_some(user),
            None => {
                let _ = verify_password(&self.dummy_hash, password);
                None
            }
        }
    }
}
