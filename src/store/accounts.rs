//! Account store: registration and credential verification.
//!
//! One directory per account under the data root; its existence is the
//! uniqueness witness for registration. The directory holds a `passwd` file
//! with the lowercase-hex SHA-256 digest of the password, never the password
//! itself.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::*;
use sha2::{Digest, Sha256};

use crate::common::error::AuthError;

/// Name of the credential file inside an account directory.
pub const CREDENTIAL_FILE: &str = "passwd";

/// Check that a username is usable as a mailbox directory name and as the
/// local part of an address: ASCII alphanumerics plus `.`, `_`, `-`, no
/// leading dot.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub struct AccountStore {
    root: PathBuf,
}

impl AccountStore {
    pub fn open(root: &Path) -> io::Result<Self> {
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Register a new account and persist its credential digest.
    ///
    /// Directory creation is the uniqueness check: a second registration for
    /// the same name fails with `AccountExists` and leaves the stored
    /// credential untouched.
    pub fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if !is_valid_username(username) {
            return Err(AuthError::InvalidName);
        }

        let dir = self.root.join(username);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("register {}: account exists", username);
                return Err(AuthError::AccountExists);
            }
            Err(e) => return Err(AuthError::Store(e)),
        }

        fs::write(dir.join(CREDENTIAL_FILE), hash_password(password))?;
        info!("registered account {}", username);
        Ok(())
    }

    /// Verify a username/password pair.
    ///
    /// Unknown username and wrong password collapse into the same
    /// `InvalidCredentials` outcome; the candidate password is hashed in both
    /// cases and the digest comparison is constant-time, so neither path
    /// leaks which accounts exist.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let candidate = hash_password(password);

        let stored = if is_valid_username(username) {
            fs::read_to_string(self.root.join(username).join(CREDENTIAL_FILE)).ok()
        } else {
            None
        };

        // Compare against the candidate's own digest when the account is
        // unknown, to keep the timing of both failure paths alike.
        let stored = stored.unwrap_or_else(|| candidate.clone());
        let matched = ct_eq(candidate.as_bytes(), stored.trim().as_bytes());

        if matched && self.exists(username) {
            Ok(())
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }

    /// Whether an account with this name is registered.
    pub fn exists(&self, username: &str) -> bool {
        is_valid_username(username) && self.root.join(username).is_dir()
    }
}

/// Deterministic one-way password digest, rendered as lowercase hex.
fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Constant-time byte comparison. Length mismatch returns early, which is
/// fine: digest strings are fixed-width.
fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
