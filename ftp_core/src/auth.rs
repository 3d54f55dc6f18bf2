//! Authentication gate.
//!
//! The credential store is a plain text file with one `identity secret`
//! pair per line. It is opened read-only for every attempt and never cached.

use std::fmt;
use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::AuthError;

/// An identity/secret pair as submitted during login. Lives only for the
/// duration of the handshake.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub identity: String,
    pub secret: String,
}

impl Credential {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identity", &self.identity)
            .field("secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    Authenticated,
    Rejected,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    anonymous: Option<String>,
}

impl CredentialStore {
    /// `anonymous` names the identity that skips the secret check, if any
    pub fn new(path: impl Into<PathBuf>, anonymous: Option<String>) -> Self {
        Self {
            path: path.into(),
            anonymous,
        }
    }

    /// Check a credential against the store.
    ///
    /// An unreadable store is an error even for the anonymous identity.
    pub async fn authenticate(&self, credential: &Credential) -> Result<AuthOutcome, AuthError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
            AuthError::StoreUnavailable {
                path: self.path.clone(),
                source,
            }
        })?;

        if self.anonymous.as_deref() == Some(credential.identity.as_str()) {
            info!("User {} logged in (anonymous)", credential.identity);
            return Ok(AuthOutcome::Authenticated);
        }

        let found = parse_accounts(&content)
            .any(|(id, secret)| id == credential.identity && secret == credential.secret);

        if found {
            info!("User {} logged in", credential.identity);
            Ok(AuthOutcome::Authenticated)
        } else {
            warn!("Login rejected for {}", credential.identity);
            Ok(AuthOutcome::Rejected)
        }
    }
}

/// Yield `(identity, secret)` pairs. Blank lines and lines without a secret
/// are skipped; trailing whitespace on the secret is ignored.
fn parse_accounts(content: &str) -> impl Iterator<Item = (&str, &str)> {
    content.lines().filter_map(|line| {
        let (identity, secret) = line.split_once(' ')?;
        let secret = secret.trim_end();
        if identity.is_empty() || secret.is_empty() {
            return None;
        }
        Some((identity, secret))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::ANONYMOUS;

    fn store_with(content: &str) -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".accounts");
        std::fs::write(&path, content).unwrap();
        let store = CredentialStore::new(path, Some(ANONYMOUS.to_string()));
        (dir, store)
    }

    #[test]
    fn test_parse_accounts() {
        let pairs: Vec<_> =
            parse_accounts("bob hunter2\n\nalice s3cret  \r\nbroken\n").collect();
        assert_eq!(pairs, vec![("bob", "hunter2"), ("alice", "s3cret")]);
    }

    #[tokio::test]
    async fn test_verbatim_pair_authenticates() {
        let (_dir, store) = store_with("alice wonder\nbob hunter2\n");
        let outcome = store
            .authenticate(&Credential::new("bob", "hunter2"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Authenticated);
    }

    #[tokio::test]
    async fn test_wrong_secret_rejected() {
        let (_dir, store) = store_with("bob hunter2\n");
        let outcome = store
            .authenticate(&Credential::new("bob", "hunter3"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_secret_of_other_identity_rejected() {
        let (_dir, store) = store_with("alice wonder\nbob hunter2\n");
        let outcome = store
            .authenticate(&Credential::new("alice", "hunter2"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_anonymous_ignores_secret() {
        let (_dir, store) = store_with("");
        let outcome = store
            .authenticate(&Credential::new(ANONYMOUS, "whatever"))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Authenticated);
    }

    #[tokio::test]
    async fn test_anonymous_can_be_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".accounts");
        std::fs::write(&path, "bob hunter2\n").unwrap();
        let store = CredentialStore::new(path, None);
        let outcome = store
            .authenticate(&Credential::new(ANONYMOUS, ""))
            .await
            .unwrap();
        assert_eq!(outcome, AuthOutcome::Rejected);
    }

    #[tokio::test]
    async fn test_missing_store_is_operational_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("absent"), Some(ANONYMOUS.to_string()));
        let result = store.authenticate(&Credential::new(ANONYMOUS, "")).await;
        assert!(matches!(result, Err(AuthError::StoreUnavailable { .. })));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", Credential::new("bob", "hunter2"));
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2"));
    }
}
