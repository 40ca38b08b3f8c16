//! Tokens of the logged-in user.

use std::sync::{Arc, PoisonError, RwLock};

/// Access and refresh tokens of the logged-in user. Both are opaque strings.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Session {
    /// Sent as bearer token with every request.
    pub access_token: String,
    /// Exchanged for a new pair when the access token expires. Empty before login.
    pub refresh_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

/// Shared holder of the current [`Session`].
///
/// Cloning gives another handle on the same tokens. Reads return a snapshot of both tokens
/// taken under one lock, so a reader never sees the access token of one pair and the refresh
/// token of another. Writes go through [`Gateway`](crate::gateway::Gateway), which serializes
/// refreshes.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    inner: Arc<RwLock<Session>>,
}

impl CredentialStore {
    /// Store without tokens.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of both tokens.
    pub fn get(&self) -> Session {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces both tokens at once.
    pub fn set(&self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Session {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        };
    }

    /// False before login.
    pub fn has_refresh_token(&self) -> bool {
        !self.get().refresh_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_tokens() {
        let store = CredentialStore::new();
        let other = store.clone();
        assert!(!other.has_refresh_token());

        store.set("a1", "r1");
        assert_eq!(
            other.get(),
            Session {
                access_token: "a1".into(),
                refresh_token: "r1".into()
            }
        );
    }

    #[test]
    fn debug_hides_tokens() {
        let store = CredentialStore::new();
        store.set("secret-access", "secret-refresh");
        let printed = format!("{:?}", store.get());
        assert!(!printed.contains("secret"));
    }
}
