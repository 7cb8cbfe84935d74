//! Access/refresh token storage.
//!
//! Tokens live in memory and, for the persistent variant, in a JSON file
//! under the platform data directory so a console session survives process
//! restarts. Every observer shares the same store: the REST client writes
//! refreshed tokens, the event channel reads the access token at connect
//! time.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use mv_protocol::rest::TokenPair;

#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    /// Absent for in-memory stores (tests, one-shot commands).
    path: Option<PathBuf>,
    tokens: Mutex<Option<TokenPair>>,
}

impl TokenStore {
    /// Store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                path: None,
                tokens: Mutex::new(None),
            }),
        }
    }

    /// Store backed by `<data dir>/mailvault/tokens.json`, pre-loaded with
    /// whatever a previous session left there.
    pub fn persistent() -> Self {
        let path = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mailvault")
            .join("tokens.json");

        let tokens = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| serde_json::from_str::<TokenPair>(&contents).ok());

        Self {
            inner: Arc::new(StoreInner {
                path: Some(path),
                tokens: Mutex::new(tokens),
            }),
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .tokens
            .lock()
            .unwrap()
            .as_ref()
            .map(|t| t.access_token.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner
            .tokens
            .lock()
            .unwrap()
            .as_ref()
            .map(|t| t.refresh_token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.tokens.lock().unwrap().is_some()
    }

    /// Replace the stored pair; persistence failures are logged, not fatal.
    pub fn set(&self, pair: TokenPair) {
        if let Some(path) = &self.inner.path {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            match serde_json::to_string(&pair) {
                Ok(contents) => {
                    if let Err(e) = std::fs::write(path, contents) {
                        tracing::warn!(error = %e, "failed to persist tokens");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to serialize tokens"),
            }
        }
        *self.inner.tokens.lock().unwrap() = Some(pair);
    }

    /// Drop the stored pair and remove the on-disk copy.
    pub fn clear(&self) {
        if let Some(path) = &self.inner.path {
            let _ = std::fs::remove_file(path);
        }
        *self.inner.tokens.lock().unwrap() = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: format!("{access}-refresh"),
            token_type: "bearer".to_string(),
            expires_in: 3600,
        }
    }

    #[test]
    fn in_memory_store_round_trips() {
        let store = TokenStore::in_memory();
        assert!(!store.is_authenticated());
        assert_eq!(store.access_token(), None);

        store.set(pair("abc"));
        assert!(store.is_authenticated());
        assert_eq!(store.access_token().as_deref(), Some("abc"));
        assert_eq!(store.refresh_token().as_deref(), Some("abc-refresh"));

        store.clear();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn clones_share_state() {
        let store = TokenStore::in_memory();
        let other = store.clone();
        store.set(pair("xyz"));
        assert_eq!(other.access_token().as_deref(), Some("xyz"));
    }
}
