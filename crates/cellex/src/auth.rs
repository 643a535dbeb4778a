//! Session credentials shared by dispatchers.

use std::sync::Arc;
use tokio::sync::RwLock;

/// Bearer token for the current session.
///
/// Cloning shares the same session. The token is set by a successful login and
/// cleared by logout or by any 401 response. Only the dispatcher mutates it.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    token: Arc<RwLock<Option<String>>>,
}

impl AuthContext {
    /// Create an unauthenticated context
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token, if any
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Whether a token is held
    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub(crate) async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub(crate) async fn clear(&self) {
        *self.token.write().await = None;
    }
}
