//! Process-wide configuration shared by all request handling

use super::Settings;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Hot-swappable handle to the current [`Settings`]
///
/// Readers get an `Arc` to a complete snapshot, so a reload can never be
/// observed half-applied. Reloads replace the whole snapshot at once.
#[derive(Clone)]
pub struct LiveConfig {
    current: Arc<RwLock<Arc<Settings>>>,
}

impl LiveConfig {
    /// Create a live config from initial settings
    pub fn new(settings: Settings) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(settings.normalized()))),
        }
    }

    /// Get the current snapshot
    pub async fn snapshot(&self) -> Arc<Settings> {
        self.current.read().await.clone()
    }

    /// Swap in new settings, returning the snapshot they replaced
    pub async fn replace(&self, settings: Settings) -> Arc<Settings> {
        let next = Arc::new(settings.normalized());
        std::mem::replace(&mut *self.current.write().await, next)
    }
}
