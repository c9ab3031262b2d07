//! Hot reload of the config file

use super::{LiveConfig, Settings};
use anyhow::Result;
use relay_shared::defaults;
use std::path::PathBuf;
use std::time::SystemTime;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

/// What we compare between polls to notice a changed file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

/// Polls the config file and swaps in new settings when it changes
pub struct ConfigWatcher {
    path: PathBuf,
    live: LiveConfig,
    poll_interval: Duration,
}

impl ConfigWatcher {
    /// Create a new watcher for `path`
    pub fn new(path: PathBuf, live: LiveConfig) -> Self {
        Self {
            path,
            live,
            poll_interval: Duration::from_millis(defaults::CONFIG_POLL_INTERVAL_MS),
        }
    }

    #[cfg(test)]
    pub fn with_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Start the polling loop
    pub async fn run(&self) {
        let mut last = self.fingerprint().await;
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let current = self.fingerprint().await;
            if current == last {
                continue;
            }
            last = current;

            if current.is_none() {
                warn!("Config file {} is no longer readable", self.path.display());
                continue;
            }

            info!("Config file changed: {}", self.path.display());
            if let Err(e) = self.reload().await {
                warn!("Keeping previous configuration: {:#}", e);
            }
        }
    }

    /// Re-read the file and swap it in; the old snapshot stays on failure
    pub async fn reload(&self) -> Result<()> {
        let settings = Settings::load_non_empty(&self.path).await?;
        let previous = self.live.replace(settings).await;
        let current = self.live.snapshot().await;

        if previous.listen_address() != current.listen_address() {
            warn!(
                "Listen address changed to {} (takes effect after restart)",
                current.listen_address()
            );
        }
        if previous.credentials != current.credentials
            || previous.simulated_vehicles != current.simulated_vehicles
        {
            warn!("Remote session settings changed (takes effect after restart)");
        }

        info!(
            "Configuration reloaded: {} auth tokens, {} retries every {}ms, metric={}",
            current.auth_tokens.len(),
            current.retries,
            current.retry_delay_ms,
            current.metric
        );
        Ok(())
    }

    async fn fingerprint(&self) -> Option<Fingerprint> {
        match tokio::fs::metadata(&self.path).await {
            Ok(meta) => Some(Fingerprint {
                modified: meta.modified().ok(),
                len: meta.len(),
            }),
            Err(e) => {
                debug!("Cannot stat {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_reload_swaps_settings() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"auth_tokens: [old]\n").unwrap();

        let live = LiveConfig::new(Settings::load(file.path()).await.unwrap());
        let watcher = ConfigWatcher::new(file.path().to_path_buf(), live.clone());

        std::fs::write(file.path(), "auth_tokens: [new, newer]\nretries: 9\n").unwrap();
        watcher.reload().await.expect("reload failed");

        let snapshot = live.snapshot().await;
        assert_eq!(snapshot.auth_tokens, vec!["new", "newer"]);
        assert_eq!(snapshot.retries, 9);
    }

    #[tokio::test]
    async fn test_invalid_reload_keeps_previous() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"auth_tokens: [keep]\n").unwrap();

        let live = LiveConfig::new(Settings::load(file.path()).await.unwrap());
        let watcher = ConfigWatcher::new(file.path().to_path_buf(), live.clone());

        std::fs::write(file.path(), "auth_tokens: {broken").unwrap();
        assert!(watcher.reload().await.is_err());
        assert_eq!(live.snapshot().await.auth_tokens, vec!["keep"]);
    }

    #[tokio::test]
    async fn test_emptied_file_keeps_previous() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"auth_tokens: [keep]\nretries: 5\n").unwrap();

        let live = LiveConfig::new(Settings::load(file.path()).await.unwrap());
        let watcher = ConfigWatcher::new(file.path().to_path_buf(), live.clone());

        std::fs::write(file.path(), "").unwrap();
        assert!(watcher.reload().await.is_err());

        let snapshot = live.snapshot().await;
        assert_eq!(snapshot.auth_tokens, vec!["keep"]);
        assert_eq!(snapshot.retries, 5);
    }

    #[tokio::test]
    async fn test_run_picks_up_changes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"retries: 1\n").unwrap();

        let live = LiveConfig::new(Settings::load(file.path()).await.unwrap());
        let watcher = ConfigWatcher::new(file.path().to_path_buf(), live.clone())
            .with_interval(Duration::from_millis(20));
        let task = tokio::spawn(async move { watcher.run().await });

        // Let the watcher take its first fingerprint
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Different length, so the change is seen even with coarse mtimes
        std::fs::write(file.path(), "retries: 4\nmetric: false\n").unwrap();

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while live.snapshot().await.retries != 4 {
            assert!(
                tokio::time::Instant::now() < deadline,
                "watcher did not reload in time"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!live.snapshot().await.metric);

        task.abort();
    }
}
