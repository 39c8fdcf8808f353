//! Client configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the sync server.
    /// Env: `NERVOS_SERVER_URL`
    /// Default: `http://127.0.0.1:8000`
    pub server_url: String,

    /// Pause between sync cycles while unlocked.
    /// Env: `NERVOS_SYNC_INTERVAL_SECS`
    /// Default: 30 seconds
    pub sync_interval: Duration,

    /// How often the sync loop re-checks while locked.
    /// Env: `NERVOS_LOCKED_POLL_MS`
    /// Default: 1 second
    pub locked_poll: Duration,

    /// Quiet period before the debounced writer persists an edit.
    /// Env: `NERVOS_SAVE_DELAY_MS`
    /// Default: 1 second
    pub save_delay: Duration,

    /// Timeout for a single sync request.
    /// Env: `NERVOS_REQUEST_TIMEOUT_SECS`
    /// Default: 30 seconds
    pub request_timeout: Duration,

    /// Database file. `None` uses the platform data directory.
    /// Env: `NERVOS_DB_PATH`
    pub db_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8000".to_string(),
            sync_interval: Duration::from_secs(30),
            locked_poll: Duration::from_millis(1000),
            save_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_secs(30),
            db_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = var("NERVOS_SERVER_URL") {
            let url = url.trim().trim_end_matches('/');
            if url.is_empty() {
                tracing::warn!("Empty NERVOS_SERVER_URL, using default");
            } else {
                config.server_url = url.to_string();
            }
        }

        if let Some(d) = duration_var(&var, "NERVOS_SYNC_INTERVAL_SECS", Duration::from_secs) {
            config.sync_interval = d;
        }
        if let Some(d) = duration_var(&var, "NERVOS_LOCKED_POLL_MS", Duration::from_millis) {
            config.locked_poll = d;
        }
        if let Some(d) = duration_var(&var, "NERVOS_SAVE_DELAY_MS", Duration::from_millis) {
            config.save_delay = d;
        }
        if let Some(d) = duration_var(&var, "NERVOS_REQUEST_TIMEOUT_SECS", Duration::from_secs) {
            config.request_timeout = d;
        }

        if let Some(path) = var("NERVOS_DB_PATH") {
            config.db_path = Some(PathBuf::from(path));
        }

        config
    }
}

fn duration_var(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    unit: fn(u64) -> Duration,
) -> Option<Duration> {
    let val = var(name)?;
    match val.trim().parse::<u64>() {
        Ok(n) if n > 0 => Some(unit(n)),
        _ => {
            tracing::warn!(value = %val, "Invalid {name}, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]);
        assert_eq!(config.server_url, "http://127.0.0.1:8000");
        assert_eq!(config.sync_interval, Duration::from_secs(30));
        assert_eq!(config.save_delay, Duration::from_secs(1));
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("NERVOS_SERVER_URL", "https://notes.example.org/"),
            ("NERVOS_SYNC_INTERVAL_SECS", "5"),
            ("NERVOS_SAVE_DELAY_MS", "250"),
            ("NERVOS_DB_PATH", "/tmp/n.db"),
        ]);
        assert_eq!(config.server_url, "https://notes.example.org");
        assert_eq!(config.sync_interval, Duration::from_secs(5));
        assert_eq!(config.save_delay, Duration::from_millis(250));
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/n.db")));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = from_pairs(&[
            ("NERVOS_SYNC_INTERVAL_SECS", "soon"),
            ("NERVOS_LOCKED_POLL_MS", "0"),
        ]);
        assert_eq!(config.sync_interval, Duration::from_secs(30));
        assert_eq!(config.locked_poll, Duration::from_secs(1));
    }
}
