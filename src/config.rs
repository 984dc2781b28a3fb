use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Age after which a snapshot is flagged stale. Deliberately not read from the environment.
pub const STALE_THRESHOLD: chrono::Duration = chrono::Duration::milliseconds(86_400_000);

const DEFAULT_SOURCE: &str = "operations-data.json";
const DEFAULT_REALM: &str = "Operations Dashboard";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const SESSION_FILE_NAME: &str = "opsdash-session";

#[derive(Clone, Debug)]
pub struct DashboardConfig {
    pub source: String,
    pub password_digest: Option<String>,
    pub stale_threshold: chrono::Duration,
    pub session_file: PathBuf,
    pub edge_password: Option<String>,
    pub realm: String,
    pub fetch_timeout: Duration,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            password_digest: None,
            stale_threshold: STALE_THRESHOLD,
            session_file: env::temp_dir().join(SESSION_FILE_NAME),
            edge_password: None,
            realm: DEFAULT_REALM.to_string(),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(source) = env::var("OPSDASH_DATA_URL") {
            if !source.trim().is_empty() {
                cfg.source = source;
            }
        }
        cfg.password_digest = non_empty(env::var("OPSDASH_PASSWORD_SHA256").ok())
            .map(|d| d.trim().to_ascii_lowercase());
        if let Ok(path) = env::var("OPSDASH_SESSION_FILE") {
            cfg.session_file = PathBuf::from(path);
        }
        cfg.edge_password = non_empty(env::var("OPS_DASHBOARD_PASSWORD").ok());
        if let Some(realm) = non_empty(env::var("OPSDASH_REALM").ok()) {
            cfg.realm = realm;
        }
        if let Ok(timeout) = env::var("OPSDASH_FETCH_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse::<u64>() {
                cfg.fetch_timeout = Duration::from_secs(parsed);
            }
        }
        cfg
    }

    /// Command-line overrides win over the environment.
    pub fn with_source(mut self, source: Option<String>) -> Self {
        if let Some(s) = source {
            self.source = s;
        }
        self
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_threshold_is_one_day() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.stale_threshold.num_milliseconds(), 86_400_000);
        assert_eq!(cfg.source, "operations-data.json");
        assert!(cfg.password_digest.is_none());
    }

    #[test]
    fn cli_source_overrides() {
        let cfg = DashboardConfig::default().with_source(Some("https://example.com/data.json".into()));
        assert_eq!(cfg.source, "https://example.com/data.json");
        let cfg = cfg.with_source(None);
        assert_eq!(cfg.source, "https://example.com/data.json");
    }
}
