use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// YAML file naming the retailer base URL and the categories to pull.
    pub catalog_path: PathBuf,
    /// Directory holding the `data.json` / `sales.json` snapshots.
    pub cache_dir: PathBuf,
    /// Six-field cron expression (seconds first) for the periodic refresh.
    pub refresh_cron: String,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window_secs: u64,
    pub scraper_request_timeout_secs: u64,
    pub scraper_user_agent: String,
    pub scraper_max_concurrent_fetches: usize,
    pub scraper_max_retries: u32,
    pub scraper_retry_backoff_base_secs: u64,
}
