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

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub reference_path: PathBuf,
    pub api_keys: Vec<String>,
    pub sweep_window_days: u32,
    pub sweep_cron: String,
    pub recompute_cron: String,
    pub recompute_top_n_brands: usize,
    pub recompute_max_concurrent_brands: usize,
    /// Effective credibility each of two sources needs for synchronous corroboration.
    pub corroboration_threshold: f64,
    /// Lower bar used once the official check has failed.
    pub fallback_threshold: f64,
    pub dedup_threshold: f64,
    pub dealbreaker_cap: f64,
    pub dealbreaker_label: String,
    pub rate_limit_capacity: u32,
    pub rate_limit_refill_per_sec: f64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("reference_path", &self.reference_path)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("sweep_window_days", &self.sweep_window_days)
            .field("sweep_cron", &self.sweep_cron)
            .field("recompute_cron", &self.recompute_cron)
            .field("recompute_top_n_brands", &self.recompute_top_n_brands)
            .field(
                "recompute_max_concurrent_brands",
                &self.recompute_max_concurrent_brands,
            )
            .field("corroboration_threshold", &self.corroboration_threshold)
            .field("fallback_threshold", &self.fallback_threshold)
            .field("dedup_threshold", &self.dedup_threshold)
            .field("dealbreaker_cap", &self.dealbreaker_cap)
            .field("dealbreaker_label", &self.dealbreaker_label)
            .field("rate_limit_capacity", &self.rate_limit_capacity)
            .field("rate_limit_refill_per_sec", &self.rate_limit_refill_per_sec)
            .finish()
    }
}
