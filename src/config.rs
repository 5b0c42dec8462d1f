use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub simulation: SimulationConfig,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// None = the transport's own default.
    pub http_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub tick_interval_ms: u64,           // Primary poll period (1.5s)
    pub decision_stats_interval_ms: u64, // Decision aggregate refresh (5s)
    pub history_window: usize,           // Portfolio snapshots kept for charting
    pub trades_window: usize,
    pub activity_window: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub enabled: bool,
    pub failure_rate: f64, // Probability a simulated call fails like a dropped connection
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub summary_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1500,
            decision_stats_interval_ms: 5000,
            history_window: 90,
            trades_window: 100,
            activity_window: 200,
        }
    }
}

impl SyncConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn decision_stats_interval(&self) -> Duration {
        Duration::from_millis(self.decision_stats_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".into(),
                http_timeout_secs: None,
            },
            sync: SyncConfig::default(),
            simulation: SimulationConfig {
                enabled: false,
                failure_rate: 0.0,
            },
            telemetry: TelemetryConfig {
                log_level: "info".into(),
                summary_interval_secs: 30,
            },
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| v == "true" || v == "1")
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Config {
    /// Load configuration from environment variables (.env file) with defaults.
    ///
    /// Optional env vars:
    ///   POLYBOT_API_URL: backend base URL (default: http://localhost:8000)
    ///   POLYBOT_SIMULATE: "true" to run against the in-process simulated backend
    ///   POLYBOT_TICK_MS, POLYBOT_DECISION_STATS_MS: poll periods
    ///   POLYBOT_HTTP_TIMEOUT_SECS: request timeout (transport default if unset)
    ///   POLYBOT_SUMMARY_SECS: terminal summary period (default: 30)
    ///   POLYBOT_SIM_FAILURE_RATE: simulated transport failure probability
    ///   RUST_LOG: log level (default: info)
    pub fn load_or_default() -> Self {
        // Load .env file if present
        let _ = dotenv::dotenv();

        let mut config = Self::default();

        if let Ok(url) = std::env::var("POLYBOT_API_URL") {
            let url = url.trim();
            if !url.is_empty() {
                config.api.base_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Some(secs) = env_parse::<u64>("POLYBOT_HTTP_TIMEOUT_SECS") {
            config.api.http_timeout_secs = Some(secs);
        }

        if let Some(ms) = env_parse("POLYBOT_TICK_MS") {
            config.sync.tick_interval_ms = ms;
        }
        if let Some(ms) = env_parse("POLYBOT_DECISION_STATS_MS") {
            config.sync.decision_stats_interval_ms = ms;
        }

        if let Some(enabled) = env_flag("POLYBOT_SIMULATE") {
            config.simulation.enabled = enabled;
        }
        if let Some(rate) = env_parse("POLYBOT_SIM_FAILURE_RATE") {
            config.simulation.failure_rate = rate;
        }

        if let Some(secs) = env_parse("POLYBOT_SUMMARY_SECS") {
            config.telemetry.summary_interval_secs = secs;
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.telemetry.log_level = level;
        }

        config
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.simulation.enabled {
            let parsed = url::Url::parse(&self.api.base_url)?;
            anyhow::ensure!(
                matches!(parsed.scheme(), "http" | "https"),
                "POLYBOT_API_URL must be http(s), got {}",
                parsed.scheme()
            );
        }
        anyhow::ensure!(self.sync.tick_interval_ms > 0, "tick interval must be > 0");
        anyhow::ensure!(
            self.sync.decision_stats_interval_ms > 0,
            "decision stats interval must be > 0"
        );
        anyhow::ensure!(
            self.sync.history_window > 0 && self.sync.trades_window > 0 && self.sync.activity_window > 0,
            "collection windows must be non-empty"
        );
        anyhow::ensure!(
            (0.0..=1.0).contains(&self.simulation.failure_rate),
            "POLYBOT_SIM_FAILURE_RATE must be between 0 and 1, got {}",
            self.simulation.failure_rate
        );
        Ok(())
    }
}
