use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BotMode {
    Live,
    Paper,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatus {
    pub is_connected: bool,
    pub last_heartbeat: DateTime<Utc>,
    /// Seconds since the bot process started.
    pub uptime: u64,
    pub total_trades: u64,
    /// Percent, 0-100.
    pub win_rate: f64,
    pub active_positions: u32,
    pub mode: BotMode,
    pub version: String,
}

impl Default for BotStatus {
    fn default() -> Self {
        Self {
            is_connected: false,
            last_heartbeat: DateTime::<Utc>::default(),
            uptime: 0,
            total_trades: 0,
            win_rate: 0.0,
            active_positions: 0,
            mode: BotMode::Paper,
            version: String::new(),
        }
    }
}
