use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Starting balance the backend and the generator measure cumulative P&L against.
pub const INITIAL_BALANCE: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    pub total_value: f64,
    pub cash_balance: f64,
    pub invested_value: f64,
    #[serde(rename = "dailyPnL")]
    pub daily_pnl: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
}

impl PortfolioSnapshot {
    /// Balance the snapshot's cumulative P&L is measured from.
    pub fn implied_initial_balance(&self) -> f64 {
        self.total_value - self.total_pnl
    }

    pub fn invested_ratio(&self) -> f64 {
        if self.total_value <= 0.0 {
            return 0.0;
        }
        self.invested_value / self.total_value
    }
}
