use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::portfolio::{PortfolioSnapshot, INITIAL_BALANCE};
use super::trade::{round2, Trade, TradeAction};

/// Headline aggregates for the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub portfolio_value: f64,
    pub daily_change: f64,
    pub daily_change_percent: f64,
    #[serde(rename = "totalPnL")]
    pub total_pnl: f64,
    #[serde(rename = "totalPnLPercent")]
    pub total_pnl_percent: f64,
    pub total_trades: u64,
    pub win_rate: f64,
    pub active_positions: u32,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
}

/// Counts of the bot's decisions, HOLDs included. Snake-case on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionStats {
    pub total_decisions: u64,
    pub buys: u64,
    pub sells: u64,
    pub holds: u64,
    pub executed: u64,
}

impl DecisionStats {
    /// Tally decisions from a trade list; every listed trade counts as executed
    /// except HOLDs.
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut stats = Self::default();
        for trade in trades {
            stats.total_decisions += 1;
            match trade.action {
                TradeAction::Buy => stats.buys += 1,
                TradeAction::Sell => stats.sells += 1,
                TradeAction::Hold => stats.holds += 1,
            }
            if trade.action != TradeAction::Hold {
                stats.executed += 1;
            }
        }
        stats
    }

    pub fn execution_rate(&self) -> f64 {
        if self.total_decisions == 0 {
            return 0.0;
        }
        self.executed as f64 / self.total_decisions as f64
    }
}

impl DashboardStats {
    /// Compute the aggregate from locally held collections.
    ///
    /// `history` is oldest-first and normally ends with `current`. Daily change
    /// compares against the latest entry at least 24h older than the newest one,
    /// falling back to the oldest entry, then to the initial balance. Drawdown
    /// is measured from a running peak that starts at the initial balance.
    pub fn derive(
        current: Option<&PortfolioSnapshot>,
        history: &[PortfolioSnapshot],
        trades: &[Trade],
        active_positions: usize,
    ) -> Self {
        let latest = current.or_else(|| history.last());
        let initial = latest
            .map(|s| s.implied_initial_balance())
            .filter(|b| *b > 0.0)
            .unwrap_or(INITIAL_BALANCE);
        let value = latest.map(|s| s.total_value).unwrap_or(initial);

        let total_pnl = value - initial;
        let total_pnl_percent = if initial > 0.0 { total_pnl / initial * 100.0 } else { 0.0 };

        let reference = latest
            .and_then(|l| {
                let cutoff = l.timestamp - Duration::hours(24);
                history.iter().rev().find(|s| s.timestamp <= cutoff)
            })
            .or_else(|| history.first())
            .map(|s| s.total_value)
            .unwrap_or(initial);
        let daily_change = value - reference;
        let daily_change_percent = if reference > 0.0 { daily_change / reference * 100.0 } else { 0.0 };

        let mut peak = initial;
        let mut max_drawdown: f64 = 0.0;
        for snap in history {
            peak = peak.max(snap.total_value);
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - snap.total_value) / peak * 100.0);
            }
        }

        let settled: Vec<bool> = trades.iter().filter_map(Trade::is_win).collect();
        let win_rate = if settled.is_empty() {
            0.0
        } else {
            let wins = settled.iter().filter(|w| **w).count();
            (wins as f64 / settled.len() as f64 * 1000.0).round() / 10.0
        };

        Self {
            portfolio_value: round2(value),
            daily_change: round2(daily_change),
            daily_change_percent: round2(daily_change_percent),
            total_pnl: round2(total_pnl),
            total_pnl_percent: round2(total_pnl_percent),
            total_trades: trades.len() as u64,
            win_rate,
            active_positions: active_positions as u32,
            sharpe_ratio: 0.0,
            max_drawdown: round2(max_drawdown),
        }
    }
}
