use serde::{Deserialize, Serialize};

use super::market::Side;
use super::trade::round2;

/// An open position. P&L fields are derived from entry vs current price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub market_id: String,
    pub market_question: String,
    pub side: Side,
    pub shares: f64,
    pub avg_entry_price: f64,
    pub current_price: f64,
    #[serde(rename = "unrealizedPnL")]
    pub unrealized_pnl: f64,
    pub percent_change: f64,
}

impl Position {
    pub fn new(
        market_id: &str,
        market_question: &str,
        side: Side,
        shares: f64,
        avg_entry_price: f64,
        current_price: f64,
    ) -> Self {
        let mut pos = Self {
            market_id: market_id.to_string(),
            market_question: market_question.to_string(),
            side,
            shares: shares.max(0.0),
            avg_entry_price,
            current_price,
            unrealized_pnl: 0.0,
            percent_change: 0.0,
        };
        pos.reprice(current_price);
        pos
    }

    /// Move to a new mark price and recompute the derived fields.
    pub fn reprice(&mut self, current_price: f64) {
        self.current_price = current_price;
        self.unrealized_pnl = round2((current_price - self.avg_entry_price) * self.shares);
        self.percent_change = if self.avg_entry_price > 0.0 {
            round2((current_price - self.avg_entry_price) / self.avg_entry_price * 100.0)
        } else {
            0.0
        };
    }

    pub fn market_value(&self) -> f64 {
        self.shares * self.current_price
    }
}
