//! The consumer-visible mirror of the bot. Every mutation goes through one
//! of the `apply_*` / `replace_*` methods so window bounds always hold.

use tracing::debug;

use crate::config::SyncConfig;
use crate::models::activity::ActivityLog;
use crate::models::chat::ChatMessage;
use crate::models::envelope::{TickResponse, TunnelEvent};
use crate::models::market::Market;
use crate::models::portfolio::PortfolioSnapshot;
use crate::models::position::Position;
use crate::models::stats::{DashboardStats, DecisionStats};
use crate::models::status::BotStatus;
use crate::models::trade::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windows {
    pub history: usize,
    pub trades: usize,
    pub activity: usize,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            history: 90,
            trades: 100,
            activity: 200,
        }
    }
}

impl From<&SyncConfig> for Windows {
    fn from(cfg: &SyncConfig) -> Self {
        Self {
            history: cfg.history_window,
            trades: cfg.trades_window,
            activity: cfg.activity_window,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveState {
    windows: Windows,
    connected: bool,
    status: BotStatus,
    portfolio: Option<PortfolioSnapshot>,
    portfolio_history: Vec<PortfolioSnapshot>, // oldest first
    trades: Vec<Trade>,                        // newest first
    activity: Vec<ActivityLog>,                // newest first
    positions: Vec<Position>,
    markets: Vec<Market>,
    stats: Option<DashboardStats>,
    decision_stats: Option<DecisionStats>,
    chat: Vec<ChatMessage>,
}

impl LiveState {
    pub fn new(windows: Windows) -> Self {
        Self {
            windows,
            ..Self::default()
        }
    }

    // --- Accessors ---

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn status(&self) -> &BotStatus {
        &self.status
    }

    pub fn portfolio(&self) -> Option<&PortfolioSnapshot> {
        self.portfolio.as_ref()
    }

    pub fn portfolio_history(&self) -> &[PortfolioSnapshot] {
        &self.portfolio_history
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn activity(&self) -> &[ActivityLog] {
        &self.activity
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn markets(&self) -> &[Market] {
        &self.markets
    }

    pub fn stats(&self) -> Option<&DashboardStats> {
        self.stats.as_ref()
    }

    pub fn decision_stats(&self) -> Option<&DecisionStats> {
        self.decision_stats.as_ref()
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    /// Remote aggregate when the backend sent one, otherwise computed from
    /// the collections held locally.
    pub fn effective_stats(&self) -> DashboardStats {
        match &self.stats {
            Some(stats) => stats.clone(),
            None => DashboardStats::derive(
                self.portfolio.as_ref(),
                &self.portfolio_history,
                &self.trades,
                self.positions.len(),
            ),
        }
    }

    // --- Connectivity ---

    /// Returns true on the disconnected → connected edge.
    pub fn mark_connected(&mut self) -> bool {
        let was = self.connected;
        self.connected = true;
        !was
    }

    pub fn mark_disconnected(&mut self) {
        self.connected = false;
        self.status.is_connected = false;
    }

    // --- Incremental updates ---

    /// Fold one tick: events in delivered order, then the flat fields.
    pub fn apply_tick(&mut self, tick: TickResponse) {
        let event_count = tick.events.len();
        for msg in tick.events {
            self.apply_event(msg.event);
        }

        if let Some(stats) = tick.stats {
            self.stats = Some(stats);
        }
        if let Some(positions) = tick.positions {
            self.positions = positions;
        }
        if let Some(markets) = tick.markets {
            self.markets = markets;
        }
        if let Some(history) = tick.portfolio_history {
            self.replace_portfolio_history(history);
        }

        debug!(
            "Tick applied: events={} trades={} activity={} markets={}",
            event_count,
            self.trades.len(),
            self.activity.len(),
            self.markets.len()
        );
    }

    pub fn apply_event(&mut self, event: TunnelEvent) {
        match event {
            TunnelEvent::BotStatus(status) => self.status = status,
            TunnelEvent::PortfolioUpdate(snapshot) => {
                self.portfolio_history.push(snapshot.clone());
                self.portfolio = Some(snapshot);
                self.trim_history();
            }
            TunnelEvent::TradeExecuted(trade) => {
                self.trades.insert(0, trade);
                self.trades.truncate(self.windows.trades);
            }
            TunnelEvent::ActivityLog(log) => {
                self.activity.insert(0, log);
                self.activity.truncate(self.windows.activity);
            }
            TunnelEvent::MarketUpdate(market) => self.upsert_market(market),
            TunnelEvent::ChatResponse(message) => self.merge_chat(vec![message]),
        }
    }

    /// Replace the market with the same id in place, or append it.
    pub fn upsert_market(&mut self, market: Market) {
        match self.markets.iter_mut().find(|m| m.id == market.id) {
            Some(existing) => *existing = market,
            None => self.markets.push(market),
        }
    }

    /// Add messages whose id is not already present, then keep the log in
    /// timestamp order. Ties keep arrival order.
    pub fn merge_chat(&mut self, incoming: Vec<ChatMessage>) {
        for message in incoming {
            if !self.chat.iter().any(|m| m.id == message.id) {
                self.chat.push(message);
            }
        }
        self.chat.sort_by_key(|m| m.timestamp);
    }

    // --- Bootstrap replacements ---

    pub fn replace_positions(&mut self, positions: Vec<Position>) {
        self.positions = positions;
    }

    /// Keeps the most recent entries when the backend sends more than the window.
    pub fn replace_portfolio_history(&mut self, history: Vec<PortfolioSnapshot>) {
        self.portfolio_history = history;
        self.trim_history();
        if self.portfolio.is_none() {
            self.portfolio = self.portfolio_history.last().cloned();
        }
    }

    pub fn replace_trades(&mut self, mut trades: Vec<Trade>) {
        trades.truncate(self.windows.trades);
        self.trades = trades;
    }

    pub fn replace_activity(&mut self, mut activity: Vec<ActivityLog>) {
        activity.truncate(self.windows.activity);
        self.activity = activity;
    }

    pub fn set_decision_stats(&mut self, stats: DecisionStats) {
        self.decision_stats = Some(stats);
    }

    fn trim_history(&mut self) {
        let excess = self.portfolio_history.len().saturating_sub(self.windows.history);
        if excess > 0 {
            self.portfolio_history.drain(..excess);
        }
    }
}
