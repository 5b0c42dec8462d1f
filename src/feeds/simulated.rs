//! In-process stand-in for the bot backend.
//!
//! Keeps a small world (catalog prices, a running portfolio walk, trade and
//! chat history) and serves it through the same `DataSource` surface as the
//! HTTP client, so the synchronizer cannot tell the two apart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::error::{Result, SyncError};
use crate::feeds::source::DataSource;
use crate::models::activity::{ActivityLog, LogType, Severity};
use crate::models::chat::ChatMessage;
use crate::models::envelope::{TickResponse, TunnelEvent, TunnelMessage};
use crate::models::market::Market;
use crate::models::portfolio::{PortfolioSnapshot, INITIAL_BALANCE};
use crate::models::position::Position;
use crate::models::stats::DecisionStats;
use crate::models::status::{BotMode, BotStatus};
use crate::models::trade::{round2, Trade, TradeAction};
use crate::simulation::{generator, responder};

const HISTORY_DAYS: u32 = 90;
const SEED_TRADES: usize = 20;
const SEED_ACTIVITY: usize = 30;
const MAX_TRADES: usize = 100;
const MAX_ACTIVITY: usize = 200;

const PRICE_STEP: f64 = 0.02;
const TRADE_PROBABILITY: f64 = 0.10;

struct World {
    rng: StdRng,
    started: DateTime<Utc>,
    markets: Vec<Market>,
    positions: Vec<Position>,
    history: Vec<PortfolioSnapshot>,
    trades: Vec<Trade>,
    activity: Vec<ActivityLog>,
    chat: Vec<ChatMessage>,
    /// Events produced outside a tick (chat replies), delivered with the next one.
    pending: Vec<TunnelMessage>,
}

pub struct SimulatedSource {
    world: Mutex<World>,
    failure_rate: f64,
}

impl SimulatedSource {
    pub fn new(config: &SimulationConfig, catalog: Vec<Market>) -> Self {
        Self::build(config, catalog, StdRng::from_entropy())
    }

    /// Deterministic world for tests and reproducible demos.
    pub fn with_seed(config: &SimulationConfig, catalog: Vec<Market>, seed: u64) -> Self {
        Self::build(config, catalog, StdRng::seed_from_u64(seed))
    }

    fn build(config: &SimulationConfig, markets: Vec<Market>, mut rng: StdRng) -> Self {
        let now = Utc::now();
        let positions = generator::open_positions(&mut rng, &markets);
        let history = generator::portfolio_history(&mut rng, HISTORY_DAYS, now);
        let trades = generator::trade_history(&mut rng, &markets, SEED_TRADES, now);
        let activity = generator::activity_logs(&mut rng, SEED_ACTIVITY, now);

        Self {
            world: Mutex::new(World {
                rng,
                started: now,
                markets,
                positions,
                history,
                trades,
                activity,
                chat: Vec::new(),
                pending: Vec::new(),
            }),
            failure_rate: config.failure_rate.clamp(0.0, 1.0),
        }
    }

    fn roll_failure(&self, world: &mut World, what: &str) -> Result<()> {
        if self.failure_rate > 0.0 && world.rng.gen_bool(self.failure_rate) {
            return Err(SyncError::Simulated(format!("{what}: connection dropped")));
        }
        Ok(())
    }
}

impl World {
    fn nudge_market(&mut self) -> Option<Market> {
        if self.markets.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.markets.len());
        let step = self.rng.gen_range(-PRICE_STEP..=PRICE_STEP);
        let market = &mut self.markets[idx];
        market.current_price = ((market.current_price + step) * 1000.0).round() / 1000.0;
        market.current_price = market
            .current_price
            .clamp(generator::MIN_TRADE_PRICE, generator::MAX_TRADE_PRICE);
        let market = market.clone();

        for pos in self.positions.iter_mut().filter(|p| p.market_id == market.id) {
            pos.reprice(market.price_of(pos.side));
        }
        Some(market)
    }

    fn step_portfolio(&mut self, now: DateTime<Utc>) -> PortfolioSnapshot {
        let previous = self
            .history
            .last()
            .map(|s| s.total_value)
            .unwrap_or(INITIAL_BALANCE);
        let total = round2(previous * (1.0 + self.rng.gen_range(-0.002..=0.0025)));
        let invested = round2(self.positions.iter().map(Position::market_value).sum::<f64>().min(total));

        let snapshot = PortfolioSnapshot {
            timestamp: now,
            total_value: total,
            cash_balance: round2(total - invested),
            invested_value: invested,
            daily_pnl: round2(total - previous),
            total_pnl: round2(total - INITIAL_BALANCE),
        };
        self.history.push(snapshot.clone());
        let excess = self.history.len().saturating_sub(HISTORY_DAYS as usize + 1);
        self.history.drain(..excess);
        snapshot
    }

    fn record_trade(&mut self, trade: Trade) -> ActivityLog {
        let log = ActivityLog {
            id: format!("log_{:06x}", self.rng.gen::<u32>() & 0x00ff_ffff),
            timestamp: trade.timestamp,
            log_type: LogType::Trade,
            severity: if trade.action == TradeAction::Hold {
                Severity::Info
            } else {
                Severity::Success
            },
            message: format!(
                "{} {} on \"{}\" at {:.2}",
                trade.action.as_str(),
                trade.side.as_str(),
                trade.market_question,
                trade.price
            ),
            details: Some(trade.reasoning.clone()),
        };

        self.trades.insert(0, trade);
        self.trades.truncate(MAX_TRADES);
        self.activity.insert(0, log.clone());
        self.activity.truncate(MAX_ACTIVITY);
        log
    }

    fn status(&self, now: DateTime<Utc>) -> BotStatus {
        let settled: Vec<bool> = self.trades.iter().filter_map(Trade::is_win).collect();
        let wins = settled.iter().filter(|w| **w).count();
        BotStatus {
            is_connected: true,
            last_heartbeat: now,
            uptime: (now - self.started).num_seconds().max(0) as u64,
            total_trades: self.trades.len() as u64,
            win_rate: if settled.is_empty() {
                0.0
            } else {
                (wins as f64 / settled.len() as f64 * 1000.0).round() / 10.0
            },
            active_positions: self.positions.len() as u32,
            mode: BotMode::Paper,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[async_trait]
impl DataSource for SimulatedSource {
    async fn tick(&self) -> Result<TickResponse> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "tick")?;

        let now = Utc::now();
        let mut events: Vec<TunnelMessage> = world.pending.drain(..).collect();

        if let Some(market) = world.nudge_market() {
            events.push(TunnelMessage::now(TunnelEvent::MarketUpdate(market)));
        }

        if world.rng.gen_bool(TRADE_PROBABILITY) {
            let World { rng, markets, .. } = &mut *world;
            if let Some(trade) = generator::random_trade(rng, markets, now) {
                let log = world.record_trade(trade.clone());
                events.push(TunnelMessage::now(TunnelEvent::TradeExecuted(trade)));
                events.push(TunnelMessage::now(TunnelEvent::ActivityLog(log)));
            }
        }

        let snapshot = world.step_portfolio(now);
        events.push(TunnelMessage::now(TunnelEvent::PortfolioUpdate(snapshot)));
        events.push(TunnelMessage::now(TunnelEvent::BotStatus(world.status(now))));

        debug!("Simulated tick with {} events", events.len());
        Ok(TickResponse {
            events,
            markets: Some(world.markets.clone()),
            ..TickResponse::default()
        })
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "positions")?;
        Ok(world.positions.clone())
    }

    async fn portfolio_history(&self) -> Result<Vec<PortfolioSnapshot>> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "portfolio history")?;
        Ok(world.history.clone())
    }

    async fn trades(&self) -> Result<Vec<Trade>> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "trades")?;
        Ok(world.trades.clone())
    }

    async fn activity(&self) -> Result<Vec<ActivityLog>> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "activity")?;
        Ok(world.activity.clone())
    }

    async fn chat_history(&self) -> Result<Vec<ChatMessage>> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "chat history")?;
        Ok(world.chat.clone())
    }

    async fn decision_stats(&self) -> Result<DecisionStats> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "decision stats")?;
        Ok(generator::decision_stats(&mut world.rng))
    }

    async fn send_chat(&self, message: &str) -> Result<ChatMessage> {
        let mut world = self.world.lock().await;
        self.roll_failure(&mut world, "chat")?;

        let now = Utc::now();
        let mut user = ChatMessage::from_user(message);
        user.timestamp = now;
        let reply = responder::canned_reply(&mut world.rng, message, now);

        world.chat.push(user);
        world.chat.push(reply.clone());
        world
            .pending
            .push(TunnelMessage::now(TunnelEvent::ChatResponse(reply.clone())));
        Ok(reply)
    }
}
