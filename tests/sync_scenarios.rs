//! End-to-end synchronizer scenarios against a scripted data source.
//!
//! Run with: cargo test --test sync_scenarios

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

use polybot_terminal::config::{SimulationConfig, SyncConfig};
use polybot_terminal::error::{Result, SyncError};
use polybot_terminal::feeds::simulated::SimulatedSource;
use polybot_terminal::feeds::DataSource;
use polybot_terminal::models::activity::ActivityLog;
use polybot_terminal::models::chat::{ChatMessage, Sender};
use polybot_terminal::models::envelope::{TickResponse, TunnelEvent, TunnelMessage};
use polybot_terminal::models::market::{Market, MarketCategory, Side};
use polybot_terminal::models::portfolio::PortfolioSnapshot;
use polybot_terminal::models::position::Position;
use polybot_terminal::models::stats::DecisionStats;
use polybot_terminal::models::trade::{Trade, TradeAction};
use polybot_terminal::simulation::catalog::default_markets;
use polybot_terminal::simulation::responder::{reply_pool, ChatTopic};
use polybot_terminal::sync::{LiveState, SyncHandle, Synchronizer};

// ---------------------------------------------------------------------------
// Scripted source
// ---------------------------------------------------------------------------

struct Step {
    delay: Duration,
    result: Result<TickResponse>,
}

fn ok(tick: TickResponse) -> Step {
    Step {
        delay: Duration::ZERO,
        result: Ok(tick),
    }
}

fn fail() -> Step {
    Step {
        delay: Duration::ZERO,
        result: Err(SyncError::Simulated("connection refused".into())),
    }
}

/// Tick results are served in order, then empty ticks forever. Bootstrap
/// resources fail unless scripted.
#[derive(Default)]
struct ScriptedSource {
    ticks: Mutex<VecDeque<Step>>,
    trades: Option<Vec<Trade>>,
    chat_history: Vec<ChatMessage>,
    chat_reply: Option<ChatMessage>,
    bootstrap_calls: AtomicUsize,
    decision_calls: AtomicUsize,
    /// The first decision-stats request takes a minute to answer.
    slow_first_decision: bool,
}

impl ScriptedSource {
    fn with_ticks(steps: Vec<Step>) -> Self {
        Self {
            ticks: Mutex::new(steps.into()),
            ..Self::default()
        }
    }
}

fn unscripted<T>() -> Result<T> {
    Err(SyncError::Simulated("not scripted".into()))
}

#[async_trait]
impl DataSource for ScriptedSource {
    async fn tick(&self) -> Result<TickResponse> {
        let step = self.ticks.lock().unwrap().pop_front();
        match step {
            Some(Step { delay, result }) => {
                tokio::time::sleep(delay).await;
                result
            }
            None => Ok(TickResponse::default()),
        }
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        self.bootstrap_calls.fetch_add(1, Ordering::SeqCst);
        unscripted()
    }

    async fn portfolio_history(&self) -> Result<Vec<PortfolioSnapshot>> {
        unscripted()
    }

    async fn trades(&self) -> Result<Vec<Trade>> {
        self.trades.clone().ok_or(SyncError::Simulated("not scripted".into()))
    }

    async fn activity(&self) -> Result<Vec<ActivityLog>> {
        unscripted()
    }

    async fn chat_history(&self) -> Result<Vec<ChatMessage>> {
        Ok(self.chat_history.clone())
    }

    async fn decision_stats(&self) -> Result<DecisionStats> {
        let call = self.decision_calls.fetch_add(1, Ordering::SeqCst);
        if self.slow_first_decision && call == 0 {
            tokio::time::sleep(Duration::from_secs(60)).await;
        }
        Ok(DecisionStats {
            total_decisions: 10,
            buys: 4,
            sells: 2,
            holds: 4,
            executed: 6,
        })
    }

    async fn send_chat(&self, _message: &str) -> Result<ChatMessage> {
        self.chat_reply.clone().ok_or(SyncError::Simulated("chat down".into()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn start(source: Arc<dyn DataSource>) -> (SyncHandle, broadcast::Sender<()>) {
    let (shutdown_tx, _) = broadcast::channel(1);
    let handle = Synchronizer::new(source, SyncConfig::default()).start(&shutdown_tx);
    (handle, shutdown_tx)
}

async fn wait_until(
    rx: &mut watch::Receiver<Arc<LiveState>>,
    what: &str,
    pred: impl FnMut(&Arc<LiveState>) -> bool,
) -> Arc<LiveState> {
    match tokio::time::timeout(Duration::from_secs(60), rx.wait_for(pred)).await {
        Ok(Ok(state)) => state.clone(),
        _ => panic!("timed out waiting for: {what}"),
    }
}

fn market(id: &str, price: f64) -> Market {
    Market::new(id, &format!("{id}?"), MarketCategory::Crypto, price)
}

fn trade(id: &str) -> Trade {
    Trade {
        id: id.to_string(),
        timestamp: Utc::now(),
        market_id: "mkt_btc_150k".into(),
        market_question: "Will Bitcoin reach $150k by end of 2026?".into(),
        action: TradeAction::Buy,
        side: Side::Yes,
        quantity: 100.0,
        price: 0.42,
        total_cost: 42.0,
        confidence: 80,
        reasoning: "test".into(),
        profit_loss: None,
    }
}

fn bot_message(id: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_string(),
        timestamp: Utc::now(),
        sender: Sender::Bot,
        content: "Risk is capped at 5% per market.".into(),
        is_typing: None,
    }
}

fn markets_tick(markets: Vec<Market>) -> TickResponse {
    TickResponse {
        markets: Some(markets),
        ..TickResponse::default()
    }
}

fn ids(markets: &[Market]) -> Vec<&str> {
    markets.iter().map(|m| m.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_first_tick_fires_immediately() {
    let source = ScriptedSource::with_ticks(vec![ok(markets_tick(vec![market("a", 0.4)]))]);
    let (handle, _shutdown) = start(Arc::new(source));
    let started = tokio::time::Instant::now();

    let mut rx = handle.subscribe();
    let state = wait_until(&mut rx, "connected", |s| s.is_connected()).await;

    assert!(started.elapsed() < Duration::from_millis(1500));
    assert_eq!(ids(state.markets()), ["a"]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_tick_is_discarded() {
    let slow = Step {
        delay: Duration::from_secs(5),
        result: Ok(markets_tick(vec![market("stale", 0.1)])),
    };
    let source = ScriptedSource::with_ticks(vec![slow, ok(markets_tick(vec![market("fresh", 0.2)]))]);
    let (handle, _shutdown) = start(Arc::new(source));

    let mut rx = handle.subscribe();
    wait_until(&mut rx, "fresh markets", |s| !s.markets().is_empty()).await;

    // Tick #1 completes at t=5s, after #2 was applied.
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(ids(handle.snapshot().markets()), ["fresh"]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_failure_does_not_disconnect() {
    let slow_failure = Step {
        delay: Duration::from_secs(5),
        result: Err(SyncError::Simulated("timeout".into())),
    };
    let source = ScriptedSource::with_ticks(vec![slow_failure, ok(TickResponse::default())]);
    let (handle, _shutdown) = start(Arc::new(source));

    let mut rx = handle.subscribe();
    wait_until(&mut rx, "connected", |s| s.is_connected()).await;

    tokio::time::sleep(Duration::from_secs(7)).await;
    assert!(handle.snapshot().is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_keeps_last_known_state() {
    let first = TickResponse {
        events: vec![TunnelMessage::now(TunnelEvent::TradeExecuted(trade("t1")))],
        ..TickResponse::default()
    };
    let source = Arc::new(ScriptedSource::with_ticks(vec![ok(first), fail()]));
    let (handle, _shutdown) = start(source.clone());

    let mut rx = handle.subscribe();
    wait_until(&mut rx, "first trade", |s| s.is_connected() && s.trades().len() == 1).await;

    let offline = wait_until(&mut rx, "disconnect", |s| !s.is_connected()).await;
    assert_eq!(offline.trades().len(), 1, "collections survive a failed tick");
    assert!(!offline.status().is_connected);

    let online = wait_until(&mut rx, "reconnect", |s| s.is_connected()).await;
    assert_eq!(online.trades()[0].id, "t1");
    assert_eq!(
        source.bootstrap_calls.load(Ordering::SeqCst),
        1,
        "bootstrap runs only on the first connection"
    );
}

#[tokio::test(start_paused = true)]
async fn test_flat_markets_override_event_fold() {
    let tick = TickResponse {
        events: vec![TunnelMessage::now(TunnelEvent::MarketUpdate(market("evt", 0.7)))],
        markets: Some(vec![market("flat_1", 0.3), market("flat_2", 0.6)]),
        ..TickResponse::default()
    };
    let source = ScriptedSource::with_ticks(vec![ok(tick)]);
    let (handle, _shutdown) = start(Arc::new(source));

    let mut rx = handle.subscribe();
    let state = wait_until(&mut rx, "markets", |s| !s.markets().is_empty()).await;
    assert_eq!(ids(state.markets()), ["flat_1", "flat_2"]);
}

#[tokio::test(start_paused = true)]
async fn test_market_update_upserts_across_ticks() {
    let update = |price| TickResponse {
        events: vec![TunnelMessage::now(TunnelEvent::MarketUpdate(market("a", price)))],
        ..TickResponse::default()
    };
    let source = ScriptedSource::with_ticks(vec![
        ok(markets_tick(vec![market("a", 0.40), market("b", 0.50)])),
        ok(update(0.45)),
        ok(update(0.45)),
    ]);
    let (handle, _shutdown) = start(Arc::new(source));

    tokio::time::sleep(Duration::from_secs(5)).await;
    let state = handle.snapshot();
    assert_eq!(ids(state.markets()), ["a", "b"]);
    assert_eq!(state.markets()[0].current_price, 0.45);
}

#[tokio::test(start_paused = true)]
async fn test_chat_reply_merged_once() {
    let reply = bot_message("m1");
    let tick = TickResponse {
        events: vec![TunnelMessage::now(TunnelEvent::ChatResponse(reply.clone()))],
        ..TickResponse::default()
    };
    let source = ScriptedSource {
        chat_reply: Some(reply.clone()),
        chat_history: vec![reply.clone()],
        ..ScriptedSource::with_ticks(vec![ok(tick)])
    };
    let (handle, _shutdown) = start(Arc::new(source));

    let mut rx = handle.subscribe();
    wait_until(&mut rx, "connected", |s| s.is_connected()).await;

    let returned = handle.send_chat("What is your risk management approach?").await;
    assert_eq!(returned.as_ref().map(|m| m.id.as_str()), Some("m1"));

    tokio::time::sleep(Duration::from_secs(3)).await;
    let state = handle.snapshot();
    let m1_count = state.chat().iter().filter(|m| m.id == "m1").count();
    assert_eq!(m1_count, 1, "m1 merged from event, history and reply exactly once");
    assert_eq!(state.chat().len(), 2);
    assert!(state.chat().iter().any(|m| m.sender == Sender::User));
}

#[tokio::test(start_paused = true)]
async fn test_chat_failure_keeps_optimistic_message() {
    let source = ScriptedSource::with_ticks(vec![]);
    let (handle, _shutdown) = start(Arc::new(source));

    assert!(handle.send_chat("hello?").await.is_none());
    assert!(handle.send_chat("   ").await.is_none(), "blank input is ignored");

    let mut rx = handle.subscribe();
    let state = wait_until(&mut rx, "optimistic message", |s| !s.chat().is_empty()).await;
    assert_eq!(state.chat().len(), 1);
    assert_eq!(state.chat()[0].sender, Sender::User);
    assert_eq!(state.chat()[0].content, "hello?");
}

#[tokio::test(start_paused = true)]
async fn test_decision_stats_poll_waits_for_connection() {
    let source = Arc::new(ScriptedSource::with_ticks(vec![fail(), fail(), fail()]));
    let (handle, _shutdown) = start(source.clone());

    // Ticks at 0s, 1.5s, 3s fail.
    tokio::time::sleep(Duration::from_millis(4000)).await;
    assert_eq!(source.decision_calls.load(Ordering::SeqCst), 0);
    assert!(handle.snapshot().decision_stats().is_none());

    let mut rx = handle.subscribe();
    let state = wait_until(&mut rx, "decision stats", |s| s.decision_stats().is_some()).await;
    assert_eq!(state.decision_stats().map(|d| d.executed), Some(6));
}

#[tokio::test(start_paused = true)]
async fn test_decision_stats_poll_survives_hung_request() {
    let source = Arc::new(ScriptedSource {
        slow_first_decision: true,
        ..ScriptedSource::with_ticks(vec![])
    });
    let (handle, _shutdown) = start(source.clone());

    let mut rx = handle.subscribe();
    wait_until(&mut rx, "connected", |s| s.is_connected()).await;

    // 5s period: refreshes at 0, 5, 10, ... keep going while the first one hangs.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let calls = source.decision_calls.load(Ordering::SeqCst);
    assert!(calls >= 6, "only {calls} refreshes in 30s");
    assert!(handle.snapshot().decision_stats().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_trades_are_bounded() {
    let source = ScriptedSource {
        trades: Some((0..150).map(|i| trade(&format!("t{i}"))).collect()),
        ..ScriptedSource::with_ticks(vec![])
    };
    let (handle, _shutdown) = start(Arc::new(source));

    let mut rx = handle.subscribe();
    let state = wait_until(&mut rx, "bootstrap trades", |s| !s.trades().is_empty()).await;
    assert_eq!(state.trades().len(), 100);
    assert_eq!(state.trades()[0].id, "t0");
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_writer() {
    let (handle, shutdown_tx) = start(Arc::new(ScriptedSource::default()));
    let mut rx = handle.subscribe();
    wait_until(&mut rx, "connected", |s| s.is_connected()).await;

    shutdown_tx.send(()).unwrap();
    let closed = tokio::time::timeout(Duration::from_secs(10), async {
        while rx.changed().await.is_ok() {}
    })
    .await;
    assert!(closed.is_ok(), "state channel closes after shutdown");
}

#[tokio::test(start_paused = true)]
async fn test_simulated_backend_end_to_end() {
    let config = SimulationConfig {
        enabled: true,
        failure_rate: 0.0,
    };
    let catalog = default_markets();
    let source = SimulatedSource::with_seed(&config, catalog.clone(), 99);
    let (handle, _shutdown) = start(Arc::new(source));

    let mut rx = handle.subscribe();
    let state = wait_until(&mut rx, "bootstrapped", |s| {
        s.is_connected() && !s.positions().is_empty() && s.portfolio_history().len() > 1
    })
    .await;
    assert_eq!(state.markets().len(), catalog.len());
    assert!(state.portfolio_history().len() <= 90);
    assert!(state.status().is_connected);

    let reply = handle
        .send_chat("What is your risk management approach?")
        .await
        .expect("simulated chat never fails at rate 0");
    assert!(reply_pool(Some(ChatTopic::Risk)).contains(&reply.content.as_str()));

    // The reply also arrives as a CHAT_RESPONSE event on the next tick.
    tokio::time::sleep(Duration::from_secs(4)).await;
    let state = handle.snapshot();
    assert_eq!(state.chat().iter().filter(|m| m.id == reply.id).count(), 1);
}
