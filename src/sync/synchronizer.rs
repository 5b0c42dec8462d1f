use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::feeds::source::DataSource;
use crate::models::activity::ActivityLog;
use crate::models::chat::ChatMessage;
use crate::models::envelope::TickResponse;
use crate::models::portfolio::PortfolioSnapshot;
use crate::models::position::Position;
use crate::models::stats::DecisionStats;
use crate::models::trade::Trade;
use crate::sync::state::{LiveState, Windows};

/// Everything that can change `LiveState`. Only the writer task consumes these.
#[derive(Debug)]
pub enum Update {
    Tick { seq: u64, result: Result<TickResponse> },
    Positions(Result<Vec<Position>>),
    PortfolioHistory(Result<Vec<PortfolioSnapshot>>),
    Trades(Result<Vec<Trade>>),
    Activity(Result<Vec<ActivityLog>>),
    ChatHistory(Result<Vec<ChatMessage>>),
    DecisionStats(Result<DecisionStats>),
    /// Optimistic local message, before the backend has answered.
    ChatSent(ChatMessage),
    ChatReply(ChatMessage),
}

/// Keeps a `LiveState` in step with a `DataSource`.
///
/// Spawns:
///   1. Tick loop (every `tick_interval`, first call immediately)
///   2. State writer (sole owner of the state, publishes snapshots)
///   3. On first connection: bootstrap fetches and the decision-stats poller
pub struct Synchronizer {
    source: Arc<dyn DataSource>,
    config: SyncConfig,
}

/// Read-only view of the synchronized state plus the chat command.
#[derive(Clone)]
pub struct SyncHandle {
    state: watch::Receiver<Arc<LiveState>>,
    updates: mpsc::UnboundedSender<Update>,
    source: Arc<dyn DataSource>,
}

impl Synchronizer {
    pub fn new(source: Arc<dyn DataSource>, config: SyncConfig) -> Self {
        Self { source, config }
    }

    pub fn start(self, shutdown_tx: &broadcast::Sender<()>) -> SyncHandle {
        info!(
            "Starting synchronizer: tick={}ms decision_stats={}ms",
            self.config.tick_interval_ms, self.config.decision_stats_interval_ms
        );

        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let initial = LiveState::new(Windows::from(&self.config));
        let (state_tx, state_rx) = watch::channel(Arc::new(initial.clone()));

        let writer = Writer {
            state: initial,
            last_tick_seq: 0,
            bootstrapped: false,
            publish: state_tx,
            source: self.source.clone(),
            updates: update_tx.clone(),
            shutdown_tx: shutdown_tx.clone(),
            decision_stats_interval: self.config.decision_stats_interval(),
        };
        tokio::spawn(writer.run(update_rx, shutdown_tx.subscribe()));

        spawn_tick_loop(
            self.source.clone(),
            update_tx.clone(),
            self.config.tick_interval(),
            shutdown_tx.subscribe(),
        );

        SyncHandle {
            state: state_rx,
            updates: update_tx,
            source: self.source,
        }
    }
}

impl SyncHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> Arc<LiveState> {
        self.state.borrow().clone()
    }

    /// Receiver that is notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<LiveState>> {
        self.state.clone()
    }

    /// Send a chat message to the bot.
    ///
    /// The user's message shows up in `chat` right away. Returns the bot's
    /// reply, or None when the backend could not be reached; the user's
    /// message is kept either way.
    pub async fn send_chat(&self, text: &str) -> Option<ChatMessage> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.updates.send(Update::ChatSent(ChatMessage::from_user(text))).ok()?;

        match self.source.send_chat(text).await {
            Ok(reply) => {
                let _ = self.updates.send(Update::ChatReply(reply.clone()));
                Some(reply)
            }
            Err(e) => {
                warn!("Chat request failed: {}", e);
                None
            }
        }
    }
}

fn spawn_tick_loop(
    source: Arc<dyn DataSource>,
    updates: mpsc::UnboundedSender<Update>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut seq: u64 = 0;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    seq += 1;
                    // Own task per request: a slow response never delays the next tick.
                    let source = source.clone();
                    let updates = updates.clone();
                    tokio::spawn(async move {
                        let result = source.tick().await;
                        let _ = updates.send(Update::Tick { seq, result });
                    });
                }
                _ = shutdown.recv() => {
                    info!("Tick loop shutting down");
                    break;
                }
            }
        }
    });
}

struct Writer {
    state: LiveState,
    last_tick_seq: u64,
    bootstrapped: bool,
    publish: watch::Sender<Arc<LiveState>>,
    source: Arc<dyn DataSource>,
    updates: mpsc::UnboundedSender<Update>,
    shutdown_tx: broadcast::Sender<()>,
    decision_stats_interval: Duration,
}

impl Writer {
    async fn run(
        mut self,
        mut updates: mpsc::UnboundedReceiver<Update>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(update) = update else { break };
                    if self.apply(update) {
                        self.publish.send_replace(Arc::new(self.state.clone()));
                    }
                }
                _ = shutdown.recv() => {
                    info!("State writer shutting down");
                    break;
                }
            }
        }
    }

    /// Returns whether the state changed.
    fn apply(&mut self, update: Update) -> bool {
        match update {
            Update::Tick { seq, result } => {
                if seq < self.last_tick_seq {
                    debug!("Discarding stale tick #{} (last applied #{})", seq, self.last_tick_seq);
                    return false;
                }
                self.last_tick_seq = seq;

                match result {
                    Ok(tick) => {
                        if self.state.mark_connected() {
                            info!("Connected to backend");
                            if !self.bootstrapped {
                                self.bootstrapped = true;
                                self.spawn_bootstrap();
                            }
                        }
                        self.state.apply_tick(tick);
                    }
                    Err(e) => {
                        warn!("Tick #{} failed: {}", seq, e);
                        self.state.mark_disconnected();
                    }
                }
                true
            }
            Update::Positions(result) => self.bootstrap_step("positions", result, LiveState::replace_positions),
            Update::PortfolioHistory(result) => {
                self.bootstrap_step("portfolio history", result, LiveState::replace_portfolio_history)
            }
            Update::Trades(result) => self.bootstrap_step("trades", result, LiveState::replace_trades),
            Update::Activity(result) => self.bootstrap_step("activity", result, LiveState::replace_activity),
            Update::ChatHistory(result) => self.bootstrap_step("chat history", result, LiveState::merge_chat),
            Update::DecisionStats(result) => match result {
                Ok(stats) => {
                    self.state.set_decision_stats(stats);
                    true
                }
                Err(e) => {
                    debug!("Decision stats refresh failed: {}", e);
                    false
                }
            },
            Update::ChatSent(message) | Update::ChatReply(message) => {
                self.state.merge_chat(vec![message]);
                true
            }
        }
    }

    fn bootstrap_step<T>(
        &mut self,
        what: &str,
        result: Result<T>,
        apply: impl FnOnce(&mut LiveState, T),
    ) -> bool {
        match result {
            Ok(value) => {
                apply(&mut self.state, value);
                debug!("Bootstrap {} loaded", what);
                true
            }
            Err(e) => {
                warn!("Bootstrap {} failed: {}", what, e);
                false
            }
        }
    }

    fn spawn_bootstrap(&self) {
        info!("Running bootstrap fetches");

        macro_rules! fetch {
            ($method:ident, $variant:ident) => {{
                let source = self.source.clone();
                let updates = self.updates.clone();
                tokio::spawn(async move {
                    let result = source.$method().await;
                    let _ = updates.send(Update::$variant(result));
                });
            }};
        }

        fetch!(positions, Positions);
        fetch!(portfolio_history, PortfolioHistory);
        fetch!(trades, Trades);
        fetch!(activity, Activity);
        fetch!(chat_history, ChatHistory);

        self.spawn_decision_stats_poller();
    }

    fn spawn_decision_stats_poller(&self) {
        let source = self.source.clone();
        let updates = self.updates.clone();
        let period = self.decision_stats_interval;
        let mut shutdown = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if updates.is_closed() {
                            break;
                        }
                        // Own task per refresh: a hung request never stalls the poll.
                        let source = source.clone();
                        let updates = updates.clone();
                        tokio::spawn(async move {
                            let result = source.decision_stats().await;
                            let _ = updates.send(Update::DecisionStats(result));
                        });
                    }
                    _ = shutdown.recv() => break,
                }
            }
        });
    }
}
