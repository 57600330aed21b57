//! # scheduler
//!
//! **Refresh Loop** — fetch immediately, then every `period`, and publish the
//! result into the [`TimeSeriesStore`].
//!
//! ## State machine
//!
//! ```text
//!   Idle ──tick──▶ Fetching ──payload──▶ Settled(Ok)     ──notify──▶ Idle
//!                     │      ──error────▶ Settled(Failed) ──notify──▶ Idle
//!                     └─tick─▶ coalesced (no second request)
//! ```
//!
//! * Exactly one fetch may be outstanding. It runs as its own task so the
//!   loop keeps receiving ticks and the stop signal while it waits.
//! * A transport failure leaves the store untouched and sets `last_error`.
//! * `stop()` aborts the in-flight fetch and waits for the loop to exit, so
//!   nothing is written to the store afterwards.
//!
//! Time comes from `tokio::time`; tests run on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, oneshot, Mutex, RwLock};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::FetchError;
use crate::provider::{ProviderPayload, QuoteSource};
use crate::store::TimeSeriesStore;

type FetchResult = Result<ProviderPayload, FetchError>;

// ─── Status ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Ok,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "outcome", rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Fetching,
    Settled(Outcome),
}

/// What the dashboard needs for its banner and health badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RefreshStatus {
    #[serde(flatten)]
    pub phase:           Phase,
    /// How the most recent cycle settled. Kept after the phase returns to
    /// `Idle`, so the dashboard can tell a healthy loop from a failing one.
    pub last_outcome:    Option<Outcome>,
    /// Set by a failed cycle, cleared by the next successful one.
    pub last_error:      Option<String>,
    pub last_success_at: Option<DateTime<Utc>>,
    /// Fetches started so far.
    pub cycles:          u64,
    /// Ticks that arrived while a fetch was still running.
    pub coalesced_ticks: u64,
}

impl Default for RefreshStatus {
    fn default() -> Self {
        Self {
            phase:           Phase::Idle,
            last_outcome:    None,
            last_error:      None,
            last_success_at: None,
            cycles:          0,
            coalesced_ticks: 0,
        }
    }
}

// ─── Events ───────────────────────────────────────────────────────────────────

/// Broadcast to subscribers after every settled cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefreshEvent {
    /// New data is in the store.
    Updated {
        cycle:  u64,
        loaded: usize,
        failed: usize,
        at:     DateTime<Utc>,
    },
    /// The request failed; previous data is still being served.
    Failed {
        cycle:  u64,
        reason: String,
    },
}

impl RefreshEvent {
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}

// ─── Scheduler ────────────────────────────────────────────────────────────────

struct Running {
    stop_tx: oneshot::Sender<()>,
    task:    JoinHandle<()>,
}

pub struct RefreshScheduler {
    worker:  Worker,
    running: Mutex<Option<Running>>,
}

impl RefreshScheduler {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        store: Arc<TimeSeriesStore>,
        symbols: Vec<String>,
        period: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(64);

        Self {
            worker: Worker {
                source,
                store,
                symbols: Arc::new(symbols),
                period,
                status: Arc::new(RwLock::new(RefreshStatus::default())),
                events,
            },
            running: Mutex::new(None),
        }
    }

    /// Spawn the refresh loop. The first fetch is issued right away.
    /// Calling `start` on a running scheduler does nothing.
    pub async fn start(&self) {
        let mut running = self.running.lock().await;
        if running.is_some() {
            warn!("Refresh scheduler already running");
            return;
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let worker = self.worker.clone();
        let task = tokio::spawn(async move { worker.run(stop_rx).await });

        info!(
            source  = self.worker.source.id(),
            symbols = ?self.worker.symbols,
            period  = ?self.worker.period,
            "🔄 Refresh scheduler started"
        );

        *running = Some(Running { stop_tx, task });
    }

    /// Stop the loop and discard any in-flight fetch. Returns once the loop
    /// has exited.
    pub async fn stop(&self) {
        let Some(Running { stop_tx, task }) = self.running.lock().await.take() else {
            return;
        };

        let _ = stop_tx.send(());
        if let Err(e) = task.await {
            error!(error = %e, "Refresh loop ended abnormally");
        }

        info!("⏹️ Refresh scheduler stopped");
    }

    pub async fn status(&self) -> RefreshStatus {
        self.worker.status.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.worker.events.subscribe()
    }
}

// ─── Worker ───────────────────────────────────────────────────────────────────

#[derive(Clone)]
struct Worker {
    source:  Arc<dyn QuoteSource>,
    store:   Arc<TimeSeriesStore>,
    symbols: Arc<Vec<String>>,
    period:  Duration,
    status:  Arc<RwLock<RefreshStatus>>,
    events:  broadcast::Sender<RefreshEvent>,
}

impl Worker {
    async fn run(self, mut stop_rx: oneshot::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut in_flight: Option<JoinHandle<FetchResult>> = None;

        loop {
            tokio::select! {
                _ = &mut stop_rx => break,

                _ = ticker.tick() => {
                    if in_flight.is_some() {
                        self.coalesce().await;
                        continue;
                    }
                    in_flight = Some(self.begin_fetch().await);
                }

                joined = join_in_flight(&mut in_flight) => {
                    in_flight = None;
                    self.settle(joined).await;
                }
            }
        }

        if let Some(handle) = in_flight.take() {
            handle.abort();
            debug!("In-flight fetch discarded");
        }
        self.status.write().await.phase = Phase::Idle;
    }

    async fn coalesce(&self) {
        let mut status = self.status.write().await;
        status.coalesced_ticks += 1;
        debug!(cycle = status.cycles, "Tick while fetching — coalesced");
    }

    async fn begin_fetch(&self) -> JoinHandle<FetchResult> {
        let cycle = {
            let mut status = self.status.write().await;
            status.phase = Phase::Fetching;
            status.cycles += 1;
            status.cycles
        };
        debug!(cycle, "Fetching quotes...");

        let source = Arc::clone(&self.source);
        let symbols = Arc::clone(&self.symbols);
        tokio::spawn(async move { source.fetch(&symbols).await })
    }

    async fn settle(&self, joined: Result<FetchResult, JoinError>) {
        let cycle = self.status.read().await.cycles;

        let event = match joined {
            Ok(Ok(payload)) => {
                let summary = self.store.replace(&self.symbols, &payload).await;
                let at = Utc::now();

                let mut status = self.status.write().await;
                status.phase = Phase::Settled(Outcome::Ok);
                status.last_outcome = Some(Outcome::Ok);
                status.last_error = None;
                status.last_success_at = Some(at);

                info!(
                    cycle,
                    entries = payload.len(),
                    loaded  = summary.loaded,
                    failed  = summary.failed,
                    "✅ Quotes refreshed"
                );

                RefreshEvent::Updated {
                    cycle,
                    loaded: summary.loaded,
                    failed: summary.failed,
                    at,
                }
            }
            Ok(Err(e)) => self.fail(cycle, e.to_string()).await,
            Err(e) => self.fail(cycle, format!("fetch task failed: {e}")).await,
        };

        // Err only means nobody is listening.
        let _ = self.events.send(event);

        self.status.write().await.phase = Phase::Idle;
    }

    async fn fail(&self, cycle: u64, reason: String) -> RefreshEvent {
        error!(cycle, error = %reason, "❌ Refresh failed — keeping previous quotes");

        let mut status = self.status.write().await;
        status.phase = Phase::Settled(Outcome::Failed);
        status.last_outcome = Some(Outcome::Failed);
        status.last_error = Some(reason.clone());

        RefreshEvent::Failed { cycle, reason }
    }
}

/// Resolves with the in-flight fetch, or never when nothing is in flight.
async fn join_in_flight(slot: &mut Option<JoinHandle<FetchResult>>) -> Result<FetchResult, JoinError> {
    match slot.as_mut() {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Notify;

    use crate::window::merge_latest;

    const PERIOD: Duration = Duration::from_secs(30);

    enum Step {
        Payload(ProviderPayload),
        Fail(u16),
    }

    /// Plays back scripted responses. With a gate, every fetch waits for
    /// `gate.notify_one()` before answering.
    struct ScriptedSource {
        calls:  AtomicUsize,
        script: std::sync::Mutex<VecDeque<Step>>,
        gate:   Option<Arc<Notify>>,
    }

    impl ScriptedSource {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                calls:  AtomicUsize::new(0),
                script: std::sync::Mutex::new(steps.into()),
                gate:   None,
            }
        }

        fn gated(steps: Vec<Step>, gate: Arc<Notify>) -> Self {
            Self { gate: Some(gate), ..Self::new(steps) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for ScriptedSource {
        fn id(&self) -> &'static str {
            "SCRIPTED"
        }

        async fn fetch(&self, _symbols: &[String]) -> Result<ProviderPayload, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            let step = self.script.lock().unwrap().pop_front();
            match step {
                Some(Step::Payload(payload)) => Ok(payload),
                Some(Step::Fail(status)) => Err(FetchError::Status {
                    status,
                    body: "upstream down".into(),
                }),
                None => Ok(ProviderPayload::default()),
            }
        }
    }

    fn symbols() -> Vec<String> {
        vec!["AAPL".to_string(), "EUR/USD".to_string()]
    }

    fn aapl_payload(close: &str) -> ProviderPayload {
        ProviderPayload::from_entries([
            (
                "AAPL".to_string(),
                json!({
                    "status": "ok",
                    "meta": { "symbol": "AAPL", "currency": "USD", "type": "Common Stock" },
                    "values": [{ "datetime": "2024-01-01 10:01:00", "open": "10", "high": "12",
                                 "low": "9", "close": close, "volume": "100" }]
                }),
            ),
            ("EUR/USD".to_string(), json!({ "status": "error" })),
        ])
    }

    fn scheduler_with(source: Arc<ScriptedSource>) -> (RefreshScheduler, Arc<TimeSeriesStore>) {
        let store = Arc::new(TimeSeriesStore::new());
        let scheduler = RefreshScheduler::new(source, Arc::clone(&store), symbols(), PERIOD);
        (scheduler, store)
    }

    async fn settle_briefly() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fetch_is_immediate() {
        let source = Arc::new(ScriptedSource::new(vec![Step::Payload(aapl_payload("11"))]));
        let (scheduler, store) = scheduler_with(Arc::clone(&source));

        scheduler.start().await;
        settle_briefly().await;

        assert_eq!(source.calls(), 1);
        let rows = merge_latest(&*store.snapshot().await, &symbols());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");

        // Symbol-level failures are not a banner error.
        let status = scheduler.status().await;
        assert_eq!(status.last_error, None);
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(status.last_outcome, Some(Outcome::Ok));
        assert!(status.last_success_at.is_some());

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetches_every_period() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let (scheduler, _store) = scheduler_with(Arc::clone(&source));

        scheduler.start().await;
        tokio::time::sleep(Duration::from_secs(65)).await;

        // t = 0, 30, 60
        assert_eq!(source.calls(), 3);
        assert_eq!(scheduler.status().await.cycles, 3);

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_while_fetching_is_coalesced() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource::gated(
            vec![Step::Payload(aapl_payload("11")), Step::Payload(aapl_payload("12"))],
            Arc::clone(&gate),
        ));
        let (scheduler, store) = scheduler_with(Arc::clone(&source));
        let mut events = scheduler.subscribe();

        scheduler.start().await;
        tokio::time::sleep(Duration::from_secs(95)).await;

        // Ticks at 30, 60 and 90 arrived while the first fetch was held.
        assert_eq!(source.calls(), 1);
        let status = scheduler.status().await;
        assert_eq!(status.phase, Phase::Fetching);
        assert_eq!(status.coalesced_ticks, 3);
        assert!(store.get("AAPL").await.is_none());

        gate.notify_one();
        settle_briefly().await;

        assert_eq!(source.calls(), 1);
        assert!(matches!(events.try_recv(), Ok(RefreshEvent::Updated { cycle: 1, .. })));
        assert!(events.try_recv().is_err());
        assert!(store.get("AAPL").await.unwrap().is_ok());

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_keeps_previous_rows() {
        let source = Arc::new(ScriptedSource::new(vec![
            Step::Payload(aapl_payload("11")),
            Step::Fail(503),
        ]));
        let (scheduler, store) = scheduler_with(Arc::clone(&source));
        let mut events = scheduler.subscribe();

        scheduler.start().await;
        settle_briefly().await;
        let after_first = merge_latest(&*store.snapshot().await, &symbols());

        tokio::time::sleep(PERIOD).await;
        let after_second = merge_latest(&*store.snapshot().await, &symbols());

        assert_eq!(source.calls(), 2);
        assert_eq!(after_first, after_second);

        let status = scheduler.status().await;
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(status.last_outcome, Some(Outcome::Failed));
        let last_error = status.last_error.expect("failure should be surfaced");
        assert!(last_error.contains("503"));

        assert!(matches!(events.try_recv(), Ok(RefreshEvent::Updated { cycle: 1, .. })));
        assert!(matches!(events.try_recv(), Ok(RefreshEvent::Failed { cycle: 2, .. })));

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_clears_last_error() {
        let source = Arc::new(ScriptedSource::new(vec![
            Step::Fail(500),
            Step::Payload(aapl_payload("11")),
        ]));
        let (scheduler, _store) = scheduler_with(Arc::clone(&source));

        scheduler.start().await;
        settle_briefly().await;
        assert!(scheduler.status().await.last_error.is_some());

        tokio::time::sleep(PERIOD).await;
        let status = scheduler.status().await;
        assert_eq!(status.last_error, None);
        assert_eq!(status.last_outcome, Some(Outcome::Ok));

        scheduler.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_discards_in_flight_result() {
        let gate = Arc::new(Notify::new());
        let source = Arc::new(ScriptedSource::gated(
            vec![Step::Payload(aapl_payload("11"))],
            Arc::clone(&gate),
        ));
        let (scheduler, store) = scheduler_with(Arc::clone(&source));

        scheduler.start().await;
        settle_briefly().await;
        assert_eq!(source.calls(), 1);

        scheduler.stop().await;
        gate.notify_one();
        tokio::time::sleep(Duration::from_secs(90)).await;

        assert_eq!(source.calls(), 1);
        assert!(store.snapshot().await.is_empty());
        assert_eq!(scheduler.status().await.phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_a_no_op() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let (scheduler, _store) = scheduler_with(Arc::clone(&source));

        scheduler.start().await;
        scheduler.start().await;
        settle_briefly().await;

        assert_eq!(source.calls(), 1);
        scheduler.stop().await;
    }

    #[test]
    fn test_status_json_shape() {
        let status = RefreshStatus {
            phase:        Phase::Idle,
            last_outcome: Some(Outcome::Failed),
            last_error:   Some("boom".into()),
            cycles:       2,
            ..Default::default()
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["phase"], "idle");
        assert_eq!(value["last_outcome"], "failed");

        let settled = RefreshStatus {
            phase: Phase::Settled(Outcome::Ok),
            ..Default::default()
        };
        let value = serde_json::to_value(&settled).unwrap();
        assert_eq!(value["phase"], "settled");
        assert_eq!(value["outcome"], "ok");
        assert!(value["last_outcome"].is_null());
    }

    #[test]
    fn test_event_json_shape() {
        let event = RefreshEvent::Failed { cycle: 2, reason: "boom".into() };
        let value: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(value["event"], "FAILED");
        assert_eq!(value["reason"], "boom");
    }
}
