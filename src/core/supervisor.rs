//! # Supervisor: starts subscribers, races exhaustion against termination, drains.
//!
//! The [`Supervisor`] owns every [`Subscriber`] it creates in a local collection and
//! applies one shutdown policy to all of them. There is no ambient global state: the
//! termination event is translated into a broadcast cancel by the supervisor alone.
//!
//! ## State machine
//! ```text
//!  STARTING ──(all subscribers created)──► RUNNING ──(exhausted | terminated)──► DRAINING ──► STOPPED
//!     │                                                                                        ▲
//!     └──(subscribe error: cancel + join already-created subscribers)──────────────────────────┘
//! ```
//!
//! ## Run path
//! ```text
//! run(topics):
//!   STARTING  register termination trap            (failure → RuntimeError::Signal)
//!             for spec in topics:
//!               Subscriber::create(spec, backend, completion, runtime_token)
//!               └─ error → drain created ones, return RuntimeError::Subscribe
//!   RUNNING   select! (biased) {
//!               completion.exhausted()   ─► StopReason::Exhausted
//!               termination.requested()  ─► StopReason::Terminated
//!             }
//!   DRAINING  runtime_token.cancel(); subscriber.cancel() for every subscriber
//!             wait all loops (bounded by cfg.grace; stragglers aborted → GraceExceeded)
//!   STOPPED   info!("supervisor stopped") once, return
//! ```
//!
//! ## Rules
//! - DRAINING cancels every subscriber regardless of which branch won the race.
//! - Subscribers are never recreated; restarts belong to the process manager.
//! - After `run` returns, no receive loop is alive and no handler runs.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use datasync::{MemoryBackend, MemoryEmitter, Schema, StopReason, Supervisor, SupervisorConfig, TopicSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = MemoryBackend::new();
//!     let sink = Arc::new(MemoryEmitter::new());
//!
//!     bus.publish("txn_confirm_on_head", r#"{"hash":"h1","ts":100,"function":"f","height":5}"#);
//!     bus.close("txn_confirm_on_head");
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus))
//!         .with_termination(std::future::pending())
//!         .build();
//!
//!     let reason = sup.run(vec![TopicSpec::for_schema(Schema::Txn, sink.clone())]).await?;
//!     assert_eq!(reason, StopReason::Exhausted);
//!     assert_eq!(sink.records("txn_confirm_on_head"), vec!["h1,f,5,100"]);
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::core::builder::SupervisorBuilder;
use crate::core::completion::CompletionToken;
use crate::core::config::SupervisorConfig;
use crate::core::shutdown::{Termination, TerminationTrap};
use crate::error::RuntimeError;
use crate::subscribers::{Subscriber, TopicSpec};

/// Lifecycle state of a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    /// Creating subscribers.
    Starting,
    /// Waiting for exhaustion or termination.
    Running,
    /// Cancelling and joining subscribers.
    Draining,
    /// Terminal.
    Stopped,
}

impl SupervisorState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            SupervisorState::Starting => "starting",
            SupervisorState::Running => "running",
            SupervisorState::Draining => "draining",
            SupervisorState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Which branch of the RUNNING race triggered the drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every receive loop exited on its own (all upstream streams closed).
    Exhausted,
    /// The termination event fired.
    Terminated,
}

impl StopReason {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StopReason::Exhausted => "exhausted",
            StopReason::Terminated => "terminated",
        }
    }
}

/// Coordinates a set of topic subscribers under a single shutdown policy.
pub struct Supervisor {
    cfg: SupervisorConfig,
    backend: Arc<dyn Backend>,
    termination: Option<BoxFuture<'static, ()>>,
    state: watch::Sender<SupervisorState>,
}

impl Supervisor {
    /// Returns a builder for a supervisor subscribing through `backend`.
    pub fn builder(cfg: SupervisorConfig, backend: Arc<dyn Backend>) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg, backend)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        backend: Arc<dyn Backend>,
        termination: Option<BoxFuture<'static, ()>>,
    ) -> Self {
        let (state, _rx) = watch::channel(SupervisorState::Starting);
        Self {
            cfg,
            backend,
            termination,
            state,
        }
    }

    /// Returns a receiver observing the supervisor's lifecycle state.
    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Runs one subscriber per topic until either:
    /// - every receive loop exits on its own → `Ok(StopReason::Exhausted)`, or
    /// - the termination event fires → `Ok(StopReason::Terminated)`.
    ///
    /// Errors:
    /// - [`RuntimeError::Signal`]: termination trap registration failed (nothing started);
    /// - [`RuntimeError::Subscribe`]: a topic failed to subscribe (started ones were drained);
    /// - [`RuntimeError::GraceExceeded`]: some loops did not exit within `grace` and were aborted.
    pub async fn run(self, topics: Vec<TopicSpec>) -> Result<StopReason, RuntimeError> {
        let Supervisor {
            cfg,
            backend,
            termination,
            state,
        } = self;
        transition(&state, SupervisorState::Starting);

        let mut termination = match termination {
            Some(fut) => Termination::External(fut),
            None => match TerminationTrap::register() {
                Ok(trap) => Termination::Signals(trap),
                Err(e) => {
                    transition(&state, SupervisorState::Stopped);
                    return Err(RuntimeError::Signal(e));
                }
            },
        };

        let runtime_token = CancellationToken::new();
        let completion = CompletionToken::new();

        let spawned = spawn_subscribers(
            &cfg,
            backend.as_ref(),
            topics,
            &completion,
            &runtime_token,
        );
        let mut subs = match spawned.await {
            Ok(subs) => subs,
            Err(e) => {
                transition(&state, SupervisorState::Stopped);
                return Err(e);
            }
        };

        transition(&state, SupervisorState::Running);
        info!(subscribers = subs.len(), "supervisor running");

        let reason = tokio::select! {
            biased;
            _ = completion.exhausted() => {
                debug!("all subscribers down");
                StopReason::Exhausted
            }
            cause = termination.requested() => {
                debug!(cause, "termination requested");
                StopReason::Terminated
            }
        };

        transition(&state, SupervisorState::Draining);
        let res = drain(&cfg, &runtime_token, &mut subs).await;
        transition(&state, SupervisorState::Stopped);

        match res {
            Ok(()) => {
                info!(reason = reason.as_label(), "supervisor stopped");
                Ok(reason)
            }
            Err(e) => {
                error!(error = %e, label = e.as_label(), "supervisor stopped uncleanly");
                Err(e)
            }
        }
    }
}

/// Creates one subscriber per spec; on the first failure drains the ones already created.
async fn spawn_subscribers(
    cfg: &SupervisorConfig,
    backend: &dyn Backend,
    topics: Vec<TopicSpec>,
    completion: &CompletionToken,
    runtime_token: &CancellationToken,
) -> Result<Vec<Subscriber>, RuntimeError> {
    let mut subs = Vec::with_capacity(topics.len());
    for spec in &topics {
        match Subscriber::create(spec, backend, completion, runtime_token).await {
            Ok(sub) => subs.push(sub),
            Err(e) => {
                error!(topic = spec.topic(), error = %e, "subscribe failed; aborting startup");
                if let Err(drain_err) = drain(cfg, runtime_token, &mut subs).await {
                    warn!(error = %drain_err, "partial start did not drain cleanly");
                }
                return Err(e);
            }
        }
    }
    Ok(subs)
}

/// Cancels every subscriber and waits for their loops within the grace period.
async fn drain(
    cfg: &SupervisorConfig,
    runtime_token: &CancellationToken,
    subs: &mut [Subscriber],
) -> Result<(), RuntimeError> {
    runtime_token.cancel();
    for sub in subs.iter() {
        sub.cancel();
    }

    let grace = cfg.grace;
    let all = join_all(subs.iter_mut().map(|s| s.wait()));
    if tokio::time::timeout(grace, all).await.is_ok() {
        return Ok(());
    }

    let stuck: Vec<String> = subs
        .iter()
        .filter(|s| !s.is_finished())
        .map(|s| s.topic().to_string())
        .collect();
    for sub in subs.iter() {
        sub.abort();
    }
    Err(RuntimeError::GraceExceeded { grace, stuck })
}

fn transition(state: &watch::Sender<SupervisorState>, next: SupervisorState) {
    let prev = state.send_replace(next);
    if prev != next {
        debug!(from = prev.as_label(), to = next.as_label(), "supervisor state");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use std::io;
    use std::sync::Mutex;

    use tokio::sync::oneshot;
    use tracing::Level;

    use super::*;
    use crate::backend::MemoryBackend;
    use crate::handlers::{Emitted, HandlerFn, MemoryEmitter, Schema};

    const RECORD: &[u8] = br#"{"hash":"h1","ts":100,"function":"f","height":5}"#;

    fn abc(sink: &Arc<MemoryEmitter>) -> Vec<TopicSpec> {
        ["A", "B", "C"]
            .into_iter()
            .map(|t| TopicSpec::with_schema(t, Schema::Txn, sink.clone()))
            .collect()
    }

    async fn eventually(what: &str, cond: impl Fn() -> bool) {
        for _ in 0..500 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("timed out waiting for {what}");
    }

    #[tokio::test]
    async fn exhaustion_runs_full_lifecycle() {
        let bus = MemoryBackend::new();
        let sink = Arc::new(MemoryEmitter::new());
        let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus.clone()))
            .with_termination(std::future::pending())
            .build();
        let mut state = sup.state();
        let run = tokio::spawn(sup.run(abc(&sink)));

        state
            .wait_for(|s| *s == SupervisorState::Running)
            .await
            .unwrap();
        bus.publish("A", RECORD);
        eventually("record on A", || sink.len() == 1).await;
        assert_eq!(sink.records("A"), vec!["h1,f,5,100".to_string()]);

        bus.close_all();
        let reason = run.await.unwrap().unwrap();
        assert_eq!(reason, StopReason::Exhausted);
        assert_eq!(*state.borrow(), SupervisorState::Stopped);
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_does_not_close_subscription() {
        let bus = MemoryBackend::new();
        let sink = Arc::new(MemoryEmitter::new());
        let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus.clone()))
            .with_termination(std::future::pending())
            .build();
        let run = tokio::spawn(sup.run(abc(&sink)));

        bus.publish("A", b"\x00\x01garbage".to_vec());
        eventually("decode error on A", || sink.errors("A").len() == 1).await;
        assert!(sink.records("A").is_empty());

        bus.publish("A", RECORD);
        eventually("record on A", || sink.records("A").len() == 1).await;

        bus.close_all();
        assert_eq!(run.await.unwrap().unwrap(), StopReason::Exhausted);
        assert!(matches!(&sink.all()[0], Emitted::DecodeFailed { topic, .. } if topic == "A"));
    }

    #[tokio::test]
    async fn termination_cancels_open_streams() {
        let bus = MemoryBackend::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let topics: Vec<TopicSpec> = ["A", "B", "C"]
            .into_iter()
            .map(|t| {
                let calls = Arc::clone(&calls);
                TopicSpec::new(
                    t,
                    HandlerFn::arc(move |_p: &[u8]| {
                        calls.fetch_add(1, Ordering::SeqCst);
                    }),
                )
            })
            .collect();

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus.clone()))
            .with_termination(async move {
                let _ = stop_rx.await;
            })
            .build();
        let mut state = sup.state();
        let run = tokio::spawn(sup.run(topics));

        state
            .wait_for(|s| *s == SupervisorState::Running)
            .await
            .unwrap();
        bus.publish("B", b"x".to_vec());
        eventually("handler on B", || calls.load(Ordering::SeqCst) == 1).await;

        stop_tx.send(()).unwrap();
        assert_eq!(run.await.unwrap().unwrap(), StopReason::Terminated);

        // every loop is gone: topics refuse further payloads, nothing else is handled
        for t in ["A", "B", "C"] {
            assert!(!bus.publish(t, b"late".to_vec()), "topic {t} still consumed");
        }
        tokio::task::yield_now().await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subscribe_failure_drains_partial_start() {
        let bus = MemoryBackend::new();
        bus.reject("B", "no such topic");
        let sink = Arc::new(MemoryEmitter::new());
        let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus.clone()))
            .with_termination(std::future::pending())
            .build();
        let state = sup.state();

        let err = sup.run(abc(&sink)).await.unwrap_err();
        match err {
            RuntimeError::Subscribe { topic, source } => {
                assert_eq!(topic, "B");
                assert_eq!(source.as_label(), "backend_rejected");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(*state.borrow(), SupervisorState::Stopped);
        // A was subscribed and then cancelled; C was never attempted
        assert!(bus.is_subscribed("A"));
        assert!(!bus.publish("A", RECORD));
        assert!(!bus.is_subscribed("C"));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn no_topics_is_immediately_exhausted() {
        let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(MemoryBackend::new()))
            .with_termination(std::future::pending())
            .build();
        assert_eq!(sup.run(Vec::new()).await.unwrap(), StopReason::Exhausted);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stuck_handler_exceeds_grace() {
        let bus = MemoryBackend::new();
        let entered = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&entered);
        let spec = TopicSpec::new(
            "A",
            HandlerFn::arc(move |_p: &[u8]| {
                flag.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(500));
            }),
        );

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let cfg = SupervisorConfig {
            grace: Duration::from_millis(50),
        };
        let sup = Supervisor::builder(cfg, Arc::new(bus.clone()))
            .with_termination(async move {
                let _ = stop_rx.await;
            })
            .build();
        let run = tokio::spawn(sup.run(vec![spec]));

        bus.publish("A", b"slow".to_vec());
        eventually("handler entered", || entered.load(Ordering::SeqCst)).await;
        stop_tx.send(()).unwrap();

        match run.await.unwrap() {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => assert_eq!(stuck, vec!["A"]),
            other => panic!("expected grace exceeded, got {other:?}"),
        }
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn run_future_is_send() {
        let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(MemoryBackend::new()))
            .with_termination(std::future::pending())
            .build();
        let fut = sup.run(Vec::new());
        assert_send(&fut);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn clean_shutdown_logs_one_info_line() {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(Level::INFO)
            .with_ansi(false)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let bus = MemoryBackend::new();
        bus.publish("A", RECORD);
        bus.close("A");
        let sink = Arc::new(MemoryEmitter::new());
        let sup = Supervisor::builder(SupervisorConfig::default(), Arc::new(bus))
            .with_termination(std::future::pending())
            .build();
        let spec = TopicSpec::with_schema("A", Schema::Txn, sink.clone());
        assert_eq!(sup.run(vec![spec]).await.unwrap(), StopReason::Exhausted);

        let text = String::from_utf8(out.0.lock().unwrap().clone()).unwrap();
        let after_running: Vec<&str> = text
            .lines()
            .skip_while(|l| !l.contains("supervisor running"))
            .skip(1)
            .filter(|l| l.contains("INFO"))
            .collect();
        assert_eq!(after_running.len(), 1, "{text}");
        assert!(after_running[0].contains("supervisor stopped"));
        assert!(after_running[0].contains("exhausted"));
    }
}
