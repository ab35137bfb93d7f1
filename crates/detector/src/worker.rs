use std::sync::Arc;

use chrono::Utc;
use shared::probe::ProbeVerdict;
use shared::state::{ConnectionState, NetworkSignal};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;

use crate::backoff::Backoff;
use crate::config::DetectorConfig;
use crate::probe::TransportProbe;
use crate::system::SystemSignal;
use crate::DetectorEvent;

pub(crate) enum Command {
    NetworkChanged(NetworkSignal),
    CheckNow {
        reply: oneshot::Sender<ConnectionState>,
    },
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum CheckStage {
    FromSystem,
    ProbeDefaultUrl,
    ProbeFallbackUrl,
}

impl CheckStage {
    fn as_str(self) -> &'static str {
        match self {
            CheckStage::FromSystem => "from_system",
            CheckStage::ProbeDefaultUrl => "probe_default_url",
            CheckStage::ProbeFallbackUrl => "probe_fallback_url",
        }
    }
}

struct RoundResult {
    generation: u64,
    state: ConnectionState,
}

/// Owns the detector state machine. Commands come in over mpsc, transitions
/// go out over broadcast, and each evaluation round runs as a child task
/// tagged with a generation so superseded results are dropped on the floor.
pub(crate) struct Worker {
    config: DetectorConfig,
    probe: Arc<dyn TransportProbe>,
    system: Arc<dyn SystemSignal>,
    state: Arc<RwLock<ConnectionState>>,
    events: broadcast::Sender<DetectorEvent>,
    commands: mpsc::Receiver<Command>,
    rounds_tx: mpsc::Sender<RoundResult>,
    rounds_rx: mpsc::Receiver<RoundResult>,
    backoff: Backoff,
    generation: u64,
    inflight: Option<JoinHandle<()>>,
    next_round_at: Option<Instant>,
    waiters: Vec<oneshot::Sender<ConnectionState>>,
    link: Option<NetworkSignal>,
}

impl Worker {
    pub(crate) fn new(
        config: DetectorConfig,
        probe: Arc<dyn TransportProbe>,
        system: Arc<dyn SystemSignal>,
        state: Arc<RwLock<ConnectionState>>,
        events: broadcast::Sender<DetectorEvent>,
        commands: mpsc::Receiver<Command>,
    ) -> Self {
        let backoff = Backoff::new(config.initial_retry_delay, config.max_retry_delay);
        let (rounds_tx, rounds_rx) = mpsc::channel(8);
        Self {
            config,
            probe,
            system,
            state,
            events,
            commands,
            rounds_tx,
            rounds_rx,
            backoff,
            generation: 0,
            inflight: None,
            next_round_at: None,
            waiters: Vec::new(),
            link: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let retry_deadline = self.next_round_at.unwrap_or_else(Instant::now);
            tokio::select! {
                maybe_cmd = self.commands.recv() => {
                    match maybe_cmd {
                        None | Some(Command::Shutdown) => break,
                        Some(Command::NetworkChanged(signal)) => {
                            self.handle_network_changed(signal).await;
                        }
                        Some(Command::CheckNow { reply }) => {
                            self.handle_check_now(reply);
                        }
                    }
                }
                Some(result) = self.rounds_rx.recv() => {
                    self.handle_round_result(result).await;
                }
                _ = tokio::time::sleep_until(retry_deadline), if self.next_round_at.is_some() => {
                    self.next_round_at = None;
                    self.start_round();
                }
            }
        }
        self.cancel_round();
    }

    async fn handle_network_changed(&mut self, signal: NetworkSignal) {
        self.link = Some(signal);
        match signal {
            NetworkSignal::Offline => {
                info!("link went offline; stopping reachability checks");
                self.cancel_round();
                self.backoff.reset();
                self.set_state(ConnectionState::Disconnected).await;
                self.resolve_waiters(ConnectionState::Disconnected);
            }
            NetworkSignal::Online(kind) => {
                info!(kind = %kind, "link came online; starting reachability checks");
                // Reachability on the new link is genuinely unknown; do not
                // let observers act on a verdict from the previous link.
                self.set_state(ConnectionState::Unknown).await;
                self.begin_fresh_episode();
            }
        }
    }

    fn handle_check_now(&mut self, reply: oneshot::Sender<ConnectionState>) {
        if matches!(self.link, Some(NetworkSignal::Offline)) {
            let _ = reply.send(ConnectionState::Disconnected);
            return;
        }
        self.waiters.push(reply);
        self.begin_fresh_episode();
    }

    async fn handle_round_result(&mut self, result: RoundResult) {
        if result.generation != self.generation {
            // A trigger superseded this round while it was in flight.
            return;
        }
        self.inflight = None;
        self.set_state(result.state).await;
        self.resolve_waiters(result.state);

        if result.state == ConnectionState::Validated {
            self.backoff.reset();
            return;
        }
        match self.backoff.next_delay() {
            Some(delay) => {
                info!(
                    delay_ms = delay.as_millis() as u64,
                    state = %result.state,
                    "scheduling reachability recheck"
                );
                self.next_round_at = Some(Instant::now() + delay);
            }
            None => {
                warn!(
                    state = %result.state,
                    "retry schedule exhausted; waiting for a new link signal"
                );
            }
        }
    }

    /// Cancel whatever is running or scheduled and start a round right away
    /// with a fresh retry schedule.
    fn begin_fresh_episode(&mut self) {
        self.cancel_round();
        self.backoff.reset();
        self.start_round();
    }

    fn start_round(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let probe = Arc::clone(&self.probe);
        let system = Arc::clone(&self.system);
        let config = self.config.clone();
        let results = self.rounds_tx.clone();
        self.inflight = Some(tokio::spawn(async move {
            let state = run_round(probe.as_ref(), system.as_ref(), &config).await;
            let _ = results.send(RoundResult { generation, state }).await;
        }));
    }

    fn cancel_round(&mut self) {
        if let Some(task) = self.inflight.take() {
            task.abort();
        }
        self.next_round_at = None;
    }

    async fn set_state(&mut self, next: ConnectionState) {
        let previous = {
            let mut guard = self.state.write().await;
            std::mem::replace(&mut *guard, next)
        };
        if previous != next {
            info!(previous = %previous, current = %next, "connection state changed");
            let _ = self.events.send(DetectorEvent::StateChanged {
                previous,
                current: next,
                at: Utc::now(),
            });
        }
    }

    fn resolve_waiters(&mut self, state: ConnectionState) {
        for reply in self.waiters.drain(..) {
            let _ = reply.send(state);
        }
    }
}

/// One pass through the three-stage pipeline: system verdict, then the
/// default probe URL, then the fallback. `Validated` short-circuits; the
/// last stage reached decides the round.
async fn run_round(
    probe: &dyn TransportProbe,
    system: &dyn SystemSignal,
    config: &DetectorConfig,
) -> ConnectionState {
    let system_verdict = system.current_verdict().await;
    if system_verdict == ConnectionState::Validated || system.skips_http_probes() {
        info!(
            stage = CheckStage::FromSystem.as_str(),
            verdict = %system_verdict,
            "round decided by system verdict"
        );
        return system_verdict;
    }

    let default_verdict = probe_stage(
        probe,
        &config.default_probe_url,
        CheckStage::ProbeDefaultUrl,
    )
    .await;
    if default_verdict == ProbeVerdict::Validated {
        return ConnectionState::Validated;
    }

    let fallback_verdict = probe_stage(
        probe,
        &config.fallback_probe_url,
        CheckStage::ProbeFallbackUrl,
    )
    .await;
    fallback_verdict.connection_state()
}

async fn probe_stage(probe: &dyn TransportProbe, url: &Url, stage: CheckStage) -> ProbeVerdict {
    match probe.probe(url).await {
        Ok(verdict) => {
            info!(stage = stage.as_str(), %url, verdict = ?verdict, "probe stage finished");
            verdict
        }
        Err(err) => {
            warn!(
                stage = stage.as_str(),
                %url,
                error = %err,
                "probe stage failed; treating as no internet"
            );
            ProbeVerdict::NoInternet
        }
    }
}
