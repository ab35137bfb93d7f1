//! Continuous Internet reachability detection.
//!
//! The embedder feeds coarse link signals (`NetworkSignal`) and the detector
//! verifies actual reachability with generate-204 HTTP probes, retrying with
//! exponential backoff while the verdict is negative and broadcasting every
//! state transition.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::error::ProbeError;
use shared::state::{ConnectionState, NetworkSignal};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, Mutex, RwLock};
use tokio::task::JoinHandle;
use url::Url;

mod backoff;
mod config;
mod probe;
mod system;
mod worker;

pub use config::{DetectorConfig, DEFAULT_PROBE_URL, DEFAULT_USER_AGENT, FALLBACK_PROBE_URL};
pub use probe::{HttpProbe, TransportProbe};
pub use system::{NoSystemSignal, SystemSignal};

use worker::{Command, Worker};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const COMMAND_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("probe url scheme must be http or https: {0}")]
    UnsupportedProbeScheme(Url),
    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("initial_retry_delay must not exceed max_retry_delay")]
    RetryDelayRange,
    #[error("failed to build probe transport: {0}")]
    Probe(#[from] ProbeError),
    #[error("detector has been shut down")]
    ShutDown,
}

/// Published to subscribers on every actual state transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum DetectorEvent {
    StateChanged {
        previous: ConnectionState,
        current: ConnectionState,
        at: DateTime<Utc>,
    },
}

/// Handle to a running detector worker.
///
/// Every method takes `&self` and talks to the worker task over channels, so
/// the handle can be shared behind an `Arc`. The worker keeps running until
/// `shutdown` is called.
pub struct ConnectivityDetector {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<DetectorEvent>,
    state: Arc<RwLock<ConnectionState>>,
    worker_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityDetector {
    /// Start a detector with the production HTTP probe and no system signal.
    pub fn spawn(config: DetectorConfig) -> Result<Self, DetectorError> {
        let probe = HttpProbe::new(config.probe_timeout, &config.user_agent)?;
        Self::spawn_with_dependencies(config, Arc::new(probe), Arc::new(NoSystemSignal))
    }

    /// Start a detector with caller-supplied probe and system-signal
    /// implementations.
    pub fn spawn_with_dependencies(
        config: DetectorConfig,
        probe: Arc<dyn TransportProbe>,
        system: Arc<dyn SystemSignal>,
    ) -> Result<Self, DetectorError> {
        config.validate()?;

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let state = Arc::new(RwLock::new(ConnectionState::Unknown));

        let worker = Worker::new(
            config,
            probe,
            system,
            Arc::clone(&state),
            events.clone(),
            commands_rx,
        );
        let worker_task = tokio::spawn(worker.run());

        Ok(Self {
            commands: commands_tx,
            events,
            state,
            worker_task: Mutex::new(Some(worker_task)),
        })
    }

    /// Feed a link signal. `Offline` cancels all checking and records
    /// `Disconnected`; `Online` starts a fresh evaluation episode.
    pub async fn network_changed(&self, signal: NetworkSignal) -> Result<(), DetectorError> {
        self.commands
            .send(Command::NetworkChanged(signal))
            .await
            .map_err(|_| DetectorError::ShutDown)
    }

    /// Force an evaluation round and resolve with the state that round
    /// produced. A concurrent `Offline` signal resolves it with
    /// `Disconnected` instead.
    pub async fn check_now(&self) -> Result<ConnectionState, DetectorError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Command::CheckNow { reply: reply_tx })
            .await
            .map_err(|_| DetectorError::ShutDown)?;
        reply_rx.await.map_err(|_| DetectorError::ShutDown)
    }

    /// Snapshot of the current state without forcing a check.
    pub async fn current_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DetectorEvent> {
        self.events.subscribe()
    }

    /// Stop the worker. In-flight rounds are aborted, pending `check_now`
    /// callers resolve with `DetectorError::ShutDown`, and every later
    /// operation returns `DetectorError::ShutDown`.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Some(task) = self.worker_task.lock().await.take() {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
