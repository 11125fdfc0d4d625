//! In-process fleet agent for local runs and tests
//!
//! The real agent is a vendored SDK talking to the orchestration backend
//! over its control endpoint. This loopback implementation honors the same
//! contract entirely in-process: it retains the registered
//! [`ProcessParameters`], paces periodic health checks on its own task, and
//! lets a local driver assign sessions and request termination the way the
//! backend would. Every signal it receives is counted, which is what the
//! test suite asserts against.

use async_trait::async_trait;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{interval, MissedTickBehavior};

use crate::agent::{
    AgentClient, AgentError, CallbackError, ProcessParameters, SessionAssignment,
    SessionCallbacks,
};
use crate::params::ServerParameters;

/// Pacing of the real agent's health probe.
const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(60);

/// Builds a throwaway session assignment for local development runs.
pub fn demo_session(fleet_id: &str) -> SessionAssignment {
    SessionAssignment {
        session_id: format!("gsess-{:08x}", rand::random::<u32>()),
        fleet_id: fleet_id.to_string(),
        name: Some("local-session".to_string()),
        max_players: 8,
        properties: HashMap::new(),
    }
}

struct LoopbackShared {
    health_interval: Duration,
    initialized: AtomicBool,
    shut_down: AtomicBool,
    ready_signals: AtomicUsize,
    active_signals: AtomicUsize,
    terminating_signals: AtomicUsize,
    health_checks: AtomicUsize,
    process_params: Mutex<Option<Arc<ProcessParameters>>>,
}

/// Loopback [`AgentClient`] plus the driver half the backend would own.
///
/// Clones share state, so a driver handle can be kept after moving the
/// client into the adapter.
#[derive(Clone)]
pub struct LoopbackAgent {
    shared: Arc<LoopbackShared>,
}

impl LoopbackAgent {
    pub fn new() -> Self {
        Self::with_health_interval(DEFAULT_HEALTH_INTERVAL)
    }

    /// Same agent with a custom health-probe pacing; tests use short ones.
    pub fn with_health_interval(health_interval: Duration) -> Self {
        Self {
            shared: Arc::new(LoopbackShared {
                health_interval,
                initialized: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
                ready_signals: AtomicUsize::new(0),
                active_signals: AtomicUsize::new(0),
                terminating_signals: AtomicUsize::new(0),
                health_checks: AtomicUsize::new(0),
                process_params: Mutex::new(None),
            }),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::SeqCst)
    }

    pub fn ready_signals(&self) -> usize {
        self.shared.ready_signals.load(Ordering::SeqCst)
    }

    pub fn session_active_signals(&self) -> usize {
        self.shared.active_signals.load(Ordering::SeqCst)
    }

    pub fn terminating_signals(&self) -> usize {
        self.shared.terminating_signals.load(Ordering::SeqCst)
    }

    /// Number of health probes run so far, ticker and manual combined.
    pub fn health_checks(&self) -> usize {
        self.shared.health_checks.load(Ordering::SeqCst)
    }

    /// The parameters a ready process registered, if any.
    pub async fn process_parameters(&self) -> Option<Arc<ProcessParameters>> {
        self.shared.process_params.lock().await.clone()
    }

    async fn callbacks(&self) -> Option<Arc<dyn SessionCallbacks>> {
        self.shared
            .process_params
            .lock()
            .await
            .as_ref()
            .map(|p| Arc::clone(&p.callbacks))
    }

    /// Assigns a session to the registered process, invoking its callback on
    /// a separate task the way the real agent delivers callbacks.
    pub async fn start_session(&self, assignment: SessionAssignment) -> Result<(), CallbackError> {
        let callbacks = self.callbacks().await.ok_or_else(|| {
            CallbackError::Agent(AgentError::Rejected(
                "no ready process registered".to_string(),
            ))
        })?;

        info!("loopback agent assigning session {}", assignment.session_id);
        let delivery = tokio::spawn(async move { callbacks.on_session_start(assignment).await });
        delivery.await.unwrap_or_else(|e| {
            Err(CallbackError::SessionSetup(format!(
                "session callback panicked: {}",
                e
            )))
        })
    }

    /// Requests termination of the registered process and waits for its
    /// callback to finish. The acknowledgment arrives through
    /// [`AgentClient::signal_terminating`].
    pub async fn request_termination(&self) {
        let Some(callbacks) = self.callbacks().await else {
            warn!("termination requested but no process is registered");
            return;
        };

        info!("loopback agent requesting termination");
        self.shared.shut_down.store(true, Ordering::SeqCst);
        let delivery = tokio::spawn(async move { callbacks.on_terminate().await });
        if delivery.await.is_err() {
            warn!("terminate callback panicked");
        }
    }

    /// Runs one health probe immediately, independent of the ticker.
    pub async fn run_health_check(&self) -> Result<bool, AgentError> {
        let callbacks = self
            .callbacks()
            .await
            .ok_or_else(|| AgentError::Rejected("no ready process registered".to_string()))?;

        let healthy = callbacks.on_health_check().await;
        self.shared.health_checks.fetch_add(1, Ordering::SeqCst);
        Ok(healthy)
    }

    fn spawn_health_ticker(&self) {
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            let mut ticker = interval(shared.health_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the first tick since it fires immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if shared.shut_down.load(Ordering::SeqCst) {
                    break;
                }

                let callbacks = shared
                    .process_params
                    .lock()
                    .await
                    .as_ref()
                    .map(|p| Arc::clone(&p.callbacks));
                let Some(callbacks) = callbacks else { break };

                let healthy = callbacks.on_health_check().await;
                shared.health_checks.fetch_add(1, Ordering::SeqCst);
                if !healthy {
                    warn!("registered process reported unhealthy");
                }
            }
        });
    }
}

impl Default for LoopbackAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentClient for LoopbackAgent {
    async fn initialize(&self, params: &ServerParameters) -> Result<(), AgentError> {
        info!(
            "loopback agent accepting process {} (host {:?}, fleet {:?})",
            params.process_id, params.host_id, params.fleet_id
        );
        self.shared.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn signal_ready(&self, params: Arc<ProcessParameters>) -> Result<(), AgentError> {
        if !self.is_initialized() {
            return Err(AgentError::NotInitialized);
        }

        let mut slot = self.shared.process_params.lock().await;
        if slot.is_some() {
            return Err(AgentError::Rejected(
                "readiness already signaled".to_string(),
            ));
        }

        info!(
            "process ready on port {} (log paths: {:?})",
            params.port, params.log_paths
        );
        *slot = Some(params);
        drop(slot);

        self.shared.ready_signals.fetch_add(1, Ordering::SeqCst);
        self.spawn_health_ticker();
        Ok(())
    }

    async fn signal_session_active(&self) -> Result<(), AgentError> {
        if self.callbacks().await.is_none() {
            return Err(AgentError::Rejected(
                "no ready process registered".to_string(),
            ));
        }

        self.shared.active_signals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn signal_terminating(&self) -> Result<(), AgentError> {
        self.shared.shut_down.store(true, Ordering::SeqCst);
        self.shared.terminating_signals.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
