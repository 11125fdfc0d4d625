//! Lifecycle adapter driving the handshake with the fleet agent
//!
//! A hosted server process walks a fixed path: collect startup parameters,
//! initialize the agent connection, then declare readiness with its
//! listening port and log locations. Afterwards the agent owns the pacing:
//! it assigns sessions, probes health, and eventually requests termination
//! through the callbacks registered at readiness time.
//!
//! The adapter enforces that ordering, bridges agent callbacks to the
//! game-side [`ServerHooks`], and guarantees the acknowledgment discipline
//! the agent relies on: session-active exactly once per assignment,
//! terminating exactly once per process, readiness at most once.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, Notify};

use crate::agent::{
    AgentClient, AgentError, CallbackError, ProcessParameters, SessionAssignment,
    SessionCallbacks,
};
use crate::params::ServerParameters;

/// Phases of the handshake with the fleet agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Process started, nothing collected yet.
    Uninitialized,
    /// Startup parameters were read from the command line.
    ParametersCollected,
    /// The agent connection is established.
    SdkInitialized,
    /// Readiness was signaled; the agent may assign sessions.
    Ready,
    /// The agent requested termination; local shutdown is running.
    Terminating,
    /// Termination was acknowledged; the process should exit.
    Terminated,
}

/// Errors from driving the lifecycle out of order or from the agent itself.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid lifecycle state: expected {expected:?}, found {found:?}")]
    InvalidState {
        expected: LifecycleState,
        found: LifecycleState,
    },
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// Game-side injection point for session work.
///
/// The adapter owns the conversation with the agent; the embedding server
/// supplies what is actually game-specific through this trait. The defaults
/// make a server that does no per-session work and always reports healthy.
#[async_trait]
pub trait ServerHooks: Send + Sync {
    /// Session-specific setup, run before session-active is signaled. An
    /// error here is reported to the agent and no activation is sent.
    async fn on_session_start(&self, session: &SessionAssignment) -> Result<(), CallbackError>;

    /// Local shutdown work, run before the terminating acknowledgment. The
    /// acknowledgment is sent even when this fails.
    async fn on_shutdown(&self) -> Result<(), CallbackError> {
        Ok(())
    }

    /// Health probe. The default performs no dependency checks and always
    /// reports healthy.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Hooks that accept every session and do nothing on shutdown.
pub struct DefaultHooks;

#[async_trait]
impl ServerHooks for DefaultHooks {
    async fn on_session_start(&self, session: &SessionAssignment) -> Result<(), CallbackError> {
        info!("session {} accepted", session.session_id);
        Ok(())
    }
}

struct AdapterShared<C: AgentClient> {
    client: C,
    state: Mutex<LifecycleState>,
    server_params: Mutex<Option<ServerParameters>>,
    terminated: Notify,
}

/// Drives the lifecycle handshake over a concrete [`AgentClient`].
///
/// Keep the adapter alive for the whole process: it holds the registered
/// [`ProcessParameters`] that the agent retains for callback delivery.
pub struct LifecycleAdapter<C: AgentClient> {
    shared: Arc<AdapterShared<C>>,
    process_params: Mutex<Option<Arc<ProcessParameters>>>,
}

impl<C: AgentClient> LifecycleAdapter<C> {
    pub fn new(client: C) -> Self {
        Self {
            shared: Arc::new(AdapterShared {
                client,
                state: Mutex::new(LifecycleState::Uninitialized),
                server_params: Mutex::new(None),
                terminated: Notify::new(),
            }),
            process_params: Mutex::new(None),
        }
    }

    /// The agent client this adapter drives.
    pub fn client(&self) -> &C {
        &self.shared.client
    }

    /// Current lifecycle phase.
    pub async fn state(&self) -> LifecycleState {
        *self.shared.state.lock().await
    }

    /// Parameters collected at startup, once available.
    pub async fn server_parameters(&self) -> Option<ServerParameters> {
        self.shared.server_params.lock().await.clone()
    }

    /// Reads the fleet-agent switches from the given argument tokens.
    /// Callable exactly once, before [`initialize`](Self::initialize).
    pub async fn collect_parameters<I, S>(&self, args: I) -> Result<(), LifecycleError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.shared.state.lock().await;
        if *state != LifecycleState::Uninitialized {
            return Err(LifecycleError::InvalidState {
                expected: LifecycleState::Uninitialized,
                found: *state,
            });
        }

        let params = ServerParameters::from_args(args);
        *self.shared.server_params.lock().await = Some(params);
        *state = LifecycleState::ParametersCollected;
        Ok(())
    }

    /// Establishes the agent connection with the collected parameters.
    ///
    /// Failure is fatal to the hosting process: without the agent connection
    /// no sessions can ever be assigned, so callers should exit rather than
    /// retry (reconnect policy belongs to the agent client).
    pub async fn initialize(&self) -> Result<(), LifecycleError> {
        let mut state = self.shared.state.lock().await;
        if *state != LifecycleState::ParametersCollected {
            return Err(LifecycleError::InvalidState {
                expected: LifecycleState::ParametersCollected,
                found: *state,
            });
        }

        let params = self
            .shared
            .server_params
            .lock()
            .await
            .clone()
            .unwrap_or_default();

        info!("initializing connection to the fleet agent");
        self.shared.client.initialize(&params).await?;
        *state = LifecycleState::SdkInitialized;
        Ok(())
    }

    /// Registers the callbacks and signals readiness to host sessions.
    ///
    /// Registration and the readiness signal are one step, so the callbacks
    /// are registered exactly once and readiness is sent at most once: a
    /// second call fails with [`LifecycleError::InvalidState`] without
    /// reaching the agent.
    pub async fn make_ready(
        &self,
        port: u16,
        log_paths: Vec<String>,
        hooks: Arc<dyn ServerHooks>,
    ) -> Result<(), LifecycleError> {
        let mut state = self.shared.state.lock().await;
        if *state != LifecycleState::SdkInitialized {
            return Err(LifecycleError::InvalidState {
                expected: LifecycleState::SdkInitialized,
                found: *state,
            });
        }

        let bridge = Arc::new(CallbackBridge {
            shared: Arc::clone(&self.shared),
            hooks,
        });
        let process_params = Arc::new(ProcessParameters {
            port,
            log_paths,
            callbacks: bridge,
        });

        // The agent retains its copy for the rest of the process lifetime;
        // the adapter keeps one too so the structure outlives every callback.
        *self.process_params.lock().await = Some(Arc::clone(&process_params));

        if let Err(e) = self.shared.client.signal_ready(process_params).await {
            *self.process_params.lock().await = None;
            return Err(e.into());
        }

        *state = LifecycleState::Ready;
        info!("ready to host sessions on port {}", port);
        Ok(())
    }

    /// Resolves once the terminating acknowledgment has been sent.
    pub async fn wait_terminated(&self) {
        loop {
            let notified = self.shared.terminated.notified();
            if *self.shared.state.lock().await == LifecycleState::Terminated {
                return;
            }
            notified.await;
        }
    }
}

/// Agent-facing handler bridging callbacks to the injected [`ServerHooks`].
struct CallbackBridge<C: AgentClient> {
    shared: Arc<AdapterShared<C>>,
    hooks: Arc<dyn ServerHooks>,
}

#[async_trait]
impl<C: AgentClient> SessionCallbacks for CallbackBridge<C> {
    async fn on_session_start(&self, session: SessionAssignment) -> Result<(), CallbackError> {
        let state = *self.shared.state.lock().await;
        if state != LifecycleState::Ready {
            warn!(
                "session {} assigned while not ready ({:?})",
                session.session_id, state
            );
            return Err(CallbackError::SessionSetup(format!(
                "process not ready for sessions ({:?})",
                state
            )));
        }

        info!("session {} initializing", session.session_id);
        self.hooks.on_session_start(&session).await?;
        self.shared.client.signal_session_active().await?;
        info!("session {} active", session.session_id);
        Ok(())
    }

    async fn on_terminate(&self) {
        {
            let mut state = self.shared.state.lock().await;
            match *state {
                LifecycleState::Terminating | LifecycleState::Terminated => {
                    warn!("duplicate termination request ignored");
                    return;
                }
                _ => *state = LifecycleState::Terminating,
            }
        }

        info!("fleet agent requested termination");
        if let Err(e) = self.hooks.on_shutdown().await {
            error!("shutdown work failed: {}", e);
        }

        // The acknowledgment goes out even when shutdown work failed;
        // withholding it only earns the process a forced kill.
        if let Err(e) = self.shared.client.signal_terminating().await {
            error!("failed to acknowledge termination: {}", e);
        }

        *self.shared.state.lock().await = LifecycleState::Terminated;
        self.shared.terminated.notify_waiters();
    }

    async fn on_health_check(&self) -> bool {
        let healthy = self.hooks.health_check().await;
        debug!("health check reported {}", healthy);
        healthy
    }
}
