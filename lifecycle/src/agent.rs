//! Fleet-agent client seam and the callback interface the agent invokes
//!
//! The real fleet agent is an external collaborator: a vendored SDK that
//! keeps a connection to the orchestration backend and calls back into the
//! server process to assign sessions, probe health, and request termination.
//! This module captures that contract as traits so the rest of the crate
//! never depends on a concrete transport. Reconnect and timeout policy live
//! entirely on the agent side; nothing here retries.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::params::ServerParameters;

/// Failures reported by an agent client.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The connection to the fleet agent could not be established or was lost.
    #[error("connection to fleet agent failed: {0}")]
    Connection(String),
    /// The agent refused the request in its current state.
    #[error("fleet agent rejected the request: {0}")]
    Rejected(String),
    /// A signal was sent before `initialize` succeeded.
    #[error("agent client used before initialization")]
    NotInitialized,
}

/// Failures inside a callback body, returned to the agent instead of
/// panicking across the callback boundary. The agent has no other way to
/// learn that local work failed.
#[derive(Debug, Error)]
pub enum CallbackError {
    #[error("session setup failed: {0}")]
    SessionSetup(String),
    #[error("shutdown work failed: {0}")]
    Shutdown(String),
    #[error(transparent)]
    Agent(#[from] AgentError),
}

/// A session the orchestration service placed on this process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionAssignment {
    /// Unique session identifier assigned by the orchestration service.
    pub session_id: String,
    /// Fleet the session was placed on.
    #[serde(default)]
    pub fleet_id: String,
    /// Optional human-readable session name.
    #[serde(default)]
    pub name: Option<String>,
    /// Player capacity requested for the session.
    #[serde(default)]
    pub max_players: u32,
    /// Opaque key/value properties forwarded from the session request.
    #[serde(default)]
    pub properties: HashMap<String, String>,
}

/// Everything the agent needs to run a ready server process.
///
/// The agent client retains this structure for the remaining process
/// lifetime so it can invoke the callbacks at arbitrary future times; it is
/// therefore always handed over inside an [`Arc`].
pub struct ProcessParameters {
    /// Port the server accepts player connections on.
    pub port: u16,
    /// Relative log file paths the agent collects after each session.
    pub log_paths: Vec<String>,
    /// Handler object the agent invokes for lifecycle events.
    pub callbacks: Arc<dyn SessionCallbacks>,
}

impl fmt::Debug for ProcessParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessParameters")
            .field("port", &self.port)
            .field("log_paths", &self.log_paths)
            .finish_non_exhaustive()
    }
}

/// The callbacks a ready process exposes to the fleet agent.
///
/// The agent invokes these on its own tasks, concurrent with the server's
/// main loop. Implementations must be safe to call from any thread and must
/// report failure through the return value, never by panicking.
#[async_trait]
pub trait SessionCallbacks: Send + Sync {
    /// A session was assigned to this process. On success the process is
    /// expected to have signaled session-active before returning.
    async fn on_session_start(&self, session: SessionAssignment) -> Result<(), CallbackError>;

    /// The agent is about to shut this process down. The process performs
    /// local shutdown work and acknowledges with a terminating signal; the
    /// agent force-kills the process if the acknowledgment never arrives.
    async fn on_terminate(&self);

    /// Periodic health probe, paced by the agent (roughly once a minute).
    async fn on_health_check(&self) -> bool;
}

/// Client half of the fleet-agent contract.
///
/// `signal_ready` doubles as callback registration: the handed
/// [`ProcessParameters`] carries the handler object, so callbacks are
/// registered exactly once and only together with the readiness signal.
#[async_trait]
pub trait AgentClient: Send + Sync + 'static {
    /// Establishes the local connection to the fleet agent. Mandatory before
    /// any signal; failure means the process cannot receive sessions.
    async fn initialize(&self, params: &ServerParameters) -> Result<(), AgentError>;

    /// Declares the process ready to host sessions on the given port.
    async fn signal_ready(&self, params: Arc<ProcessParameters>) -> Result<(), AgentError>;

    /// Confirms that an assigned session finished setup and accepts players.
    async fn signal_session_active(&self) -> Result<(), AgentError>;

    /// Acknowledges a termination request after local shutdown work.
    async fn signal_terminating(&self) -> Result<(), AgentError>;
}
