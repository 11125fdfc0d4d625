//! # Fleet Lifecycle Library
//!
//! This library implements the client-side lifecycle contract a game-server
//! process must honor when it runs under an external fleet-management agent.
//! The agent owns session placement, health monitoring, and process
//! termination; this crate owns the process-local half of that handshake.
//!
//! ## Core Responsibilities
//!
//! ### Parameter Collection
//! The fleet agent launches the server with `-key=value` switches carrying
//! the credentials and endpoint it expects the process to use. The
//! [`params`] module extracts those switches without ever failing: a missing
//! or malformed switch falls back to a default so the process can still come
//! up on a developer workstation with no agent present.
//!
//! ### Lifecycle Handshake
//! The [`adapter`] module drives the state machine every hosted server walks
//! through: collect parameters, initialize the agent connection, then signal
//! readiness together with the listening port and log locations. From that
//! point on the agent calls back into the process to assign sessions, probe
//! health, and eventually request termination.
//!
//! ### Agent Seam
//! The [`agent`] module defines the [`agent::AgentClient`] trait that stands
//! for the vendored agent SDK, plus the callback interface the agent invokes.
//! The [`loopback`] module provides an in-process implementation of that
//! trait for local runs and tests.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use lifecycle::adapter::LifecycleAdapter;
//! use lifecycle::loopback::LoopbackAgent;
//! use lifecycle::params::port_from_args;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let args: Vec<String> = std::env::args().skip(1).collect();
//!
//!     let adapter = LifecycleAdapter::new(LoopbackAgent::new());
//!
//!     adapter.collect_parameters(args.iter()).await?;
//!     adapter.initialize().await?;
//!
//!     let hooks = Arc::new(lifecycle::adapter::DefaultHooks);
//!     let port = port_from_args(args.iter());
//!     adapter
//!         .make_ready(port, vec!["logs/server.log".into()], hooks)
//!         .await?;
//!
//!     adapter.wait_terminated().await;
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod agent;
pub mod loopback;
pub mod params;
