//! # Fleet-Hosted Game Server
//!
//! Binary crate wiring a game-server process into the fleet-management
//! agent's lifecycle contract. The `lifecycle` crate owns the handshake;
//! this crate contributes the game-side pieces:
//!
//! - the [`hooks`] module implements the session hooks the lifecycle
//!   adapter invokes (session setup, shutdown work, health reporting)
//! - the binary entry point collects the agent's startup switches, drives
//!   the readiness handshake, and waits for termination

pub mod hooks;
