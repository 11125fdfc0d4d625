//! Integration tests for the fleet lifecycle handshake
//!
//! These tests drive the whole stack the way a deployment would: the game
//! server's hooks behind the lifecycle adapter, against the loopback agent
//! standing in for the fleet-management agent.

use lifecycle::adapter::{LifecycleAdapter, LifecycleError, LifecycleState};
use lifecycle::agent::SessionAssignment;
use lifecycle::loopback::{demo_session, LoopbackAgent};
use lifecycle::params::{port_from_args, DEFAULT_PORT};
use server::hooks::GameServer;
use std::sync::Arc;
use std::time::Duration;

fn agent_args() -> Vec<String> {
    vec![
        "-authtoken=token-123".to_string(),
        "-hostid=host-a".to_string(),
        "-fleetid=fleet-1".to_string(),
        "-websocketurl=wss://agent.local:4242".to_string(),
        "-port=7778".to_string(),
    ]
}

/// Runs collect/initialize/make_ready with the given arguments and hooks.
async fn bring_up(
    agent: LoopbackAgent,
    args: Vec<String>,
    hooks: Arc<GameServer>,
) -> LifecycleAdapter<LoopbackAgent> {
    let adapter = LifecycleAdapter::new(agent);
    adapter.collect_parameters(args.iter()).await.unwrap();
    adapter.initialize().await.unwrap();

    let port = port_from_args(args.iter());
    adapter
        .make_ready(port, vec!["logs/server.log".to_string()], hooks)
        .await
        .unwrap();
    adapter
}

/// READINESS HANDSHAKE TESTS
mod handshake_tests {
    use super::*;

    /// Tests the full path from raw arguments to an active session.
    #[tokio::test]
    async fn full_handshake_reaches_active_session() {
        let agent = LoopbackAgent::new();
        let hooks = Arc::new(GameServer::new());
        let adapter = bring_up(agent.clone(), agent_args(), Arc::clone(&hooks)).await;

        assert_eq!(adapter.state().await, LifecycleState::Ready);
        assert_eq!(agent.ready_signals(), 1);
        assert_eq!(agent.process_parameters().await.unwrap().port, 7778);

        agent.start_session(demo_session("fleet-1")).await.unwrap();

        assert_eq!(agent.session_active_signals(), 1);
        let active = hooks.active_session().await.unwrap();
        assert_eq!(active.fleet_id, "fleet-1");
    }

    /// Tests that a malformed port falls back to the default end to end.
    #[tokio::test]
    async fn malformed_port_falls_back_to_default() {
        let agent = LoopbackAgent::new();
        let mut args = agent_args();
        args.retain(|a| !a.starts_with("-port"));
        args.push("-port=abc".to_string());

        bring_up(agent.clone(), args, Arc::new(GameServer::new())).await;

        assert_eq!(
            agent.process_parameters().await.unwrap().port,
            DEFAULT_PORT
        );
    }

    /// Tests that readiness cannot be signaled twice for one process.
    #[tokio::test]
    async fn readiness_signaled_at_most_once() {
        let agent = LoopbackAgent::new();
        let adapter = bring_up(agent.clone(), agent_args(), Arc::new(GameServer::new())).await;

        let second = adapter
            .make_ready(7779, vec![], Arc::new(GameServer::new()))
            .await;

        assert!(matches!(second, Err(LifecycleError::InvalidState { .. })));
        assert_eq!(agent.ready_signals(), 1);
    }

    /// Tests a session assignment arriving as a JSON payload from the agent.
    #[tokio::test]
    async fn session_assignment_from_json_payload() {
        let agent = LoopbackAgent::new();
        let hooks = Arc::new(GameServer::new());
        bring_up(agent.clone(), agent_args(), Arc::clone(&hooks)).await;

        let assignment: SessionAssignment = serde_json::from_str(
            r#"{
                "session_id": "gsess-json",
                "fleet_id": "fleet-1",
                "max_players": 16,
                "properties": {"map": "arena", "mode": "ffa"}
            }"#,
        )
        .unwrap();

        agent.start_session(assignment).await.unwrap();

        let active = hooks.active_session().await.unwrap();
        assert_eq!(active.session_id, "gsess-json");
        assert_eq!(active.max_players, 16);
        assert_eq!(active.properties.get("mode").map(String::as_str), Some("ffa"));
    }

    /// Tests that a second assignment is refused while a session is hosted,
    /// and that the refusal reaches the agent as an error result.
    #[tokio::test]
    async fn concurrent_session_assignment_refused() {
        let agent = LoopbackAgent::new();
        let hooks = Arc::new(GameServer::new());
        bring_up(agent.clone(), agent_args(), Arc::clone(&hooks)).await;

        agent.start_session(demo_session("fleet-1")).await.unwrap();
        let second = agent.start_session(demo_session("fleet-1")).await;

        assert!(second.is_err());
        // Only the first assignment was activated.
        assert_eq!(agent.session_active_signals(), 1);
    }
}

/// HEALTH AND TERMINATION TESTS
mod termination_tests {
    use super::*;

    /// Tests that the periodic health probe sees a healthy server.
    #[tokio::test]
    async fn health_probes_report_healthy() {
        let agent = LoopbackAgent::with_health_interval(Duration::from_millis(10));
        bring_up(agent.clone(), agent_args(), Arc::new(GameServer::new())).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(agent.health_checks() >= 1);
        assert!(agent.run_health_check().await.unwrap());
    }

    /// Tests that termination closes the session and is acknowledged once.
    #[tokio::test]
    async fn termination_acknowledged_and_session_closed() {
        let agent = LoopbackAgent::new();
        let hooks = Arc::new(GameServer::new());
        let adapter = bring_up(agent.clone(), agent_args(), Arc::clone(&hooks)).await;

        agent.start_session(demo_session("fleet-1")).await.unwrap();
        agent.request_termination().await;

        assert_eq!(agent.terminating_signals(), 1);
        assert_eq!(adapter.state().await, LifecycleState::Terminated);
        assert!(hooks.active_session().await.is_none());
    }

    /// Tests that the process observes termination through the adapter.
    #[tokio::test]
    async fn wait_terminated_resolves_after_agent_request() {
        let agent = LoopbackAgent::new();
        let adapter = Arc::new(
            bring_up(agent.clone(), agent_args(), Arc::new(GameServer::new())).await,
        );

        let waiter = {
            let adapter = Arc::clone(&adapter);
            tokio::spawn(async move { adapter.wait_terminated().await })
        };

        agent.request_termination().await;

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait_terminated should resolve after the acknowledgment")
            .unwrap();
    }

    /// Tests that no session can start once termination ran.
    #[tokio::test]
    async fn sessions_refused_after_termination() {
        let agent = LoopbackAgent::new();
        bring_up(agent.clone(), agent_args(), Arc::new(GameServer::new())).await;

        agent.request_termination().await;
        let result = agent.start_session(demo_session("fleet-1")).await;

        assert!(result.is_err());
        assert_eq!(agent.session_active_signals(), 0);
    }
}
