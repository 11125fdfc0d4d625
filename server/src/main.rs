use lifecycle::adapter::LifecycleAdapter;
use lifecycle::loopback::{demo_session, LoopbackAgent};
use lifecycle::params::port_from_args;
use log::{error, info};
use server::hooks::GameServer;
use std::sync::Arc;
use std::time::Duration;

/// Main-method of the fleet-hosted game server.
/// Collects the agent's startup switches, runs the lifecycle handshake, then
/// waits until the agent terminates the process (or Ctrl+C does locally).
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    // The vendored agent SDK client would slot in here on a managed fleet;
    // this build runs against the in-process loopback agent.
    let agent = LoopbackAgent::new();
    let adapter = LifecycleAdapter::new(agent.clone());

    adapter.collect_parameters(args.iter()).await?;

    // Fatal on failure: without the agent connection this process can never
    // be assigned a session, so there is nothing useful left to do.
    adapter.initialize().await?;

    let port = port_from_args(args.iter());
    let hooks = Arc::new(GameServer::new());
    adapter
        .make_ready(port, vec!["logs/server.log".to_string()], hooks)
        .await?;

    // `-demosession` asks the loopback agent to place a throwaway session,
    // which exercises the whole activation path on a workstation.
    if has_flag(&args, "demosession") {
        let fleet_id = adapter
            .server_parameters()
            .await
            .map(|p| p.fleet_id)
            .unwrap_or_default();
        let driver = agent.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            if let Err(e) = driver.start_session(demo_session(&fleet_id)).await {
                error!("demo session failed to start: {}", e);
            }
        });
    }

    tokio::select! {
        _ = adapter.wait_terminated() => {
            info!("terminated by fleet agent");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down gracefully...");
            agent.request_termination().await;
            adapter.wait_terminated().await;
        }
    }

    Ok(())
}

/// Checks for a bare `-flag` switch, any number of dashes, case-insensitive.
fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter()
        .any(|arg| arg.trim_start_matches('-').eq_ignore_ascii_case(flag))
}
