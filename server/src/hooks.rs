//! Game-side session hooks invoked by the lifecycle adapter

use async_trait::async_trait;
use lifecycle::adapter::ServerHooks;
use lifecycle::agent::{CallbackError, SessionAssignment};
use log::info;
use tokio::sync::Mutex;

/// Session state of the game server.
///
/// Hosts exactly one session at a time, the placement model the fleet uses
/// for this server. Real match setup (loading the map, opening player slots)
/// would hang off `on_session_start`; this server just records the
/// assignment so the rest of the process can see what it is hosting.
pub struct GameServer {
    active_session: Mutex<Option<SessionAssignment>>,
}

impl GameServer {
    pub fn new() -> Self {
        Self {
            active_session: Mutex::new(None),
        }
    }

    /// The session currently hosted, if any.
    pub async fn active_session(&self) -> Option<SessionAssignment> {
        self.active_session.lock().await.clone()
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServerHooks for GameServer {
    async fn on_session_start(&self, session: &SessionAssignment) -> Result<(), CallbackError> {
        let mut slot = self.active_session.lock().await;
        if let Some(current) = slot.as_ref() {
            return Err(CallbackError::SessionSetup(format!(
                "session {} is already active",
                current.session_id
            )));
        }

        info!(
            "preparing session {} ({} player slots)",
            session.session_id, session.max_players
        );
        *slot = Some(session.clone());
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), CallbackError> {
        if let Some(session) = self.active_session.lock().await.take() {
            info!("closing session {}", session.session_id);
        }
        Ok(())
    }

    // health_check: default, no dependencies to probe
}
