//! Startup parameter collection from fleet-agent command-line switches
//!
//! The fleet agent launches a registered server process with a set of
//! `-key=value` switches (`-authtoken=`, `-hostid=`, `-fleetid=`,
//! `-websocketurl=`, `-port=`). Collection never fails: keys match
//! case-insensitively, unknown switches are ignored, and absent or malformed
//! values fall back to defaults so the binary also starts standalone.

use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Port the server listens on when the agent passes none.
pub const DEFAULT_PORT: u16 = 7777;

/// Connection parameters handed to the agent during initialization.
///
/// Populated once at startup and immutable afterwards. Fields left empty
/// simply were not present on the command line; the agent client decides
/// whether that matters for the fleet type it connects to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerParameters {
    /// Short-lived compute auth token issued by the orchestration service.
    pub auth_token: String,
    /// Host/compute name this process is registered under.
    pub host_id: String,
    /// Identifier of the fleet this host belongs to.
    pub fleet_id: String,
    /// Control endpoint URL of the fleet agent.
    pub websocket_url: String,
    /// Identifier of this process, defaults to the OS pid.
    pub process_id: String,
}

impl ServerParameters {
    /// Collects connection parameters from raw argument tokens.
    ///
    /// Logs every recognized value so an operator can verify what the agent
    /// handed the process. Missing keys leave the field empty.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = ServerParameters {
            process_id: std::process::id().to_string(),
            ..ServerParameters::default()
        };

        for arg in args {
            let Some((key, value)) = split_switch(arg.as_ref()) else {
                continue;
            };

            match key.to_ascii_lowercase().as_str() {
                "authtoken" => {
                    info!("AUTH_TOKEN: {}", value);
                    params.auth_token = value.to_string();
                }
                "hostid" => {
                    info!("HOST_ID: {}", value);
                    params.host_id = value.to_string();
                }
                "fleetid" => {
                    info!("FLEET_ID: {}", value);
                    params.fleet_id = value.to_string();
                }
                "websocketurl" => {
                    info!("WEBSOCKET_URL: {}", value);
                    params.websocket_url = value.to_string();
                }
                _ => {}
            }
        }

        info!("PID: {}", params.process_id);
        params
    }
}

/// Extracts the listening port from `-port=<int>`, first occurrence wins.
///
/// A missing switch or a non-numeric value falls back to [`DEFAULT_PORT`];
/// the fallback is silent toward the caller but logged for the operator.
pub fn port_from_args<I, S>(args: I) -> u16
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    for arg in args {
        let Some((key, value)) = split_switch(arg.as_ref()) else {
            continue;
        };

        if key.eq_ignore_ascii_case("port") {
            return match value.parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    warn!(
                        "ignoring non-numeric port value {:?}, listening on {}",
                        value, DEFAULT_PORT
                    );
                    DEFAULT_PORT
                }
            };
        }
    }

    DEFAULT_PORT
}

/// Splits a `-key=value` token, tolerating any number of leading dashes.
fn split_switch(arg: &str) -> Option<(&str, &str)> {
    arg.trim_start_matches('-').split_once('=')
}
