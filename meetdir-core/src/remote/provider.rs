//! Provider subprocess protocol.
//!
//! This module handles communication with external provider binaries
//! (e.g., `meetdir-provider-google`) using JSON over stdin/stdout.
//!
//! Any executable that speaks the JSON protocol can be a provider.
//! Providers manage their own credentials; meetdir only passes the
//! provider-specific keys from its config.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::debug;

use crate::error::{MeetDirError, MeetDirResult};
use crate::remote::protocol::{Command, ProviderCommand, Request, Response};

const LIST_TIMEOUT: Duration = Duration::from_secs(30);
/// Downloads can be large exports.
const FETCH_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    fn binary_path(&self) -> MeetDirResult<std::path::PathBuf> {
        let binary_name = format!("meetdir-provider-{}", self.0);
        which::which(&binary_name).map_err(|_| MeetDirError::ProviderNotInstalled(binary_name))
    }

    /// Call a typed provider command and return the result.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> MeetDirResult<C::Response> {
        let limit = match C::command() {
            Command::FetchDocument => FETCH_TIMEOUT,
            Command::ListEvents | Command::ListDocuments => LIST_TIMEOUT,
        };
        timeout(limit, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| MeetDirError::ProviderTimeout(limit.as_secs()))?
    }

    /// Low-level call that sends a command with params and deserializes the response.
    async fn call_raw<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> MeetDirResult<R> {
        let params = serde_json::to_value(params)?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)?;

        let binary_path = self.binary_path()?;
        debug!(provider = %self.0, ?command, "Calling provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                MeetDirError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| MeetDirError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(MeetDirError::Provider(format!(
                "Provider {} exited with status: {}",
                self.0,
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(MeetDirError::Provider(format!(
                "Provider {} returned no response",
                self.0
            )));
        }

        let response: Response<R> = serde_json::from_str(&response_str)
            .map_err(|e| MeetDirError::Provider(format!("Failed to parse response: {}", e)))?;

        match response {
            Response::Success { data } => Ok(data),
            Response::Error { error } => Err(MeetDirError::Provider(error)),
        }
    }
}
