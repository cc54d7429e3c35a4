//! Control channel between foreground pages and the controller
//!
//! Pages post a JSON value and may attach a reply port. Two commands are
//! understood; anything else is dropped without a reply.
//!
//! | Message | Reply |
//! |---------|-------|
//! | `"FORCE_UPDATE"` | `{"status": "UPDATE_COMPLETE"}` |
//! | `"GET_VERSION"` | `{"version": "<version>"}` |
//!
//! The object form `{"type": "FORCE_UPDATE"}` is accepted as well.

use super::Controller;
use crate::error::{SwError, SwResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

pub const FORCE_UPDATE: &str = "FORCE_UPDATE";
pub const GET_VERSION: &str = "GET_VERSION";
pub const UPDATE_COMPLETE: &str = "UPDATE_COMPLETE";

/// Recognized control commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    ForceUpdate,
    GetVersion,
    Unknown,
}

impl ControlMessage {
    pub fn parse(data: &Value) -> Self {
        let command = match data {
            Value::String(s) => Some(s.as_str()),
            Value::Object(map) => map.get("type").and_then(Value::as_str),
            _ => None,
        };

        match command {
            Some(FORCE_UPDATE) => Self::ForceUpdate,
            Some(GET_VERSION) => Self::GetVersion,
            _ => Self::Unknown,
        }
    }
}

/// Replies sent over a reply port
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlReply {
    Status { status: String },
    Version { version: String },
}

impl ControlReply {
    pub fn update_complete() -> Self {
        Self::Status {
            status: UPDATE_COMPLETE.to_string(),
        }
    }
}

/// Sending half of a reply channel
pub type ReplyPort = oneshot::Sender<ControlReply>;

/// Create a reply port and the receiver the page waits on
pub fn reply_channel() -> (ReplyPort, oneshot::Receiver<ControlReply>) {
    oneshot::channel()
}

/// What the controller did with a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Every bucket was deleted and the acknowledgment sent
    ForceUpdated { deleted: Vec<String> },
    /// The version was sent back
    VersionReported(String),
    /// Unrecognized message, nothing done
    Ignored,
}

fn send_reply(port: Option<ReplyPort>, reply: ControlReply) {
    if let Some(port) = port {
        if port.send(reply).is_err() {
            debug!("Reply port closed before the reply was sent");
        }
    }
}

impl Controller {
    /// Message hook
    ///
    /// A failed force-update returns an error and drops the reply port
    /// without acknowledging, so the page sees no completion.
    pub async fn on_message(
        &self,
        data: &Value,
        port: Option<ReplyPort>,
    ) -> SwResult<MessageOutcome> {
        match ControlMessage::parse(data) {
            ControlMessage::ForceUpdate => {
                let deleted = self.force_update().await?;
                send_reply(port, ControlReply::update_complete());
                Ok(MessageOutcome::ForceUpdated { deleted })
            }
            ControlMessage::GetVersion => {
                let version = self.version.to_string();
                send_reply(
                    port,
                    ControlReply::Version {
                        version: version.clone(),
                    },
                );
                Ok(MessageOutcome::VersionReported(version))
            }
            ControlMessage::Unknown => {
                debug!("Ignoring unrecognized message: {}", data);
                Ok(MessageOutcome::Ignored)
            }
        }
    }

    /// Delete every bucket, stale or not, then skip waiting
    async fn force_update(&self) -> SwResult<Vec<String>> {
        info!("Force update requested");

        let names = self
            .store
            .keys()
            .await
            .map_err(|e| SwError::ForceUpdate(e.to_string()))?;

        let (deleted, failed) = self.delete_buckets(&names).await;
        if !failed.is_empty() {
            warn!("Force update left {} bucket(s) behind", failed.len());
            return Err(SwError::ForceUpdate(format!(
                "could not delete {}",
                failed.join(", ")
            )));
        }

        self.host
            .skip_waiting()
            .await
            .map_err(|e| SwError::ForceUpdate(e.to_string()))?;

        info!("Force update complete, {} bucket(s) cleared", deleted.len());
        Ok(deleted)
    }
}
