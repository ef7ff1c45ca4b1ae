//! Wire protocol for live-reload clients.
//!
//! JSON messages tagged by `type`; clients reload the page on `reload` and
//! answer `ping` with `pong` to keep the connection alive.

use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReloadMessage {
    /// Tell the client to reload the page
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Sent once on connect
    Connected { version: u32 },
    Ping { ts: u64 },
    Pong { ts: u64 },
}

impl ReloadMessage {
    pub fn reload() -> Self {
        Self::Reload { reason: None }
    }

    pub fn reload_with_reason(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn connected() -> Self {
        Self::Connected {
            version: PROTOCOL_VERSION,
        }
    }

    pub fn to_json(&self) -> String {
        // The enum has no non-serializable payloads
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}
