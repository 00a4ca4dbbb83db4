//! The mirrored state of one topic.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::access::AccessControl;

/// Opaque description payload.
///
/// The shape is defined by the application (user cards, group profiles);
/// the sync core stores and forwards it without inspecting it.
pub type Payload = serde_json::Value;

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

/// When a peer was last seen online, and from what client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSeen {
    /// Timestamp in milliseconds since the Unix epoch.
    pub when_ms: u64,
    /// User-agent string of the peer's client, if reported.
    pub user_agent: Option<String>,
}

impl LastSeen {
    /// A last-seen record stamped with the current time.
    pub fn now(user_agent: Option<String>) -> Self {
        Self {
            when_ms: now_ms(),
            user_agent,
        }
    }
}

/// The locally mirrored state of one topic.
///
/// Watermarks are `None` until the server first reports them; `None`
/// compares below any reported value. The `advance_*` setters are
/// monotonic: a value at or below the current one is a no-op, so the
/// invariant `read ≤ recv ≤ seq` holds as long as every read advance is
/// followed by a recv advance to the same value (the routers do this).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicRecord {
    /// Unique topic name.
    pub name: String,
    /// Public description payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<Payload>,
    /// Private, per-user description payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<Payload>,
    /// Access-control state of this subscription.
    #[serde(default)]
    pub access: AccessControl,
    /// Whether the topic (or peer) is currently online.
    #[serde(default)]
    pub online: bool,
    /// When the peer was last seen online.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<LastSeen>,
    /// Highest known message sequence id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Highest sequence id acknowledged as received by this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recv: Option<u64>,
    /// Highest sequence id acknowledged as read by this user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<u64>,
    /// When the topic last saw activity, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub touched_ms: Option<u64>,
    /// When the server-side state last changed, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_ms: Option<u64>,
}

impl TopicRecord {
    /// A fresh record for the named topic.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Advance the highest known sequence id. No-op unless `seq` is
    /// greater than the current value.
    pub fn advance_seq(&mut self, seq: u64) -> bool {
        if Some(seq) > self.seq {
            self.seq = Some(seq);
            true
        } else {
            false
        }
    }

    /// Advance the received watermark. No-op unless `recv` is greater
    /// than the current value.
    pub fn advance_recv(&mut self, recv: u64) -> bool {
        if Some(recv) > self.recv {
            self.recv = Some(recv);
            true
        } else {
            false
        }
    }

    /// Advance the read watermark. No-op unless `read` is greater than
    /// the current value. Callers must follow a successful advance with
    /// [`advance_recv`](Self::advance_recv) to the same value.
    pub fn advance_read(&mut self, read: u64) -> bool {
        if Some(read) > self.read {
            self.read = Some(read);
            true
        } else {
            false
        }
    }

    /// Stamp the activity timestamp with the current time.
    pub fn touch(&mut self) {
        self.touched_ms = Some(now_ms());
    }
}
