//! Server-pushed events consumed by the sync core.
//!
//! The transport layer deserializes wire frames into these structures;
//! the sync core only ever sees the parsed form.

use serde::{Deserialize, Serialize};

use crate::access::{AccessControl, AccessDelta};
use crate::record::Payload;

/// The kind of a presence event.
///
/// Unrecognized kinds survive deserialization as [`Unknown`]
/// so a newer server cannot break event routing.
///
/// [`Unknown`]: PresenceKind::Unknown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PresenceKind {
    /// Topic or peer came online.
    Online,
    /// Topic or peer went offline.
    Offline,
    /// A new message was posted to the topic.
    MessageReceived,
    /// The topic description changed server-side.
    Updated,
    /// The access mode of a subscription changed.
    AccessChanged,
    /// The peer's user agent changed.
    UserAgentChanged,
    /// Another session of this user marked messages as received.
    Received,
    /// Another session of this user marked messages as read.
    Read,
    /// The topic was deleted or became inaccessible.
    Gone,
    /// Messages were deleted from the topic.
    Deleted,
    /// The account's tag set changed.
    Tags,
    /// The subscription itself was terminated by the server.
    Terminated,
    /// A kind this client does not recognize.
    Unknown(String),
}

impl PresenceKind {
    fn as_str(&self) -> &str {
        match self {
            Self::Online => "on",
            Self::Offline => "off",
            Self::MessageReceived => "msg",
            Self::Updated => "upd",
            Self::AccessChanged => "acs",
            Self::UserAgentChanged => "ua",
            Self::Received => "recv",
            Self::Read => "read",
            Self::Gone => "gone",
            Self::Deleted => "del",
            Self::Tags => "tags",
            Self::Terminated => "term",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for PresenceKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "on" => Self::Online,
            "off" => Self::Offline,
            "msg" => Self::MessageReceived,
            "upd" => Self::Updated,
            "acs" => Self::AccessChanged,
            "ua" => Self::UserAgentChanged,
            "recv" => Self::Received,
            "read" => Self::Read,
            "gone" => Self::Gone,
            "del" => Self::Deleted,
            "tags" => Self::Tags,
            "term" => Self::Terminated,
            _ => Self::Unknown(s),
        }
    }
}

impl From<PresenceKind> for String {
    fn from(kind: PresenceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for PresenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A presence event pushed by the server.
///
/// On the self channel these describe state changes of *other* topics:
/// `src` names the affected topic and is absent only for account-level
/// events such as [`PresenceKind::Tags`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceEvent {
    /// The kind of change.
    pub what: PresenceKind,
    /// The topic the change applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Message sequence id, for message and watermark events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// The user who caused the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// User-agent string, for [`PresenceKind::UserAgentChanged`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Access-control delta, for [`PresenceKind::AccessChanged`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<AccessDelta>,
}

impl PresenceEvent {
    /// An event of the given kind with all optional fields empty.
    pub fn new(what: PresenceKind) -> Self {
        Self {
            what,
            src: None,
            seq: None,
            actor: None,
            user_agent: None,
            delta: None,
        }
    }

    /// Set the source topic.
    pub fn with_src(mut self, src: impl Into<String>) -> Self {
        self.src = Some(src.into());
        self
    }

    /// Set the message sequence id.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    /// Set the acting user.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    /// Set the user-agent string.
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set the access-control delta.
    pub fn with_delta(mut self, delta: AccessDelta) -> Self {
        self.delta = Some(delta);
        self
    }
}

/// One record of a meta-subscription snapshot.
///
/// On the self channel each record describes this user's subscription
/// to one topic; a batch of them reconciles the local mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    /// Name of the topic this subscription is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// When the subscription last changed, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_ms: Option<u64>,
    /// Set when the subscription was deleted server-side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_ms: Option<u64>,
    /// Access-control state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acs: Option<AccessControl>,
    /// Public description payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public: Option<Payload>,
    /// Private description payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<Payload>,
    /// Whether the topic is currently online.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    /// Highest known message sequence id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    /// Received watermark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recv: Option<u64>,
    /// Read watermark.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<u64>,
}

impl SubscriptionRecord {
    /// A record for the named topic with no other fields set.
    pub fn for_topic(name: impl Into<String>) -> Self {
        Self {
            topic: Some(name.into()),
            ..Default::default()
        }
    }

    /// Mark the record as a server-side deletion.
    pub fn deleted_at(mut self, when_ms: u64) -> Self {
        self.deleted_ms = Some(when_ms);
        self
    }
}

/// A parsed server-to-client event, as handed over by the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerEvent {
    /// A presence event.
    Presence(PresenceEvent),
    /// A meta-subscription snapshot batch.
    MetaSub {
        /// The topic the snapshot was requested on.
        topic: String,
        /// The subscription records in the batch.
        subs: Vec<SubscriptionRecord>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_kind_string_roundtrip() {
        for kind in [
            PresenceKind::Online,
            PresenceKind::Offline,
            PresenceKind::MessageReceived,
            PresenceKind::AccessChanged,
            PresenceKind::Gone,
            PresenceKind::Terminated,
        ] {
            let s = String::from(kind.clone());
            assert_eq!(PresenceKind::from(s), kind);
        }
    }

    #[test]
    fn unknown_kind_preserves_raw_string() {
        let kind = PresenceKind::from("frob".to_string());
        assert_eq!(kind, PresenceKind::Unknown("frob".into()));
        assert_eq!(String::from(kind), "frob");
    }

    #[test]
    fn presence_event_deserializes_unknown_kind() {
        let json = r#"{"what":"frob","src":"grp-hiking"}"#;
        let pres: PresenceEvent = serde_json::from_str(json).unwrap();
        assert_eq!(pres.what, PresenceKind::Unknown("frob".into()));
        assert_eq!(pres.src.as_deref(), Some("grp-hiking"));
    }

    #[test]
    fn presence_event_builder() {
        let pres = PresenceEvent::new(PresenceKind::MessageReceived)
            .with_src("grp-hiking")
            .with_seq(42)
            .with_actor("usr-alice");
        assert_eq!(pres.seq, Some(42));
        assert_eq!(pres.actor.as_deref(), Some("usr-alice"));
    }

    #[test]
    fn subscription_record_deserializes_sparse_json() {
        let json = r#"{"topic":"grp-hiking","seq":7}"#;
        let sub: SubscriptionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(sub.topic.as_deref(), Some("grp-hiking"));
        assert_eq!(sub.seq, Some(7));
        assert!(sub.deleted_ms.is_none());
        assert!(sub.acs.is_none());
    }
}
