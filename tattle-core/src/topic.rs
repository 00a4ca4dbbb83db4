//! Per-topic state and the base behaviors shared by all topic kinds.

use thiserror::Error;

use tattle_types::{
    AccessDelta, LastSeen, MaskError, SubscriptionRecord, TopicRecord,
};

use crate::lifecycle::{LifecycleEvent, TopicLifecycle};

/// The concrete kind of a topic, selected by its name prefix.
///
/// A closed set: kind-specific behavior dispatches on this tag rather
/// than on open-ended inheritance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    /// A one-to-one conversation with another user (`usr*`).
    Contact,
    /// A multi-user group conversation (`grp*` and anything else).
    Group,
    /// The server-side search/directory topic (`dir*`). Its state comes
    /// from query results, never from subscription merges.
    Directory,
}

impl TopicKind {
    /// Derive the kind from a topic name.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("usr") {
            Self::Contact
        } else if name.starts_with("dir") {
            Self::Directory
        } else {
            Self::Group
        }
    }

    /// Whether this kind accepts meta-subscription merges.
    pub fn accepts_subscription_updates(&self) -> bool {
        !matches!(self, Self::Directory)
    }
}

/// Errors from per-topic state updates.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopicError {
    /// The topic's kind cannot accept the requested update. Reaching
    /// this is an internal-consistency defect, not a protocol error.
    #[error("topic kind {0:?} does not accept subscription updates")]
    UnsupportedKind(TopicKind),

    /// A malformed access mask inside the update.
    #[error(transparent)]
    Mask(#[from] MaskError),
}

/// One mirrored topic: its record, kind tag, and session state.
///
/// Topics are owned by the [`TopicRegistry`](crate::TopicRegistry);
/// routers borrow them for the duration of one event.
#[derive(Debug, Clone)]
pub struct Topic {
    record: TopicRecord,
    kind: TopicKind,
    lifecycle: TopicLifecycle,
    persisted: bool,
}

impl Topic {
    /// A new topic with an empty record, kind derived from the name.
    pub fn new(name: impl Into<String>) -> Self {
        let record = TopicRecord::new(name);
        let kind = TopicKind::from_name(&record.name);
        Self {
            record,
            kind,
            lifecycle: TopicLifecycle::default(),
            persisted: false,
        }
    }

    /// Build a topic from a meta-subscription record.
    ///
    /// Used by the registry factory when the server reports a
    /// subscription to a topic not yet mirrored locally.
    pub fn from_subscription(name: &str, sub: &SubscriptionRecord) -> Self {
        let mut topic = Self::new(name);
        topic.populate(sub);
        topic
    }

    /// The topic name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// The kind tag.
    pub fn kind(&self) -> TopicKind {
        self.kind
    }

    /// Shared view of the mirrored record.
    pub fn record(&self) -> &TopicRecord {
        &self.record
    }

    /// Mutable view of the mirrored record.
    pub fn record_mut(&mut self) -> &mut TopicRecord {
        &mut self.record
    }

    /// Whether the topic is currently online.
    pub fn is_online(&self) -> bool {
        self.record.online
    }

    /// Set the online flag.
    pub fn set_online(&mut self, online: bool) {
        self.record.online = online;
    }

    /// Whether the topic is stored locally.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// Mark the topic as stored or not stored locally.
    pub fn set_persisted(&mut self, persisted: bool) {
        self.persisted = persisted;
    }

    /// The subscription lifecycle state.
    pub fn lifecycle(&self) -> TopicLifecycle {
        self.lifecycle
    }

    /// Advance the subscription lifecycle.
    pub fn apply_lifecycle(&mut self, event: LifecycleEvent) {
        self.lifecycle = self.lifecycle.on_event(event);
    }

    /// Base handling for a terminal server event: detach and go offline.
    pub fn handle_terminated(&mut self) {
        self.lifecycle = self.lifecycle.on_event(LifecycleEvent::ServerTerminated);
        self.record.online = false;
    }

    /// Apply an access-control delta to the stored access state.
    ///
    /// Returns whether anything changed; the caller persists on change.
    pub fn apply_access_delta(&mut self, delta: &AccessDelta) -> Result<bool, MaskError> {
        self.record.access.apply_delta(delta)
    }

    /// Merge a meta-subscription record into this topic.
    ///
    /// Only kinds whose state is driven by subscription snapshots accept
    /// this; [`TopicKind::Directory`] returns
    /// [`TopicError::UnsupportedKind`]. Returns whether anything changed.
    pub fn apply_subscription(&mut self, sub: &SubscriptionRecord) -> Result<bool, TopicError> {
        if !self.kind.accepts_subscription_updates() {
            return Err(TopicError::UnsupportedKind(self.kind));
        }
        Ok(self.populate(sub))
    }

    /// Copy the fields present on `sub` into the record. Watermarks only
    /// move forward; description payloads are replaced when present.
    fn populate(&mut self, sub: &SubscriptionRecord) -> bool {
        let rec = &mut self.record;
        let mut changed = false;

        if let Some(acs) = &sub.acs {
            changed |= rec.access.merge(acs);
        }
        if let Some(public) = &sub.public {
            if rec.public.as_ref() != Some(public) {
                rec.public = Some(public.clone());
                changed = true;
            }
        }
        if let Some(private) = &sub.private {
            if rec.private.as_ref() != Some(private) {
                rec.private = Some(private.clone());
                changed = true;
            }
        }
        if let Some(online) = sub.online {
            if rec.online != online {
                rec.online = online;
                changed = true;
            }
        }
        if let Some(seq) = sub.seq {
            changed |= rec.advance_seq(seq);
        }
        if let Some(read) = sub.read {
            // Read implies received.
            changed |= rec.advance_read(read);
            changed |= rec.advance_recv(read);
        }
        if let Some(recv) = sub.recv {
            changed |= rec.advance_recv(recv);
        }
        if let Some(updated_ms) = sub.updated_ms {
            if rec.updated_ms < Some(updated_ms) {
                rec.updated_ms = Some(updated_ms);
                changed = true;
            }
        }
        changed
    }

    /// Record that the peer was just seen, with an optional user agent.
    pub fn note_seen(&mut self, user_agent: Option<String>) {
        self.record.last_seen = Some(LastSeen::now(user_agent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tattle_types::{AccessControl, AccessMask};

    fn mask(s: &str) -> AccessMask {
        s.parse().unwrap()
    }

    #[test]
    fn kind_from_name_prefix() {
        assert_eq!(TopicKind::from_name("usr-alice"), TopicKind::Contact);
        assert_eq!(TopicKind::from_name("grp-hiking"), TopicKind::Group);
        assert_eq!(TopicKind::from_name("dir"), TopicKind::Directory);
        assert_eq!(TopicKind::from_name("weird"), TopicKind::Group);
    }

    #[test]
    fn apply_subscription_merges_fields() {
        let mut topic = Topic::new("grp-hiking");
        let sub = SubscriptionRecord {
            topic: Some("grp-hiking".into()),
            public: Some(serde_json::json!({"fn": "Hiking club"})),
            seq: Some(10),
            read: Some(4),
            acs: Some(AccessControl {
                given: Some(mask("JRWP")),
                want: Some(mask("JRW")),
                mode: Some(mask("JRW")),
                default_mode: None,
            }),
            ..Default::default()
        };

        assert!(topic.apply_subscription(&sub).unwrap());
        assert_eq!(topic.record().seq, Some(10));
        assert_eq!(topic.record().read, Some(4));
        // Read implies received.
        assert_eq!(topic.record().recv, Some(4));
        assert_eq!(topic.record().access.mode, Some(mask("JRW")));
    }

    #[test]
    fn apply_subscription_is_idempotent() {
        let mut topic = Topic::new("grp-hiking");
        let sub = SubscriptionRecord {
            topic: Some("grp-hiking".into()),
            seq: Some(5),
            online: Some(true),
            ..Default::default()
        };
        assert!(topic.apply_subscription(&sub).unwrap());
        assert!(!topic.apply_subscription(&sub).unwrap());
    }

    #[test]
    fn directory_topic_rejects_subscription_updates() {
        let mut topic = Topic::new("dir");
        let sub = SubscriptionRecord::for_topic("dir");
        assert_eq!(
            topic.apply_subscription(&sub),
            Err(TopicError::UnsupportedKind(TopicKind::Directory))
        );
    }

    #[test]
    fn access_delta_reports_change() {
        let mut topic = Topic::new("usr-bob");
        let changed = topic
            .apply_access_delta(&AccessDelta::both("+RW", "+RW"))
            .unwrap();
        assert!(changed);
        assert_eq!(topic.record().access.mode, Some(mask("RW")));

        let changed = topic
            .apply_access_delta(&AccessDelta::given("+R"))
            .unwrap();
        assert!(!changed);
    }

    #[test]
    fn terminated_detaches_and_goes_offline() {
        let mut topic = Topic::new("grp-hiking");
        topic.apply_lifecycle(LifecycleEvent::SubscribeRequested);
        topic.apply_lifecycle(LifecycleEvent::SubscribeConfirmed);
        topic.set_online(true);

        topic.handle_terminated();
        assert!(!topic.is_online());
        assert!(!topic.lifecycle().is_attached());
    }

    #[test]
    fn from_subscription_populates_record() {
        let sub = SubscriptionRecord {
            topic: Some("usr-carol".into()),
            seq: Some(3),
            private: Some(serde_json::json!({"comment": "from work"})),
            ..Default::default()
        };
        let topic = Topic::from_subscription("usr-carol", &sub);
        assert_eq!(topic.kind(), TopicKind::Contact);
        assert_eq!(topic.record().seq, Some(3));
        assert!(topic.record().private.is_some());
    }
}
