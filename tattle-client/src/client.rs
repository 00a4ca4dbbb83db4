//! MirrorClient - the main interface for a Tattle client session.
//!
//! Wires the self-channel router to a registry, a store, a request
//! channel, and a listener, and feeds parsed server events into it.
//!
//! # Architecture
//!
//! ```text
//! Application → MirrorClient → SelfChannel → TopicRegistry → Store
//!                      ↑              ↓
//!              parsed ServerEvent  Requests (deferred replies)
//! ```
//!
//! The transport layer is out of scope: it deserializes wire frames
//! into [`ServerEvent`]s and calls [`MirrorClient::handle_event`], on
//! one logical event sequence per session.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use tattle_core::{
    LifecycleEvent, Listener, PendingReply, Requests, SelfChannel, Store, Topic, TopicRegistry,
    SELF_CHANNEL,
};
use tattle_types::{MaskError, PresenceEvent, ServerEvent, SubscriptionRecord};

/// Client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The configuration failed to parse.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    /// A malformed access-mode string.
    #[error("invalid access mode: {0}")]
    Mask(#[from] MaskError),
}

fn default_device_name() -> String {
    "tattle device".to_string()
}

/// Configuration for a client session.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    /// The local user's id, used to attribute watermark updates.
    pub user_id: String,
    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub device_name: String,
}

impl MirrorConfig {
    /// A configuration for the given user with default settings.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            device_name: default_device_name(),
        }
    }

    /// Parse a configuration from TOML.
    pub fn from_toml_str(s: &str) -> Result<Self, ClientError> {
        Ok(toml::from_str(s)?)
    }

    /// Set the device name.
    pub fn with_device_name(mut self, name: &str) -> Self {
        self.device_name = name.to_string();
        self
    }
}

/// A client session's mirror of its server-side subscriptions.
///
/// Owns the topic registry and the self-channel router. All event
/// handling is synchronous; outbound requests complete on their own
/// through the deferred replies.
pub struct MirrorClient<S, R, L> {
    config: MirrorConfig,
    registry: TopicRegistry,
    channel: SelfChannel<S, R, L>,
}

impl<S: Store, R: Requests, L: Listener> MirrorClient<S, R, L> {
    /// A new session for the configured user.
    pub fn new(config: MirrorConfig, store: S, requests: R, listener: L) -> Self {
        let channel = SelfChannel::new(config.user_id.clone(), store, requests, listener);
        Self {
            config,
            registry: TopicRegistry::new(),
            channel,
        }
    }

    /// The session configuration.
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// The topic registry.
    pub fn registry(&self) -> &TopicRegistry {
        &self.registry
    }

    /// The topic registry, mutably. Intended for session bootstrap
    /// (seeding topics loaded from the store).
    pub fn registry_mut(&mut self) -> &mut TopicRegistry {
        &mut self.registry
    }

    /// The self-channel router.
    pub fn self_channel(&self) -> &SelfChannel<S, R, L> {
        &self.channel
    }

    /// Look up a mirrored topic by name.
    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.registry.get(name)
    }

    /// Number of mirrored topics.
    pub fn topic_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the self channel is attached to the server.
    pub fn is_attached(&self) -> bool {
        self.channel.is_attached()
    }

    /// Advance the self channel's subscription lifecycle. Called by the
    /// session layer as the server confirms subscribe/leave requests.
    pub fn apply_lifecycle(&mut self, event: LifecycleEvent) {
        self.channel.apply_lifecycle(event);
    }

    /// Route one parsed server event into the mirror.
    pub fn handle_event(&mut self, event: &ServerEvent) {
        match event {
            ServerEvent::Presence(pres) => self.handle_presence(pres),
            ServerEvent::MetaSub { topic, subs } => self.handle_meta_sub(topic, subs),
        }
    }

    /// Route a presence event from the self channel.
    pub fn handle_presence(&mut self, pres: &PresenceEvent) {
        self.channel.route_presence(&mut self.registry, pres);
    }

    /// Route a meta-subscription snapshot batch.
    pub fn handle_meta_sub(&mut self, topic: &str, subs: &[SubscriptionRecord]) {
        if topic != SELF_CHANNEL {
            // Per-topic subscriber lists are not part of the mirror.
            debug!(topic, "meta sub for non-self topic; ignoring");
            return;
        }
        self.channel.route_meta_sub(&mut self.registry, subs);
    }

    /// Handle loss of the server connection. Detaches the self channel
    /// and marks every mirrored topic offline.
    pub fn connection_lost(&mut self, code: u16, reason: &str) {
        self.channel
            .channel_left(&mut self.registry, false, code, reason);
    }

    /// Request a change to the self subscription's access mode.
    pub fn update_mode(&mut self, update: &str) -> Result<PendingReply, ClientError> {
        Ok(self.channel.update_mode(update)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRequests;
    use crate::requests::OutboundRequest;
    use tattle_core::{MemoryStore, NullListener, Topic};
    use tattle_types::{AccessDelta, PresenceKind};

    fn client(mock: &MockRequests) -> MirrorClient<MemoryStore, MockRequests, NullListener> {
        MirrorClient::new(
            MirrorConfig::new("usr-self"),
            MemoryStore::new(),
            mock.clone(),
            NullListener,
        )
    }

    #[test]
    fn config_from_toml() {
        let config = MirrorConfig::from_toml_str(
            r#"
            user_id = "usr-self"
            device_name = "test rig"
            "#,
        )
        .unwrap();
        assert_eq!(config.user_id, "usr-self");
        assert_eq!(config.device_name, "test rig");
    }

    #[test]
    fn config_device_name_defaults() {
        let config = MirrorConfig::from_toml_str(r#"user_id = "usr-self""#).unwrap();
        assert_eq!(config.device_name, "tattle device");

        let config = MirrorConfig::new("usr-self").with_device_name("laptop");
        assert_eq!(config.device_name, "laptop");
    }

    #[test]
    fn config_rejects_missing_user() {
        assert!(MirrorConfig::from_toml_str(r#"device_name = "x""#).is_err());
    }

    #[test]
    fn presence_events_reach_the_registry() {
        let mock = MockRequests::new();
        let mut client = client(&mock);
        client.registry_mut().insert(Topic::new("grp-hiking"));

        client.handle_event(&ServerEvent::Presence(
            PresenceEvent::new(PresenceKind::Online).with_src("grp-hiking"),
        ));

        assert!(client.topic("grp-hiking").unwrap().is_online());
    }

    #[test]
    fn meta_sub_batch_builds_the_mirror() {
        let mock = MockRequests::new();
        let mut client = client(&mock);

        client.handle_event(&ServerEvent::MetaSub {
            topic: SELF_CHANNEL.into(),
            subs: vec![
                SubscriptionRecord {
                    topic: Some("grp-hiking".into()),
                    seq: Some(4),
                    ..Default::default()
                },
                SubscriptionRecord {
                    topic: Some("usr-alice".into()),
                    seq: Some(9),
                    ..Default::default()
                },
            ],
        });

        assert_eq!(client.topic_count(), 2);
        assert_eq!(client.topic("usr-alice").unwrap().record().seq, Some(9));
    }

    #[test]
    fn meta_sub_for_other_topics_is_ignored() {
        let mock = MockRequests::new();
        let mut client = client(&mock);

        client.handle_event(&ServerEvent::MetaSub {
            topic: "grp-hiking".into(),
            subs: vec![SubscriptionRecord::for_topic("usr-alice")],
        });

        assert_eq!(client.topic_count(), 0);
    }

    #[test]
    fn discovery_fetch_goes_out_through_the_request_channel() {
        let mock = MockRequests::new();
        let mut client = client(&mock);

        client.handle_event(&ServerEvent::Presence(
            PresenceEvent::new(PresenceKind::AccessChanged)
                .with_src("grp-new")
                .with_delta(AccessDelta::both("RW", "RW")),
        ));

        assert_eq!(mock.meta_fetch_count(), 1);
        assert!(matches!(
            mock.last_sent(),
            Some(OutboundRequest::GetMeta { topic, .. }) if topic == SELF_CHANNEL
        ));
    }

    #[test]
    fn connection_loss_marks_everything_offline() {
        let mock = MockRequests::new();
        let mut client = client(&mock);
        client.apply_lifecycle(LifecycleEvent::SubscribeRequested);
        client.apply_lifecycle(LifecycleEvent::SubscribeConfirmed);
        assert!(client.is_attached());

        for name in ["grp-a", "usr-b"] {
            let mut topic = Topic::new(name);
            topic.set_online(true);
            client.registry_mut().insert(topic);
        }

        client.connection_lost(503, "connection reset");

        assert!(!client.is_attached());
        assert!(client.registry().iter().all(|t| !t.is_online()));
    }

    #[tokio::test]
    async fn update_mode_round_trip() {
        let mock = MockRequests::new();
        let mut client = client(&mock);

        let reply = client.update_mode("+RW").unwrap();
        assert!(reply.await.unwrap().is_ok());
        assert!(matches!(
            mock.last_sent(),
            Some(OutboundRequest::SetSubscription { .. })
        ));
    }
}
