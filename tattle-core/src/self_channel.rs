//! The self-channel router.
//!
//! The server multiplexes presence and subscription updates for *all* of
//! a user's topics through one distinguished channel. [`SelfChannel`]
//! routes those events to the mirrored topics: it resolves the source
//! topic through the registry, applies watermark and access-control
//! updates, triggers targeted metadata fetches when the payload shape is
//! opaque, and manages topic creation and teardown.
//!
//! Routing is resilient by contract: a malformed or replayed event is
//! logged and skipped, never escalated. One bad event must not corrupt
//! the mirror or abort the session. All routing runs on one logical
//! event sequence; watermark and access merges are not safe to
//! interleave.

use tracing::{debug, error, warn};

use tattle_types::{
    AccessControl, AccessMask, MaskError, MetaQuery, PresenceEvent, PresenceKind, ServerResponse,
    SubscriptionRecord, SubscriptionUpdate, TopicRecord,
};

use crate::lifecycle::{LifecycleEvent, TopicLifecycle};
use crate::listener::Listener;
use crate::registry::TopicRegistry;
use crate::requests::{resolved_reply, PendingReply, Requests};
use crate::store::Store;
use crate::topic::Topic;

/// Name of the distinguished channel carrying a user's own events.
pub const SELF_CHANNEL: &str = "self";

/// Router for the self channel.
///
/// Owns the seams it routes through (store, request channel, listener)
/// and the self topic's own record; the registry of mirrored topics is
/// passed by reference into every routing call, because the registry —
/// not the router — owns topic lifetime.
pub struct SelfChannel<S, R, L> {
    user: String,
    record: TopicRecord,
    lifecycle: TopicLifecycle,
    store: S,
    requests: R,
    listener: L,
}

impl<S: Store, R: Requests, L: Listener> SelfChannel<S, R, L> {
    /// A router for the given local user.
    pub fn new(user: impl Into<String>, store: S, requests: R, listener: L) -> Self {
        Self {
            user: user.into(),
            record: TopicRecord::new(SELF_CHANNEL),
            lifecycle: TopicLifecycle::default(),
            store,
            requests,
            listener,
        }
    }

    /// The local user id.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The self topic's own mirrored record.
    pub fn record(&self) -> &TopicRecord {
        &self.record
    }

    /// Whether the self channel is attached to the server.
    pub fn is_attached(&self) -> bool {
        self.lifecycle.is_attached()
    }

    /// Advance the self channel's subscription lifecycle.
    pub fn apply_lifecycle(&mut self, event: LifecycleEvent) {
        self.lifecycle = self.lifecycle.on_event(event);
    }

    /// The store, for inspection in tests.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The request channel, for inspection in tests.
    pub fn requests(&self) -> &R {
        &self.requests
    }

    /// The listener, for inspection in tests.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    /// Route a presence event from the self channel.
    ///
    /// Dispatches on the event kind and source topic. Events naming an
    /// unknown topic are meaningful only for access grants (the way new
    /// topics are discovered) and account tags; everything else is a
    /// protocol warning. The raw event is always forwarded to the
    /// listener last.
    pub fn route_presence(&mut self, registry: &mut TopicRegistry, pres: &PresenceEvent) {
        let src = pres.src.as_deref();

        match &pres.what {
            PresenceKind::Terminated => {
                // The self channel itself was detached.
                self.channel_left(registry, false, 502, "terminated");
            }
            PresenceKind::Updated if src == Some(SELF_CHANNEL) => {
                // Own description changed server-side. The payload shape
                // is opaque; fetch the canonical version.
                let _ = self
                    .requests
                    .get_meta(SELF_CHANNEL, MetaQuery::builder().with_desc().build());
            }
            _ => match src.filter(|s| registry.contains(s)) {
                Some(name) => self.route_known(registry, name, pres),
                None => self.route_unknown(src, pres),
            },
        }

        if pres.what == PresenceKind::Gone {
            // A removal changes the subscription list even though no
            // single-topic callback covers it.
            self.listener.on_subs_updated();
        }
        self.listener.on_presence(pres);
    }

    /// Dispatch a presence event about a topic the registry knows.
    fn route_known(&mut self, registry: &mut TopicRegistry, name: &str, pres: &PresenceEvent) {
        let Some(topic) = registry.get_mut(name) else {
            return;
        };

        match &pres.what {
            PresenceKind::Online => topic.set_online(true),
            PresenceKind::Offline => {
                topic.set_online(false);
                topic.note_seen(None);
            }
            PresenceKind::MessageReceived => {
                let Some(seq) = pres.seq else {
                    warn!(topic = name, "msg presence without seq; skipping");
                    return;
                };
                topic.record_mut().advance_seq(seq);
                let own = pres
                    .actor
                    .as_deref()
                    .map_or(true, |actor| actor == self.user);
                if own {
                    // Sent by this user (possibly from another session):
                    // the message is implicitly read.
                    self.assign_read(topic, seq);
                }
                topic.record_mut().touch();
            }
            PresenceKind::Updated => {
                // Description changed; fetch the canonical state rather
                // than guessing the payload.
                let _ = self.requests.get_meta(
                    SELF_CHANNEL,
                    MetaQuery::builder().with_sub(Some(name)).build(),
                );
            }
            PresenceKind::AccessChanged => match &pres.delta {
                Some(delta) => match topic.apply_access_delta(delta) {
                    Ok(true) => self.store.upsert_topic(topic),
                    Ok(false) => {}
                    Err(err) => warn!(topic = name, %err, "bad access delta"),
                },
                None => warn!(topic = name, "acs presence without delta"),
            },
            PresenceKind::UserAgentChanged => {
                topic.note_seen(pres.user_agent.clone());
            }
            PresenceKind::Received => {
                if let Some(seq) = pres.seq {
                    self.assign_recv(topic, seq);
                }
            }
            PresenceKind::Read => {
                if let Some(seq) = pres.seq {
                    self.assign_read(topic, seq);
                }
            }
            PresenceKind::Gone => {
                // The topic no longer exists or is no longer accessible.
                topic.set_persisted(false);
                self.store.remove_topic(name);
                registry.remove(name);
            }
            PresenceKind::Deleted => {
                // Messages deleted elsewhere; the self channel mirrors
                // no message history of its own.
            }
            what => {
                warn!(topic = name, %what, "unknown presence kind");
            }
        }
    }

    /// Dispatch a presence event that names no locally known topic.
    fn route_unknown(&mut self, src: Option<&str>, pres: &PresenceEvent) {
        match &pres.what {
            PresenceKind::AccessChanged => {
                let Some(name) = src else {
                    warn!("acs presence without source topic");
                    return;
                };
                let Some(delta) = &pres.delta else {
                    warn!(topic = name, "acs presence without delta");
                    return;
                };
                // A grant on an unknown topic is how new subscriptions
                // are discovered. Resolve the mode from the delta alone;
                // the topic itself is created when the fetch comes back.
                let mut transient = AccessControl::default();
                match transient.apply_delta(delta) {
                    Ok(_) if transient.is_mode_defined() => {
                        let _ = self.requests.get_meta(
                            SELF_CHANNEL,
                            MetaQuery::builder().with_sub(Some(name)).build(),
                        );
                    }
                    Ok(_) => {
                        warn!(topic = name, ?delta, "unresolvable access mode for unknown topic");
                    }
                    Err(err) => {
                        warn!(topic = name, %err, "bad access delta for unknown topic");
                    }
                }
            }
            PresenceKind::Tags => {
                // Account tags changed; fetch the new set.
                let _ = self
                    .requests
                    .get_meta(SELF_CHANNEL, MetaQuery::builder().with_tags().build());
            }
            what => {
                warn!(%what, src = src.unwrap_or("-"), "presence for unknown topic");
            }
        }
    }

    /// Process a meta-subscription snapshot batch.
    ///
    /// Each record reconciles one topic: known and deleted → removed,
    /// known and live → merged, unknown and live → created through the
    /// registry factory. A record the topic's kind cannot accept is an
    /// internal-consistency defect scoped to that single item.
    pub fn route_meta_sub(&mut self, registry: &mut TopicRegistry, subs: &[SubscriptionRecord]) {
        for sub in subs {
            let Some(name) = sub.topic.as_deref() else {
                warn!("subscription record without topic name; skipping");
                continue;
            };
            match registry.get_mut(name) {
                Some(topic) => {
                    if sub.deleted_ms.is_some() {
                        topic.set_persisted(false);
                        self.store.remove_topic(name);
                        registry.remove(name);
                    } else {
                        match topic.apply_subscription(sub) {
                            Ok(true) => self.store.upsert_topic(topic),
                            Ok(false) => {}
                            Err(err) => {
                                // Should be unreachable with a correctly
                                // constructed registry.
                                error!(topic = name, %err, "cannot apply subscription update");
                            }
                        }
                    }
                }
                None if sub.deleted_ms.is_none() => {
                    let topic = registry.create_from_record(name, sub);
                    topic.set_persisted(true);
                    self.store.upsert_topic(topic);
                }
                None => {
                    debug!(topic = name, "deletion of untracked topic; nothing to do");
                }
            }
            self.listener.on_meta_sub(sub);
        }
        self.listener.on_subs_updated();
    }

    /// Handle the self channel leaving the server-side subscription.
    ///
    /// With the self channel down no presence information is available
    /// for any topic, so every registered topic is marked offline.
    pub fn channel_left(
        &mut self,
        registry: &mut TopicRegistry,
        unsub: bool,
        code: u16,
        reason: &str,
    ) {
        let event = if unsub {
            LifecycleEvent::LeaveConfirmed
        } else {
            LifecycleEvent::ServerTerminated
        };
        self.lifecycle = self.lifecycle.on_event(event);
        self.record.online = false;

        for topic in registry.iter_mut() {
            topic.set_online(false);
        }
        self.listener.on_channel_left(unsub, code, reason);
    }

    /// Request a change to the self subscription's access mode.
    ///
    /// The delta is applied to a copy of the current `want` mask; local
    /// state is not mutated — the server's echo updates it. When the
    /// delta is a no-op the returned reply is already resolved with a
    /// 304 and no request goes out.
    pub fn update_mode(&mut self, update: &str) -> Result<PendingReply, MaskError> {
        let mut want = self.record.access.want.unwrap_or(AccessMask::NONE);
        if want.update(update)? {
            Ok(self.requests.set_subscription(
                SELF_CHANNEL,
                SubscriptionUpdate {
                    user: None,
                    mode: Some(want.to_string()),
                },
            ))
        } else {
            Ok(resolved_reply(ServerResponse::not_modified()))
        }
    }

    /// Advance a topic's received watermark, persisting only on change.
    fn assign_recv(&mut self, topic: &mut Topic, recv: u64) {
        if topic.record_mut().advance_recv(recv) {
            self.store.set_recv(topic.name(), recv);
        }
    }

    /// Advance a topic's read watermark, persisting only on change.
    /// A read advance implies a received advance to the same value.
    fn assign_read(&mut self, topic: &mut Topic, read: u64) {
        if topic.record_mut().advance_read(read) {
            self.store.set_read(topic.name(), read);
            self.assign_recv(topic, read);
        }
    }
}
