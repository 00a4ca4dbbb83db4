//! Lifecycle and update callbacks.

use tattle_types::{PresenceEvent, SubscriptionRecord};

/// Push-only notifications to the presentation layer.
///
/// All callbacks are fire-and-forget with default no-op bodies;
/// implement only what the consumer cares about.
pub trait Listener {
    /// A presence event was routed, whatever the outcome.
    fn on_presence(&mut self, _pres: &PresenceEvent) {}

    /// The set of subscriptions changed (topic added, removed, or the
    /// whole list reconciled).
    fn on_subs_updated(&mut self) {}

    /// One meta-subscription record was processed.
    fn on_meta_sub(&mut self, _sub: &SubscriptionRecord) {}

    /// The self channel detached from the server.
    fn on_channel_left(&mut self, _unsub: bool, _code: u16, _reason: &str) {}
}

/// A listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl Listener for NullListener {}
