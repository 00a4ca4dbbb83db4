//! Subscription lifecycle state machine.
//!
//! Pure state transitions, no I/O. The session layer feeds lifecycle
//! events in as the server confirms subscribe and leave requests; the
//! routers consult the state but never block on it.

/// The subscription state of one topic within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopicLifecycle {
    /// Not subscribed; the server sends no events for this topic.
    #[default]
    Unsubscribed,
    /// Subscribe request sent, awaiting confirmation.
    Subscribing,
    /// Subscribed; events flow.
    Subscribed,
    /// Leave request sent, awaiting confirmation.
    Leaving,
}

/// Events that drive the subscription lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The client asked to subscribe.
    SubscribeRequested,
    /// The server confirmed the subscription.
    SubscribeConfirmed,
    /// The client asked to leave.
    LeaveRequested,
    /// The server confirmed the leave.
    LeaveConfirmed,
    /// The server terminated the subscription unilaterally.
    ServerTerminated,
}

impl TopicLifecycle {
    /// Process a lifecycle event and return the new state.
    ///
    /// Invalid transitions keep the current state; terminal server
    /// events force `Unsubscribed` from anywhere.
    pub fn on_event(self, event: LifecycleEvent) -> Self {
        match (self, event) {
            (_, LifecycleEvent::ServerTerminated) => Self::Unsubscribed,
            (Self::Unsubscribed, LifecycleEvent::SubscribeRequested) => Self::Subscribing,
            (Self::Subscribing, LifecycleEvent::SubscribeConfirmed) => Self::Subscribed,
            (Self::Subscribed, LifecycleEvent::LeaveRequested) => Self::Leaving,
            (Self::Subscribing | Self::Subscribed | Self::Leaving, LifecycleEvent::LeaveConfirmed) => {
                Self::Unsubscribed
            }
            (state, _) => state,
        }
    }

    /// Whether the topic is attached to the server-side subscription.
    pub fn is_attached(&self) -> bool {
        matches!(self, Self::Subscribed)
    }
}
