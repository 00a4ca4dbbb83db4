//! # tattle-core
//!
//! Per-topic event routing and state reconciliation for the Tattle
//! pub/sub protocol.
//!
//! This crate is the synchronization engine: it applies server-pushed
//! presence and subscription events to a local mirror of topic state.
//! I/O happens only through the seams the caller provides — a
//! [`Store`] for persistence, a [`Requests`] channel for outbound
//! metadata fetches, and a [`Listener`] for update callbacks — so the
//! whole engine unit-tests without a network.
//!
//! ```text
//! Transport → parsed event → SelfChannel → TopicRegistry → Store
//!                                  ↓
//!                              Listener
//! ```
//!
//! Routing must run on one logical event sequence per client: watermark
//! and access-control merges are not commutative-safe under
//! interleaving, and self-channel events touch many topics at once, so
//! serialization is per client, not per topic.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod lifecycle;
mod listener;
mod registry;
mod requests;
mod self_channel;
mod store;
mod topic;

pub use lifecycle::{LifecycleEvent, TopicLifecycle};
pub use listener::{Listener, NullListener};
pub use registry::TopicRegistry;
pub use requests::{failed_reply, resolved_reply, PendingReply, Requests};
pub use self_channel::{SelfChannel, SELF_CHANNEL};
pub use store::{MemoryStore, NullStore, Store, StoreOp};
pub use topic::{Topic, TopicError, TopicKind};
