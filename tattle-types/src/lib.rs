//! # tattle-types
//!
//! Value types for the Tattle pub/sub protocol client.
//!
//! This crate provides the foundational types used across all Tattle
//! crates:
//! - [`AccessMask`], [`AccessControl`], [`AccessDelta`] - permission bitsets
//!   and their merge semantics
//! - [`TopicRecord`], [`LastSeen`] - the mirrored state of one topic
//! - [`PresenceEvent`], [`SubscriptionRecord`], [`ServerEvent`] - parsed
//!   server pushes
//! - [`MetaQuery`], [`ServerResponse`] - outbound metadata queries
//! - [`MaskError`], [`RequestError`] - error types

#![warn(missing_docs)]
#![warn(clippy::all)]

mod access;
mod error;
mod events;
mod query;
mod record;

pub use access::{AccessControl, AccessDelta, AccessMask};
pub use error::{MaskError, RequestError};
pub use events::{PresenceEvent, PresenceKind, ServerEvent, SubscriptionRecord};
pub use query::{MetaFacet, MetaQuery, MetaQueryBuilder, ServerResponse, SubscriptionUpdate};
pub use record::{now_ms, LastSeen, Payload, TopicRecord};
