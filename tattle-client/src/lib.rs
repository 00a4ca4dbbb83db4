//! # tattle-client
//!
//! Client session glue for the Tattle pub/sub protocol.
//!
//! This crate wires the pure reconciliation engine from `tattle-core`
//! to a running session:
//!
//! - **[`MirrorClient`]**: owns the registry and the self-channel
//!   router, dispatches parsed server events
//! - **[`ChannelRequests`] / [`RequestWorker`]**: channel-based
//!   request/response plumbing with deferred replies
//! - **[`MockRequests`]**: test double for the request seam
//!
//! ## Example
//!
//! ```ignore
//! use tattle_client::{MirrorClient, MirrorConfig, ChannelRequests, RequestWorker};
//! use tattle_core::{MemoryStore, NullListener};
//!
//! let (requests, rx) = ChannelRequests::new();
//! tokio::spawn(RequestWorker::new(rx, transport_handler).run());
//!
//! let mut client = MirrorClient::new(
//!     MirrorConfig::new("usr-self"),
//!     MemoryStore::new(),
//!     requests,
//!     NullListener,
//! );
//!
//! // Feed parsed server events, in arrival order.
//! client.handle_event(&event);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod mock;
pub mod requests;

pub use client::{ClientError, MirrorClient, MirrorConfig};
pub use mock::MockRequests;
pub use requests::{ChannelRequests, OutboundRequest, QueuedRequest, RequestHandler, RequestWorker};
