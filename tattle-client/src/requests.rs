//! Channel-backed request plumbing.
//!
//! The router issues requests synchronously and gets a deferred reply;
//! the actual server round-trip runs on an async worker. This module
//! wires the two together with an mpsc queue of
//! `(request, reply sender)` pairs.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use tattle_core::{failed_reply, PendingReply, Requests};
use tattle_types::{MetaQuery, RequestError, ServerResponse, SubscriptionUpdate};

/// An outbound request, as queued for the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundRequest {
    /// A metadata fetch.
    GetMeta {
        /// The topic the query is addressed to.
        topic: String,
        /// The selected facets.
        query: MetaQuery,
    },
    /// A subscription change.
    SetSubscription {
        /// The topic the change is addressed to.
        topic: String,
        /// The change itself.
        update: SubscriptionUpdate,
    },
}

/// A queued request paired with the sender that completes its reply.
pub type QueuedRequest = (
    OutboundRequest,
    oneshot::Sender<Result<ServerResponse, RequestError>>,
);

/// The sending half of the request channel.
///
/// Cheap to clone; every call enqueues the request and returns the
/// deferred reply immediately. If the worker is gone the reply resolves
/// to [`RequestError::ChannelClosed`] instead of hanging.
#[derive(Debug, Clone)]
pub struct ChannelRequests {
    tx: mpsc::UnboundedSender<QueuedRequest>,
}

impl ChannelRequests {
    /// Create a request channel and the receiver the worker drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<QueuedRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn enqueue(&self, request: OutboundRequest) -> PendingReply {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send((request, reply_tx)).is_err() {
            debug!("request channel closed, failing request");
            return failed_reply(RequestError::ChannelClosed);
        }
        reply_rx
    }
}

impl Requests for ChannelRequests {
    fn get_meta(&mut self, topic: &str, query: MetaQuery) -> PendingReply {
        self.enqueue(OutboundRequest::GetMeta {
            topic: topic.to_string(),
            query,
        })
    }

    fn set_subscription(&mut self, topic: &str, update: SubscriptionUpdate) -> PendingReply {
        self.enqueue(OutboundRequest::SetSubscription {
            topic: topic.to_string(),
            update,
        })
    }
}

/// Backend that performs the actual server round-trip for one request.
///
/// Implemented by the transport layer; the worker stays agnostic of
/// how requests reach the server.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Perform the request and return the server's control response.
    async fn handle(&self, request: OutboundRequest) -> Result<ServerResponse, RequestError>;
}

/// Drains the request queue, completing each deferred reply.
///
/// Run it on the session's runtime: `tokio::spawn(worker.run())`. The
/// worker exits when every [`ChannelRequests`] clone is dropped.
pub struct RequestWorker<H: RequestHandler> {
    rx: mpsc::UnboundedReceiver<QueuedRequest>,
    handler: H,
}

impl<H: RequestHandler> RequestWorker<H> {
    /// A worker draining `rx` through `handler`.
    pub fn new(rx: mpsc::UnboundedReceiver<QueuedRequest>, handler: H) -> Self {
        Self { rx, handler }
    }

    /// Process requests until the channel closes.
    pub async fn run(mut self) {
        while let Some((request, reply)) = self.rx.recv().await {
            let result = self.handler.handle(request).await;
            // The issuer may have dropped the reply; that is fine.
            let _ = reply.send(result);
        }
    }
}
