//! The outbound request seam.
//!
//! Routing side effects (metadata fetches, mode updates) go out through
//! [`Requests`]. Every call returns a [`PendingReply`] immediately; the
//! routers never await it. The transport layer completes the reply when
//! the server responds — or the caller drops the receiver if it does
//! not care, which is the common case for router-initiated fetches.

use tokio::sync::oneshot;

use tattle_types::{MetaQuery, RequestError, ServerResponse, SubscriptionUpdate};

/// The deferred result of an outbound request.
pub type PendingReply = oneshot::Receiver<Result<ServerResponse, RequestError>>;

/// Request/response channel to the server.
pub trait Requests {
    /// Fetch topic metadata. The selected facets decide what the server
    /// sends back (as ordinary server events, not through the reply).
    fn get_meta(&mut self, topic: &str, query: MetaQuery) -> PendingReply;

    /// Change a subscription (access mode, invited user).
    fn set_subscription(&mut self, topic: &str, update: SubscriptionUpdate) -> PendingReply;
}

/// A reply that is already complete.
///
/// Used when a request resolves locally without reaching the server,
/// e.g. a mode update that turns out to be a no-op.
pub fn resolved_reply(response: ServerResponse) -> PendingReply {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(Ok(response));
    rx
}

/// A reply that has already failed.
pub fn failed_reply(error: RequestError) -> PendingReply {
    let (tx, rx) = oneshot::channel();
    let _ = tx.send(Err(error));
    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolved_reply_completes_immediately() {
        let reply = resolved_reply(ServerResponse::not_modified());
        let result = reply.await.unwrap();
        assert_eq!(result, Ok(ServerResponse::not_modified()));
    }

    #[tokio::test]
    async fn failed_reply_carries_error() {
        let reply = failed_reply(RequestError::ChannelClosed);
        let result = reply.await.unwrap();
        assert_eq!(result, Err(RequestError::ChannelClosed));
    }
}
