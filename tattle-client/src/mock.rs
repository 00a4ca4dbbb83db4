//! Mock request channel for testing.
//!
//! Records every issued request and resolves each reply from a queue
//! of canned responses, falling back to 200 ok.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tattle_core::{failed_reply, resolved_reply, PendingReply, Requests};
use tattle_types::{MetaQuery, RequestError, ServerResponse, SubscriptionUpdate};

use crate::requests::OutboundRequest;

#[derive(Debug, Default)]
struct MockRequestsInner {
    sent: Vec<OutboundRequest>,
    responses: VecDeque<Result<ServerResponse, RequestError>>,
}

/// Mock request channel for testing.
///
/// Clones share state, so a test can keep one handle for inspection
/// while the client owns the other.
#[derive(Debug, Default)]
pub struct MockRequests {
    inner: Arc<Mutex<MockRequestsInner>>,
}

impl MockRequests {
    /// A mock with an empty response queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next issued request.
    pub fn queue_response(&self, result: Result<ServerResponse, RequestError>) {
        let mut inner = self.inner.lock().unwrap();
        inner.responses.push_back(result);
    }

    /// Every request issued so far, in order.
    pub fn sent(&self) -> Vec<OutboundRequest> {
        let inner = self.inner.lock().unwrap();
        inner.sent.clone()
    }

    /// The most recent request, if any.
    pub fn last_sent(&self) -> Option<OutboundRequest> {
        let inner = self.inner.lock().unwrap();
        inner.sent.last().cloned()
    }

    /// Number of metadata fetches issued so far.
    pub fn meta_fetch_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner
            .sent
            .iter()
            .filter(|r| matches!(r, OutboundRequest::GetMeta { .. }))
            .count()
    }

    /// Forget all recorded requests and queued responses.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockRequestsInner::default();
    }

    fn record(&self, request: OutboundRequest) -> PendingReply {
        let mut inner = self.inner.lock().unwrap();
        inner.sent.push(request);
        match inner.responses.pop_front() {
            Some(Ok(response)) => resolved_reply(response),
            Some(Err(error)) => failed_reply(error),
            None => resolved_reply(ServerResponse::ok()),
        }
    }
}

impl Clone for MockRequests {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Requests for MockRequests {
    fn get_meta(&mut self, topic: &str, query: MetaQuery) -> PendingReply {
        self.record(OutboundRequest::GetMeta {
            topic: topic.to_string(),
            query,
        })
    }

    fn set_subscription(&mut self, topic: &str, update: SubscriptionUpdate) -> PendingReply {
        self.record(OutboundRequest::SetSubscription {
            topic: topic.to_string(),
            update,
        })
    }
}
