//! Error types for Tattle.

use thiserror::Error;

/// Errors from parsing or updating access masks.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MaskError {
    /// A permission letter outside the `JRWPASDO` alphabet.
    #[error("invalid permission letter: {0:?}")]
    InvalidLetter(char),
}

/// Errors surfaced through the deferred result of an outbound request.
///
/// These never propagate from the event routers; they only appear when
/// the caller awaits the reply of a request it issued.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// The request channel was closed before the request was sent.
    #[error("request channel closed")]
    ChannelClosed,

    /// The server rejected the request.
    #[error("rejected by server: {code} {text}")]
    Rejected {
        /// HTTP-style status code.
        code: u16,
        /// Human-readable explanation.
        text: String,
    },

    /// No response arrived in time.
    #[error("request timed out")]
    Timeout,
}
