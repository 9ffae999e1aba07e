//! Error types for feed operations

use lob::BookError;
use std::time::Duration;
use thiserror::Error;

/// Faults terminating a connect attempt or a stream run
///
/// A transport-level receive error is deliberately *not* represented here:
/// the receive loop surfaces it as end-of-stream and lets the caller decide
/// whether to reconnect.
#[derive(Debug, Error)]
pub enum FeedError {
    /// `run` was called without a prior successful `connect`
    #[error("not connected")]
    NotConnected,

    /// Opening the transport failed; fatal to this attempt
    #[error("connect failed: {0}")]
    Connect(String),

    /// Sending the subscription request failed
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// A frame or level was missing required fields or carried malformed
    /// values; fatal to the current run
    #[error("decode fault: {0}")]
    Decode(String),

    /// No frame arrived within the liveness deadline
    #[error("no frame received within {timeout:?}")]
    Stale {
        /// The deadline that was missed
        timeout: Duration,
    },

    /// Data-integrity fault propagated from the book
    #[error("book fault: {0}")]
    Book(#[from] BookError),

    /// The downstream handler returned an error
    #[error("handler fault: {0}")]
    Handler(anyhow::Error),

    /// The reconnect policy ran out of attempts
    #[error("gave up after {attempts} consecutive failed attempts")]
    RetriesExhausted {
        /// Consecutive failures observed
        attempts: u32,
    },
}
