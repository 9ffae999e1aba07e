//! Feed configuration and connection lifecycle state

use std::time::Duration;

/// Configuration for one feed connection
///
/// Every field is consumed by the adapter; reconnect parameters live in
/// [`crate::reconnect::ReconnectPolicy`], owned by the caller.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Feed name used in logs
    pub name: String,
    /// Websocket endpoint
    pub ws_url: String,
    /// Channel to subscribe to (e.g. `books-l2-tbt`)
    pub channel: String,
    /// Book view depth retained by the order book
    pub depth: usize,
    /// Interval between client pings
    pub heartbeat_interval: Duration,
    /// Liveness deadline for the next inbound frame
    pub receive_timeout: Duration,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            name: "okx".to_owned(),
            ws_url: "wss://ws.okx.com:8443/ws/v5/public".to_owned(),
            channel: "books-l2-tbt".to_owned(),
            depth: 400,
            heartbeat_interval: Duration::from_secs(20),
            receive_timeout: Duration::from_secs(60),
        }
    }
}

/// Connection lifecycle state
///
/// `Disconnected → Connecting → Subscribed → Streaming → {Closing, Faulted}
/// → Disconnected`. `Closing` and `Faulted` are transient: every exit path
/// ends back at `Disconnected` with the transport released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// No transport held
    Disconnected,
    /// Transport handshake in progress
    Connecting,
    /// Subscription request sent, not yet streaming
    Subscribed,
    /// Receive loop running
    Streaming,
    /// Clean shutdown in progress
    Closing,
    /// Shutting down after a fault
    Faulted,
}
