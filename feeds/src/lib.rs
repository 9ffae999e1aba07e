//! Streaming adapter for the OKX level-2 order-book feed
//!
//! Organized structure:
//! - okx/: websocket connectivity, subscription handshake, frame decoding
//! - adapter: feed configuration and connection state
//! - event: typed inbound events
//! - reconnect: caller-side reconnect policy around connect/run cycles

pub mod adapter;
pub mod error;
pub mod event;
pub mod okx;
pub mod reconnect;

pub use adapter::{FeedConfig, FeedState};
pub use error::FeedError;
pub use event::{BookAction, BookEvent};
pub use okx::websocket::{decode_frame, OkxWebSocketFeed};
pub use reconnect::{run_with_reconnect, ReconnectPolicy};
