//! OKX v5 public websocket connectivity

pub mod websocket;

pub use websocket::OkxWebSocketFeed;
