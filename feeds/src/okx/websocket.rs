//! OKX websocket feed: subscription handshake, frame decoding, receive loop

use crate::adapter::{FeedConfig, FeedState};
use crate::error::FeedError;
use crate::event::{BookAction, BookEvent};
use common::{InstrumentId, PriceLevel, Ts};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use lob::OrderBook;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Subscription request sent right after the transport opens
#[derive(Debug, Serialize)]
struct SubscribeRequest {
    op: &'static str,
    args: Vec<SubscribeArg>,
}

#[derive(Debug, Serialize)]
struct SubscribeArg {
    channel: String,
    #[serde(rename = "instId")]
    inst_id: String,
}

/// Raw inbound frame before classification
///
/// Control frames (subscribe acks, errors) carry `event` and no `data`;
/// book frames carry `action` and a `data` array.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    action: Option<String>,
    event: Option<String>,
    #[serde(default)]
    data: Vec<BookPayload>,
}

#[derive(Debug, Deserialize)]
struct BookPayload {
    #[serde(default)]
    bids: Vec<Vec<String>>,
    #[serde(default)]
    asks: Vec<Vec<String>>,
    ts: Option<String>,
}

/// Decode a text frame into a typed event
///
/// Returns `Ok(None)` for keepalive/ack frames carrying no payload.
///
/// # Errors
///
/// Returns [`FeedError::Decode`] when the frame is not valid JSON, a level
/// is missing its price or size, or a numeric field fails to parse.
pub fn decode_frame(text: &str) -> Result<Option<BookEvent>, FeedError> {
    let frame: InboundFrame = serde_json::from_str(text)
        .map_err(|e| FeedError::Decode(format!("malformed frame: {e}")))?;

    let action = BookAction::classify(frame.action.as_deref().or(frame.event.as_deref()));

    // Payload-free frames are keepalives or acks, not errors.
    let Some(payload) = frame.data.into_iter().next() else {
        return Ok(None);
    };

    let ts_raw = payload
        .ts
        .ok_or_else(|| FeedError::Decode("payload missing ts".to_owned()))?;
    let ts = ts_raw
        .parse::<u64>()
        .map(Ts::from_millis)
        .map_err(|_| FeedError::Decode(format!("malformed ts {ts_raw:?}")))?;

    Ok(Some(BookEvent {
        action,
        bids: decode_levels(&payload.bids)?,
        asks: decode_levels(&payload.asks)?,
        ts,
    }))
}

/// Decode raw `[price, size, ...]` string arrays, ignoring tail fields
fn decode_levels(raw: &[Vec<String>]) -> Result<Vec<PriceLevel>, FeedError> {
    raw.iter()
        .map(|entry| {
            let [price, size, ..] = entry.as_slice() else {
                return Err(FeedError::Decode(format!(
                    "level missing price/size: {entry:?}"
                )));
            };
            let price = price
                .parse()
                .map_err(|_| FeedError::Decode(format!("malformed price {price:?}")))?;
            let size = size
                .parse()
                .map_err(|_| FeedError::Decode(format!("malformed size {size:?}")))?;
            Ok(PriceLevel::new(price, size))
        })
        .collect()
}

/// Websocket feed maintaining one order book for one instrument
///
/// Decode, book mutation and handler dispatch run strictly sequentially in
/// one task; the only suspension points are transport sends and receives,
/// so the handler always observes a fully-applied book.
#[derive(Debug)]
pub struct OkxWebSocketFeed {
    config: FeedConfig,
    instrument: InstrumentId,
    book: OrderBook,
    state: FeedState,
    ws: Option<WsStream>,
}

impl OkxWebSocketFeed {
    /// Create a feed for one instrument
    #[must_use]
    pub fn new(config: FeedConfig, instrument: InstrumentId) -> Self {
        let book = OrderBook::with_depth(instrument.clone(), config.depth);
        Self {
            config,
            instrument,
            book,
            state: FeedState::Disconnected,
            ws: None,
        }
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn state(&self) -> FeedState {
        self.state
    }

    /// The maintained order book
    #[must_use]
    pub const fn book(&self) -> &OrderBook {
        &self.book
    }

    /// Open the transport and send the subscription request
    ///
    /// # Errors
    ///
    /// [`FeedError::Connect`] if the handshake fails, [`FeedError::Subscribe`]
    /// if the subscription request cannot be sent. Either failure is fatal to
    /// this attempt; no retry happens at this layer.
    pub async fn connect(&mut self) -> Result<(), FeedError> {
        self.state = FeedState::Connecting;
        let url = Url::parse(&self.config.ws_url).map_err(|e| {
            self.state = FeedState::Disconnected;
            FeedError::Connect(format!("invalid url {:?}: {e}", self.config.ws_url))
        })?;

        let request = SubscribeRequest {
            op: "subscribe",
            args: vec![SubscribeArg {
                channel: self.config.channel.clone(),
                inst_id: self.instrument.to_string(),
            }],
        };
        let text = serde_json::to_string(&request).map_err(|e| {
            self.state = FeedState::Disconnected;
            FeedError::Subscribe(e.to_string())
        })?;

        let (mut ws, response) = match connect_async(url.as_str()).await {
            Ok(connected) => connected,
            Err(e) => {
                self.state = FeedState::Disconnected;
                return Err(FeedError::Connect(e.to_string()));
            }
        };
        debug!(status = %response.status(), "websocket handshake complete");

        if let Err(e) = ws.send(Message::Text(text)).await {
            self.state = FeedState::Disconnected;
            return Err(FeedError::Subscribe(e.to_string()));
        }

        self.ws = Some(ws);
        self.state = FeedState::Subscribed;
        info!(
            feed = %self.config.name,
            instrument = %self.instrument,
            channel = %self.config.channel,
            "subscribed"
        );
        Ok(())
    }

    /// Release the transport without running
    pub async fn disconnect(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            ws.close(None).await.ok();
        }
        self.state = FeedState::Disconnected;
    }

    /// Apply a decoded event to the book
    ///
    /// # Errors
    ///
    /// Propagates the book's data-integrity fault for negative sizes.
    pub fn apply_message(&mut self, event: &BookEvent) -> Result<(), FeedError> {
        apply_event(&mut self.book, event)?;
        Ok(())
    }

    /// Receive frames, apply them, and invoke the handler per applied frame
    ///
    /// Runs until end-of-stream (server close or transport error), a decode
    /// fault, a handler fault, or a missed liveness deadline. Whatever the
    /// exit path, the transport is closed and the state returns to
    /// [`FeedState::Disconnected`].
    ///
    /// Returns the number of applied frames on clean end-of-stream.
    ///
    /// # Errors
    ///
    /// [`FeedError::NotConnected`] without a prior `connect`;
    /// [`FeedError::Decode`], [`FeedError::Book`], [`FeedError::Handler`] and
    /// [`FeedError::Stale`] as documented on each.
    pub async fn run<F>(&mut self, handler: &mut F) -> Result<u64, FeedError>
    where
        F: FnMut(&OrderBook, &BookEvent) -> anyhow::Result<()>,
    {
        let ws = self.ws.take().ok_or(FeedError::NotConnected)?;
        self.state = FeedState::Streaming;
        let (mut write, mut read) = ws.split();

        let result =
            Self::stream_loop(&mut write, &mut read, &mut self.book, &self.config, handler).await;

        self.state = match result {
            Ok(_) => FeedState::Closing,
            Err(_) => FeedState::Faulted,
        };
        write.close().await.ok();
        self.state = FeedState::Disconnected;
        result
    }

    async fn stream_loop<F>(
        write: &mut SplitSink<WsStream, Message>,
        read: &mut SplitStream<WsStream>,
        book: &mut OrderBook,
        config: &FeedConfig,
        handler: &mut F,
    ) -> Result<u64, FeedError>
    where
        F: FnMut(&OrderBook, &BookEvent) -> anyhow::Result<()>,
    {
        let mut applied = 0_u64;
        let mut heartbeat = tokio::time::interval(config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        heartbeat.tick().await; // the first tick completes immediately

        // Liveness deadline anchored to the last received frame. Only a
        // frame from the server pushes it out; outbound pings do not.
        let mut deadline = tokio::time::Instant::now() + config.receive_timeout;

        loop {
            let frame = tokio::select! {
                _ = heartbeat.tick() => {
                    if write.send(Message::Ping(Vec::new())).await.is_err() {
                        warn!("ping send failed, ending stream");
                        return Ok(applied);
                    }
                    continue;
                }
                () = tokio::time::sleep_until(deadline) => {
                    return Err(FeedError::Stale {
                        timeout: config.receive_timeout,
                    });
                }
                received = read.next() => {
                    deadline = tokio::time::Instant::now() + config.receive_timeout;
                    match received {
                        None => return Ok(applied),
                        Some(Err(e)) => {
                            // Transport faults end the loop as end-of-stream;
                            // reconnecting is the caller's decision.
                            warn!(error = %e, "transport error, ending stream");
                            return Ok(applied);
                        }
                        Some(Ok(frame)) => frame,
                    }
                }
            };

            match frame {
                Message::Text(text) => {
                    let Some(event) = decode_frame(&text)? else {
                        debug!("keepalive/ack frame");
                        continue;
                    };
                    apply_event(book, &event)?;
                    applied += 1;
                    handler(book, &event).map_err(FeedError::Handler)?;
                }
                Message::Ping(payload) => {
                    if write.send(Message::Pong(payload)).await.is_err() {
                        warn!("pong send failed, ending stream");
                        return Ok(applied);
                    }
                }
                Message::Pong(_) => debug!("pong received"),
                Message::Close(_) => {
                    info!("websocket closed by server");
                    return Ok(applied);
                }
                _ => {}
            }
        }
    }
}

fn apply_event(book: &mut OrderBook, event: &BookEvent) -> Result<(), FeedError> {
    match event.action {
        BookAction::Snapshot => book.apply_snapshot(&event.bids, &event.asks, event.ts)?,
        BookAction::Update => book.apply_update(&event.bids, &event.asks, event.ts)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT_FRAME: &str = r#"{
        "arg": {"channel": "books-l2-tbt", "instId": "BTC-USDT"},
        "action": "snapshot",
        "data": [{
            "bids": [["100", "2", "0", "4"], ["99", "3", "0", "1"]],
            "asks": [["101", "1", "0", "2"], ["102", "4", "0", "1"]],
            "ts": "1597026383085"
        }]
    }"#;

    #[test]
    fn test_decode_snapshot_frame() {
        let event = decode_frame(SNAPSHOT_FRAME).unwrap().unwrap();

        assert_eq!(event.action, BookAction::Snapshot);
        assert_eq!(event.bids.len(), 2);
        assert_eq!(event.asks.len(), 2);
        assert_eq!(event.ts, Ts::from_millis(1_597_026_383_085));
        assert_eq!(event.bids[0].price.to_string(), "100");
        assert_eq!(event.bids[0].size.to_string(), "2");
    }

    #[test]
    fn test_decode_untagged_frame_defaults_to_update() {
        let event = decode_frame(
            r#"{"data": [{"bids": [["100", "1"]], "asks": [], "ts": "1"}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.action, BookAction::Update);
    }

    #[test]
    fn test_decode_ack_frame_is_noop() {
        let ack = r#"{"event": "subscribe", "arg": {"channel": "books-l2-tbt"}}"#;
        assert!(decode_frame(ack).unwrap().is_none());
    }

    #[test]
    fn test_decode_empty_data_is_noop() {
        assert!(decode_frame(r#"{"action": "update", "data": []}"#)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_decode_missing_size_is_fault() {
        let result = decode_frame(r#"{"data": [{"bids": [["100"]], "asks": [], "ts": "1"}]}"#);
        assert!(matches!(result, Err(FeedError::Decode(_))));
    }

    #[test]
    fn test_decode_malformed_price_is_fault() {
        let result =
            decode_frame(r#"{"data": [{"bids": [["abc", "1"]], "asks": [], "ts": "1"}]}"#);
        assert!(matches!(result, Err(FeedError::Decode(_))));
    }

    #[test]
    fn test_decode_non_json_is_fault() {
        assert!(matches!(decode_frame("pong"), Err(FeedError::Decode(_))));
    }

    #[test]
    fn test_decode_ignores_level_tail_fields() {
        let event = decode_frame(
            r#"{"data": [{"bids": [["100", "1", "junk", "5", "6"]], "asks": [], "ts": "1"}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(event.bids[0].size.to_string(), "1");
    }

    #[test]
    fn test_apply_message_snapshot_then_update() {
        let mut feed =
            OkxWebSocketFeed::new(FeedConfig::default(), InstrumentId::from("BTC-USDT"));
        assert_eq!(feed.state(), FeedState::Disconnected);

        let snapshot = decode_frame(SNAPSHOT_FRAME).unwrap().unwrap();
        feed.apply_message(&snapshot).unwrap();
        assert_eq!(feed.book().best_bid().unwrap().price.to_string(), "100");

        let removal = decode_frame(
            r#"{"action": "update", "data": [{"bids": [["100", "0"]], "asks": [], "ts": "1597026383100"}]}"#,
        )
        .unwrap()
        .unwrap();
        feed.apply_message(&removal).unwrap();
        assert_eq!(feed.book().best_bid().unwrap().price.to_string(), "99");
        assert_eq!(feed.book().ts, Ts::from_millis(1_597_026_383_100));
    }

    #[test]
    fn test_apply_message_rejects_negative_size() {
        let mut feed =
            OkxWebSocketFeed::new(FeedConfig::default(), InstrumentId::from("BTC-USDT"));
        let event = decode_frame(
            r#"{"data": [{"bids": [["100", "-2"]], "asks": [], "ts": "1"}]}"#,
        )
        .unwrap()
        .unwrap();

        assert!(matches!(
            feed.apply_message(&event),
            Err(FeedError::Book(_))
        ));
    }

    #[tokio::test]
    async fn test_run_without_connect_fails() {
        let mut feed =
            OkxWebSocketFeed::new(FeedConfig::default(), InstrumentId::from("BTC-USDT"));
        let mut handler = |_: &OrderBook, _: &BookEvent| Ok(());

        assert!(matches!(
            feed.run(&mut handler).await,
            Err(FeedError::NotConnected)
        ));
        assert_eq!(feed.state(), FeedState::Disconnected);
    }

    #[test]
    fn test_subscribe_request_shape() {
        let request = SubscribeRequest {
            op: "subscribe",
            args: vec![SubscribeArg {
                channel: "books-l2-tbt".to_owned(),
                inst_id: "BTC-USDT".to_owned(),
            }],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"op":"subscribe","args":[{"channel":"books-l2-tbt","instId":"BTC-USDT"}]}"#
        );
    }
}
