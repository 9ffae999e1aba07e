//! Live OKX order-book feed with per-tick feature logging
//!
//! Connects to the OKX public websocket, maintains the book, and logs
//! top-of-book, checksum, event latency and microstructure features for
//! every applied frame. Reconnects are driven here, outside the adapter.

use clap::Parser;
use common::InstrumentId;
use feeds::{run_with_reconnect, FeedConfig, OkxWebSocketFeed, ReconnectPolicy};
use lob::FeatureEngine;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "okx-live", about = "Stream an OKX L2 order book and derive features")]
struct Args {
    /// Instrument to subscribe to
    #[arg(long, default_value = "BTC-USDT")]
    instrument: String,

    /// Order book channel
    #[arg(long, default_value = "books-l2-tbt")]
    channel: String,

    /// Websocket endpoint
    #[arg(long, default_value = "wss://ws.okx.com:8443/ws/v5/public")]
    ws_url: String,

    /// Book view depth
    #[arg(long, default_value_t = 400)]
    book_depth: usize,

    /// Feature window depth
    #[arg(long, default_value_t = 25)]
    feature_depth: usize,

    /// Checksum depth
    #[arg(long, default_value_t = 25)]
    checksum_depth: usize,

    /// Seconds between client pings
    #[arg(long, default_value_t = 20)]
    heartbeat_secs: u64,

    /// Liveness deadline for inbound frames, in seconds
    #[arg(long, default_value_t = 60)]
    receive_timeout_secs: u64,

    /// Consecutive failed attempts tolerated before giving up
    #[arg(long, default_value_t = 5)]
    max_reconnects: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = FeedConfig {
        name: "okx".to_owned(),
        ws_url: args.ws_url.clone(),
        channel: args.channel.clone(),
        depth: args.book_depth,
        heartbeat_interval: Duration::from_secs(args.heartbeat_secs),
        receive_timeout: Duration::from_secs(args.receive_timeout_secs),
    };
    let policy = ReconnectPolicy {
        max_attempts: args.max_reconnects,
        ..ReconnectPolicy::default()
    };

    info!(
        instrument = %args.instrument,
        channel = %args.channel,
        "starting live order-book feed"
    );

    let mut feed = OkxWebSocketFeed::new(config, InstrumentId::from(args.instrument.as_str()));
    let mut features = FeatureEngine::new(args.feature_depth);

    run_with_reconnect(&mut feed, &policy, |book, event| {
        let (bids, asks) = book.top_levels(args.feature_depth);
        let snap = features.compute(&bids, &asks);

        info!(
            action = ?event.action,
            latency_ms = event.latency_ms(),
            checksum = book.checksum(args.checksum_depth),
            ofi = %snap.ofi,
            wmp = %snap.wmp,
            vacuum = %snap.liquidity_vacuum,
            bid_pressure = %snap.bid_pressure,
            ask_pressure = %snap.ask_pressure,
            "tick"
        );
        if let (Some(bid), Some(ask)) = (book.best_bid(), book.best_ask()) {
            debug!(
                bid = %bid.price,
                bid_size = %bid.size,
                ask = %ask.price,
                ask_size = %ask.size,
                "top of book"
            );
        }
        Ok(())
    })
    .await?;

    Ok(())
}
