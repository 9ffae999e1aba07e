//! Typed inbound events decoded from raw frames

use common::{PriceLevel, Ts};
use serde::Serialize;

/// How an event mutates the book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BookAction {
    /// Full replace of both sides
    Snapshot,
    /// Incremental upsert/delete
    Update,
}

impl BookAction {
    /// Classify a raw action/event tag
    ///
    /// Anything that is not exactly `"snapshot"` (unknown tags and missing
    /// tags included) is an update.
    #[must_use]
    pub fn classify(tag: Option<&str>) -> Self {
        match tag {
            Some("snapshot") => Self::Snapshot,
            _ => Self::Update,
        }
    }
}

/// One decoded order-book event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookEvent {
    /// Snapshot or update
    pub action: BookAction,
    /// Decoded bid levels
    pub bids: Vec<PriceLevel>,
    /// Decoded ask levels
    pub asks: Vec<PriceLevel>,
    /// Exchange event timestamp, epoch milliseconds
    pub ts: Ts,
}

impl BookEvent {
    /// Wall-clock age of this event in milliseconds
    ///
    /// Saturates to 0 under clock skew.
    #[must_use]
    pub fn latency_ms(&self) -> u64 {
        self.ts.elapsed_ms(Ts::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_snapshot() {
        assert_eq!(BookAction::classify(Some("snapshot")), BookAction::Snapshot);
    }

    #[test]
    fn test_classify_defaults_to_update() {
        assert_eq!(BookAction::classify(Some("update")), BookAction::Update);
        assert_eq!(BookAction::classify(Some("subscribe")), BookAction::Update);
        assert_eq!(BookAction::classify(Some("")), BookAction::Update);
        assert_eq!(BookAction::classify(None), BookAction::Update);
    }

    #[test]
    fn test_latency_saturates_for_future_timestamps() {
        let event = BookEvent {
            action: BookAction::Update,
            bids: Vec::new(),
            asks: Vec::new(),
            ts: Ts::from_millis(u64::MAX),
        };
        assert_eq!(event.latency_ms(), 0);
    }
}
