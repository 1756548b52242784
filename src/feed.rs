//! Broadcast messages and the subscriber send capability.
//!
//! Feeds are display clients subscribed to the aggregator's view of the
//! network. The aggregator only ever sees a feed as a `FeedSink`: a
//! fire-and-forget `send` that must never block event processing. The
//! transport side owns the real connection; `ChannelSink` is the in-process
//! implementation used by the replay harness and tests.

use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};

use crate::types::{BlockNumber, NodeId, NodeSummary};

/// A message delivered to every subscribed feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "snake_case")]
pub enum FeedMessage {
    /// The network-wide best block moved to a new height.
    BestBlock { height: BlockNumber },
    /// A node joined the registry (also sent per node during snapshot).
    NodeAdded { node: NodeSummary },
    /// A node left the registry, voluntarily or via the timeout sweep.
    NodeRemoved { id: NodeId },
    /// A node imported a block; carries its updated rolling figures.
    NodeImported {
        id: NodeId,
        height: BlockNumber,
        block_time: f64,
        average: f64,
        latency: f64,
    },
    /// A node reported fresh counters.
    NodeStats { id: NodeId, peers: u64, txcount: u64 },
}

/// Send capability handed to the aggregator for one feed.
///
/// Implementations must not block: the aggregator calls `send` synchronously
/// while holding the registry, and a slow subscriber must never stall event
/// processing for everyone else.
pub trait FeedSink {
    fn send(&mut self, message: &FeedMessage);
}

/// `FeedSink` backed by an in-process channel.
///
/// The receiving half buffers everything sent to the feed; a dropped
/// receiver simply discards further messages, matching a subscriber that
/// went away mid-broadcast.
pub struct ChannelSink {
    tx: Sender<FeedMessage>,
}

impl ChannelSink {
    /// Create a sink and the receiver that collects its messages.
    pub fn new() -> (ChannelSink, Receiver<FeedMessage>) {
        let (tx, rx) = mpsc::channel();
        (ChannelSink { tx }, rx)
    }
}

impl FeedSink for ChannelSink {
    fn send(&mut self, message: &FeedMessage) {
        // The receiver hanging up is not an error worth surfacing per-message.
        let _ = self.tx.send(message.clone());
    }
}

/// Sequence of messages observed by one feed, in delivery order.
pub fn drain(rx: &Receiver<FeedMessage>) -> Vec<FeedMessage> {
    rx.try_iter().collect()
}
