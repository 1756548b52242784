//! Recorded telemetry event streams.
//!
//! The live connection layer hands the core pre-parsed events; this module
//! defines that event vocabulary and reads captured streams back from disk.
//! A capture file holds one JSON object per line, in arrival order. Order
//! is significant, since replaying the file must reproduce the broadcast
//! sequence the live system generated.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{BlockNumber, BlockPhases, FeedId, NodeId, Timestamp};

/// One pre-parsed event from the connection layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    NodeConnected {
        id: NodeId,
        name: String,
        timestamp: Timestamp,
    },
    NodeDisconnected {
        id: NodeId,
        timestamp: Timestamp,
    },
    BlockReport {
        id: NodeId,
        block_number: BlockNumber,
        timestamp: Timestamp,
        phases: BlockPhases,
        block_time: f64,
        average: f64,
        latency: f64,
    },
    StatsReport {
        id: NodeId,
        peers: u64,
        txcount: u64,
        timestamp: Timestamp,
    },
    FeedConnected {
        id: FeedId,
        timestamp: Timestamp,
    },
    FeedDisconnected {
        id: FeedId,
        timestamp: Timestamp,
    },
    /// Heartbeat tick driving the staleness sweep.
    Tick { timestamp: Timestamp },
}

/// Errors reading or decoding an event capture
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("failed to read event log: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed event on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// Read an event capture file (one JSON event per line, blank lines
/// ignored) preserving arrival order.
pub fn read_event_log(path: &Path) -> Result<Vec<TelemetryEvent>, EventError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut events = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| EventError::Decode {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}
