//! Offline replay of captured event streams.
//!
//! Replays a recorded [`TelemetryEvent`] sequence through a fresh
//! [`Aggregator`], standing in for the live connection layer. Events are
//! applied strictly in capture order through the single-writer core, so the
//! broadcast stream each feed records is exactly what the live system would
//! have delivered. Registry rejections (duplicate connects, reports from
//! unknown ids) are logged with their event index and skipped, so a corrupt
//! capture yields a partial report instead of no report.

use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;

use log::{debug, warn};

use crate::aggregator::Aggregator;
use crate::config::AggregatorConfig;
use crate::events::TelemetryEvent;
use crate::feed::{drain, ChannelSink, FeedMessage};
use crate::types::{BlockReport, FeedId, NodeId, NodeStats};

/// Everything a replay run produced: the final registry state, the full
/// message transcript per feed (including feeds that disconnected mid-run),
/// and counters for the run summary.
pub struct ReplayOutcome {
    pub aggregator: Aggregator,
    pub transcripts: BTreeMap<FeedId, Vec<FeedMessage>>,
    pub events_applied: usize,
    pub events_rejected: usize,
    pub swept: Vec<NodeId>,
}

/// Replay `events` through a fresh aggregator built from `config`.
pub fn replay(config: AggregatorConfig, events: &[TelemetryEvent]) -> ReplayOutcome {
    let mut aggregator = Aggregator::new(config);
    let mut receivers: BTreeMap<FeedId, Receiver<FeedMessage>> = BTreeMap::new();
    let mut events_applied = 0;
    let mut events_rejected = 0;
    let mut swept = Vec::new();

    for (index, event) in events.iter().enumerate() {
        let result = match event {
            TelemetryEvent::NodeConnected {
                id,
                name,
                timestamp,
            } => aggregator.add_node(*id, name.clone(), *timestamp),
            TelemetryEvent::NodeDisconnected { id, .. } => {
                aggregator.remove_node(*id).map(|_| ())
            }
            TelemetryEvent::BlockReport {
                id,
                block_number,
                timestamp,
                phases,
                block_time,
                average,
                latency,
            } => aggregator.block_report(
                *id,
                BlockReport {
                    block_number: *block_number,
                    timestamp: *timestamp,
                    phases: *phases,
                    block_time: *block_time,
                    average: *average,
                    latency: *latency,
                },
            ),
            TelemetryEvent::StatsReport {
                id,
                peers,
                txcount,
                timestamp,
            } => aggregator.stats_report(
                *id,
                NodeStats {
                    peers: *peers,
                    txcount: *txcount,
                },
                *timestamp,
            ),
            TelemetryEvent::FeedConnected { id, timestamp } => {
                debug!("feed {} connecting at {}", id, timestamp);
                let (sink, rx) = ChannelSink::new();
                match aggregator.add_feed(*id, Box::new(sink)) {
                    Ok(()) => {
                        receivers.insert(*id, rx);
                        Ok(())
                    }
                    Err(err) => Err(err),
                }
            }
            TelemetryEvent::FeedDisconnected { id, .. } => aggregator.remove_feed(*id),
            TelemetryEvent::Tick { timestamp } => {
                swept.extend(aggregator.timeout_sweep(*timestamp));
                Ok(())
            }
        };

        match result {
            Ok(()) => events_applied += 1,
            Err(rejection) => {
                warn!("event {} rejected: {}", index + 1, rejection);
                events_rejected += 1;
            }
        }
    }

    let transcripts = receivers
        .iter()
        .map(|(&id, rx)| (id, drain(rx)))
        .collect();

    ReplayOutcome {
        aggregator,
        transcripts,
        events_applied,
        events_rejected,
        swept,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockPhases;

    fn block_report(id: NodeId, block_number: u64, timestamp: f64) -> TelemetryEvent {
        TelemetryEvent::BlockReport {
            id,
            block_number,
            timestamp,
            phases: BlockPhases::Proposed { duration: 20.0 },
            block_time: 6000.0,
            average: 6000.0,
            latency: 40.0,
        }
    }

    #[test]
    fn test_replay_records_feed_transcripts() {
        let events = vec![
            TelemetryEvent::NodeConnected {
                id: 1,
                name: "alpha".into(),
                timestamp: 0.0,
            },
            TelemetryEvent::FeedConnected {
                id: 1,
                timestamp: 10.0,
            },
            block_report(1, 5, 100.0),
        ];

        let outcome = replay(AggregatorConfig::default(), &events);
        assert_eq!(outcome.events_applied, 3);
        assert_eq!(outcome.events_rejected, 0);

        let transcript = &outcome.transcripts[&1];
        // Snapshot (height, one node) then the live block report
        assert_eq!(transcript[0], FeedMessage::BestBlock { height: 0 });
        assert!(matches!(&transcript[1], FeedMessage::NodeAdded { node } if node.id == 1));
        assert_eq!(transcript[2], FeedMessage::BestBlock { height: 5 });
        assert!(matches!(
            transcript[3],
            FeedMessage::NodeImported { id: 1, height: 5, .. }
        ));
    }

    #[test]
    fn test_replay_skips_rejected_events() {
        let events = vec![
            TelemetryEvent::NodeConnected {
                id: 1,
                name: "alpha".into(),
                timestamp: 0.0,
            },
            // Duplicate connect and a report from a never-connected node
            TelemetryEvent::NodeConnected {
                id: 1,
                name: "alpha-again".into(),
                timestamp: 1.0,
            },
            block_report(9, 5, 100.0),
            block_report(1, 5, 100.0),
        ];

        let outcome = replay(AggregatorConfig::default(), &events);
        assert_eq!(outcome.events_applied, 2);
        assert_eq!(outcome.events_rejected, 2);
        assert_eq!(outcome.aggregator.height(), 5);
        // The surviving record is the original, not the duplicate
        assert_eq!(outcome.aggregator.node(1).unwrap().name(), "alpha");
    }

    #[test]
    fn test_replay_tick_drives_sweep() {
        let events = vec![
            TelemetryEvent::NodeConnected {
                id: 1,
                name: "alpha".into(),
                timestamp: 0.0,
            },
            TelemetryEvent::NodeConnected {
                id: 2,
                name: "beta".into(),
                timestamp: 0.0,
            },
            block_report(2, 1, 55_000.0),
            TelemetryEvent::Tick {
                timestamp: 61_000.0,
            },
        ];

        let outcome = replay(AggregatorConfig::default(), &events);
        assert_eq!(outcome.swept, vec![1]);
        assert_eq!(outcome.aggregator.node_ids(), vec![2]);
    }

    #[test]
    fn test_disconnected_feed_transcript_survives() {
        let events = vec![
            TelemetryEvent::FeedConnected {
                id: 1,
                timestamp: 0.0,
            },
            TelemetryEvent::NodeConnected {
                id: 1,
                name: "alpha".into(),
                timestamp: 1.0,
            },
            TelemetryEvent::FeedDisconnected {
                id: 1,
                timestamp: 2.0,
            },
            block_report(1, 3, 100.0),
        ];

        let outcome = replay(AggregatorConfig::default(), &events);
        let transcript = &outcome.transcripts[&1];
        // Empty snapshot, then the add; nothing after the disconnect
        assert_eq!(transcript[0], FeedMessage::BestBlock { height: 0 });
        assert!(matches!(&transcript[1], FeedMessage::NodeAdded { node } if node.id == 1));
        assert_eq!(transcript.len(), 2);
    }
}
