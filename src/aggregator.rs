//! The aggregation registry.
//!
//! One `Aggregator` instance is the single authoritative owner of the
//! connected-node store, the subscriber store, the network-wide best-block
//! watermark, and the best-block-time table. Every mutation flows through
//! its methods from one logical thread of control; subscribers only ever
//! observe state changes as an ordered stream of [`FeedMessage`]s.
//!
//! The connection layer is responsible for identifier uniqueness and for
//! routing node/feed lifecycle events here. Malformed report content is
//! recovered locally (logged, sentinel-substituted) and never fatal;
//! identifier collisions and operations on unknown handles are rejected
//! back to the caller as [`RegistryError`]s.

use std::collections::BTreeMap;

use log::{info, warn};

use crate::config::AggregatorConfig;
use crate::feed::{FeedMessage, FeedSink};
use crate::metrics::{self, DelayPoint, DurationPoint};
use crate::node::NodeRecord;
use crate::types::{BlockNumber, BlockPhases, BlockReport, FeedId, NodeId, NodeStats, Timestamp};

/// Rejected registry operations.
///
/// These are programmer errors in the connection layer, not runtime
/// anomalies: the caller must guarantee identifier uniqueness and only
/// operate on handles it has successfully registered.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("node {0} is already registered")]
    NodeExists(NodeId),

    #[error("feed {0} is already registered")]
    FeedExists(FeedId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("unknown feed {0}")]
    UnknownFeed(FeedId),
}

/// Single-writer registry of nodes and feeds plus the global watermarks.
pub struct Aggregator {
    config: AggregatorConfig,
    nodes: BTreeMap<NodeId, NodeRecord>,
    feeds: BTreeMap<FeedId, Box<dyn FeedSink>>,
    height: BlockNumber,
    best_block_times: BTreeMap<BlockNumber, Timestamp>,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Aggregator {
            config,
            nodes: BTreeMap::new(),
            feeds: BTreeMap::new(),
            height: 0,
            best_block_times: BTreeMap::new(),
        }
    }

    /// Highest block number reported by any node over the aggregator's
    /// lifetime. Never decreases, even as nodes disconnect.
    pub fn height(&self) -> BlockNumber {
        self.height
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(&id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.keys().copied().collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn feed_count(&self) -> usize {
        self.feeds.len()
    }

    pub fn best_block_times(&self) -> &BTreeMap<BlockNumber, Timestamp> {
        &self.best_block_times
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Register a newly connected node and announce it to every feed.
    pub fn add_node(
        &mut self,
        id: NodeId,
        name: impl Into<String>,
        connected_at: Timestamp,
    ) -> Result<(), RegistryError> {
        if self.nodes.contains_key(&id) {
            return Err(RegistryError::NodeExists(id));
        }

        let record = NodeRecord::new(id, name, connected_at);
        info!("node {} ({}) connected", id, record.name());
        let added = FeedMessage::NodeAdded {
            node: record.summary(),
        };
        self.nodes.insert(id, record);
        self.broadcast(&added);
        Ok(())
    }

    /// Remove a node that disconnected voluntarily.
    ///
    /// The returned record is the caller's to drop; nothing referencing the
    /// node survives inside the aggregator, so no broadcast after this one
    /// will ever carry its id again unless it reconnects as a new record.
    pub fn remove_node(&mut self, id: NodeId) -> Result<NodeRecord, RegistryError> {
        let record = self
            .nodes
            .remove(&id)
            .ok_or(RegistryError::UnknownNode(id))?;
        info!("node {} ({}) disconnected", id, record.name());
        self.broadcast(&FeedMessage::NodeRemoved { id });
        Ok(record)
    }

    /// Register a display subscriber and send it the joining snapshot:
    /// the current best height first, then one `NodeAdded` per connected
    /// node. After the snapshot the feed is in the live delta stream, so
    /// it never misses state and never sees a node twice.
    pub fn add_feed(
        &mut self,
        id: FeedId,
        mut sink: Box<dyn FeedSink>,
    ) -> Result<(), RegistryError> {
        if self.feeds.contains_key(&id) {
            return Err(RegistryError::FeedExists(id));
        }

        sink.send(&FeedMessage::BestBlock {
            height: self.height,
        });
        for record in self.nodes.values() {
            sink.send(&FeedMessage::NodeAdded {
                node: record.summary(),
            });
        }

        info!("feed {} subscribed ({} nodes in snapshot)", id, self.nodes.len());
        self.feeds.insert(id, sink);
        Ok(())
    }

    /// Drop a subscriber. Pending deliveries to other feeds are unaffected.
    pub fn remove_feed(&mut self, id: FeedId) -> Result<(), RegistryError> {
        self.feeds
            .remove(&id)
            .map(|_| info!("feed {} unsubscribed", id))
            .ok_or(RegistryError::UnknownFeed(id))
    }

    /// Apply one block report from a node.
    ///
    /// Raises the global watermark (broadcasting `BestBlock` before anything
    /// else from this event) when the reported number is strictly greater,
    /// then always broadcasts `NodeImported` with the node's updated rolling
    /// figures. The first node to report a block sets its best time; later
    /// reports never overwrite it.
    pub fn block_report(&mut self, id: NodeId, report: BlockReport) -> Result<(), RegistryError> {
        let report = sanitize_report(id, report);

        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(RegistryError::UnknownNode(id))?;
        node.observe(report.timestamp);
        node.apply_block(
            report.block_number,
            report.phases,
            report.block_time,
            report.average,
            report.latency,
            self.config.block_history_depth,
        );

        let name = node.name().to_string();
        let imported = FeedMessage::NodeImported {
            id,
            height: node.height(),
            block_time: node.block_time(),
            average: node.average(),
            latency: node.latency(),
        };

        if report.block_number > self.height {
            self.height = report.block_number;
            info!("New block {}", self.height);
            self.broadcast(&FeedMessage::BestBlock {
                height: self.height,
            });
        }

        self.broadcast(&imported);
        info!(
            "{} imported {}, block time: {}s, average: {}s | latency {}",
            name,
            report.block_number,
            report.block_time / 1000.0,
            report.average / 1000.0,
            report.latency
        );

        self.best_block_times
            .entry(report.block_number)
            .or_insert(report.timestamp);
        while self.best_block_times.len() > self.config.best_time_depth {
            self.best_block_times.pop_first();
        }

        Ok(())
    }

    /// Apply a stats report and forward the fresh counters to every feed.
    /// Never affects the global height.
    pub fn stats_report(
        &mut self,
        id: NodeId,
        stats: NodeStats,
        at: Timestamp,
    ) -> Result<(), RegistryError> {
        let node = self
            .nodes
            .get_mut(&id)
            .ok_or(RegistryError::UnknownNode(id))?;
        node.observe(at);
        node.apply_stats(stats);

        self.broadcast(&FeedMessage::NodeStats {
            id,
            peers: stats.peers,
            txcount: stats.txcount,
        });
        Ok(())
    }

    /// Force out every node whose last message is older than the configured
    /// staleness threshold relative to `now`. Each swept node goes through
    /// the same removal path as a voluntary disconnect: exactly one
    /// `NodeRemoved` broadcast, full cleanup. Returns the swept ids.
    pub fn timeout_sweep(&mut self, now: Timestamp) -> Vec<NodeId> {
        let threshold_ms = self.config.staleness_threshold_ms();
        let stale: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|node| node.is_stale(now, threshold_ms))
            .map(|node| node.id())
            .collect();

        for &id in &stale {
            warn!("node {} timed out, forcing disconnect", id);
            // The id came out of the store above, so removal cannot fail.
            let _ = self.remove_node(id);
        }
        stale
    }

    /// Processing-duration series for one node, ascending by block number.
    pub fn duration_series(&self, id: NodeId) -> Result<Vec<DurationPoint>, RegistryError> {
        let node = self.nodes.get(&id).ok_or(RegistryError::UnknownNode(id))?;
        Ok(metrics::duration_series(node.block_metrics()))
    }

    /// Propagation-delay series for one node, ascending by block number.
    pub fn delay_series(&self, id: NodeId) -> Result<Vec<DelayPoint>, RegistryError> {
        let node = self.nodes.get(&id).ok_or(RegistryError::UnknownNode(id))?;
        Ok(metrics::delay_series(
            id,
            node.block_metrics(),
            &self.best_block_times,
        ))
    }

    /// Deliver a message to every live feed, in store order, synchronously
    /// with respect to the event being processed.
    fn broadcast(&mut self, message: &FeedMessage) {
        for sink in self.feeds.values_mut() {
            sink.send(message);
        }
    }
}

/// Replace malformed report content with zero sentinels.
///
/// Negative timestamps and inverted phase intervals come from nodes with
/// broken clocks or buggy instrumentation. They are not grounds to drop the
/// node; the offending values are zeroed and the anomaly logged.
fn sanitize_report(id: NodeId, mut report: BlockReport) -> BlockReport {
    if report.timestamp < 0.0 {
        warn!(
            "node {} block {}: negative report timestamp {}, substituting 0",
            id, report.block_number, report.timestamp
        );
        report.timestamp = 0.0;
    }

    report.phases = match report.phases {
        BlockPhases::Proposed { duration } if duration < 0.0 => {
            warn!(
                "node {} block {}: negative proposal duration {}, substituting 0",
                id, report.block_number, duration
            );
            BlockPhases::Proposed { duration: 0.0 }
        }
        BlockPhases::Observed { sync, import } => BlockPhases::Observed {
            sync: sync.map(|p| sanitize_interval(id, report.block_number, "sync", p)),
            import: import.map(|p| sanitize_interval(id, report.block_number, "import", p)),
        },
        well_formed => well_formed,
    };

    report
}

fn sanitize_interval(
    id: NodeId,
    block_number: BlockNumber,
    phase: &str,
    interval: crate::types::PhaseInterval,
) -> crate::types::PhaseInterval {
    let malformed = interval.start_timestamp < 0.0
        || interval.end_timestamp < interval.start_timestamp
        || interval.duration < 0.0;
    if malformed {
        warn!(
            "node {} block {}: malformed {} interval \
             (start {}, end {}, duration {}), substituting zeros",
            id,
            block_number,
            phase,
            interval.start_timestamp,
            interval.end_timestamp,
            interval.duration
        );
        crate::types::PhaseInterval {
            start_timestamp: 0.0,
            end_timestamp: 0.0,
            duration: 0.0,
        }
    } else {
        interval
    }
}
