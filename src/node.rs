//! Registry entry for a single connected reporting node.
//!
//! A `NodeRecord` holds the node's identity, its latest rolling figures as
//! reported over the wire, the timestamp of its last inbound message, and a
//! bounded map of per-block phase timings used by the derivation engine.

use std::collections::BTreeMap;

use crate::types::{BlockNumber, BlockPhases, NodeId, NodeStats, NodeSummary, Timestamp};

/// State kept for one connected node.
///
/// Records are created on connect and destroyed on disconnect or timeout;
/// a node that reconnects gets a fresh record (and may restart at a lower
/// height). While the record lives its height never decreases.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    id: NodeId,
    name: String,
    height: BlockNumber,
    block_time: f64,
    average: f64,
    latency: f64,
    stats: NodeStats,
    last_seen: Timestamp,
    block_metrics: BTreeMap<BlockNumber, BlockPhases>,
}

impl NodeRecord {
    pub fn new(id: NodeId, name: impl Into<String>, connected_at: Timestamp) -> Self {
        NodeRecord {
            id,
            name: name.into(),
            height: 0,
            block_time: 0.0,
            average: 0.0,
            latency: 0.0,
            stats: NodeStats::default(),
            last_seen: connected_at,
            block_metrics: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn height(&self) -> BlockNumber {
        self.height
    }

    pub fn block_time(&self) -> f64 {
        self.block_time
    }

    pub fn average(&self) -> f64 {
        self.average
    }

    pub fn latency(&self) -> f64 {
        self.latency
    }

    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    pub fn block_metrics(&self) -> &BTreeMap<BlockNumber, BlockPhases> {
        &self.block_metrics
    }

    /// Record an inbound message at the given timestamp.
    pub fn observe(&mut self, at: Timestamp) {
        self.last_seen = at;
    }

    /// Apply a block report: raise the node's height if the report is ahead
    /// of it, carry over the rolling figures, and store the phase sample.
    ///
    /// The sample is keyed by block number, so a later report for the same
    /// block replaces the node's earlier sample (a node refines its own
    /// timings, e.g. when the import phase lands after the sync phase was
    /// first reported). The map is trimmed to `history_depth` entries,
    /// dropping the lowest block numbers first.
    pub fn apply_block(
        &mut self,
        block_number: BlockNumber,
        phases: BlockPhases,
        block_time: f64,
        average: f64,
        latency: f64,
        history_depth: usize,
    ) {
        if block_number > self.height {
            self.height = block_number;
        }
        self.block_time = block_time;
        self.average = average;
        self.latency = latency;

        self.block_metrics.insert(block_number, phases);
        while self.block_metrics.len() > history_depth {
            self.block_metrics.pop_first();
        }
    }

    /// Replace the node's rolling counters.
    pub fn apply_stats(&mut self, stats: NodeStats) {
        self.stats = stats;
    }

    /// True when the node has not been heard from within `threshold_ms`
    /// of `now`.
    pub fn is_stale(&self, now: Timestamp, threshold_ms: f64) -> bool {
        now - self.last_seen > threshold_ms
    }

    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            id: self.id,
            name: self.name.clone(),
            height: self.height,
            block_time: self.block_time,
            average: self.average,
            latency: self.latency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observed() -> BlockPhases {
        BlockPhases::Observed {
            sync: None,
            import: None,
        }
    }

    #[test]
    fn test_height_never_decreases_while_live() {
        let mut node = NodeRecord::new(1, "alpha", 0.0);
        node.apply_block(5, observed(), 1000.0, 1000.0, 40.0, 128);
        assert_eq!(node.height(), 5);

        // An out-of-order report for an older block keeps the watermark
        node.apply_block(3, observed(), 1100.0, 1050.0, 40.0, 128);
        assert_eq!(node.height(), 5);
        assert_eq!(node.block_metrics().len(), 2);
    }

    #[test]
    fn test_block_history_prunes_oldest_first() {
        let mut node = NodeRecord::new(1, "alpha", 0.0);
        for block in 1..=10 {
            node.apply_block(block, observed(), 0.0, 0.0, 0.0, 4);
        }
        assert_eq!(node.block_metrics().len(), 4);
        let retained: Vec<BlockNumber> = node.block_metrics().keys().copied().collect();
        assert_eq!(retained, vec![7, 8, 9, 10]);
    }

    #[test]
    fn test_same_block_resample_replaces() {
        let mut node = NodeRecord::new(1, "alpha", 0.0);
        node.apply_block(7, observed(), 0.0, 0.0, 0.0, 128);
        let refined = BlockPhases::Proposed { duration: 12.0 };
        node.apply_block(7, refined, 0.0, 0.0, 0.0, 128);
        assert_eq!(node.block_metrics().len(), 1);
        assert_eq!(node.block_metrics()[&7], refined);
    }

    #[test]
    fn test_staleness_threshold() {
        let mut node = NodeRecord::new(1, "alpha", 1_000.0);
        assert!(!node.is_stale(60_000.0, 60_000.0));
        assert!(node.is_stale(61_001.0, 60_000.0));

        node.observe(61_000.0);
        assert!(!node.is_stale(61_001.0, 60_000.0));
    }
}
