//! Core data types for the telemetry registry and derived series.

use serde::{Deserialize, Serialize};

/// Identifier assigned to a reporting node at connect time.
///
/// The connection layer guarantees uniqueness among live nodes; an id is
/// never reused while its node is connected.
pub type NodeId = u64;

/// Identifier assigned to a display subscriber at connect time.
pub type FeedId = u64;

/// Block height reported by a node.
pub type BlockNumber = u64;

/// Telemetry timestamp in milliseconds. Delays derived from timestamps may
/// be negative when a node's local clock runs ahead of the network.
pub type Timestamp = f64;

/// Raw timing for one phase of block processing, as reported by a node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseInterval {
    pub start_timestamp: Timestamp,
    pub end_timestamp: Timestamp,
    pub duration: f64,
}

/// Per-block phase timings reported by a single node.
///
/// A node either authored the block itself (`Proposed`) or received it from
/// the network (`Observed`). Propagation delay is undefined for the author,
/// so the proposal variant carries no sync/import detail. An observed block
/// may be missing either phase when the node has not measured it yet; absent
/// means "not measured", not "instantaneous".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockPhases {
    Proposed {
        duration: f64,
    },
    Observed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sync: Option<PhaseInterval>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        import: Option<PhaseInterval>,
    },
}

impl BlockPhases {
    /// True when the node authored the block itself.
    pub fn is_proposal(&self) -> bool {
        matches!(self, BlockPhases::Proposed { .. })
    }
}

/// Rolling counters carried by a stats report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    pub peers: u64,
    pub txcount: u64,
}

/// Snapshot of a node's identity and headline figures, as broadcast to
/// feeds in `NodeAdded` messages and embedded in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSummary {
    pub id: NodeId,
    pub name: String,
    pub height: BlockNumber,
    pub block_time: f64,
    pub average: f64,
    pub latency: f64,
}

/// One block report from a node: the block it now considers best, when it
/// first held it, the phase timings, and the node's externally-computed
/// rolling figures. The aggregator treats the rolling figures as opaque.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReport {
    pub block_number: BlockNumber,
    pub timestamp: Timestamp,
    pub phases: BlockPhases,
    pub block_time: f64,
    pub average: f64,
    pub latency: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_phases_tagged_serialization() {
        let proposed = BlockPhases::Proposed { duration: 30.0 };
        let json = serde_json::to_string(&proposed).unwrap();
        assert!(json.contains("\"kind\":\"proposed\""));

        let observed = BlockPhases::Observed {
            sync: Some(PhaseInterval {
                start_timestamp: 100.0,
                end_timestamp: 140.0,
                duration: 40.0,
            }),
            import: None,
        };
        let json = serde_json::to_string(&observed).unwrap();
        assert!(json.contains("\"kind\":\"observed\""));
        // Absent phases are omitted entirely rather than serialized as null
        assert!(!json.contains("import"));

        let back: BlockPhases = serde_json::from_str(&json).unwrap();
        assert_eq!(back, observed);
    }

    #[test]
    fn test_observed_defaults_missing_phases() {
        let back: BlockPhases = serde_json::from_str(r#"{"kind":"observed"}"#).unwrap();
        assert_eq!(
            back,
            BlockPhases::Observed {
                sync: None,
                import: None
            }
        );
        assert!(!back.is_proposal());
    }
}
