//! Derivation of chartable per-block series from raw phase timings.
//!
//! Two series are derived per node, both ordered by ascending block number:
//! processing durations (how long each phase took) and propagation delays
//! (how far behind the network-wide first sighting of a block the node's
//! phases ran). The functions here are pure: they read a node's phase
//! samples and the global best-block-time table and never mutate either.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::types::{BlockNumber, BlockPhases, NodeId, Timestamp};

/// Per-block processing durations for one node.
///
/// Absent phases stay `None` so charts render them as gaps; a phase that was
/// measured as instantaneous is `Some(0.0)`, which is a different statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationPoint {
    pub block_number: BlockNumber,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proposal_duration: Option<f64>,
    pub total_duration: f64,
}

/// Per-block propagation delays for one node, relative to the first time
/// any node reported the block as best.
///
/// Delays may be negative when the node's clock runs ahead of the node that
/// set the zero point; they are reported as measured, never clamped. An
/// `anomalous` point carries zero sentinels because the inputs needed to
/// compute it were missing, not because the delay was actually zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelayPoint {
    pub block_number: BlockNumber,
    pub sync_delay: f64,
    pub import_delay: f64,
    pub total_delay: f64,
    pub anomalous: bool,
}

impl DelayPoint {
    fn sentinel(block_number: BlockNumber, anomalous: bool) -> Self {
        DelayPoint {
            block_number,
            sync_delay: 0.0,
            import_delay: 0.0,
            total_delay: 0.0,
            anomalous,
        }
    }
}

/// Derive the processing-duration series from a node's phase samples.
///
/// Emits one point per reported block. The total sums whichever phases are
/// present, treating absent ones as contributing nothing.
pub fn duration_series(samples: &BTreeMap<BlockNumber, BlockPhases>) -> Vec<DurationPoint> {
    samples
        .iter()
        .map(|(&block_number, phases)| match *phases {
            BlockPhases::Proposed { duration } => DurationPoint {
                block_number,
                sync_duration: None,
                import_duration: None,
                proposal_duration: Some(duration),
                total_duration: duration,
            },
            BlockPhases::Observed { sync, import } => {
                let sync_duration = sync.map(|p| p.duration);
                let import_duration = import.map(|p| p.duration);
                DurationPoint {
                    block_number,
                    sync_duration,
                    import_duration,
                    proposal_duration: None,
                    total_duration: sync_duration.unwrap_or(0.0) + import_duration.unwrap_or(0.0),
                }
            }
        })
        .collect()
}

/// Derive the propagation-delay series from a node's phase samples and the
/// global best-block-time table.
///
/// For an observed block with both phases, delays are measured from the
/// block's first network-wide sighting to the start of sync, the start of
/// import, and the end of import. A proposed block gets zero delays: the
/// author never waited on propagation. The remaining cases are off-nominal
/// and yield a zero sentinel flagged `anomalous`: a best time the watermark
/// table never saw, or an observed block missing phase detail. Both are
/// logged so an operator notices the gap rather than reading a flat chart.
pub fn delay_series(
    node_id: NodeId,
    samples: &BTreeMap<BlockNumber, BlockPhases>,
    best_block_times: &BTreeMap<BlockNumber, Timestamp>,
) -> Vec<DelayPoint> {
    samples
        .iter()
        .map(|(&block_number, phases)| {
            let best = match best_block_times.get(&block_number) {
                Some(&best) => best,
                None => {
                    warn!(
                        "node {} block {}: no best-time entry, emitting anomalous zero delays",
                        node_id, block_number
                    );
                    return DelayPoint::sentinel(block_number, true);
                }
            };

            match *phases {
                BlockPhases::Proposed { .. } => DelayPoint::sentinel(block_number, false),
                BlockPhases::Observed {
                    sync: Some(sync),
                    import: Some(import),
                } => DelayPoint {
                    block_number,
                    sync_delay: sync.start_timestamp - best,
                    import_delay: import.start_timestamp - best,
                    total_delay: import.end_timestamp - best,
                    anomalous: false,
                },
                BlockPhases::Observed { .. } => {
                    warn!(
                        "node {} block {}: observed without sync/import detail, \
                         emitting anomalous zero delays",
                        node_id, block_number
                    );
                    DelayPoint::sentinel(block_number, true)
                }
            }
        })
        .collect()
}
