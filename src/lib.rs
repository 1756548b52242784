//! # Nodewatch - Telemetry aggregation core for blockchain node networks
//!
//! This library ingests status reports from independently-connected
//! blockchain nodes and republishes a consistent, ordered view of network
//! state to any number of subscribing display clients.
//!
//! ## Overview
//!
//! A running network has many nodes, each reporting best blocks, rolling
//! stats, and per-phase block timings over its own connection. Nodewatch
//! serializes those streams through a single-writer registry that tracks
//! which nodes and subscribers are live, maintains the authoritative best
//! block watermark, sweeps out stale nodes, and derives the per-block
//! duration and propagation-delay series used for charting.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `types`: identifiers, timestamps, and per-block phase data
//! - `node`: registry entry for one connected reporting node
//! - `feed`: broadcast messages and the subscriber send capability
//! - `aggregator`: the single-writer registry, watermarks, and broadcast
//! - `metrics`: pure derivation of duration and delay series
//! - `events`: recorded event streams and their on-disk format
//! - `replay`: offline replay of captured streams through the core
//! - `report`: JSON and text reports of a replay run
//! - `config`: tunables (staleness threshold, sweep cadence, retention)
//!
//! Transport, authentication, and rendering are external collaborators:
//! the connection layer hands the core pre-parsed events, and subscribers
//! are reached through a fire-and-forget send capability.
//!
//! ## Example Usage
//!
//! ```rust
//! use nodewatch::aggregator::Aggregator;
//! use nodewatch::config::AggregatorConfig;
//! use nodewatch::feed::ChannelSink;
//! use nodewatch::types::{BlockPhases, BlockReport};
//!
//! let mut aggregator = Aggregator::new(AggregatorConfig::default());
//! aggregator.add_node(1, "alice", 0.0)?;
//!
//! // A joining feed receives the snapshot before any live deltas
//! let (sink, messages) = ChannelSink::new();
//! aggregator.add_feed(1, Box::new(sink))?;
//!
//! aggregator.block_report(1, BlockReport {
//!     block_number: 42,
//!     timestamp: 90.0,
//!     phases: BlockPhases::Proposed { duration: 30.0 },
//!     block_time: 6000.0,
//!     average: 6100.0,
//!     latency: 45.0,
//! })?;
//!
//! assert_eq!(aggregator.height(), 42);
//! assert_eq!(messages.try_iter().count(), 4);
//! # Ok::<(), nodewatch::aggregator::RegistryError>(())
//! ```
//!
//! ## Error Handling
//!
//! Registry precondition violations (duplicate ids, unknown handles) are
//! rejected with typed [`aggregator::RegistryError`]s. Malformed report
//! content is recovered locally with zero sentinels and logged; no anomaly
//! in the core terminates aggregation. The application layer uses
//! `color_eyre` for error reporting with context.

pub mod aggregator;
pub mod config;
pub mod events;
pub mod feed;
pub mod metrics;
pub mod node;
pub mod replay;
pub mod report;
pub mod types;
