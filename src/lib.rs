#![deny(
    clippy::mutable_key_type,
    clippy::map_entry,
    clippy::boxed_local,
    clippy::let_unit_value,
    clippy::redundant_allocation,
    clippy::bool_comparison,
    clippy::bind_instead_of_map,
    clippy::vec_box,
    clippy::while_let_loop,
    clippy::useless_asref,
    clippy::repeat_once,
    clippy::deref_addrof,
    clippy::suspicious_map,
    clippy::single_char_pattern,
    clippy::for_kv_map,
    clippy::let_and_return,
    clippy::iter_nth,
    clippy::iter_cloned_collect,
    clippy::match_result_ok,
    clippy::cmp_owned,
    clippy::cmp_null,
    clippy::op_ref
)]

//! Sewer network topology repair.
//!
//! Snaps dangling pipe endpoints onto structures, resolves which pipes
//! connect end to end, finds the structure at each pipe end, and derives
//! flow direction and neighbouring pipe materials. [`engine::Engine`] runs
//! the whole batch; the other modules can be used on their own.

#[macro_use]
extern crate serde;

pub mod adjacency;
pub mod coincidence;
pub mod config;
pub mod connectivity;
pub mod direction;
pub mod endpoint_index;
pub mod engine;
pub mod error;
pub mod junctions;
pub mod materials;
pub mod models;
pub mod snapping;

#[cfg(test)]
mod scenario_tests;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ConfigError, TopologyError};
pub use models::{BatchReport, EndRole, PointFeature, Segment, SegmentOutput};
pub use snapping::SnapMode;
