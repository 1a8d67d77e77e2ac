//! Leaderboard harness: loads or synthesises a contest snapshot, drives the
//! ranking engine stage by stage and writes JSONL rows, a Markdown summary
//! and optional telemetry.

pub mod analytics;
pub mod config;
pub mod logging;
pub mod pipeline;
pub mod store;
pub mod synth;
pub mod telemetry;
