//! # objscan
//!
//! Scans pahole(1) struct layouts for kernel objects that land in a given
//! kmalloc bucket and carry fields useful for use-after-free exploitation.
//!
//! ## Architecture
//!
//! - **bucket**: kmalloc size classes and bucket resolution
//! - **member**: regex classification of single layout lines
//! - **evaluate**: per-object verdict over a `LayoutSource`
//! - **catalog**: catalog parsing, bucket partitioning and sequential scan
//! - **dispatch**: bounded producer/worker fan-out with ordered reassembly
//! - **pahole**: process-backed layout source and `--sizes` dump
//! - **output**: result lines, file naming, sinks and run summary
//! - **config**: path/jobs/sink resolution, logging and temp catalog lifecycle
//! - **cli**: command-line surface

pub mod bucket;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod evaluate;
pub mod member;
pub mod output;
pub mod pahole;

#[cfg(test)]
mod test_support;
