//! Data layer for duel-stats.
//!
//! Discovers and reads match-log files, folds each match into summary
//! statistics, runs the batch pass over a logs directory and assembles the
//! rated CSV report.

pub mod analysis;
pub mod analyzer;
pub mod reader;
pub mod report;

pub use duel_core as core;
