//! Demo and stress tooling for rbpool.
//!
//! This crate provides:
//! - Demo: the canonical insertion scenario with per-node colors
//! - Storms: deterministic alloc/free churn against a pool, with accounting
//!   checks after every run
//! - Structured logging: allocator lifecycle records exported as JSONL

#![forbid(unsafe_code)]

pub mod demo;
pub mod error;
pub mod storm;
pub mod structured_log;

pub use demo::{DemoReport, run_demo};
pub use error::HarnessError;
pub use storm::{StormKind, StormReport, XorShift64, run_storm};
pub use structured_log::{LogEmitter, LogEntry};
