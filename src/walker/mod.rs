//! Concurrent directory-tree sizing
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │       Controller        │
//!                     │  - one job at a time    │
//!                     │  - waits on completion  │
//!                     └───────────┬─────────────┘
//!                                 │ install / await
//!                     ┌───────────▼─────────────┐
//!                     │       SharedState       │
//!                     │  Mutex { job, busy,     │
//!                     │          shutdown }     │
//!                     │  Condvar work_available │
//!                     │  Condvar job_complete   │
//!                     └───────────┬─────────────┘
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Worker 1 │             │  Worker 2 │             │  Worker N │
//! │ pop, list │             │ pop, list │             │ pop, list │
//! │ push subs │             │ push subs │             │ push subs │
//! └───────────┘             └───────────┘             └───────────┘
//! ```

pub mod controller;
pub mod state;
pub mod worker;

pub use controller::{Controller, RootOutcome, RootReport, RunSummary};
pub use state::{Claim, Expansion, JobResult, SharedState};
pub use worker::{expand_directory, PoolStats, Worker, WorkerStats};
