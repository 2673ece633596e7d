//! Request Quota
//!
//! A single persisted counter gating generations per time window, with a
//! password override that zeroes it.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  QuotaGate                   │
//! │   Open (count < limit) ⇄ Closed (>= limit)   │
//! │   lazy window expiry on every access         │
//! ├──────────────────────────────────────────────┤
//! │        QuotaStore (file / in-memory)         │
//! │        {"count": n, "timestamp": ...}        │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! The gate is not safe for shared use on its own; callers that serve
//! concurrent requests wrap it in a mutex.

pub mod config;
pub mod gate;
pub mod state;
pub mod store;

pub use config::{QuotaConfig, QuotaPolicy};
pub use gate::{ConsumeOutcome, QuotaGate, QuotaStatus, ResetOutcome};
pub use state::QuotaState;
pub use store::{FileQuotaStore, MemoryQuotaStore, QuotaStore};
