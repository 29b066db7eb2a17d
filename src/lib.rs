//! context-scout: recommend the minimal set of files relevant to an
//! engineering task, under a token budget, and learn from feedback.
//!
//! The pipeline per request: extract a task pattern, collect per-file
//! relevance signals, blend in learned adjustments, assign tiers, and
//! select under budget. Explicit overrides and outcome reports flow back
//! into a durable per-pattern learning store.

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod history;
pub mod index;
pub mod pattern;
pub mod scan;
pub mod score;
pub mod select;
pub mod signal;
pub mod store;

pub use config::{load_config, ScoutConfig};
pub use engine::{ContextEngine, ContextRequest, ContextResponse};
pub use error::{Result, ScoutError};
pub use store::ScoutStore;
