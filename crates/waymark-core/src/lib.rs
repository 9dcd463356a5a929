//! waymark-core library.
//!
//! Folds an ordered stream of agent progress events into per-request
//! [`Session`](model::session::Session)s, rebuilds the same shape from
//! persisted history, and computes structural diffs between two snapshots of
//! a [`WorkItem`](model::work_item::WorkItem).
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for application-level return types;
//!   module errors are `thiserror` enums with a stable [`error::ErrorCode`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod diff;
pub mod error;
pub mod event;
pub mod fold;
pub mod model;
pub mod replay;

pub use diff::{diff, has_diff};
pub use fold::{FoldContext, FoldOutcome, fold, fold_json};
pub use replay::{replay, replay_json};
