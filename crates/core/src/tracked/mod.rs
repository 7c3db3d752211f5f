//! Tracked module - the coins and currencies the service keeps rates for,
//! and their best-effort persistence across restarts.

mod tracked_model;
mod tracked_store;

pub use tracked_model::{TrackedSet, TrackedSnapshot};
pub use tracked_store::TrackedSetStore;
