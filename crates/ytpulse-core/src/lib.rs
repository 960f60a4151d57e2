//! Core library for ytpulse.
//!
//! Collects public channel statistics, appends dated snapshots to a durable
//! store, and turns the accumulated history into charts and delta summaries.

pub mod aggregate;
pub mod channels;
pub mod chart;
pub mod config;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod snapshot;
pub mod store;
pub mod youtube;

pub use pipeline::{CollectReport, Pipeline, PipelineBuilder, RunReport, VisualReport};
pub use snapshot::{Snapshot, Subscribers};
