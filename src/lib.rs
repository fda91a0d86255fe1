//! FunnelDesk Backend Library
//!
//! Campaign engagement reconciliation: drains roll-ups, replies, meetings,
//! and the status registry from the paginated outreach data API and folds
//! them into deduplicated, time-bucketed funnel metrics per campaign and
//! per outreach-sequence step.

pub mod error;
pub mod models;
pub mod reconcile;
pub mod sources;
