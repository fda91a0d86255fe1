//! Campaign engagement reconciliation.
//!
//! Takes the four loosely-keyed source feeds (daily roll-ups, reply events,
//! meeting events, status registry) and reconciles them into deduplicated,
//! time-bucketed funnel metrics per campaign and per sequence step.

pub mod category;
pub mod daily;
pub mod engine;
pub mod identity;
pub mod status;
