//! Access to the upstream outreach data API.
//!
//! Every record kind is served by a paginated query endpoint that caps
//! single-response size. The reconciliation pipeline only ever reads through
//! [`EngagementSource`] + [`paged::drain_pages`]; there is deliberately no
//! unpaged "give me everything" path.

pub mod client;
pub mod paged;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{CampaignDayRollup, CampaignStatusRecord, MeetingEvent, ReplyEvent};

/// Equality/range filters accepted by every record-kind query.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    pub client: Option<String>,
    pub campaign_id: Option<String>,
    /// Inclusive lower bound on the record's calendar date.
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the record's calendar date.
    pub date_to: Option<NaiveDate>,
}

/// One page of records. `total` is a hint some backends return alongside the
/// page; the drain loop never uses it for continuation decisions.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub rows: Vec<T>,
    pub total: Option<u64>,
}

/// Paginated query collaborator for the four engagement record kinds.
///
/// Implementations must return at most `limit` rows per call, starting at
/// `offset`, under a sort order that is stable across calls.
#[async_trait]
pub trait EngagementSource: Send + Sync {
    async fn campaign_rollups(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<CampaignDayRollup>>;

    async fn reply_events(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<ReplyEvent>>;

    async fn meeting_events(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<MeetingEvent>>;

    async fn campaign_statuses(
        &self,
        filter: &SourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Page<CampaignStatusRecord>>;
}
