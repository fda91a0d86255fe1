//! Reconciliation orchestrator.
//!
//! Drives one (date range, client) scope through the full pipeline: drain
//! the four sources sequentially, resolve identities, classify categories
//! and statuses, bucket by day, and emit per-campaign (and per-step)
//! aggregates. Later stages join against the campaign-id set established by
//! the roll-up stage, so the fetches are awaited in order, never fanned out.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult, FetchStage};
use crate::models::{
    CampaignAggregate, CampaignDayRollup, CampaignStatus, FunnelCounters, ReplyEvent,
    SequenceStepAggregate, StepRollup,
};
use crate::reconcile::category::is_out_of_office;
use crate::reconcile::daily::DailyBuckets;
use crate::reconcile::identity::resolve_earliest;
use crate::reconcile::status::classify_status;
use crate::sources::paged::drain_pages;
use crate::sources::{EngagementSource, Page, SourceFilter};

/// One reconciliation request: a client and an inclusive date range.
#[derive(Debug, Clone)]
pub struct ReconcileScope {
    /// Restrict to one client's campaigns; `None` reconciles all clients.
    pub client: Option<String>,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl ReconcileScope {
    fn filter(&self, campaign_id: Option<&str>) -> SourceFilter {
        SourceFilter {
            client: self.client.clone(),
            campaign_id: campaign_id.map(str::to_string),
            date_from: Some(self.date_from),
            date_to: Some(self.date_to),
        }
    }
}

pub struct ReconcileEngine<S> {
    source: S,
}

impl<S: EngagementSource> ReconcileEngine<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Reconcile funnel metrics for every campaign in scope.
    ///
    /// Output is sorted by total emails sent descending, with campaign id
    /// ascending as tie-break. That is the dashboard's documented default
    /// order, not an accident of map iteration.
    pub async fn campaign_metrics(
        &self,
        scope: &ReconcileScope,
    ) -> EngineResult<Vec<CampaignAggregate>> {
        let filter = scope.filter(None);

        // Roll-ups establish the campaign set everything else joins against.
        let rollups = fetch_stage(FetchStage::Rollups, |offset, limit| {
            self.source.campaign_rollups(&filter, offset, limit)
        })
        .await?;

        let mut builders: BTreeMap<String, AggregateBuilder> = BTreeMap::new();
        for rollup in &rollups {
            builders
                .entry(rollup.campaign_id.clone())
                .or_insert_with(|| AggregateBuilder::new(rollup.campaign_name.clone()))
                .fold_rollup(rollup);
        }

        let replies = fetch_stage(FetchStage::Replies, |offset, limit| {
            self.source.reply_events(&filter, offset, limit)
        })
        .await?;

        let mut replies_by_campaign: HashMap<&str, Vec<&ReplyEvent>> = HashMap::new();
        for reply in &replies {
            replies_by_campaign
                .entry(reply.campaign_id.as_str())
                .or_default()
                .push(reply);
        }
        for (campaign_id, builder) in builders.iter_mut() {
            if let Some(campaign_replies) = replies_by_campaign.remove(campaign_id.as_str()) {
                builder.fold_replies(campaign_replies);
            }
        }
        for (campaign_id, orphaned) in replies_by_campaign {
            debug!(
                campaign = %campaign_id,
                count = orphaned.len(),
                "dropping replies for campaign absent from the roll-up source"
            );
        }

        let meetings = fetch_stage(FetchStage::Meetings, |offset, limit| {
            self.source.meeting_events(&filter, offset, limit)
        })
        .await?;

        let mut unmatched = 0usize;
        for meeting in &meetings {
            let day = meeting.created_at.date_naive();

            // Match by id first; fall back to display name. Names are not
            // guaranteed unique: first match in campaign-id order wins.
            let matched = meeting
                .campaign_id
                .as_deref()
                .filter(|id| builders.contains_key(*id))
                .map(str::to_string)
                .or_else(|| {
                    meeting.campaign_name.as_deref().and_then(|name| {
                        builders
                            .iter()
                            .find(|(_, builder)| builder.campaign_name == name)
                            .map(|(id, _)| id.clone())
                    })
                });

            match matched.and_then(|id| builders.get_mut(&id)) {
                Some(builder) => {
                    builder.totals.meetings_booked += 1;
                    builder.daily.entry(day).meetings_booked += 1;
                    builder.touch_activity(day);
                }
                None => {
                    unmatched += 1;
                    warn!(
                        campaign_id = ?meeting.campaign_id,
                        campaign_name = ?meeting.campaign_name,
                        created_at = %meeting.created_at,
                        "dropping meeting that matches no known campaign"
                    );
                }
            }
        }
        if unmatched > 0 {
            warn!(
                unmatched,
                total = meetings.len(),
                "🗓️ meetings dropped without a campaign match"
            );
        }

        let statuses = fetch_stage(FetchStage::Statuses, |offset, limit| {
            self.source.campaign_statuses(&filter, offset, limit)
        })
        .await?;

        // Registry ids are joined as strings; the model layer already
        // normalizes numeric ids.
        let mut status_by_id: HashMap<String, CampaignStatus> =
            HashMap::with_capacity(statuses.len());
        for record in &statuses {
            status_by_id.insert(record.campaign_id.clone(), classify_status(&record.status));
        }

        let mut aggregates: Vec<CampaignAggregate> = builders
            .into_iter()
            .map(|(campaign_id, builder)| {
                let status = status_by_id
                    .get(&campaign_id)
                    .copied()
                    .unwrap_or(CampaignStatus::Unknown);
                builder.finish(campaign_id, status)
            })
            .collect();

        aggregates.sort_by(|a, b| {
            b.totals
                .emails_sent
                .cmp(&a.totals.emails_sent)
                .then_with(|| a.campaign_id.cmp(&b.campaign_id))
        });

        info!(
            campaigns = aggregates.len(),
            replies = replies.len(),
            meetings = meetings.len(),
            "📊 reconciled campaign funnel metrics"
        );

        Ok(aggregates)
    }

    /// Reconcile per-sequence-step metrics for one campaign, sorted
    /// ascending by step order.
    pub async fn sequence_metrics(
        &self,
        scope: &ReconcileScope,
        campaign_id: &str,
    ) -> EngineResult<Vec<SequenceStepAggregate>> {
        let filter = scope.filter(Some(campaign_id));

        let rollups = fetch_stage(FetchStage::Rollups, |offset, limit| {
            self.source.campaign_rollups(&filter, offset, limit)
        })
        .await?;

        let mut steps: BTreeMap<u32, FunnelCounters> = BTreeMap::new();
        for rollup in &rollups {
            let Some(payload) = &rollup.sequence_steps else {
                continue;
            };
            match serde_json::from_value::<Vec<StepRollup>>(payload.clone()) {
                Ok(step_rows) => {
                    for row in step_rows {
                        let counters = steps.entry(row.step).or_default();
                        counters.emails_sent += row.emails_sent;
                        counters.prospects_contacted += row.leads_contacted;
                        counters.bounced += row.bounced;
                        counters.interested += row.interested;
                    }
                }
                Err(err) => {
                    // Non-fatal: this rollup contributes nothing at step level.
                    debug!(
                        campaign = %rollup.campaign_id,
                        date = %rollup.date,
                        error = %err,
                        "skipping malformed per-step payload"
                    );
                }
            }
        }

        let replies = fetch_stage(FetchStage::Replies, |offset, limit| {
            self.source.reply_events(&filter, offset, limit)
        })
        .await?;

        let mut replies_by_step: BTreeMap<u32, Vec<&ReplyEvent>> = BTreeMap::new();
        for reply in &replies {
            if let Some(step) = reply.step {
                replies_by_step.entry(step).or_default().push(reply);
            }
        }
        for (step, step_replies) in replies_by_step {
            let canonical = resolve_earliest(step_replies);
            if canonical.is_empty() {
                continue;
            }
            let counters = steps.entry(step).or_default();
            counters.total_replies += canonical.len() as u64;
            counters.real_replies += canonical
                .iter()
                .filter(|reply| !is_out_of_office(reply.category.as_deref()))
                .count() as u64;
        }

        Ok(steps
            .into_iter()
            .map(|(step, totals)| SequenceStepAggregate {
                campaign_id: campaign_id.to_string(),
                step,
                totals,
            })
            .collect())
    }
}

async fn fetch_stage<T, F, Fut>(stage: FetchStage, next_page: F) -> EngineResult<Vec<T>>
where
    F: FnMut(usize, usize) -> Fut,
    Fut: Future<Output = anyhow::Result<Page<T>>>,
{
    drain_pages(next_page)
        .await
        .map_err(|cause| EngineError::SourceUnavailable { stage, cause })
}

/// Per-campaign accumulator, finished into a [`CampaignAggregate`].
struct AggregateBuilder {
    campaign_name: String,
    totals: FunnelCounters,
    daily: DailyBuckets,
    last_activity: Option<NaiveDate>,
}

impl AggregateBuilder {
    fn new(campaign_name: String) -> Self {
        Self {
            campaign_name,
            totals: FunnelCounters::default(),
            daily: DailyBuckets::new(),
            last_activity: None,
        }
    }

    fn fold_rollup(&mut self, rollup: &CampaignDayRollup) {
        if self.campaign_name.is_empty() && !rollup.campaign_name.is_empty() {
            self.campaign_name = rollup.campaign_name.clone();
        }

        self.totals.emails_sent += rollup.emails_sent;
        self.totals.prospects_contacted += rollup.leads_contacted;
        self.totals.bounced += rollup.bounced;
        self.totals.interested += rollup.interested;

        let bucket = self.daily.entry(rollup.date);
        bucket.emails_sent += rollup.emails_sent;
        bucket.prospects_contacted += rollup.leads_contacted;
        bucket.bounced += rollup.bounced;
        bucket.interested += rollup.interested;

        self.touch_activity(rollup.date);
    }

    fn fold_replies(&mut self, replies: Vec<&ReplyEvent>) {
        let canonical = resolve_earliest(replies.iter().copied());
        self.totals.total_replies += canonical.len() as u64;
        self.totals.real_replies += canonical
            .iter()
            .filter(|reply| !is_out_of_office(reply.category.as_deref()))
            .count() as u64;

        // Identity resolves independently within each day bucket: a lead who
        // replies on two days counts in both days, once in the campaign total.
        let mut by_day: BTreeMap<NaiveDate, Vec<&ReplyEvent>> = BTreeMap::new();
        for reply in replies {
            by_day
                .entry(reply.received_at.date_naive())
                .or_default()
                .push(reply);
        }
        for (day, day_replies) in by_day {
            let day_canonical = resolve_earliest(day_replies);
            if day_canonical.is_empty() {
                continue;
            }
            let bucket = self.daily.entry(day);
            bucket.total_replies += day_canonical.len() as u64;
            bucket.real_replies += day_canonical
                .iter()
                .filter(|reply| !is_out_of_office(reply.category.as_deref()))
                .count() as u64;
            self.touch_activity(day);
        }
    }

    fn touch_activity(&mut self, date: NaiveDate) {
        self.last_activity = Some(match self.last_activity {
            Some(current) => current.max(date),
            None => date,
        });
    }

    fn finish(self, campaign_id: String, status: CampaignStatus) -> CampaignAggregate {
        CampaignAggregate {
            campaign_id,
            campaign_name: self.campaign_name,
            totals: self.totals,
            status,
            last_activity: self.last_activity,
            daily: self.daily.into_series(),
        }
    }
}

/// Latest-invocation-wins guard around the engine.
///
/// Each invocation takes a generation ticket; a run that finishes after a
/// newer invocation has started returns [`EngineError::Superseded`] instead
/// of its stale aggregates. Dropping the returned future abandons the
/// in-flight fetches outright.
pub struct ReconcileSupervisor<S> {
    engine: Arc<ReconcileEngine<S>>,
    generation: Arc<AtomicU64>,
}

impl<S> Clone for ReconcileSupervisor<S> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            generation: self.generation.clone(),
        }
    }
}

impl<S: EngagementSource> ReconcileSupervisor<S> {
    pub fn new(engine: ReconcileEngine<S>) -> Self {
        Self {
            engine: Arc::new(engine),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub async fn campaign_metrics(
        &self,
        scope: &ReconcileScope,
    ) -> EngineResult<Vec<CampaignAggregate>> {
        let ticket = self.take_ticket();
        let result = self.engine.campaign_metrics(scope).await;
        self.settle(ticket, result)
    }

    pub async fn sequence_metrics(
        &self,
        scope: &ReconcileScope,
        campaign_id: &str,
    ) -> EngineResult<Vec<SequenceStepAggregate>> {
        let ticket = self.take_ticket();
        let result = self.engine.sequence_metrics(scope, campaign_id).await;
        self.settle(ticket, result)
    }

    fn take_ticket(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn settle<T>(&self, ticket: u64, result: EngineResult<T>) -> EngineResult<T> {
        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!(ticket, "discarding superseded reconciliation result");
            return Err(EngineError::Superseded);
        }
        result
    }
}
