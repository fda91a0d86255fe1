use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Campaign lifecycle status, derived from the free-text status registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Active,
    Paused,
    Completed,
    Unknown,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CampaignStatus::Active => "active",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Unknown => "unknown",
        }
    }
}

/// Pre-aggregated per-campaign-per-day row from the sending platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignDayRollup {
    #[serde(deserialize_with = "string_id")]
    pub campaign_id: String,
    #[serde(default)]
    pub campaign_name: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub emails_sent: u64,
    #[serde(default)]
    pub leads_contacted: u64,
    #[serde(default)]
    pub bounced: u64,
    #[serde(default)]
    pub interested: u64,
    /// Embedded per-sequence-step counters. Shape varies by exporter
    /// version, so it is parsed leniently at aggregation time.
    #[serde(default)]
    pub sequence_steps: Option<serde_json::Value>,
}

/// Expected element shape of a rollup's `sequence_steps` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRollup {
    pub step: u32,
    #[serde(default)]
    pub emails_sent: u64,
    #[serde(default)]
    pub leads_contacted: u64,
    #[serde(default)]
    pub bounced: u64,
    #[serde(default)]
    pub interested: u64,
}

/// One inbound reply. Carries a lead id or a sender address, not reliably both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyEvent {
    #[serde(deserialize_with = "string_id")]
    pub campaign_id: String,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub from_email: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub received_at: DateTime<Utc>,
    #[serde(default)]
    pub step: Option<u32>,
}

/// One booked meeting. The booking tool sends a campaign id or a campaign
/// display name depending on how the calendar link was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingEvent {
    #[serde(default, deserialize_with = "optional_string_id")]
    pub campaign_id: Option<String>,
    #[serde(default)]
    pub campaign_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Free-text lifecycle status keyed by campaign id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStatusRecord {
    #[serde(deserialize_with = "string_id")]
    pub campaign_id: String,
    #[serde(default)]
    pub status: String,
}

/// Funnel counters shared by campaign totals, day buckets, and step buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelCounters {
    pub emails_sent: u64,
    pub prospects_contacted: u64,
    /// Deduplicated reply identities, out-of-office included.
    pub total_replies: u64,
    /// Deduplicated reply identities after out-of-office filtering.
    pub real_replies: u64,
    pub interested: u64,
    pub bounced: u64,
    pub meetings_booked: u64,
}

/// Reconciled funnel metrics for one campaign over the requested range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignAggregate {
    pub campaign_id: String,
    pub campaign_name: String,
    #[serde(flatten)]
    pub totals: FunnelCounters,
    pub status: CampaignStatus,
    pub last_activity: Option<NaiveDate>,
    pub daily: Vec<DailyPoint>,
}

/// One calendar day inside a campaign's series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    /// Display-formatted label ("Feb 1"), what the dashboard renders.
    pub label: String,
    #[serde(flatten)]
    pub counters: FunnelCounters,
}

/// Reconciled funnel metrics for one outreach-sequence step of a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStepAggregate {
    pub campaign_id: String,
    pub step: u32,
    #[serde(flatten)]
    pub totals: FunnelCounters,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout_secs: u64,
}

// Campaign ids arrive as JSON strings or bare numbers depending on the
// exporter; matching across sources always compares them as strings.
fn string_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(IdRepr::deserialize(deserializer)?.into_string())
}

fn optional_string_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdRepr>::deserialize(deserializer)?.map(IdRepr::into_string))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(i64),
}

impl IdRepr {
    fn into_string(self) -> String {
        match self {
            IdRepr::Text(s) => s,
            IdRepr::Number(n) => n.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numeric_campaign_ids_normalize_to_strings() {
        let record: CampaignStatusRecord =
            serde_json::from_value(json!({ "campaign_id": 42, "status": "Running" })).unwrap();
        assert_eq!(record.campaign_id, "42");

        let record: CampaignStatusRecord =
            serde_json::from_value(json!({ "campaign_id": "42", "status": "Running" })).unwrap();
        assert_eq!(record.campaign_id, "42");
    }

    #[test]
    fn meeting_event_tolerates_missing_identifiers() {
        let meeting: MeetingEvent = serde_json::from_value(json!({
            "created_at": "2024-02-02T15:30:00Z"
        }))
        .unwrap();
        assert!(meeting.campaign_id.is_none());
        assert!(meeting.campaign_name.is_none());

        let meeting: MeetingEvent = serde_json::from_value(json!({
            "campaign_id": 7,
            "created_at": "2024-02-02T15:30:00Z"
        }))
        .unwrap();
        assert_eq!(meeting.campaign_id.as_deref(), Some("7"));
    }

    #[test]
    fn rollup_defaults_missing_counters_to_zero() {
        let rollup: CampaignDayRollup = serde_json::from_value(json!({
            "campaign_id": "cmp-1",
            "date": "2024-02-01",
            "emails_sent": 100
        }))
        .unwrap();
        assert_eq!(rollup.emails_sent, 100);
        assert_eq!(rollup.leads_contacted, 0);
        assert!(rollup.sequence_steps.is_none());
    }
}
