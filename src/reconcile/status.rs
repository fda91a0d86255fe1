//! Maps free-text campaign status strings to the closed status set.

use crate::models::CampaignStatus;

const ACTIVE_KEYWORDS: [&str; 4] = ["active", "running", "in_progress", "in progress"];
const PAUSED_KEYWORDS: [&str; 4] = ["paused", "pause", "on_hold", "on hold"];
const COMPLETED_KEYWORDS: [&str; 6] = [
    "completed", "complete", "stopped", "finished", "done", "ended",
];

/// Classify a free-text status string from the status registry.
///
/// Keyword groups are checked in order: active, then paused, then completed.
/// A string matching more than one group resolves to the first match, so
/// "active" beats "completed". Non-empty but unrecognized text classifies as
/// active (a legacy fallback the dashboard's displayed counts depend on);
/// only the empty string maps to unknown.
pub fn classify_status(raw: &str) -> CampaignStatus {
    let normalized = raw.trim().to_lowercase();

    if normalized.is_empty() {
        return CampaignStatus::Unknown;
    }
    if contains_any(&normalized, &ACTIVE_KEYWORDS) {
        return CampaignStatus::Active;
    }
    if contains_any(&normalized, &PAUSED_KEYWORDS) {
        return CampaignStatus::Paused;
    }
    if contains_any(&normalized, &COMPLETED_KEYWORDS) {
        return CampaignStatus::Completed;
    }

    CampaignStatus::Active
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| text.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_groups_classify_in_order() {
        assert_eq!(classify_status("active"), CampaignStatus::Active);
        assert_eq!(
            classify_status("Campaign is RUNNING now"),
            CampaignStatus::Active
        );
        assert_eq!(classify_status("on_hold"), CampaignStatus::Paused);
        assert_eq!(classify_status("  Paused by user "), CampaignStatus::Paused);
        assert_eq!(classify_status("stopped early"), CampaignStatus::Completed);
        assert_eq!(classify_status("DONE"), CampaignStatus::Completed);
    }

    #[test]
    fn active_keywords_beat_completed_keywords() {
        // Rule order is load-bearing: both groups match, active runs first.
        assert_eq!(
            classify_status("running until stopped"),
            CampaignStatus::Active
        );
    }

    #[test]
    fn unrecognized_text_falls_back_to_active() {
        assert_eq!(
            classify_status("weird_custom_value"),
            CampaignStatus::Active
        );
    }

    #[test]
    fn empty_and_whitespace_are_unknown() {
        assert_eq!(classify_status(""), CampaignStatus::Unknown);
        assert_eq!(classify_status("   "), CampaignStatus::Unknown);
    }
}
