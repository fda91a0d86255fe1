//! Canonical lead identity and earliest-wins deduplication.
//!
//! The reply feed keys records inconsistently: some carry a lead id, some
//! only a sender address, and the same real-world lead shows up repeatedly
//! across a thread. This module is the single dedup implementation the rest
//! of the engine calls; the legacy dashboard reimplemented this scan in
//! every record-browsing view.

use std::collections::HashSet;

use tracing::debug;

use crate::models::ReplyEvent;

/// Canonical identity for a reply: the lead id when present and non-empty,
/// else the sender address. `None` means the record cannot participate in
/// identity-sensitive counts and is dropped.
pub fn identity_key(reply: &ReplyEvent) -> Option<&str> {
    match reply.lead_id.as_deref() {
        Some(id) if !id.is_empty() => Some(id),
        _ => match reply.from_email.as_deref() {
            Some(addr) if !addr.is_empty() => Some(addr),
            _ => None,
        },
    }
}

/// Deduplicate replies, keeping the chronologically first record per
/// (campaign id, identity) as canonical.
///
/// The first touch is treated as canonical for a thread of engagement even
/// if later replies are categorized differently. The same literal identity
/// under two campaign ids counts twice; the client dimension is fixed by the
/// run scope, so it does not appear in the key. Records with an equal
/// timestamp keep their input order (the sort is stable), so output is
/// deterministic for a given input sequence.
pub fn resolve_earliest<'a, I>(replies: I) -> Vec<&'a ReplyEvent>
where
    I: IntoIterator<Item = &'a ReplyEvent>,
{
    let mut ordered: Vec<&ReplyEvent> = replies.into_iter().collect();
    ordered.sort_by_key(|reply| reply.received_at);

    let mut seen: HashSet<(&str, &str)> = HashSet::with_capacity(ordered.len());
    let mut canonical = Vec::new();

    for reply in ordered {
        let Some(key) = identity_key(reply) else {
            debug!(
                campaign = %reply.campaign_id,
                received_at = %reply.received_at,
                "dropping reply with no lead id or sender address"
            );
            continue;
        };

        if seen.insert((reply.campaign_id.as_str(), key)) {
            canonical.push(reply);
        }
    }

    canonical
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reply(
        campaign_id: &str,
        lead_id: Option<&str>,
        from_email: Option<&str>,
        category: Option<&str>,
        received_at: &str,
    ) -> ReplyEvent {
        ReplyEvent {
            campaign_id: campaign_id.to_string(),
            lead_id: lead_id.map(str::to_string),
            from_email: from_email.map(str::to_string),
            category: category.map(str::to_string),
            received_at: received_at.parse().unwrap(),
            step: None,
        }
    }

    #[test]
    fn lead_id_preferred_over_sender_address() {
        let r = reply("c1", Some("lead-1"), Some("a@x.com"), None, "2024-01-01T09:00:00Z");
        assert_eq!(identity_key(&r), Some("lead-1"));
    }

    #[test]
    fn empty_lead_id_falls_back_to_sender_address() {
        let r = reply("c1", Some(""), Some("a@x.com"), None, "2024-01-01T09:00:00Z");
        assert_eq!(identity_key(&r), Some("a@x.com"));
    }

    #[test]
    fn both_identity_fields_missing_is_unresolvable() {
        let r = reply("c1", None, Some(""), None, "2024-01-01T09:00:00Z");
        assert_eq!(identity_key(&r), None);

        let resolved = resolve_earliest([&r]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn earliest_record_wins_regardless_of_input_order() {
        let later = reply(
            "c1",
            Some("lead-42"),
            None,
            Some("Interested"),
            "2024-01-03T10:00:00Z",
        );
        let earlier = reply(
            "c1",
            Some("lead-42"),
            None,
            Some("Out of Office"),
            "2024-01-01T09:00:00Z",
        );

        let resolved = resolve_earliest([&later, &earlier]);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].category.as_deref(), Some("Out of Office"));
        assert_eq!(
            resolved[0].received_at,
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn deduplication_is_idempotent() {
        let a = reply("c1", Some("lead-1"), None, None, "2024-01-01T09:00:00Z");
        let b = reply("c1", Some("lead-1"), None, None, "2024-01-02T09:00:00Z");
        let c = reply("c1", None, Some("b@x.com"), None, "2024-01-02T10:00:00Z");

        let once = resolve_earliest([&a, &b, &c]);
        let twice = resolve_earliest(once.iter().copied());

        assert_eq!(once.len(), 2);
        assert_eq!(
            once.iter().map(|r| r.received_at).collect::<Vec<_>>(),
            twice.iter().map(|r| r.received_at).collect::<Vec<_>>()
        );
    }

    #[test]
    fn same_identity_in_two_campaigns_stays_distinct() {
        let a = reply("c1", Some("lead-1"), None, None, "2024-01-01T09:00:00Z");
        let b = reply("c2", Some("lead-1"), None, None, "2024-01-01T10:00:00Z");

        let resolved = resolve_earliest([&a, &b]);
        assert_eq!(resolved.len(), 2);
    }
}
