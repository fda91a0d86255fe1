//! Per-calendar-day bucketing of funnel counters.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::models::{DailyPoint, FunnelCounters};

/// Accumulates counters into per-day buckets and emits a date-sorted series.
///
/// Buckets are created the first time any source record touches a date,
/// never fabricated ahead of data, with all counters zero-initialized.
/// Percentage math is a presentation concern and does not happen here.
#[derive(Debug, Default)]
pub struct DailyBuckets {
    buckets: BTreeMap<NaiveDate, FunnelCounters>,
}

impl DailyBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bucket for `date`, created on first touch.
    pub fn entry(&mut self, date: NaiveDate) -> &mut FunnelCounters {
        self.buckets.entry(date).or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Emit the series ascending by date, each point carrying its display
    /// label.
    pub fn into_series(self) -> Vec<DailyPoint> {
        self.buckets
            .into_iter()
            .map(|(date, counters)| DailyPoint {
                label: day_label(date),
                date,
                counters,
            })
            .collect()
    }
}

/// Display label for a day bucket, e.g. "Feb 1".
pub fn day_label(date: NaiveDate) -> String {
    date.format("%b %-d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn buckets_exist_only_for_touched_dates() {
        let mut buckets = DailyBuckets::new();
        assert!(buckets.is_empty());

        buckets.entry(day("2024-02-03")).emails_sent += 10;
        buckets.entry(day("2024-02-01")).emails_sent += 5;

        let series = buckets.into_series();
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn series_is_sorted_ascending_by_date() {
        let mut buckets = DailyBuckets::new();
        buckets.entry(day("2024-02-03")).meetings_booked += 1;
        buckets.entry(day("2024-01-31")).emails_sent += 1;
        buckets.entry(day("2024-02-01")).real_replies += 1;

        let dates: Vec<NaiveDate> = buckets.into_series().iter().map(|p| p.date).collect();
        assert_eq!(
            dates,
            vec![day("2024-01-31"), day("2024-02-01"), day("2024-02-03")]
        );
    }

    #[test]
    fn repeated_touches_accumulate_in_one_bucket() {
        let mut buckets = DailyBuckets::new();
        buckets.entry(day("2024-02-01")).emails_sent += 100;
        buckets.entry(day("2024-02-01")).emails_sent += 50;

        let series = buckets.into_series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].counters.emails_sent, 150);
    }

    #[test]
    fn labels_are_display_formatted() {
        assert_eq!(day_label(day("2024-02-01")), "Feb 1");
        assert_eq!(day_label(day("2024-12-25")), "Dec 25");
    }
}
