//! Macroeconomic indicator observations and the as-of lookup.
//!
//! Observations are staged in long form (series, date, value). The merge
//! joins them onto filings with `value_as_of`, which only ever looks
//! backwards in time. Joining on the nearest date in either direction, or
//! on exact equality, would leak future information or drop filing rows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One (series, date, value) observation as staged by the FRED fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorObservation {
    pub series_id: String,
    pub date: NaiveDate,
    pub value: f64,
}

/// Group long-form observations by series, sorted by date within each series.
///
/// The `BTreeMap` keys give the deterministic series order the merged panel's
/// column layout relies on.
pub fn group_by_series(
    observations: &[IndicatorObservation],
) -> BTreeMap<String, Vec<(NaiveDate, f64)>> {
    let mut series: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();
    for obs in observations {
        series
            .entry(obs.series_id.clone())
            .or_default()
            .push((obs.date, obs.value));
    }
    for points in series.values_mut() {
        points.sort_by_key(|(date, _)| *date);
    }
    series
}

/// Latest observation at or before `as_of`, if any.
///
/// `points` must be sorted by date ascending. Returns `None` when `as_of`
/// precedes all observations; the caller surfaces that as an explicit
/// missing value, never a fabricated default.
pub fn value_as_of(points: &[(NaiveDate, f64)], as_of: NaiveDate) -> Option<f64> {
    let idx = points.partition_point(|(date, _)| *date <= as_of);
    if idx == 0 {
        None
    } else {
        Some(points[idx - 1].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn as_of_picks_latest_at_or_before() {
        let points = vec![(d("2024-02-01"), 3.1), (d("2024-04-01"), 3.3)];

        // Between the two observations: the earlier one wins, never the later.
        assert_eq!(value_as_of(&points, d("2024-03-15")), Some(3.1));
        // Exactly on an observation date: that observation counts.
        assert_eq!(value_as_of(&points, d("2024-04-01")), Some(3.3));
        assert_eq!(value_as_of(&points, d("2024-02-01")), Some(3.1));
        // After all observations: the last one.
        assert_eq!(value_as_of(&points, d("2024-12-31")), Some(3.3));
    }

    #[test]
    fn as_of_before_all_history_is_none() {
        let points = vec![(d("2024-02-01"), 3.1)];
        assert_eq!(value_as_of(&points, d("2024-01-31")), None);
        assert_eq!(value_as_of(&[], d("2024-01-31")), None);
    }

    #[test]
    fn group_sorts_within_series_and_orders_series() {
        let obs = vec![
            IndicatorObservation {
                series_id: "UNRATE".into(),
                date: d("2024-03-01"),
                value: 3.9,
            },
            IndicatorObservation {
                series_id: "FEDFUNDS".into(),
                date: d("2024-02-01"),
                value: 5.33,
            },
            IndicatorObservation {
                series_id: "UNRATE".into(),
                date: d("2024-01-01"),
                value: 3.7,
            },
        ];

        let grouped = group_by_series(&obs);
        let keys: Vec<&String> = grouped.keys().collect();
        assert_eq!(keys, ["FEDFUNDS", "UNRATE"]);
        assert_eq!(
            grouped["UNRATE"],
            vec![(d("2024-01-01"), 3.7), (d("2024-03-01"), 3.9)]
        );
    }

    /// Reference implementation: linear scan over all observations.
    fn value_as_of_naive(points: &[(NaiveDate, f64)], as_of: NaiveDate) -> Option<f64> {
        points
            .iter()
            .filter(|(date, _)| *date <= as_of)
            .max_by_key(|(date, _)| *date)
            .map(|(_, value)| *value)
    }

    proptest! {
        #[test]
        fn as_of_matches_linear_scan(
            day_offsets in proptest::collection::btree_set(0i64..2000, 0..40),
            probe in 0i64..2000,
        ) {
            let base = d("2020-01-01");
            let points: Vec<(NaiveDate, f64)> = day_offsets
                .iter()
                .map(|&off| (base + chrono::Duration::days(off), off as f64 / 10.0))
                .collect();
            let as_of = base + chrono::Duration::days(probe);

            prop_assert_eq!(value_as_of(&points, as_of), value_as_of_naive(&points, as_of));
        }
    }
}
