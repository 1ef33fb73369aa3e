use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::Artifact;
use crate::normalizer::parse_iso;

/// A quiet period between two consecutive artifacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineGap {
    /// Timestamp of the artifact before the gap
    pub before: String,
    /// Timestamp of the artifact after the gap
    pub after: String,
    /// Gap length in hours, rounded to two decimals
    pub hours: f64,
}

fn timestamped(artifacts: &[Artifact]) -> Vec<&Artifact> {
    let mut ordered: Vec<&Artifact> = artifacts.iter().filter(|a| a.timestamp.is_some()).collect();
    // Normalized timestamps sort chronologically as text
    ordered.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    ordered
}

/// Gaps of at least `min_gap_hours` between consecutive timestamped artifacts.
pub fn find_gaps(artifacts: &[Artifact], min_gap_hours: f64) -> Vec<TimelineGap> {
    let ordered = timestamped(artifacts);
    let mut gaps = Vec::new();

    for pair in ordered.windows(2) {
        let (Some(before), Some(after)) = (pair[0].timestamp.as_deref(), pair[1].timestamp.as_deref()) else {
            continue;
        };
        let (Some(start), Some(end)) = (parse_iso(before), parse_iso(after)) else {
            continue;
        };
        let hours = (end - start).num_milliseconds() as f64 / 3_600_000.0;
        if hours >= min_gap_hours {
            gaps.push(TimelineGap {
                before: before.to_string(),
                after: after.to_string(),
                hours: (hours * 100.0).round() / 100.0,
            });
        }
    }
    gaps
}

/// Timestamped artifacts grouped by calendar day (`YYYY-MM-DD`), each day in
/// chronological order.
pub fn group_by_day(artifacts: &[Artifact]) -> BTreeMap<String, Vec<&Artifact>> {
    let mut grouped: BTreeMap<String, Vec<&Artifact>> = BTreeMap::new();
    for artifact in timestamped(artifacts) {
        if let Some(day) = artifact.timestamp.as_deref().and_then(|ts| ts.get(..10)) {
            grouped.entry(day.to_string()).or_default().push(artifact);
        }
    }
    grouped
}

/// Number of artifacts per day.
pub fn daily_counts(artifacts: &[Artifact]) -> BTreeMap<String, usize> {
    group_by_day(artifacts)
        .into_iter()
        .map(|(day, items)| (day, items.len()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::artifact_at;

    #[test]
    fn test_find_gaps_threshold() {
        let artifacts = vec![
            artifact_at("a", Some("2024-01-01T00:00:00+00:00")),
            artifact_at("a", Some("2024-01-01T05:00:00+00:00")),
            artifact_at("a", Some("2024-01-01T07:00:00+00:00")),
        ];
        let gaps = find_gaps(&artifacts, 4.0);
        assert_eq!(
            gaps,
            vec![TimelineGap {
                before: "2024-01-01T00:00:00+00:00".to_string(),
                after: "2024-01-01T05:00:00+00:00".to_string(),
                hours: 5.0,
            }]
        );
    }

    #[test]
    fn test_find_gaps_orders_and_ignores_untimed() {
        let artifacts = vec![
            artifact_at("b", Some("2024-01-02T00:00:00+00:00")),
            artifact_at("b", None),
            artifact_at("a", Some("2024-01-01T00:20:00+00:00")),
        ];
        let gaps = find_gaps(&artifacts, 4.0);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].before, "2024-01-01T00:20:00+00:00");
        assert_eq!(gaps[0].hours, 23.67);
    }

    #[test]
    fn test_exact_threshold_is_reported() {
        let artifacts = vec![
            artifact_at("a", Some("2024-01-01T00:00:00+00:00")),
            artifact_at("a", Some("2024-01-01T04:00:00+00:00")),
        ];
        assert_eq!(find_gaps(&artifacts, 4.0).len(), 1);
        assert!(find_gaps(&artifacts[..1], 4.0).is_empty());
    }

    #[test]
    fn test_group_by_day() {
        let artifacts = vec![
            artifact_at("a", Some("2024-01-02T09:00:00+00:00")),
            artifact_at("a", Some("2024-01-01T23:59:59+00:00")),
            artifact_at("a", Some("2024-01-02T08:00:00+00:00")),
            artifact_at("a", None),
        ];
        let grouped = group_by_day(&artifacts);
        assert_eq!(grouped.keys().cloned().collect::<Vec<_>>(), vec!["2024-01-01", "2024-01-02"]);
        assert_eq!(
            grouped["2024-01-02"][0].timestamp.as_deref(),
            Some("2024-01-02T08:00:00+00:00")
        );

        let counts = daily_counts(&artifacts);
        assert_eq!(counts["2024-01-02"], 2);
    }
}
