// Composite ranking of groups.
//
// Each ranking metric is aggregated per group (sum for counts, mean for
// ratios), min-max scaled across groups, and the scaled values are averaged
// into an unweighted composite score. Groups are ordered by descending score;
// ties keep ascending `group_id` order because the sort is stable over a
// `BTreeMap` walk.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::filter::FilteredView;
use crate::metrics::Metric;
use crate::types::{GroupComparisonRow, Record, TopGroupRow};
use crate::util::{average, format_number, min_max_scale};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedGroup {
    pub group_id: String,
    pub group_name: String,
    /// Per-metric aggregates, aligned with `Ranking::metrics`.
    pub values: Vec<f64>,
    /// Per-metric min-max scaled values in `[0, 1]`.
    pub normalized: Vec<f64>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub metrics: Vec<Metric>,
    pub groups: Vec<RankedGroup>,
}

impl Ranking {
    pub fn group_ids(&self) -> Vec<String> {
        self.groups.iter().map(|g| g.group_id.clone()).collect()
    }

    pub fn to_rows(&self) -> Vec<TopGroupRow> {
        self.groups
            .iter()
            .enumerate()
            .map(|(idx, g)| TopGroupRow {
                rank: idx + 1,
                group_id: g.group_id.clone(),
                group: g.group_name.clone(),
                metrics: self
                    .metrics
                    .iter()
                    .zip(&g.values)
                    .map(|(m, v)| format!("{}={}", m.key(), m.format_value(*v)))
                    .collect::<Vec<_>>()
                    .join(", "),
                composite_score: format_number(g.score, 3),
            })
            .collect()
    }

    /// Comparison-chart bars for `metric`, in ranking order.
    ///
    /// Built from the same ranked list as the table so both always show the
    /// same groups in the same order.
    pub fn comparison(&self, view: &FilteredView<'_>, metric: Metric) -> Vec<GroupAggregate> {
        let by_group = group_rows(view);
        self.groups
            .iter()
            .map(|g| {
                let values: Vec<f64> = by_group
                    .get(g.group_id.as_str())
                    .map(|(_, rows)| rows.iter().map(|r| metric.value(r)).collect())
                    .unwrap_or_default();
                GroupAggregate {
                    group_id: g.group_id.clone(),
                    group_name: g.group_name.clone(),
                    metric,
                    value: metric.reduce(&values),
                }
            })
            .collect()
    }
}

/// One group's aggregate of one metric, for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub group_id: String,
    pub group_name: String,
    pub metric: Metric,
    pub value: f64,
}

impl GroupAggregate {
    pub fn to_row(&self) -> GroupComparisonRow {
        GroupComparisonRow {
            group_id: self.group_id.clone(),
            group: self.group_name.clone(),
            metric: self.metric.label().to_string(),
            value: format_number(self.value, 2),
        }
    }
}

type GroupRows<'a> = BTreeMap<&'a str, (&'a str, Vec<&'a Record>)>;

fn group_rows<'a>(view: &FilteredView<'a>) -> GroupRows<'a> {
    let mut map: GroupRows<'a> = BTreeMap::new();
    for r in view.iter() {
        map.entry(r.group_id.as_str())
            .or_insert_with(|| (r.group_name.as_str(), Vec::new()))
            .1
            .push(r);
    }
    map
}

/// Score every group in the view, best first.
pub fn score_groups(view: &FilteredView<'_>, metrics: &[Metric]) -> Result<Vec<RankedGroup>> {
    if metrics.is_empty() {
        return Err(DashboardError::InvalidArgument(
            "ranking needs at least one metric".to_string(),
        ));
    }

    let mut groups: Vec<RankedGroup> = group_rows(view)
        .into_iter()
        .map(|(id, (name, rows))| {
            let values = metrics
                .iter()
                .map(|m| {
                    let vals: Vec<f64> = rows.iter().map(|r| m.value(r)).collect();
                    m.reduce(&vals)
                })
                .collect();
            RankedGroup {
                group_id: id.to_string(),
                group_name: name.to_string(),
                values,
                normalized: Vec::new(),
                score: 0.0,
            }
        })
        .collect();

    for i in 0..metrics.len() {
        let (min, max) = groups.iter().fold((f64::MAX, f64::MIN), |(lo, hi), g| {
            (lo.min(g.values[i]), hi.max(g.values[i]))
        });
        for g in groups.iter_mut() {
            let scaled = min_max_scale(g.values[i], min, max);
            g.normalized.push(scaled);
        }
    }
    for g in groups.iter_mut() {
        g.score = average(&g.normalized);
    }

    groups.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    Ok(groups)
}

/// Top `n` groups by composite score. Fewer groups than `n` returns them all.
pub fn rank(view: &FilteredView<'_>, metrics: &[Metric], n: usize) -> Result<Ranking> {
    let mut groups = score_groups(view, metrics)?;
    groups.truncate(n);
    log::debug!(
        "ranking: kept {} groups over {} metrics",
        groups.len(),
        metrics.len()
    );
    Ok(Ranking {
        metrics: metrics.to_vec(),
        groups,
    })
}

/// Ids of the top `n` groups, best first.
pub fn rank_groups(view: &FilteredView<'_>, metrics: &[Metric], n: usize) -> Result<Vec<String>> {
    Ok(rank(view, metrics, n)?.group_ids())
}

/// Per-group mean of `metric` over every group in the view, highest first.
pub fn group_comparison(view: &FilteredView<'_>, metric: Metric) -> Vec<GroupAggregate> {
    let mut out: Vec<GroupAggregate> = group_rows(view)
        .into_iter()
        .map(|(id, (name, rows))| {
            let vals: Vec<f64> = rows.iter().map(|r| metric.value(r)).collect();
            GroupAggregate {
                group_id: id.to_string(),
                group_name: name.to_string(),
                metric,
                value: average(&vals),
            }
        })
        .collect();
    out.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use crate::types::fixtures::{record, with_sales};

    fn two_groups() -> RecordStore {
        RecordStore::new(vec![
            with_sales(record("A", 2024, 1), 100, 50),
            with_sales(record("B", 2024, 1), 200, 40),
        ])
    }

    #[test]
    fn composite_is_mean_of_min_max_scaled_metrics() {
        let store = two_groups();
        let view = FilteredView::all(&store);
        let metrics = [Metric::Quotes, Metric::Sales, Metric::ClosingRatio];
        let ranking = rank(&view, &metrics, 5).unwrap();

        let a = &ranking.groups[0];
        assert_eq!(a.group_id, "A");
        assert_eq!(a.values, vec![100.0, 50.0, 50.0]);
        assert_eq!(a.normalized, vec![0.0, 1.0, 1.0]);
        assert!((a.score - 2.0 / 3.0).abs() < 1e-12);

        let b = &ranking.groups[1];
        assert_eq!(b.normalized, vec![1.0, 0.0, 0.0]);
        assert!((b.score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_metric_favours_larger_value() {
        let store = two_groups();
        let view = FilteredView::all(&store);
        assert_eq!(rank_groups(&view, &[Metric::Quotes], 1).unwrap(), vec!["B"]);
    }

    #[test]
    fn all_equal_values_rank_by_group_id() {
        let store = RecordStore::new(vec![
            with_sales(record("C", 2024, 1), 10, 1),
            with_sales(record("A", 2024, 1), 10, 1),
            with_sales(record("B", 2024, 1), 10, 1),
        ]);
        let view = FilteredView::all(&store);
        let ranking = rank(&view, &[Metric::Quotes, Metric::Sales], 10).unwrap();
        assert_eq!(ranking.group_ids(), vec!["A", "B", "C"]);
        assert!(ranking.groups.iter().all(|g| g.score == 0.0));
    }

    #[test]
    fn ratios_are_averaged_per_group() {
        let store = RecordStore::new(vec![
            with_sales(record("A", 2024, 1), 100, 10),
            with_sales(record("A", 2024, 2), 100, 30),
            with_sales(record("B", 2024, 1), 100, 15),
        ]);
        let view = FilteredView::all(&store);
        let ranking = rank(&view, &[Metric::ClosingRatio], 2).unwrap();
        assert_eq!(ranking.groups[0].group_id, "A");
        assert_eq!(ranking.groups[0].values, vec![20.0]);
    }

    #[test]
    fn degenerate_inputs() {
        let store = two_groups();
        let view = FilteredView::all(&store);
        assert_eq!(rank_groups(&view, &[Metric::Quotes], 10).unwrap().len(), 2);
        assert!(rank_groups(&view, &[Metric::Quotes], 0).unwrap().is_empty());
        assert!(matches!(
            rank(&view, &[], 3),
            Err(DashboardError::InvalidArgument(_))
        ));
        let empty = RecordStore::default();
        assert!(rank_groups(&FilteredView::all(&empty), &[Metric::Sales], 3)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn comparison_follows_ranking_order() {
        let store = two_groups();
        let view = FilteredView::all(&store);
        let ranking = rank(&view, &[Metric::ClosingRatio], 2).unwrap();
        let bars = ranking.comparison(&view, Metric::Quotes);
        let ids: Vec<&str> = bars.iter().map(|b| b.group_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(bars[0].value, 100.0);

        let chart = group_comparison(&view, Metric::Quotes);
        assert_eq!(chart[0].group_id, "B");
        assert_eq!(chart[0].to_row().value, "200.00");
    }
}
