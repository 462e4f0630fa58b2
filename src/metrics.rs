// Metric catalogue and aggregation over a filtered view.
//
// - Ranking and charts: counts and currency sum, per-row ratios (closing ratio,
//   average premium, average CLV) take the arithmetic mean of row values.
// - KPI table: only the closing ratio is averaged; every other metric sums.
// - Trends run on the per-period series, bucketed by month and read in order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::filter::FilteredView;
use crate::types::Record;
use crate::util::{average, pct_change};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Metric {
    Quotes,
    Sales,
    WrittenPremiums,
    ClosingRatio,
    AvgPremium,
    AvgClv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Count,
    Currency,
    /// A percentage per row, rendered with a `%` suffix.
    Percentage,
    /// A per-unit amount per row.
    Average,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

impl Aggregation {
    pub fn reduce(&self, values: &[f64]) -> f64 {
        match self {
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => average(values),
        }
    }
}

static METRIC_NAMES: Lazy<HashMap<String, Metric>> = Lazy::new(|| {
    let mut names = HashMap::new();
    for m in Metric::ALL {
        names.insert(normalize_name(m.key()), m);
        names.insert(normalize_name(m.label()), m);
    }
    names
});

fn normalize_name(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

impl Metric {
    /// Declaration order; the KPI table emits rows in this order.
    pub const ALL: [Metric; 6] = [
        Metric::Quotes,
        Metric::Sales,
        Metric::WrittenPremiums,
        Metric::ClosingRatio,
        Metric::AvgPremium,
        Metric::AvgClv,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            Metric::Quotes => "Quotes",
            Metric::Sales => "Sales",
            Metric::WrittenPremiums => "Written_Premiums",
            Metric::ClosingRatio => "Closing_Ratio",
            Metric::AvgPremium => "Avg_Premium",
            Metric::AvgClv => "Avg_CLV",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Quotes => "Quotes",
            Metric::Sales => "Sales",
            Metric::WrittenPremiums => "Written Premiums",
            Metric::ClosingRatio => "Closing Ratio",
            Metric::AvgPremium => "Average Premium",
            Metric::AvgClv => "Average CLV",
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Quotes | Metric::Sales => MetricKind::Count,
            Metric::WrittenPremiums => MetricKind::Currency,
            Metric::ClosingRatio => MetricKind::Percentage,
            Metric::AvgPremium | Metric::AvgClv => MetricKind::Average,
        }
    }

    pub fn aggregation(&self) -> Aggregation {
        match self.kind() {
            MetricKind::Count | MetricKind::Currency => Aggregation::Sum,
            MetricKind::Percentage | MetricKind::Average => Aggregation::Mean,
        }
    }

    /// Aggregation used by the KPI table, where only the percentage is averaged.
    pub fn breakdown_aggregation(&self) -> Aggregation {
        match self.kind() {
            MetricKind::Percentage => Aggregation::Mean,
            MetricKind::Count | MetricKind::Currency | MetricKind::Average => Aggregation::Sum,
        }
    }

    /// Value of this metric for a single record; always finite.
    pub fn value(&self, r: &Record) -> f64 {
        match self {
            Metric::Quotes => r.quotes as f64,
            Metric::Sales => r.sales() as f64,
            Metric::WrittenPremiums => r.total_written_premium,
            Metric::ClosingRatio => r.closing_ratio(),
            Metric::AvgPremium => r.avg_premium(),
            Metric::AvgClv => r.avg_clv(),
        }
    }

    /// Reduce a bag of row values with this metric's aggregation.
    pub fn reduce(&self, values: &[f64]) -> f64 {
        self.aggregation().reduce(values)
    }

    /// Render an aggregated value: percentages as `12.3%`, everything else as
    /// a truncated integer.
    pub fn format_value(&self, v: f64) -> String {
        match self.kind() {
            MetricKind::Percentage => format!("{:.1}%", v),
            _ => format!("{}", v.trunc() as i64),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = DashboardError;

    /// Accepts keys (`Written_Premiums`) and labels (`written premiums`),
    /// case-insensitively.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        METRIC_NAMES
            .get(&normalize_name(s))
            .copied()
            .ok_or_else(|| DashboardError::UnknownMetric { name: s.to_string() })
    }
}

/// Parse a comma-separated metric list, rejecting unknown names and empty lists.
pub fn parse_metric_list(s: &str) -> Result<Vec<Metric>> {
    let metrics = s
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<Metric>())
        .collect::<Result<Vec<Metric>>>()?;
    if metrics.is_empty() {
        return Err(DashboardError::InvalidArgument(
            "metric list must not be empty".to_string(),
        ));
    }
    Ok(metrics)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Aggregate {
    pub value: f64,
    pub trend_percent: f64,
}

fn bucketed(view: &FilteredView<'_>, metric: Metric, agg: Aggregation) -> Vec<(NaiveDate, f64)> {
    let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for r in view.iter() {
        buckets.entry(r.period).or_default().push(metric.value(r));
    }
    buckets
        .into_iter()
        .map(|(period, values)| (period, agg.reduce(&values)))
        .collect()
}

/// Per-period series of `metric`, in ascending period order.
pub fn period_series(view: &FilteredView<'_>, metric: Metric) -> Vec<(NaiveDate, f64)> {
    bucketed(view, metric, metric.aggregation())
}

/// Per-period series reduced the way the KPI table reduces `metric`.
pub fn period_totals(view: &FilteredView<'_>, metric: Metric) -> Vec<(NaiveDate, f64)> {
    bucketed(view, metric, metric.breakdown_aggregation())
}

/// First-vs-last percent change; 0 for fewer than two points or a zero first value.
pub fn trend_first_last(series: &[f64]) -> f64 {
    match series {
        [first, .., last] => pct_change(*first, *last),
        _ => 0.0,
    }
}

/// KPI value and first-vs-last trend of `metric` over `view`.
pub fn aggregate(view: &FilteredView<'_>, metric: Metric) -> Aggregate {
    let values: Vec<f64> = view.iter().map(|r| metric.value(r)).collect();
    let series: Vec<f64> = period_totals(view, metric)
        .into_iter()
        .map(|(_, v)| v)
        .collect();
    Aggregate {
        value: metric.breakdown_aggregation().reduce(&values),
        trend_percent: trend_first_last(&series),
    }
}

/// `aggregate` for a metric named by the caller.
pub fn aggregate_named(view: &FilteredView<'_>, metric: &str) -> Result<Aggregate> {
    let metric: Metric = metric.parse()?;
    Ok(aggregate(view, metric))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use crate::types::fixtures::{record, with_sales};

    fn alpha(quotes: [u64; 3], sales: [u64; 3]) -> RecordStore {
        RecordStore::new(
            (0..3)
                .map(|i| with_sales(record("Alpha", 2024, i as u32 + 1), quotes[i], sales[i]))
                .collect(),
        )
    }

    #[test]
    fn closing_ratio_is_mean_of_rows_with_first_last_trend() {
        let store = alpha([100, 100, 200], [10, 20, 20]);
        let view = FilteredView::all(&store);
        let series: Vec<f64> = period_series(&view, Metric::ClosingRatio)
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(series, vec![10.0, 20.0, 10.0]);
        let agg = aggregate(&view, Metric::ClosingRatio);
        assert!((agg.value - 13.333_333).abs() < 1e-4);
        assert_eq!(agg.trend_percent, 0.0);
        assert_eq!(Metric::ClosingRatio.format_value(agg.value), "13.3%");
    }

    #[test]
    fn zero_first_value_guards_trend() {
        let store = alpha([0, 100, 100], [0, 10, 20]);
        let view = FilteredView::all(&store);
        let agg = aggregate(&view, Metric::ClosingRatio);
        assert_eq!(agg.trend_percent, 0.0);
        assert!(agg.trend_percent.is_finite());
        assert_eq!(agg.value, 10.0);
    }

    #[test]
    fn counts_sum_and_trend_across_periods() {
        let store = alpha([100, 100, 250], [10, 20, 20]);
        let view = FilteredView::all(&store);
        let agg = aggregate(&view, Metric::Quotes);
        assert_eq!(agg.value, 450.0);
        assert_eq!(agg.trend_percent, 150.0);
        assert_eq!(Metric::Quotes.format_value(agg.value), "450");
    }

    #[test]
    fn rows_in_the_same_period_are_bucketed() {
        let mut rows = vec![
            with_sales(record("A", 2024, 1), 10, 1),
            with_sales(record("B", 2024, 1), 30, 3),
            with_sales(record("A", 2024, 2), 80, 8),
        ];
        rows[1].channel = Some("Web".to_string());
        let store = RecordStore::new(rows);
        let view = FilteredView::all(&store);
        let series = period_series(&view, Metric::Quotes);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].1, 40.0);
        assert_eq!(aggregate(&view, Metric::Quotes).trend_percent, 100.0);
    }

    #[test]
    fn average_metrics_sum_in_the_kpi_aggregate() {
        let mut a = with_sales(record("A", 2024, 1), 10, 1);
        a.total_written_premium = 100.0;
        let mut b = with_sales(record("B", 2024, 1), 10, 1);
        b.total_written_premium = 300.0;
        let mut c = with_sales(record("A", 2024, 2), 10, 2);
        c.total_written_premium = 1000.0;
        let store = RecordStore::new(vec![a, b, c]);
        let view = FilteredView::all(&store);

        let agg = aggregate(&view, Metric::AvgPremium);
        assert_eq!(agg.value, 900.0);
        // Jan 100 + 300 = 400, Feb 500
        assert_eq!(agg.trend_percent, 25.0);
        assert_eq!(Metric::AvgPremium.format_value(agg.value), "900");

        // Charts and ranking still average per-row ratios.
        let series = period_series(&view, Metric::AvgPremium);
        assert_eq!(series[0].1, 200.0);
        assert_eq!(Metric::AvgPremium.reduce(&[100.0, 300.0]), 200.0);
        assert_eq!(Metric::ClosingRatio.breakdown_aggregation(), Aggregation::Mean);
    }

    #[test]
    fn empty_view_aggregates_to_zero() {
        let store = RecordStore::default();
        let view = FilteredView::all(&store);
        for m in Metric::ALL {
            let agg = aggregate(&view, m);
            assert_eq!(agg.value, 0.0);
            assert_eq!(agg.trend_percent, 0.0);
        }
    }

    #[test]
    fn trend_needs_two_points() {
        assert_eq!(trend_first_last(&[]), 0.0);
        assert_eq!(trend_first_last(&[5.0]), 0.0);
        assert_eq!(trend_first_last(&[4.0, 1.0, 5.0]), 25.0);
    }

    #[test]
    fn metric_names_resolve_or_fail() {
        assert_eq!("Written_Premiums".parse::<Metric>().unwrap(), Metric::WrittenPremiums);
        assert_eq!("average clv".parse::<Metric>().unwrap(), Metric::AvgClv);
        assert_eq!("closing ratio".parse::<Metric>().unwrap(), Metric::ClosingRatio);
        let store = RecordStore::default();
        let err = aggregate_named(&FilteredView::all(&store), "profit").unwrap_err();
        assert!(matches!(err, DashboardError::UnknownMetric { .. }));
        assert_eq!(
            parse_metric_list("quotes, sales").unwrap(),
            vec![Metric::Quotes, Metric::Sales]
        );
        assert!(parse_metric_list(" , ").is_err());
    }
}
