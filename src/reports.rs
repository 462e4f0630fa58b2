use crate::breakdown::{kpi_table, BreakdownTable, CategoryMode, ChannelSlice};
use crate::error::Result;
use crate::filter::{apply, FilterSpec, FilteredView};
use crate::indicator::{indicators, Indicator};
use crate::metrics::{period_series, Metric};
use crate::ranking::{group_comparison, rank, GroupAggregate, Ranking};
use crate::store::RecordStore;
use crate::types::{GroupMonthlyRow, SummaryStats};
use crate::util::{format_number, month_label};
use chrono::NaiveDate;
use serde::Serialize;

/// Everything the presentation layer supplies for one recomputation.
#[derive(Debug, Clone)]
pub struct DashboardRequest {
    pub filter: FilterSpec,
    /// Show only the top-N affinity groups in the KPI table.
    pub top_n_mode: bool,
    pub top_n: usize,
    pub trend_metrics: Vec<Metric>,
    pub ranking_metrics: Vec<Metric>,
    pub compare_metric: Metric,
    pub slices: Vec<ChannelSlice>,
}

impl Default for DashboardRequest {
    fn default() -> Self {
        Self {
            filter: FilterSpec::default(),
            top_n_mode: false,
            top_n: 30,
            trend_metrics: vec![Metric::WrittenPremiums, Metric::AvgPremium, Metric::AvgClv],
            ranking_metrics: vec![Metric::Quotes, Metric::Sales, Metric::ClosingRatio],
            compare_metric: Metric::Quotes,
            slices: ChannelSlice::defaults(),
        }
    }
}

impl DashboardRequest {
    pub fn category_mode(&self) -> CategoryMode {
        if self.top_n_mode {
            CategoryMode::TopAffinity(self.top_n)
        } else {
            CategoryMode::SegmentSplit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSeries {
    pub metric: Metric,
    pub points: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone)]
pub struct DashboardReport {
    pub records: Vec<GroupMonthlyRow>,
    pub kpi: BreakdownTable,
    pub indicators: Vec<Indicator>,
    pub series: Vec<MetricSeries>,
    pub ranking: Ranking,
    /// Bars for the top-groups chart, in the same order as `ranking`.
    pub top_comparison: Vec<GroupAggregate>,
    /// Bars for the all-groups comparison chart.
    pub group_comparison: Vec<GroupAggregate>,
    pub summary: SummaryStats,
}

/// Run one full recomputation pass for `request` against `store`.
///
/// Pure with respect to the store: nothing is cached between calls.
pub fn build_report(store: &RecordStore, request: &DashboardRequest) -> Result<DashboardReport> {
    let view = apply(store, &request.filter);
    log::debug!("recomputing dashboard over {} rows", view.len());

    let kpi = kpi_table(&view, request.category_mode(), &request.slices)?;
    let ranking = rank(&view, &request.ranking_metrics, request.top_n)?;
    let top_comparison = ranking.comparison(&view, request.compare_metric);

    Ok(DashboardReport {
        records: group_monthly_rows(&view),
        kpi,
        indicators: indicators(&view, &request.trend_metrics),
        series: chart_series(&view, &request.trend_metrics),
        top_comparison,
        group_comparison: group_comparison(&view, request.compare_metric),
        summary: generate_summary(&view, &ranking),
        ranking,
    })
}

/// Filtered rows projected for direct tabular display.
pub fn group_monthly_rows(view: &FilteredView<'_>) -> Vec<GroupMonthlyRow> {
    view.iter()
        .map(|r| GroupMonthlyRow {
            group_id: r.group_id.clone(),
            group: r.group_name.clone(),
            month: month_label(r.period),
            channel: r.channel.clone().unwrap_or_default(),
            quotes: r.quotes,
            sales: r.sales(),
            written_premiums: format_number(r.total_written_premium, 2),
            closing_ratio: format!("{:.2}", r.closing_ratio()),
            avg_premium: format_number(r.avg_premium(), 2),
            avg_clv: format_number(r.avg_clv(), 2),
        })
        .collect()
}

/// Monthly series for the sales/closing chart plus the selected trend metrics.
pub fn chart_series(view: &FilteredView<'_>, trend_metrics: &[Metric]) -> Vec<MetricSeries> {
    let mut metrics = vec![Metric::Quotes, Metric::Sales, Metric::ClosingRatio];
    for m in trend_metrics {
        if !metrics.contains(m) {
            metrics.push(*m);
        }
    }
    metrics
        .into_iter()
        .map(|metric| MetricSeries {
            metric,
            points: period_series(view, metric),
        })
        .collect()
}

pub fn generate_summary(view: &FilteredView<'_>, ranking: &Ranking) -> SummaryStats {
    let first_period = view.iter().map(|r| r.period).min();
    SummaryStats {
        total_records: view.len(),
        total_groups: view.distinct_groups(),
        first_period,
        last_period: view.latest_period(),
        total_quotes: view.iter().fold(0u64, |acc, r| acc.saturating_add(r.quotes)),
        total_sales: view.iter().fold(0u64, |acc, r| acc.saturating_add(r.sales())),
        total_written_premium: view.iter().map(|r| r.total_written_premium).sum(),
        top_groups: ranking.group_ids(),
    }
}
