// The wide KPI table: metrics × channel slices down the side, categories
// (segment partitions or the top-N affinity groups) across the top.
//
// Each category contributes a value column and a first-vs-last trend column.
// Category order is declaration order and is never resorted.

use serde::Serialize;

use crate::error::Result;
use crate::filter::{Dimension, FilteredView};
use crate::metrics::{aggregate, Metric};
use crate::ranking::rank_groups;
use crate::util::{format_signed_pct, month_label};

pub const AFFINITY: &str = "Affinity";
pub const DIRECT_MARKET: &str = "Direct Market";
pub const TOTAL: &str = "Total";

/// A channel sub-split shown as an indented row under each metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSlice {
    pub label: String,
    /// Value of the record's `channel` field this slice keeps.
    pub channel: String,
}

impl ChannelSlice {
    pub fn new(label: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            channel: channel.into(),
        }
    }

    /// Phone quotes arrive on the `In` channel.
    pub fn defaults() -> Vec<ChannelSlice> {
        vec![ChannelSlice::new("Phone", "In"), ChannelSlice::new("Web", "Web")]
    }
}

/// How the view is partitioned into column groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMode {
    /// Affinity, Direct Market, Total.
    SegmentSplit,
    /// A single category: the top-N affinity groups by quotes.
    TopAffinity(usize),
}

#[derive(Debug, Clone)]
pub struct Category<'a> {
    pub name: String,
    pub view: FilteredView<'a>,
}

impl<'a> Category<'a> {
    pub fn new(name: impl Into<String>, view: FilteredView<'a>) -> Self {
        Self {
            name: name.into(),
            view,
        }
    }
}

/// Partition `view` into named categories.
pub fn categories<'a>(view: &FilteredView<'a>, mode: CategoryMode) -> Result<Vec<Category<'a>>> {
    match mode {
        CategoryMode::SegmentSplit => Ok(vec![
            Category::new(AFFINITY, view.where_eq(Dimension::SegmentType, AFFINITY)),
            Category::new(DIRECT_MARKET, view.where_eq(Dimension::SegmentType, DIRECT_MARKET)),
            Category::new(TOTAL, view.clone()),
        ]),
        CategoryMode::TopAffinity(n) => {
            let affinity = view.where_eq(Dimension::SegmentType, AFFINITY);
            let top = rank_groups(&affinity, &[Metric::Quotes], n)?;
            let top_view = affinity.restrict_by(|r| top.contains(&r.group_id));
            Ok(vec![Category::new(format!("Top {} {}", n, AFFINITY), top_view)])
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownCell {
    pub category: String,
    pub value: f64,
    pub trend_percent: f64,
    pub value_text: String,
    pub trend_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub metric: Metric,
    /// `None` for the all-channel row, otherwise the slice label.
    pub slice: Option<String>,
    pub label: String,
    pub cells: Vec<BreakdownCell>,
}

impl BreakdownRow {
    pub fn cell(&self, category: &str) -> Option<&BreakdownCell> {
        self.cells.iter().find(|c| c.category == category)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownTable {
    pub columns: Vec<String>,
    pub rows: Vec<BreakdownRow>,
}

impl BreakdownTable {
    /// Rows as plain strings, aligned with `columns`.
    pub fn to_records(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                let mut rec = vec![row.label.clone()];
                for c in &row.cells {
                    rec.push(c.value_text.clone());
                    rec.push(c.trend_text.clone());
                }
                rec
            })
            .collect()
    }

    pub fn row(&self, metric: Metric, slice: Option<&str>) -> Option<&BreakdownRow> {
        self.rows
            .iter()
            .find(|r| r.metric == metric && r.slice.as_deref() == slice)
    }
}

fn cell(category: &Category<'_>, metric: Metric) -> BreakdownCell {
    let agg = aggregate(&category.view, metric);
    BreakdownCell {
        category: category.name.clone(),
        value: agg.value,
        trend_percent: agg.trend_percent,
        value_text: metric.format_value(agg.value),
        trend_text: format_signed_pct(agg.trend_percent),
    }
}

/// Build the KPI table over `categories` for each metric, followed by one
/// indented sub-row per channel slice.
///
/// `view` only supplies the latest month for the value column headers.
pub fn build_breakdown(
    view: &FilteredView<'_>,
    metrics: &[Metric],
    categories: &[Category<'_>],
    slices: &[ChannelSlice],
) -> BreakdownTable {
    let month = view.latest_period().map(month_label).unwrap_or_default();
    let mut columns = vec!["Metrics".to_string()];
    for c in categories {
        columns.push(format!("{} {}", c.name, month).trim_end().to_string());
        columns.push(format!("{} YoY", c.name));
    }

    let mut rows = Vec::with_capacity(metrics.len() * (slices.len() + 1));
    for &metric in metrics {
        rows.push(BreakdownRow {
            metric,
            slice: None,
            label: metric.label().to_string(),
            cells: categories.iter().map(|c| cell(c, metric)).collect(),
        });
        for slice in slices {
            let cells = categories
                .iter()
                .map(|c| {
                    let sub = Category::new(
                        c.name.clone(),
                        c.view.where_eq(Dimension::Channel, &slice.channel),
                    );
                    cell(&sub, metric)
                })
                .collect();
            rows.push(BreakdownRow {
                metric,
                slice: Some(slice.label.clone()),
                label: format!("   {}", slice.label),
                cells,
            });
        }
    }
    log::debug!(
        "breakdown: {} rows x {} categories over {} records",
        rows.len(),
        categories.len(),
        view.len()
    );
    BreakdownTable { columns, rows }
}

/// Categories and table in one call, as the KPI panel uses them.
pub fn kpi_table(
    view: &FilteredView<'_>,
    mode: CategoryMode,
    slices: &[ChannelSlice],
) -> Result<BreakdownTable> {
    let cats = categories(view, mode)?;
    Ok(build_breakdown(view, &Metric::ALL, &cats, slices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RecordStore;
    use crate::types::fixtures::{record, with_sales};
    use crate::types::Record;

    fn row(group: &str, month: u32, segment: &str, channel: &str, quotes: u64, sales: u64) -> Record {
        let mut r = with_sales(record(group, 2024, month), quotes, sales);
        r.segment_type = Some(segment.to_string());
        r.channel = Some(channel.to_string());
        r
    }

    fn store() -> RecordStore {
        RecordStore::new(vec![
            row("A", 1, AFFINITY, "In", 100, 10),
            row("A", 2, AFFINITY, "Web", 150, 30),
            row("D", 1, DIRECT_MARKET, "Web", 40, 4),
            row("D", 2, DIRECT_MARKET, "In", 60, 3),
        ])
    }

    #[test]
    fn columns_follow_category_declaration_order() {
        let store = store();
        let view = FilteredView::all(&store);
        let table = kpi_table(&view, CategoryMode::SegmentSplit, &ChannelSlice::defaults()).unwrap();
        assert_eq!(
            table.columns,
            vec![
                "Metrics",
                "Affinity Feb 2024",
                "Affinity YoY",
                "Direct Market Feb 2024",
                "Direct Market YoY",
                "Total Feb 2024",
                "Total YoY",
            ]
        );
        assert_eq!(table.rows.len(), Metric::ALL.len() * 3);
        assert_eq!(table.rows[0].label, "Quotes");
        assert_eq!(table.rows[1].label, "   Phone");
        assert_eq!(table.rows[2].label, "   Web");
        assert_eq!(table.rows[3].label, "Sales");
    }

    #[test]
    fn values_and_trends_per_category() {
        let store = store();
        let view = FilteredView::all(&store);
        let table = kpi_table(&view, CategoryMode::SegmentSplit, &ChannelSlice::defaults()).unwrap();

        let quotes = table.row(Metric::Quotes, None).unwrap();
        let aff = quotes.cell(AFFINITY).unwrap();
        assert_eq!(aff.value_text, "250");
        assert_eq!(aff.trend_text, "+50.0%");
        let total = quotes.cell(TOTAL).unwrap();
        assert_eq!(total.value, 350.0);
        // Jan 140 -> Feb 210
        assert_eq!(total.trend_text, "+50.0%");

        let phone = table.row(Metric::Quotes, Some("Phone")).unwrap();
        assert_eq!(phone.cell(AFFINITY).unwrap().value_text, "100");
        assert_eq!(phone.cell(AFFINITY).unwrap().trend_text, "+0.0%");
        assert_eq!(phone.cell(TOTAL).unwrap().value, 160.0);

        let cr = table.row(Metric::ClosingRatio, None).unwrap();
        // Direct Market rows: 10% then 5%
        let dm = cr.cell(DIRECT_MARKET).unwrap();
        assert_eq!(dm.value_text, "7.5%");
        assert_eq!(dm.trend_text, "-50.0%");
    }

    #[test]
    fn average_premium_cells_sum_row_values() {
        let mut a = row("A", 1, AFFINITY, "In", 10, 1);
        a.total_written_premium = 100.0;
        let mut b = row("B", 1, AFFINITY, "In", 10, 1);
        b.total_written_premium = 300.0;
        let store = RecordStore::new(vec![a, b]);
        let view = FilteredView::all(&store);
        let table = kpi_table(&view, CategoryMode::SegmentSplit, &[]).unwrap();

        let avg = table.row(Metric::AvgPremium, None).unwrap();
        assert_eq!(avg.cell(TOTAL).unwrap().value_text, "400");
        assert_eq!(avg.cell(AFFINITY).unwrap().value_text, "400");
        assert_eq!(avg.cell(DIRECT_MARKET).unwrap().value_text, "0");
        let cr = table.row(Metric::ClosingRatio, None).unwrap();
        assert_eq!(cr.cell(TOTAL).unwrap().value_text, "10.0%");
    }

    #[test]
    fn top_affinity_mode_is_a_single_category() {
        let store = RecordStore::new(vec![
            row("A", 1, AFFINITY, "In", 100, 10),
            row("B", 1, AFFINITY, "In", 300, 10),
            row("C", 1, AFFINITY, "In", 200, 10),
            row("D", 1, DIRECT_MARKET, "In", 900, 10),
        ]);
        let view = FilteredView::all(&store);
        let cats = categories(&view, CategoryMode::TopAffinity(2)).unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].name, "Top 2 Affinity");
        let mut ids: Vec<&str> = cats[0].view.iter().map(|r| r.group_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["B", "C"]);

        let table = build_breakdown(&view, &[Metric::Quotes], &cats, &[]);
        assert_eq!(table.columns, vec!["Metrics", "Top 2 Affinity Jan 2024", "Top 2 Affinity YoY"]);
        assert_eq!(table.to_records(), vec![vec!["Quotes", "500", "+0.0%"]]);
    }

    #[test]
    fn empty_view_renders_zeros() {
        let store = RecordStore::default();
        let view = FilteredView::all(&store);
        let table = kpi_table(&view, CategoryMode::SegmentSplit, &ChannelSlice::defaults()).unwrap();
        assert_eq!(table.columns[1], "Affinity");
        for row in &table.rows {
            for c in &row.cells {
                assert_eq!(c.value, 0.0);
                assert_eq!(c.trend_text, "+0.0%");
            }
        }
        let cr = table.row(Metric::ClosingRatio, None).unwrap();
        assert_eq!(cr.cells[0].value_text, "0.0%");
    }
}
