use crate::breakdown::BreakdownTable;
use crate::error::Result;
use serde::Serialize;
use std::path::Path;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize, P: AsRef<Path>>(path: P, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

/// The KPI table has dynamic columns, so it is written record by record.
pub fn write_breakdown_csv<P: AsRef<Path>>(path: P, table: &BreakdownTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(&table.columns)?;
    for rec in table.to_records() {
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn render_breakdown(table: &BreakdownTable) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.columns.clone());
    for rec in table.to_records() {
        builder.push_record(rec);
    }
    builder.build().with(Style::markdown()).to_string()
}

pub fn preview_breakdown(table: &BreakdownTable) {
    if table.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    println!("{}\n", render_breakdown(table));
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakdown::{build_breakdown, Category};
    use crate::filter::FilteredView;
    use crate::metrics::Metric;
    use crate::store::RecordStore;
    use crate::types::fixtures::{record, with_sales};

    #[test]
    fn renders_breakdown_as_markdown() {
        let store = RecordStore::new(vec![with_sales(record("A", 2024, 5), 12, 3)]);
        let view = FilteredView::all(&store);
        let cats = vec![Category::new("Total", view.clone())];
        let table = build_breakdown(&view, &[Metric::Quotes, Metric::ClosingRatio], &cats, &[]);
        let text = render_breakdown(&table);
        assert!(text.contains("Total May 2024"));
        assert!(text.contains("Total YoY"));
        assert!(text.contains("25.0%"));
        assert!(text.contains("+0.0%"));
    }
}
