// Entry point and high-level CLI flow.
//
// - Option [1] loads and cleans the CSV, printing diagnostics.
// - Option [2] edits the filter selection (date range, groups, dropdowns,
//   top-N toggle).
// - Option [3] recomputes every dashboard output, previews it and exports it.
// - After generating reports, the user can choose to go back to the menu or exit.
use chrono::NaiveDate;
use insurance_dashboard::config::DashboardConfig;
use insurance_dashboard::filter::{Dimension, FilterSpec, Selection, ALL};
use insurance_dashboard::store::RecordStore;
use insurance_dashboard::util::{self, month_label};
use insurance_dashboard::{loader, output, reports, Result};
use std::io::{self, BufRead, Write};

/// Per-run state. The store is replaced wholesale on reload, never mutated.
struct Session {
    config: DashboardConfig,
    store: Option<RecordStore>,
    filter: FilterSpec,
    top_n_mode: bool,
}

/// One trimmed line from `input`; `None` at end of input.
fn read_trimmed_line<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) => None,
        Ok(_) => Some(buf.trim().to_string()),
        Err(e) => {
            log::warn!("failed to read input: {}", e);
            None
        }
    }
}

/// Print `label` and read one trimmed line. `None` once stdin is closed.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    read_trimmed_line(&mut io::stdin().lock())
}

/// Like `prompt`, but end of input reads as a blank answer.
fn prompt_or_blank(label: &str) -> String {
    prompt(label).unwrap_or_default()
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> Option<String> {
    prompt("Enter choice: ")
}

/// Ask the user whether to go back to the menu after generating reports.
///
/// Returns `true` if the user chose `Y`, `false` if they chose `N` or input ended.
fn prompt_back_to_menu() -> bool {
    loop {
        let Some(resp) = prompt("Back to Report Selection (Y/N): ") else {
            return false;
        };
        match resp.to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

/// Handle option [1]: load and clean the CSV file.
fn handle_load(session: &mut Session) {
    let path = session.config.data_path.clone();
    match loader::load_and_clean(&path) {
        Ok((store, report)) => {
            println!(
                "Processing dataset... ({} rows read, {} kept)",
                util::format_int(report.total_rows),
                util::format_int(report.kept_rows)
            );
            println!(
                "Note: {} rows skipped (bad period: {}, missing group: {}, unreadable: {}).",
                util::format_int(report.bad_periods + report.missing_group_names + report.parse_errors),
                util::format_int(report.bad_periods),
                util::format_int(report.missing_group_names),
                util::format_int(report.parse_errors)
            );
            if let Some((first, last)) = store.date_bounds() {
                println!("Periods available: {} to {}", month_label(first), month_label(last));
            }
            println!();
            session.store = Some(store);
            session.filter = FilterSpec::default();
        }
        Err(e) => {
            eprintln!("Failed to load file {}: {}\n", path.display(), e);
        }
    }
}

fn parse_month(s: &str) -> Option<NaiveDate> {
    util::parse_period(Some(s.replace('-', "").as_str()))
}

/// Handle option [2]: edit the filter selection. Blank input keeps "All".
fn handle_filters(session: &mut Session) {
    let Some(store) = session.store.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return;
    };

    let mut spec = FilterSpec::new();
    if let Some((first, last)) = store.date_bounds() {
        println!("Time Period ({} to {}), format YYYYMM", month_label(first), month_label(last));
        let start = parse_month(&prompt_or_blank("  From [blank = first]: ")).unwrap_or(first);
        let end = parse_month(&prompt_or_blank("  To   [blank = last]: ")).unwrap_or(last);
        spec = spec.with_date_range(start, end);
    }

    let groups = store.groups();
    println!("Groups: {} available (comma-separated ids, blank = all)", util::format_int(groups.len()));
    let picked = prompt_or_blank("  Group ids: ");
    spec = spec.with_groups(
        picked
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>(),
    );

    for dim in Dimension::ALL {
        let choices = store.choices(dim);
        println!("{}: {}, {}", dim.label(), ALL, choices.join(", "));
        let sel = Selection::parse(&prompt_or_blank(&format!("  {} [{}]: ", dim.label(), ALL)));
        spec = spec.with(dim, sel);
    }

    let toggle = prompt_or_blank(&format!("Show Top {} Affinity Groups? (y/N): ", session.config.top_n));
    session.top_n_mode = toggle.eq_ignore_ascii_case("y");
    session.filter = spec;
    println!();
}

/// Handle option [3]: recompute all outputs, preview and export them.
fn handle_generate_reports(session: &Session) -> Result<()> {
    let Some(store) = session.store.as_ref() else {
        println!("Error: No data loaded. Please load the CSV file first (option 1).\n");
        return Ok(());
    };

    let request = session.config.request(session.filter.clone(), session.top_n_mode);
    let report = reports::build_report(store, &request)?;
    let dir = &session.config.output_dir;
    std::fs::create_dir_all(dir)?;

    println!("Generating reports...");
    println!("Outputs saved to {}\n", dir.display());

    let file1 = dir.join("report1_kpi_table.csv");
    output::write_breakdown_csv(&file1, &report.kpi)?;
    println!("Report 1: KPI Data Table\n");
    output::preview_breakdown(&report.kpi);
    println!("(Full table exported to {})\n", file1.display());

    println!("Trend Analysis (Month-over-Month)\n");
    let indicator_rows: Vec<_> = report.indicators.iter().map(|i| i.to_row()).collect();
    output::preview_table_rows(&indicator_rows, indicator_rows.len());

    let file2 = dir.join("report2_group_monthly.csv");
    output::write_csv(&file2, &report.records)?;
    println!("Report 2: Group Performance Metrics\n");
    output::preview_table_rows(&report.records, 5);
    println!("(Full table exported to {})\n", file2.display());

    let file3 = dir.join("report3_top_groups.csv");
    let top_rows = report.ranking.to_rows();
    output::write_csv(&file3, &top_rows)?;
    println!("Report 3: Top Groups by Composite Score\n");
    output::preview_table_rows(&top_rows, 10);
    println!("(Full table exported to {})\n", file3.display());

    let file4 = dir.join("report4_group_comparison.csv");
    let bars: Vec<_> = report.top_comparison.iter().map(|g| g.to_row()).collect();
    output::write_csv(&file4, &bars)?;
    println!("Report 4: {} by Top Group\n", request.compare_metric.label());
    output::preview_table_rows(&bars, 10);
    println!("(Full table exported to {})\n", file4.display());

    let file5 = dir.join("report5_all_groups.csv");
    let all_bars: Vec<_> = report.group_comparison.iter().map(|g| g.to_row()).collect();
    output::write_csv(&file5, &all_bars)?;
    println!("Report 5: {} by Group\n", request.compare_metric.label());
    output::preview_table_rows(&all_bars, 5);
    println!("(Full table exported to {})\n", file5.display());

    output::write_json(dir.join("series.json"), &report.series)?;
    output::write_json(dir.join("summary.json"), &report.summary)?;
    println!("Summary Stats (summary.json):");
    println!(
        "{{\"total_records\": {}, \"total_groups\": {}, \"total_written_premium\": {}}}\n",
        util::format_int(report.summary.total_records),
        util::format_int(report.summary.total_groups),
        util::format_number(report.summary.total_written_premium, 2)
    );
    Ok(())
}

fn main() {
    env_logger::init();
    let config = match DashboardConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };
    log::debug!("configuration: {:?}", config);

    let mut session = Session {
        config,
        store: None,
        filter: FilterSpec::default(),
        top_n_mode: false,
    };

    loop {
        println!("Insurance Performance Dashboard:");
        println!("[1] Load the file");
        println!("[2] Set filters");
        println!("[3] Generate Reports\n");
        let Some(choice) = read_choice() else {
            println!("Exiting the program.");
            break;
        };
        match choice.as_str() {
            "1" => handle_load(&mut session),
            "2" => handle_filters(&mut session),
            "3" => {
                println!();
                if let Err(e) = handle_generate_reports(&session) {
                    eprintln!("Report error: {}\n", e);
                }
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            _ => {
                println!("Invalid choice. Please enter 1, 2 or 3.\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_input_reads_as_none() {
        let mut input = io::Cursor::new("  3 \nY\n");
        assert_eq!(read_trimmed_line(&mut input).as_deref(), Some("3"));
        assert_eq!(read_trimmed_line(&mut input).as_deref(), Some("Y"));
        assert_eq!(read_trimmed_line(&mut input), None);
        assert_eq!(read_trimmed_line(&mut io::empty()), None);
    }

    #[test]
    fn blank_line_is_not_end_of_input() {
        let mut input = io::Cursor::new("\n");
        assert_eq!(read_trimmed_line(&mut input).as_deref(), Some(""));
        assert_eq!(read_trimmed_line(&mut input), None);
    }
}
