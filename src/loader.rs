use crate::error::Result;
use crate::store::RecordStore;
use crate::types::{RawRow, Record};
use crate::util::{clean_text, parse_count, parse_f64_safe, parse_money, parse_period};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub parse_errors: usize,
    pub bad_periods: usize,
    pub missing_group_names: usize,
}

pub fn load_and_clean<P: AsRef<Path>>(path: P) -> Result<(RecordStore, LoadReport)> {
    let path = path.as_ref();
    log::debug!("loading group performance data from {}", path.display());
    let rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    clean_rows(rdr)
}

/// Same as `load_and_clean` for any reader, e.g. an in-memory export.
pub fn load_from_reader<R: Read>(reader: R) -> Result<(RecordStore, LoadReport)> {
    let rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    clean_rows(rdr)
}

fn clean_rows<R: Read>(mut rdr: csv::Reader<R>) -> Result<(RecordStore, LoadReport)> {
    let mut report = LoadReport::default();
    let mut records: Vec<Record> = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(e) => {
                log::debug!("row {}: {}", report.total_rows, e);
                report.parse_errors += 1;
                continue;
            }
        };
        match clean_row(row) {
            Ok(record) => records.push(record),
            Err(Rejection::BadPeriod) => report.bad_periods += 1,
            Err(Rejection::MissingGroupName) => report.missing_group_names += 1,
        }
    }

    report.kept_rows = records.len();
    log::info!(
        "loaded {} of {} rows ({} bad periods, {} without group name, {} unreadable)",
        report.kept_rows,
        report.total_rows,
        report.bad_periods,
        report.missing_group_names,
        report.parse_errors
    );
    if records.is_empty() {
        log::warn!("record store is empty after cleaning");
    }
    Ok((RecordStore::new(records), report))
}

enum Rejection {
    BadPeriod,
    MissingGroupName,
}

fn clean_row(row: RawRow) -> std::result::Result<Record, Rejection> {
    let period = parse_period(row.fiscal_period_cd.as_deref()).ok_or(Rejection::BadPeriod)?;
    let group_name = clean_text(row.group_name).ok_or(Rejection::MissingGroupName)?;
    let group_id = clean_text(row.group_no).unwrap_or_else(|| group_name.clone());

    let written_premium_new = parse_money(row.prime_nwb.as_deref());
    let written_premium_renewal = parse_money(row.prime_ren.as_deref());
    let written_premium_cancel = parse_money(row.prime_can.as_deref());
    let written_premium_endorsement = parse_money(row.prime_end.as_deref());
    // Prefer the exported total; rebuild it from the parts when absent.
    let total_written_premium = parse_f64_safe(row.total_wp.as_deref()).unwrap_or(
        written_premium_new
            + written_premium_renewal
            + written_premium_cancel
            + written_premium_endorsement,
    );

    Ok(Record {
        period,
        group_id,
        group_name,
        marketing_tier: clean_text(row.marketing_tier),
        region: clean_text(row.region),
        product: clean_text(row.product),
        segment_type: clean_text(row.segment),
        channel: clean_text(row.incoming_channel),
        quotes: parse_count(row.nb_quote.as_deref()),
        new_business_count: parse_count(row.nb_nwb.as_deref()),
        renewal_count: parse_count(row.nb_ren.as_deref()),
        cancel_count: parse_count(row.nb_can.as_deref()),
        endorsement_count: parse_count(row.nb_end.as_deref()),
        written_premium_new,
        written_premium_renewal,
        written_premium_cancel,
        written_premium_endorsement,
        total_written_premium,
        inforce_clients: parse_count(row.inforce_clients.as_deref()),
    })
}
