use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::safe_div;

/// One line of the group performance export, exactly as it appears in the CSV.
///
/// Every field is optional text; cleaning happens in the loader.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(rename = "sqpmp_fiscal_period_cd", alias = "sqapp_fiscal_period_cd")]
    pub fiscal_period_cd: Option<String>,
    #[serde(rename = "parentgroupno")]
    pub group_no: Option<String>,
    #[serde(rename = "parentgroupname")]
    pub group_name: Option<String>,
    #[serde(rename = "grp_marketing_tier")]
    pub marketing_tier: Option<String>,
    #[serde(rename = "region")]
    pub region: Option<String>,
    #[serde(rename = "product")]
    pub product: Option<String>,
    #[serde(rename = "grp_segment")]
    pub segment: Option<String>,
    #[serde(rename = "incoming_channel")]
    pub incoming_channel: Option<String>,
    #[serde(rename = "nb_quote")]
    pub nb_quote: Option<String>,
    #[serde(rename = "nb_nwb")]
    pub nb_nwb: Option<String>,
    #[serde(rename = "nb_ren")]
    pub nb_ren: Option<String>,
    #[serde(rename = "nb_can")]
    pub nb_can: Option<String>,
    #[serde(rename = "nb_end")]
    pub nb_end: Option<String>,
    #[serde(rename = "prime_nwb")]
    pub prime_nwb: Option<String>,
    #[serde(rename = "prime_ren")]
    pub prime_ren: Option<String>,
    #[serde(rename = "prime_can")]
    pub prime_can: Option<String>,
    #[serde(rename = "prime_end")]
    pub prime_end: Option<String>,
    #[serde(rename = "total_wp")]
    pub total_wp: Option<String>,
    #[serde(rename = "inforce_clients")]
    pub inforce_clients: Option<String>,
}

/// A cleaned monthly fact for one group and one channel.
///
/// Derived metrics are methods rather than fields so they can never drift from
/// the counts they are computed from.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub period: NaiveDate,
    pub group_id: String,
    pub group_name: String,
    pub marketing_tier: Option<String>,
    pub region: Option<String>,
    pub product: Option<String>,
    pub segment_type: Option<String>,
    pub channel: Option<String>,
    pub quotes: u64,
    pub new_business_count: u64,
    pub renewal_count: u64,
    pub cancel_count: u64,
    pub endorsement_count: u64,
    pub written_premium_new: f64,
    pub written_premium_renewal: f64,
    pub written_premium_cancel: f64,
    pub written_premium_endorsement: f64,
    pub total_written_premium: f64,
    pub inforce_clients: u64,
}

impl Record {
    /// New business plus renewals, saturating at `u64::MAX`.
    pub fn sales(&self) -> u64 {
        self.new_business_count.saturating_add(self.renewal_count)
    }

    /// Sales per quote, in percent; 0 without quotes.
    pub fn closing_ratio(&self) -> f64 {
        safe_div(self.sales() as f64, self.quotes as f64) * 100.0
    }

    /// Written premium per sale; net-negative premium (heavy cancellations) floors at 0.
    pub fn avg_premium(&self) -> f64 {
        safe_div(self.total_written_premium, self.sales() as f64).max(0.0)
    }

    /// Written premium per inforce client, floored at 0 like `avg_premium`.
    pub fn avg_clv(&self) -> f64 {
        safe_div(self.total_written_premium, self.inforce_clients as f64).max(0.0)
    }
}

/// Filtered record projected for the "Group Performance Metrics" table.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupMonthlyRow {
    #[serde(rename = "Group ID")]
    #[tabled(rename = "Group ID")]
    pub group_id: String,
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Channel")]
    #[tabled(rename = "Channel")]
    pub channel: String,
    #[serde(rename = "Quotes")]
    #[tabled(rename = "Quotes")]
    pub quotes: u64,
    #[serde(rename = "Sales")]
    #[tabled(rename = "Sales")]
    pub sales: u64,
    #[serde(rename = "Written Premiums")]
    #[tabled(rename = "Written Premiums")]
    pub written_premiums: String,
    #[serde(rename = "Closing Ratio")]
    #[tabled(rename = "Closing Ratio")]
    pub closing_ratio: String,
    #[serde(rename = "Average Premium")]
    #[tabled(rename = "Average Premium")]
    pub avg_premium: String,
    #[serde(rename = "Average CLV")]
    #[tabled(rename = "Average CLV")]
    pub avg_clv: String,
}

/// One line of the "Top Groups" table.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct TopGroupRow {
    #[serde(rename = "Rank")]
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[serde(rename = "Group ID")]
    #[tabled(rename = "Group ID")]
    pub group_id: String,
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Metrics")]
    #[tabled(rename = "Metrics")]
    pub metrics: String,
    #[serde(rename = "CompositeScore")]
    #[tabled(rename = "CompositeScore")]
    pub composite_score: String,
}

/// One bar of a group comparison chart.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct GroupComparisonRow {
    #[serde(rename = "Group ID")]
    #[tabled(rename = "Group ID")]
    pub group_id: String,
    #[serde(rename = "Group")]
    #[tabled(rename = "Group")]
    pub group: String,
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
}

/// One month-over-month indicator line.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct IndicatorRow {
    #[serde(rename = "Metric")]
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[serde(rename = "Change")]
    #[tabled(rename = "Change")]
    pub change: String,
    #[serde(rename = "Tone")]
    #[tabled(rename = "Tone")]
    pub tone: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub total_groups: usize,
    pub first_period: Option<NaiveDate>,
    pub last_period: Option<NaiveDate>,
    pub total_quotes: u64,
    pub total_sales: u64,
    pub total_written_premium: f64,
    pub top_groups: Vec<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::Record;
    use chrono::NaiveDate;

    /// A record with every count and amount at zero, for tests to fill in.
    pub fn record(group: &str, year: i32, month: u32) -> Record {
        Record {
            period: NaiveDate::from_ymd_opt(year, month, 1).unwrap(),
            group_id: group.to_string(),
            group_name: format!("{} Group", group),
            marketing_tier: Some("Gold".to_string()),
            region: Some("East".to_string()),
            product: Some("Auto".to_string()),
            segment_type: Some("Affinity".to_string()),
            channel: Some("In".to_string()),
            quotes: 0,
            new_business_count: 0,
            renewal_count: 0,
            cancel_count: 0,
            endorsement_count: 0,
            written_premium_new: 0.0,
            written_premium_renewal: 0.0,
            written_premium_cancel: 0.0,
            written_premium_endorsement: 0.0,
            total_written_premium: 0.0,
            inforce_clients: 0,
        }
    }

    pub fn with_sales(mut r: Record, quotes: u64, sales: u64) -> Record {
        r.quotes = quotes;
        r.new_business_count = sales;
        r
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{record, with_sales};

    #[test]
    fn derived_ratios_are_guarded() {
        let r = record("A", 2024, 1);
        assert_eq!(r.closing_ratio(), 0.0);
        assert_eq!(r.avg_premium(), 0.0);
        assert_eq!(r.avg_clv(), 0.0);
    }

    #[test]
    fn derived_ratios_from_counts() {
        let mut r = with_sales(record("A", 2024, 1), 200, 30);
        r.renewal_count = 10;
        r.total_written_premium = 8000.0;
        r.inforce_clients = 16;
        assert_eq!(r.sales(), 40);
        assert_eq!(r.closing_ratio(), 20.0);
        assert_eq!(r.avg_premium(), 200.0);
        assert_eq!(r.avg_clv(), 500.0);
    }

    #[test]
    fn oversized_counts_saturate() {
        let mut r = with_sales(record("A", 2024, 1), 10, u64::MAX);
        r.renewal_count = 1;
        assert_eq!(r.sales(), u64::MAX);
        assert!(r.closing_ratio().is_finite());
    }

    #[test]
    fn net_negative_premium_floors_at_zero() {
        let mut r = with_sales(record("A", 2024, 1), 10, 5);
        r.total_written_premium = -250.0;
        r.inforce_clients = 4;
        assert_eq!(r.avg_premium(), 0.0);
        assert_eq!(r.avg_clv(), 0.0);
    }
}
