// Runtime configuration, read from the environment (and `.env` if present).

use std::path::PathBuf;

use crate::breakdown::ChannelSlice;
use crate::error::{DashboardError, Result};
use crate::filter::FilterSpec;
use crate::metrics::{parse_metric_list, Metric};
use crate::reports::DashboardRequest;

pub const ENV_DATA: &str = "DASHBOARD_DATA";
pub const ENV_OUTPUT_DIR: &str = "DASHBOARD_OUTPUT_DIR";
pub const ENV_TOP_N: &str = "DASHBOARD_TOP_N";
pub const ENV_RANKING_METRICS: &str = "DASHBOARD_RANKING_METRICS";
pub const ENV_TREND_METRICS: &str = "DASHBOARD_TREND_METRICS";
pub const ENV_COMPARE_METRIC: &str = "DASHBOARD_COMPARE_METRIC";

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    pub top_n: usize,
    pub ranking_metrics: Vec<Metric>,
    pub trend_metrics: Vec<Metric>,
    pub compare_metric: Metric,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data.csv"),
            output_dir: PathBuf::from("."),
            top_n: 30,
            ranking_metrics: vec![Metric::Quotes, Metric::Sales, Metric::ClosingRatio],
            trend_metrics: vec![Metric::WrittenPremiums, Metric::AvgPremium, Metric::AvgClv],
            compare_metric: Metric::Quotes,
        }
    }
}

impl DashboardConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(v) = lookup(ENV_DATA) {
            cfg.data_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_OUTPUT_DIR) {
            cfg.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_TOP_N) {
            cfg.top_n = v.trim().parse().map_err(|_| DashboardError::Config {
                key: ENV_TOP_N.to_string(),
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup(ENV_RANKING_METRICS) {
            cfg.ranking_metrics = parse_metric_list(&v)?;
        }
        if let Some(v) = lookup(ENV_TREND_METRICS) {
            cfg.trend_metrics = parse_metric_list(&v)?;
        }
        if let Some(v) = lookup(ENV_COMPARE_METRIC) {
            cfg.compare_metric = v.parse()?;
        }
        Ok(cfg)
    }

    /// A recomputation request carrying this config's metric choices.
    pub fn request(&self, filter: FilterSpec, top_n_mode: bool) -> DashboardRequest {
        DashboardRequest {
            filter,
            top_n_mode,
            top_n: self.top_n,
            trend_metrics: self.trend_metrics.clone(),
            ranking_metrics: self.ranking_metrics.clone(),
            compare_metric: self.compare_metric,
            slices: ChannelSlice::defaults(),
        }
    }
}
