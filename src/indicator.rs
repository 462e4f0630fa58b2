// Month-over-month trend indicators.
//
// Unlike the KPI table, which compares the first and last month of the
// selected range, an indicator compares the latest month with the one just
// before it.

use serde::Serialize;

use crate::filter::FilteredView;
use crate::metrics::{period_series, Metric};
use crate::types::IndicatorRow;
use crate::util::{format_signed_pct, pct_change};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    pub fn marker(&self) -> &'static str {
        match self {
            Direction::Up => "▲",
            Direction::Down => "▼",
            Direction::Flat => "→",
        }
    }
}

/// Color tag for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Tone {
    Positive,
    Negative,
    Neutral,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Positive => "positive",
            Tone::Negative => "negative",
            Tone::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Indicator {
    pub metric: Metric,
    pub pct: f64,
    pub direction: Direction,
    pub tone: Tone,
}

impl Indicator {
    pub fn from_pct(metric: Metric, pct: f64) -> Self {
        let (direction, tone) = if pct > 0.0 {
            (Direction::Up, Tone::Positive)
        } else if pct < 0.0 {
            (Direction::Down, Tone::Negative)
        } else {
            (Direction::Flat, Tone::Neutral)
        };
        Self {
            metric,
            pct,
            direction,
            tone,
        }
    }

    /// e.g. `▲ +4.2%`
    pub fn display(&self) -> String {
        format!("{} {}", self.direction.marker(), format_signed_pct(self.pct))
    }

    pub fn to_row(&self) -> IndicatorRow {
        IndicatorRow {
            metric: self.metric.label().to_string(),
            change: self.display(),
            tone: self.tone.as_str().to_string(),
        }
    }
}

/// Latest-vs-previous percent change; 0 with fewer than two points or a zero previous value.
pub fn latest_change(series: &[f64]) -> f64 {
    match series {
        [.., prev, curr] => pct_change(*prev, *curr),
        _ => 0.0,
    }
}

pub fn month_over_month(view: &FilteredView<'_>, metric: Metric) -> Indicator {
    let series: Vec<f64> = period_series(view, metric)
        .into_iter()
        .map(|(_, v)| v)
        .collect();
    Indicator::from_pct(metric, latest_change(&series))
}

pub fn indicators(view: &FilteredView<'_>, metrics: &[Metric]) -> Vec<Indicator> {
    metrics.iter().map(|m| month_over_month(view, *m)).collect()
}
