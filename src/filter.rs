// Declarative filtering of the record store.
//
// A `FilterSpec` lowers to a list of independent `Predicate`s that are ANDed
// together, so the order in which they are applied never changes the result.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::DashboardError;
use crate::store::RecordStore;
use crate::types::Record;

/// Sentinel accepted from dropdowns meaning "no restriction".
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dimension {
    MarketingTier,
    Region,
    Product,
    SegmentType,
    Channel,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::MarketingTier,
        Dimension::Region,
        Dimension::Product,
        Dimension::SegmentType,
        Dimension::Channel,
    ];

    pub fn value_of<'a>(&self, r: &'a Record) -> Option<&'a str> {
        let v = match self {
            Dimension::MarketingTier => &r.marketing_tier,
            Dimension::Region => &r.region,
            Dimension::Product => &r.product,
            Dimension::SegmentType => &r.segment_type,
            Dimension::Channel => &r.channel,
        };
        v.as_deref()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::MarketingTier => "Marketing Tier",
            Dimension::Region => "Region",
            Dimension::Product => "Product",
            Dimension::SegmentType => "Segment",
            Dimension::Channel => "Channel",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Dimension {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match key.as_str() {
            "marketing_tier" | "tier" => Ok(Dimension::MarketingTier),
            "region" => Ok(Dimension::Region),
            "product" => Ok(Dimension::Product),
            "segment_type" | "segment" => Ok(Dimension::SegmentType),
            "channel" => Ok(Dimension::Channel),
            _ => Err(DashboardError::UnknownDimension { name: s.to_string() }),
        }
    }
}

/// A dropdown selection: either no restriction or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    All,
    Value(String),
}

impl Selection {
    /// Interpret raw control input; blank and `"All"` mean no restriction.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == ALL {
            Selection::All
        } else {
            Selection::Value(s.to_string())
        }
    }
}

/// One atomic row test.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    DateRange(NaiveDate, NaiveDate),
    GroupIn(BTreeSet<String>),
    Equals(Dimension, String),
}

impl Predicate {
    pub fn matches(&self, r: &Record) -> bool {
        match self {
            Predicate::DateRange(start, end) => *start <= r.period && r.period <= *end,
            Predicate::GroupIn(groups) => groups.contains(&r.group_id),
            Predicate::Equals(dim, value) => dim.value_of(r) == Some(value.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    /// Inclusive period range; `None` keeps every period.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    /// Group ids to keep; empty keeps every group.
    pub groups: BTreeSet<String>,
    pub categorical: BTreeMap<Dimension, Selection>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some((start, end));
        self
    }

    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups = groups.into_iter().map(Into::into).collect();
        self
    }

    pub fn with(mut self, dimension: Dimension, selection: Selection) -> Self {
        self.categorical.insert(dimension, selection);
        self
    }

    /// Lower the spec into independent predicates; no-op selections are omitted.
    pub fn predicates(&self) -> Vec<Predicate> {
        let mut out = Vec::new();
        if let Some((start, end)) = self.date_range {
            out.push(Predicate::DateRange(start, end));
        }
        if !self.groups.is_empty() {
            out.push(Predicate::GroupIn(self.groups.clone()));
        }
        for (dim, sel) in &self.categorical {
            if let Selection::Value(v) = sel {
                out.push(Predicate::Equals(*dim, v.clone()));
            }
        }
        out
    }
}

/// A borrowed, period-ordered subset of a `RecordStore`.
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    rows: Vec<&'a Record>,
}

impl<'a> FilteredView<'a> {
    pub fn from_rows(rows: Vec<&'a Record>) -> Self {
        Self { rows }
    }

    /// Every row of the store.
    pub fn all(store: &'a RecordStore) -> Self {
        Self {
            rows: store.records().iter().collect(),
        }
    }

    pub fn rows(&self) -> &[&'a Record] {
        &self.rows
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sub-view of rows matching `pred`; the parent view is untouched.
    pub fn restrict(&self, pred: &Predicate) -> FilteredView<'a> {
        self.restrict_by(|r| pred.matches(r))
    }

    pub fn restrict_by<F>(&self, mut keep: F) -> FilteredView<'a>
    where
        F: FnMut(&Record) -> bool,
    {
        Self {
            rows: self.rows.iter().copied().filter(|r| keep(*r)).collect(),
        }
    }

    pub fn where_eq(&self, dimension: Dimension, value: &str) -> FilteredView<'a> {
        self.restrict_by(|r| dimension.value_of(r) == Some(value))
    }

    /// Latest period present in the view.
    pub fn latest_period(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.period).max()
    }

    pub fn distinct_groups(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.group_id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Apply a filter spec to the store.
pub fn apply<'a>(store: &'a RecordStore, spec: &FilterSpec) -> FilteredView<'a> {
    let predicates = spec.predicates();
    let view = apply_predicates(store, &predicates);
    log::debug!(
        "filter: {} predicates kept {} of {} rows",
        predicates.len(),
        view.len(),
        store.len()
    );
    view
}

/// Apply predicates one after another, narrowing the view at each step.
pub fn apply_predicates<'a>(store: &'a RecordStore, predicates: &[Predicate]) -> FilteredView<'a> {
    predicates
        .iter()
        .fold(FilteredView::all(store), |view, p| view.restrict(p))
}
