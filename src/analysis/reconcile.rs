//! Crisis-period views.
//!
//! The crisis dataset is ranked on its own terms. City sets of the two
//! datasets are compared for the report, but a mismatch is never an error.

use crate::analysis::aggregator::{
    aggregate, AggregateTable, GroupBy, Reduction, ReductionSpec, SortOrder,
};
use crate::error::Result;
use crate::models::{Dataset, Indicator};
use serde::Serialize;
use std::collections::BTreeSet;

/// Rank crisis cities by one metric, descending, ties by city name.
pub fn crisis_ranking(
    crisis: &Dataset,
    metric: Indicator,
    reduction: Reduction,
) -> Result<AggregateTable> {
    crisis_profile(crisis, &ReductionSpec::from([(metric, reduction)]), metric)
}

/// Rank crisis cities over several columns by `rank_by`.
pub fn crisis_profile(
    crisis: &Dataset,
    reductions: &ReductionSpec,
    rank_by: Indicator,
) -> Result<AggregateTable> {
    aggregate(crisis, GroupBy::City, reductions)?.sorted_by(rank_by, SortOrder::Descending)
}

/// Day-by-day evolution of the crisis.
pub fn crisis_daily(crisis: &Dataset, reductions: &ReductionSpec) -> Result<AggregateTable> {
    aggregate(crisis, GroupBy::Day, reductions)
}

/// How the city sets of the two datasets overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CityCoverage {
    /// Cities present in both datasets.
    pub shared: Vec<String>,
    /// Cities only tracked by the crisis dataset.
    pub crisis_only: Vec<String>,
    /// Primary cities with records inside the crisis window but no crisis records.
    pub primary_only: Vec<String>,
}

impl CityCoverage {
    pub fn is_aligned(&self) -> bool {
        self.crisis_only.is_empty() && self.primary_only.is_empty()
    }
}

/// Compare city sets, restricting the primary side to the crisis window.
pub fn city_coverage(primary: &Dataset, crisis: &Dataset) -> CityCoverage {
    let crisis_cities = crisis.cities();
    let all_primary = primary.cities();

    let windowed: BTreeSet<&str> = match crisis.date_range() {
        Some((start, end)) => primary
            .records()
            .iter()
            .filter(|r| r.date >= start && r.date <= end)
            .map(|r| r.city.as_str())
            .collect(),
        None => BTreeSet::new(),
    };

    let owned = |set: BTreeSet<&str>| set.into_iter().map(String::from).collect::<Vec<_>>();

    CityCoverage {
        shared: owned(crisis_cities.intersection(&all_primary).copied().collect()),
        crisis_only: owned(crisis_cities.difference(&all_primary).copied().collect()),
        primary_only: owned(windowed.difference(&crisis_cities).copied().collect()),
    }
}
