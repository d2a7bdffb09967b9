//! Grouped aggregation of indicator values.
//!
//! This module partitions a dataset by a grouping key and reduces each
//! requested indicator with an explicit reduction. Tables are immutable and
//! recomputing with the same inputs yields identical rows in key order.

use crate::error::{FloodError, Result};
use crate::models::{Dataset, EventRecord, Indicator, DATE_FORMAT};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Dimension used to partition records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// Calendar year
    Year,
    /// Calendar month 1-12, folded across years
    Month,
    /// Calendar day
    Day,
    /// Literal region value
    Region,
    /// Literal city value
    City,
}

impl GroupBy {
    /// Header for the key column.
    pub fn key_label(&self) -> &'static str {
        match self {
            GroupBy::Year => "Year",
            GroupBy::Month => "Month",
            GroupBy::Day => "Date",
            GroupBy::Region => "Region",
            GroupBy::City => "City",
        }
    }

    fn key_for(&self, record: &EventRecord) -> Option<GroupKey> {
        match self {
            GroupBy::Year => Some(GroupKey::Year(record.date.year())),
            GroupBy::Month => Some(GroupKey::Month(record.date.month())),
            GroupBy::Day => Some(GroupKey::Day(record.date)),
            GroupBy::Region => record.region.clone().map(GroupKey::Name),
            GroupBy::City => Some(GroupKey::Name(record.city.clone())),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "by-{}", self.key_label().to_lowercase())
    }
}

/// Grouping key value. Keys within one table share a variant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum GroupKey {
    Year(i32),
    Month(u32),
    Day(NaiveDate),
    Name(String),
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Year(year) => write!(f, "{}", year),
            GroupKey::Month(month) => {
                let name = MONTH_NAMES
                    .get((*month as usize).wrapping_sub(1))
                    .copied()
                    .unwrap_or("?");
                write!(f, "{}", name)
            }
            GroupKey::Day(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            GroupKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Reduction applied to one indicator within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Sum,
    Mean,
    Max,
}

impl fmt::Display for Reduction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reduction::Sum => write!(f, "sum"),
            Reduction::Mean => write!(f, "mean"),
            Reduction::Max => write!(f, "max"),
        }
    }
}

/// Indicator to reduction mapping. Result columns follow indicator order.
pub type ReductionSpec = BTreeMap<Indicator, Reduction>;

/// Direction for an explicit sort by a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One reduced column of an aggregate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AggregateColumn {
    pub indicator: Indicator,
    pub reduction: Reduction,
}

impl AggregateColumn {
    /// Header text, e.g. `Displaced (sum)`.
    pub fn header(&self) -> String {
        format!("{} ({})", self.indicator.label(), self.reduction)
    }
}

/// One group of an aggregate table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key: GroupKey,
    /// Number of records in the group.
    pub count: usize,
    /// Reduced values, full precision, aligned with the table columns.
    pub values: Vec<f64>,
}

/// Keyed table of reduced indicator values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateTable {
    group_by: GroupBy,
    columns: Vec<AggregateColumn>,
    rows: Vec<AggregateRow>,
}

impl AggregateTable {
    pub fn group_by(&self) -> GroupBy {
        self.group_by
    }

    pub fn columns(&self) -> &[AggregateColumn] {
        &self.columns
    }

    pub fn rows(&self) -> &[AggregateRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of an indicator among the result columns.
    pub fn column_index(&self, indicator: Indicator) -> Option<usize> {
        self.columns.iter().position(|c| c.indicator == indicator)
    }

    /// Reduced value for one group and indicator.
    pub fn value(&self, key: &GroupKey, indicator: Indicator) -> Option<f64> {
        let index = self.column_index(indicator)?;
        self.rows
            .iter()
            .find(|r| &r.key == key)
            .map(|r| r.values[index])
    }

    /// Key/value pairs of one column, in row order.
    pub fn series(&self, indicator: Indicator) -> Vec<(GroupKey, f64)> {
        match self.column_index(indicator) {
            Some(index) => self
                .rows
                .iter()
                .map(|r| (r.key.clone(), r.values[index]))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Sum of one result column over all rows.
    pub fn column_total(&self, indicator: Indicator) -> Option<f64> {
        let index = self.column_index(indicator)?;
        Some(self.rows.iter().map(|r| r.values[index]).sum())
    }

    /// Returns a copy ordered by a result column, ties by key ascending.
    pub fn sorted_by(&self, indicator: Indicator, order: SortOrder) -> Result<Self> {
        let index = self.column_index(indicator).ok_or_else(|| FloodError::Schema {
            dataset: format!("{} aggregate", self.group_by),
            column: indicator.column().to_string(),
        })?;

        let mut rows = self.rows.clone();
        rows.sort_by(|a, b| {
            let by_value = a.values[index].total_cmp(&b.values[index]);
            let by_value = match order {
                SortOrder::Ascending => by_value,
                SortOrder::Descending => by_value.reverse(),
            };
            by_value.then_with(|| a.key.cmp(&b.key))
        });

        Ok(Self {
            group_by: self.group_by,
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Returns a copy keeping only the first `n` rows.
    pub fn head(&self, n: usize) -> Self {
        Self {
            group_by: self.group_by,
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    sum: f64,
    count: usize,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.max = self.max.max(value);
    }

    fn finish(&self, reduction: Reduction) -> f64 {
        match reduction {
            Reduction::Sum => self.sum,
            Reduction::Mean => self.sum / self.count as f64,
            Reduction::Max => self.max,
        }
    }
}

/// Aggregate a dataset by a grouping key.
///
/// Every indicator in `reductions` must be present in the dataset, and
/// region grouping requires a region column. Groups without records never
/// appear.
pub fn aggregate(
    dataset: &Dataset,
    group_by: GroupBy,
    reductions: &ReductionSpec,
) -> Result<AggregateTable> {
    for indicator in reductions.keys() {
        dataset.require_indicator(*indicator)?;
    }
    if group_by == GroupBy::Region {
        dataset.require_region()?;
    }

    let columns: Vec<AggregateColumn> = reductions
        .iter()
        .map(|(indicator, reduction)| AggregateColumn {
            indicator: *indicator,
            reduction: *reduction,
        })
        .collect();

    let mut groups: BTreeMap<GroupKey, (usize, Vec<Accumulator>)> = BTreeMap::new();

    for record in dataset.records() {
        let Some(key) = group_by.key_for(record) else {
            continue;
        };
        let (count, accumulators) = groups
            .entry(key)
            .or_insert_with(|| (0, vec![Accumulator::default(); columns.len()]));
        *count += 1;

        for (acc, column) in accumulators.iter_mut().zip(&columns) {
            if let Some(value) = record.value(column.indicator) {
                acc.push(value);
            }
        }
    }

    let rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, (count, accumulators))| AggregateRow {
            key,
            count,
            values: accumulators
                .iter()
                .zip(&columns)
                .map(|(acc, column)| acc.finish(column.reduction))
                .collect(),
        })
        .collect();

    debug!(
        "Aggregated {} {} records into {} groups",
        dataset.kind(),
        group_by,
        rows.len()
    );

    Ok(AggregateTable {
        group_by,
        columns,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::testing::*;
    use crate::models::{Dataset, DatasetKind};

    fn sums() -> ReductionSpec {
        Indicator::ALL.map(|i| (i, Reduction::Sum)).into_iter().collect()
    }

    fn sample() -> Dataset {
        primary(vec![
            record("2023-04-01", "Lajeado", "Vale do Taquari", [1.0, 3.0, 200.0, 8.0, 6.2, 120.0]),
            record("2023-09-05", "Estrela", "Vale do Taquari", [4.0, 7.0, 900.0, 15.5, 9.4, 210.0]),
            record("2024-05-03", "Porto Alegre", "Metropolitana", [2.0, 10.0, 5000.0, 250.0, 5.3, 220.0]),
            record("2024-05-10", "Canoas", "Metropolitana", [5.0, 2.0, 3000.0, 120.0, 4.1, 90.0]),
            record("2024-09-12", "Lajeado", "Vale do Taquari", [0.0, 1.0, 50.0, 1.5, 3.0, 60.0]),
        ])
    }

    #[test]
    fn test_by_year_scenario() {
        let dataset = two_year_primary();
        let reductions = ReductionSpec::from([(Indicator::Displaced, Reduction::Sum)]);

        let table = aggregate(&dataset, GroupBy::Year, &reductions).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.value(&GroupKey::Year(2023), Indicator::Displaced), Some(100.0));
        assert_eq!(table.value(&GroupKey::Year(2024), Indicator::Displaced), Some(5000.0));
        assert_eq!(table.rows()[0].key, GroupKey::Year(2023));
    }

    #[test]
    fn test_by_city_row_count_equals_distinct_cities() {
        let dataset = sample();
        let table = aggregate(&dataset, GroupBy::City, &sums()).unwrap();

        assert_eq!(table.len(), dataset.cities().len());
        let keys: Vec<String> = table.rows().iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["Canoas", "Estrela", "Lajeado", "Porto Alegre"]);
    }

    #[test]
    fn test_region_grouping_is_a_partition() {
        let dataset = sample();
        let table = aggregate(&dataset, GroupBy::Region, &sums()).unwrap();

        let grouped = table.column_total(Indicator::Displaced).unwrap();
        let overall = dataset.total(Indicator::Displaced).unwrap();
        assert_eq!(grouped, overall);
        let counted: usize = table.rows().iter().map(|r| r.count).sum();
        assert_eq!(counted, dataset.len());
    }

    #[test]
    fn test_month_folds_years_together() {
        let dataset = sample();
        let reductions = ReductionSpec::from([(Indicator::Displaced, Reduction::Mean)]);

        let table = aggregate(&dataset, GroupBy::Month, &reductions).unwrap();

        let keys: Vec<&GroupKey> = table.rows().iter().map(|r| &r.key).collect();
        assert_eq!(
            keys,
            vec![&GroupKey::Month(4), &GroupKey::Month(5), &GroupKey::Month(9)]
        );
        // September 2023 and September 2024 share one seasonal row.
        assert_eq!(table.value(&GroupKey::Month(9), Indicator::Displaced), Some(475.0));
        assert_eq!(GroupKey::Month(9).to_string(), "Sep");
    }

    #[test]
    fn test_mixed_reductions() {
        let dataset = sample();
        let reductions = ReductionSpec::from([
            (Indicator::RiverHeightM, Reduction::Max),
            (Indicator::Deaths, Reduction::Sum),
            (Indicator::Rain24hMm, Reduction::Mean),
        ]);

        let table = aggregate(&dataset, GroupBy::Region, &reductions).unwrap();

        let indicators: Vec<Indicator> = table.columns().iter().map(|c| c.indicator).collect();
        assert_eq!(
            indicators,
            vec![Indicator::Deaths, Indicator::RiverHeightM, Indicator::Rain24hMm]
        );
        let vale = GroupKey::Name("Vale do Taquari".to_string());
        assert_eq!(table.value(&vale, Indicator::Deaths), Some(5.0));
        assert_eq!(table.value(&vale, Indicator::RiverHeightM), Some(9.4));
        assert_eq!(table.value(&vale, Indicator::Rain24hMm), Some(130.0));
    }

    #[test]
    fn test_sorted_by_breaks_ties_by_key() {
        let dataset = primary(vec![
            record("2024-05-01", "Pelotas", "Sul", [0.0, 0.0, 10.0, 5.0, 1.0, 1.0]),
            record("2024-05-01", "Alvorada", "Metro", [0.0, 0.0, 10.0, 5.0, 1.0, 1.0]),
            record("2024-05-01", "Guaiba", "Metro", [0.0, 0.0, 10.0, 9.0, 1.0, 1.0]),
        ]);
        let table = aggregate(&dataset, GroupBy::City, &sums()).unwrap();

        let ranked = table
            .sorted_by(Indicator::LossMillions, SortOrder::Descending)
            .unwrap();

        let keys: Vec<String> = ranked.rows().iter().map(|r| r.key.to_string()).collect();
        assert_eq!(keys, vec!["Guaiba", "Alvorada", "Pelotas"]);
        // The source table keeps its key order.
        assert_eq!(table.rows()[0].key.to_string(), "Alvorada");
        assert_eq!(ranked.head(1).len(), 1);
    }

    #[test]
    fn test_sorted_by_unknown_column_fails() {
        let table = aggregate(
            &sample(),
            GroupBy::City,
            &ReductionSpec::from([(Indicator::Deaths, Reduction::Sum)]),
        )
        .unwrap();
        assert!(table.sorted_by(Indicator::Displaced, SortOrder::Ascending).is_err());
    }

    #[test]
    fn test_aggregation_is_deterministic() {
        let dataset = sample();
        let first = aggregate(&dataset, GroupBy::City, &sums()).unwrap();
        let second = aggregate(&dataset, GroupBy::City, &sums()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_indicator_or_region_is_schema_error() {
        let dataset = Dataset::new(
            DatasetKind::Crisis,
            "crisis.csv",
            false,
            [Indicator::Displaced].into_iter().collect(),
            vec![],
        );

        let deaths = ReductionSpec::from([(Indicator::Deaths, Reduction::Sum)]);
        assert!(matches!(
            aggregate(&dataset, GroupBy::City, &deaths),
            Err(FloodError::Schema { .. })
        ));

        let displaced = ReductionSpec::from([(Indicator::Displaced, Reduction::Sum)]);
        assert!(matches!(
            aggregate(&dataset, GroupBy::Region, &displaced),
            Err(FloodError::Schema { ref column, .. }) if column == "region"
        ));
    }

    #[test]
    fn test_empty_dataset_yields_no_rows() {
        let table = aggregate(&primary(vec![]), GroupBy::Year, &sums()).unwrap();
        assert!(table.is_empty());
        assert!(table.series(Indicator::Deaths).is_empty());
    }
}
