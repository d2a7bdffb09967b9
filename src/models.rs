//! Data models for flood event datasets.
//!
//! This module contains the typed records produced by the loader and the
//! read-only `Dataset` container every analysis stage consumes.

use crate::error::{FloodError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Date format used wherever a date is shown in a report.
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Numeric impact or hydrological column tracked per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Number of deaths
    Deaths,
    /// Number of injured people
    Injured,
    /// Number of displaced people
    Displaced,
    /// Economic loss in millions (R$)
    LossMillions,
    /// River height in meters
    RiverHeightM,
    /// Rainfall over 24 hours in millimeters
    #[serde(rename = "rain_24h_mm")]
    Rain24hMm,
}

impl Indicator {
    /// All indicators in canonical column order.
    pub const ALL: [Indicator; 6] = [
        Indicator::Deaths,
        Indicator::Injured,
        Indicator::Displaced,
        Indicator::LossMillions,
        Indicator::RiverHeightM,
        Indicator::Rain24hMm,
    ];

    /// Canonical column name.
    pub fn column(&self) -> &'static str {
        match self {
            Indicator::Deaths => "deaths",
            Indicator::Injured => "injured",
            Indicator::Displaced => "displaced",
            Indicator::LossMillions => "loss_millions",
            Indicator::RiverHeightM => "river_height_m",
            Indicator::Rain24hMm => "rain_24h_mm",
        }
    }

    /// Column name used by the Portuguese-language source files.
    pub fn alias(&self) -> &'static str {
        match self {
            Indicator::Deaths => "mortes",
            Indicator::Injured => "feridos",
            Indicator::Displaced => "desalojados",
            Indicator::LossMillions => "prejuizo_milhoes",
            Indicator::RiverHeightM => "altura_rio_metros",
            Indicator::Rain24hMm => "chuva_24h_mm",
        }
    }

    /// Human-readable label for report headers.
    pub fn label(&self) -> &'static str {
        match self {
            Indicator::Deaths => "Deaths",
            Indicator::Injured => "Injured",
            Indicator::Displaced => "Displaced",
            Indicator::LossMillions => "Loss (R$ M)",
            Indicator::RiverHeightM => "River (m)",
            Indicator::Rain24hMm => "Rain 24h (mm)",
        }
    }

    /// Position in `Indicator::ALL`.
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Resolve a header name (canonical or alias, case-insensitive).
    pub fn from_column(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|i| i.column() == name || i.alias() == name)
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column())
    }
}

impl std::str::FromStr for Indicator {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_column(s).ok_or_else(|| format!("unknown indicator: {}", s))
    }
}

/// Which of the two input datasets a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Multi-year record, coarser granularity
    Primary,
    /// Single crisis period, daily granularity
    Crisis,
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Primary => write!(f, "primary"),
            DatasetKind::Crisis => write!(f, "crisis"),
        }
    }
}

/// Indicator values for one record. Absent columns stay `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValues([Option<f64>; 6]);

impl IndicatorValues {
    /// Values for every indicator, in `Indicator::ALL` order.
    pub fn full(values: [f64; 6]) -> Self {
        Self(values.map(Some))
    }

    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        self.0[indicator.index()]
    }

    pub fn set(&mut self, indicator: Indicator, value: f64) {
        self.0[indicator.index()] = Some(value);
    }
}

/// One row of either dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Calendar date of the observation.
    pub date: NaiveDate,
    /// City name.
    pub city: String,
    /// Region name, absent when the source has no region column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Numeric indicators.
    pub values: IndicatorValues,
}

impl EventRecord {
    /// Returns the value of an indicator, if the column was loaded.
    pub fn value(&self, indicator: Indicator) -> Option<f64> {
        self.values.get(indicator)
    }
}

/// An ordered, read-only collection of records sharing one schema.
#[derive(Debug, Clone)]
pub struct Dataset {
    kind: DatasetKind,
    source: PathBuf,
    has_region: bool,
    indicators: BTreeSet<Indicator>,
    records: Vec<EventRecord>,
}

impl Dataset {
    /// Creates a dataset from already validated records.
    pub fn new(
        kind: DatasetKind,
        source: impl Into<PathBuf>,
        has_region: bool,
        indicators: BTreeSet<Indicator>,
        records: Vec<EventRecord>,
    ) -> Self {
        Self {
            kind,
            source: source.into(),
            has_region,
            indicators,
            records,
        }
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_region(&self) -> bool {
        self.has_region
    }

    pub fn has_indicator(&self, indicator: Indicator) -> bool {
        self.indicators.contains(&indicator)
    }

    /// Indicator columns present in this dataset.
    pub fn indicators(&self) -> impl Iterator<Item = Indicator> + '_ {
        self.indicators.iter().copied()
    }

    /// Fails with a schema error if the indicator column was not loaded.
    pub fn require_indicator(&self, indicator: Indicator) -> Result<()> {
        if self.has_indicator(indicator) {
            Ok(())
        } else {
            Err(FloodError::Schema {
                dataset: self.kind.to_string(),
                column: indicator.column().to_string(),
            })
        }
    }

    /// Fails with a schema error if the region column was not loaded.
    pub fn require_region(&self) -> Result<()> {
        if self.has_region {
            Ok(())
        } else {
            Err(FloodError::Schema {
                dataset: self.kind.to_string(),
                column: "region".to_string(),
            })
        }
    }

    /// All present values of an indicator, in record order.
    pub fn values(&self, indicator: Indicator) -> Vec<f64> {
        self.records
            .iter()
            .filter_map(|r| r.value(indicator))
            .collect()
    }

    /// Distinct city names, sorted.
    pub fn cities(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.city.as_str()).collect()
    }

    /// Distinct region names in order of first appearance.
    pub fn regions(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for region in self.records.iter().filter_map(|r| r.region.as_deref()) {
            if !seen.contains(&region) {
                seen.push(region);
            }
        }
        seen
    }

    /// Earliest and latest record dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.records.iter().map(|r| r.date).min()?;
        let last = self.records.iter().map(|r| r.date).max()?;
        Some((first, last))
    }

    /// Sum of an indicator over all records, if the column is present.
    pub fn total(&self, indicator: Indicator) -> Option<f64> {
        self.has_indicator(indicator)
            .then(|| self.values(indicator).iter().sum())
    }

    /// Maximum of an indicator over all records.
    pub fn peak(&self, indicator: Indicator) -> Option<f64> {
        self.values(indicator).into_iter().reduce(f64::max)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Builders shared by the unit tests of every module.

    use super::*;

    pub fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub fn record(day: &str, city: &str, region: &str, values: [f64; 6]) -> EventRecord {
        EventRecord {
            date: date(day),
            city: city.to_string(),
            region: Some(region.to_string()),
            values: IndicatorValues::full(values),
        }
    }

    pub fn primary(records: Vec<EventRecord>) -> Dataset {
        Dataset::new(
            DatasetKind::Primary,
            "primary.csv",
            true,
            Indicator::ALL.into_iter().collect(),
            records,
        )
    }

    pub fn crisis(records: Vec<EventRecord>) -> Dataset {
        Dataset::new(
            DatasetKind::Crisis,
            "crisis.csv",
            true,
            Indicator::ALL.into_iter().collect(),
            records,
        )
    }

    /// The two-row scenario used across modules.
    pub fn two_year_primary() -> Dataset {
        primary(vec![
            record("2023-04-01", "CityA", "RegionX", [0.0, 1.0, 100.0, 5.0, 2.1, 80.0]),
            record("2024-05-03", "CityA", "RegionX", [2.0, 10.0, 5000.0, 250.0, 4.8, 220.0]),
        ])
    }
}
