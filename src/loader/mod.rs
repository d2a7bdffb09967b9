//! Dataset loading and schema validation.
//!
//! Each source is checked against an explicit column declaration before
//! any row is parsed, so a missing column and a malformed value surface as
//! distinct errors. A dataset is returned whole or not at all.

use crate::error::{FloodError, Result};
use crate::models::{Dataset, DatasetKind, EventRecord, Indicator, IndicatorValues};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Calendar date
    Date,
    /// Non-empty text
    Text,
    /// Non-negative number
    Number,
}

/// A column known to the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Date,
    City,
    Region,
    Indicator(Indicator),
}

impl Column {
    /// Canonical header name.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Date => "date",
            Column::City => "city",
            Column::Region => "region",
            Column::Indicator(indicator) => indicator.column(),
        }
    }

    /// Header name used by the Portuguese-language source files.
    pub fn alias(&self) -> &'static str {
        match self {
            Column::Date => "data",
            Column::City => "cidade",
            Column::Region => "regiao",
            Column::Indicator(indicator) => indicator.alias(),
        }
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            Column::Date => ColumnType::Date,
            Column::City | Column::Region => ColumnType::Text,
            Column::Indicator(_) => ColumnType::Number,
        }
    }

    fn matches(&self, header: &str) -> bool {
        let header = header.trim().trim_start_matches('\u{feff}').to_lowercase();
        header == self.name() || header == self.alias()
    }
}

/// Column declaration for one dataset.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<(Column, bool)>,
}

impl Schema {
    /// Every column is required.
    pub fn primary() -> Self {
        let mut columns = vec![(Column::Date, true), (Column::City, true), (Column::Region, true)];
        columns.extend(Indicator::ALL.map(|i| (Column::Indicator(i), true)));
        Self { columns }
    }

    /// `region` and `deaths` are not always tracked at daily granularity.
    pub fn crisis() -> Self {
        let mut columns = vec![(Column::Date, true), (Column::City, true), (Column::Region, false)];
        columns.extend(
            Indicator::ALL.map(|i| (Column::Indicator(i), i != Indicator::Deaths)),
        );
        Self { columns }
    }

    /// Resolves each declared column to its header position.
    fn resolve(&self, headers: &csv::StringRecord, kind: DatasetKind) -> Result<Vec<(Column, usize)>> {
        let mut resolved = Vec::new();

        for (column, required) in &self.columns {
            match headers.iter().position(|h| column.matches(h)) {
                Some(index) => resolved.push((*column, index)),
                None if *required => {
                    return Err(FloodError::Schema {
                        dataset: kind.to_string(),
                        column: column.name().to_string(),
                    });
                }
                None => debug!("{} dataset has no optional column '{}'", kind, column.name()),
            }
        }

        Ok(resolved)
    }
}

/// Load the multi-year dataset.
pub fn load_primary(path: &Path) -> Result<Dataset> {
    load_dataset(path, DatasetKind::Primary, &Schema::primary())
}

/// Load the crisis-period dataset.
pub fn load_crisis(path: &Path) -> Result<Dataset> {
    load_dataset(path, DatasetKind::Crisis, &Schema::crisis())
}

/// Load and validate one CSV source.
pub fn load_dataset(path: &Path, kind: DatasetKind, schema: &Schema) -> Result<Dataset> {
    if !path.is_file() {
        return Err(FloodError::NotFound {
            dataset: kind.to_string(),
            path: path.to_path_buf(),
        });
    }

    info!("Loading {} dataset from {}", kind, path.display());

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let columns = schema.resolve(&headers, kind)?;

    let has_region = columns.iter().any(|(c, _)| *c == Column::Region);
    let indicators: BTreeSet<Indicator> = columns
        .iter()
        .filter_map(|(c, _)| match c {
            Column::Indicator(i) => Some(*i),
            _ => None,
        })
        .collect();

    let mut records = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row = result?;
        records.push(parse_row(&row, i + 1, kind, &columns)?);
    }

    info!("Loaded {} records from {} dataset", records.len(), kind);

    Ok(Dataset::new(kind, path, has_region, indicators, records))
}

/// Parse one data row. `row` is 1-based and excludes the header.
fn parse_row(
    row: &csv::StringRecord,
    row_number: usize,
    kind: DatasetKind,
    columns: &[(Column, usize)],
) -> Result<EventRecord> {
    let mut date = None;
    let mut city = None;
    let mut region = None;
    let mut values = IndicatorValues::default();

    for (column, index) in columns {
        let raw = row.get(*index).unwrap_or("");
        let invalid = |reason: &str| FloodError::Parse {
            dataset: kind.to_string(),
            row: row_number,
            column: column.name().to_string(),
            value: raw.to_string(),
            reason: reason.to_string(),
        };

        match column.column_type() {
            ColumnType::Date => {
                date = Some(parse_date(raw).ok_or_else(|| invalid("not a calendar date"))?);
            }
            ColumnType::Text => {
                if raw.is_empty() {
                    return Err(invalid("empty text"));
                }
                match column {
                    Column::City => city = Some(raw.to_string()),
                    _ => region = Some(raw.to_string()),
                }
            }
            ColumnType::Number => {
                let value = parse_number(raw).map_err(|reason| invalid(reason))?;
                if let Column::Indicator(indicator) = column {
                    values.set(*indicator, value);
                }
            }
        }
    }

    // Date and city are required by every schema, so both were resolved.
    match (date, city) {
        (Some(date), Some(city)) => Ok(EventRecord {
            date,
            city,
            region,
            values,
        }),
        (None, _) => Err(FloodError::Schema {
            dataset: kind.to_string(),
            column: Column::Date.name().to_string(),
        }),
        (_, None) => Err(FloodError::Schema {
            dataset: kind.to_string(),
            column: Column::City.name().to_string(),
        }),
    }
}

/// Parse a date, dropping any time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|dt| dt.date())
    })
}

fn parse_number(raw: &str) -> std::result::Result<f64, &'static str> {
    if raw.is_empty() {
        return Err("missing value");
    }
    let value: f64 = raw.parse().map_err(|_| "not a number")?;
    if !value.is_finite() {
        return Err("not a finite number");
    }
    if value < 0.0 {
        return Err("negative value");
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HEADER: &str =
        "date,city,region,deaths,injured,displaced,loss_millions,river_height_m,rain_24h_mm";

    fn write_csv(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_primary_dataset() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "primary.csv",
            &format!(
                "{}\n2023-04-01,CityA,RegionX,0,1,100,5.0,2.1,80\n2024-05-03,CityA,RegionX,2,10,5000,250.0,4.8,220\n",
                HEADER
            ),
        );

        let dataset = load_primary(&path).unwrap();

        assert_eq!(dataset.kind(), DatasetKind::Primary);
        assert_eq!(dataset.len(), 2);
        assert!(dataset.has_region());
        assert!(Indicator::ALL.iter().all(|i| dataset.has_indicator(*i)));
        let second = &dataset.records()[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2024, 5, 3).unwrap());
        assert_eq!(second.city, "CityA");
        assert_eq!(second.region.as_deref(), Some("RegionX"));
        assert_eq!(second.value(Indicator::LossMillions), Some(250.0));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = load_primary(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, FloodError::NotFound { ref dataset, .. } if dataset == "primary"));
    }

    #[test]
    fn test_missing_required_column_is_schema_error() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "primary.csv",
            "date,city,region,deaths,injured,loss_millions,river_height_m,rain_24h_mm\n2023-04-01,CityA,RegionX,0,1,5.0,2.1,80\n",
        );

        match load_primary(&path) {
            Err(FloodError::Schema { dataset, column }) => {
                assert_eq!(dataset, "primary");
                assert_eq!(column, "displaced");
            }
            other => panic!("expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_value_is_parse_error_with_row_and_column() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "primary.csv",
            &format!(
                "{}\n2023-04-01,CityA,RegionX,0,1,100,5.0,2.1,80\n2024-05-03,CityA,RegionX,2,10,N/A,250.0,4.8,220\n",
                HEADER
            ),
        );

        match load_primary(&path) {
            Err(FloodError::Parse { row, column, value, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "displaced");
                assert_eq!(value, "N/A");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_and_negative_values_are_rejected() {
        let dir = TempDir::new().unwrap();
        let bad_date = write_csv(
            &dir,
            "bad_date.csv",
            &format!("{}\n2023-02-30,CityA,RegionX,0,1,100,5.0,2.1,80\n", HEADER),
        );
        assert!(matches!(
            load_primary(&bad_date),
            Err(FloodError::Parse { ref column, .. }) if column == "date"
        ));

        let negative = write_csv(
            &dir,
            "negative.csv",
            &format!("{}\n2023-02-01,CityA,RegionX,0,-1,100,5.0,2.1,80\n", HEADER),
        );
        assert!(matches!(
            load_primary(&negative),
            Err(FloodError::Parse { ref column, .. }) if column == "injured"
        ));

        let empty_city = write_csv(
            &dir,
            "empty_city.csv",
            &format!("{}\n2023-02-01,,RegionX,0,1,100,5.0,2.1,80\n", HEADER),
        );
        assert!(matches!(
            load_primary(&empty_city),
            Err(FloodError::Parse { ref column, .. }) if column == "city"
        ));
    }

    #[test]
    fn test_crisis_tolerates_optional_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "crisis.csv",
            "data,cidade,feridos,desalojados,prejuizo_milhoes,altura_rio_metros,chuva_24h_mm\n\
             2024-05-01 00:00:00,Porto Alegre,12,3000,40.5,4.2,180\n\
             2024-05-02,Porto Alegre,20,8000,90.0,5.3,95\n",
        );

        let dataset = load_crisis(&path).unwrap();

        assert_eq!(dataset.len(), 2);
        assert!(!dataset.has_region());
        assert!(!dataset.has_indicator(Indicator::Deaths));
        assert_eq!(dataset.records()[0].value(Indicator::Deaths), None);
        assert_eq!(
            dataset.records()[0].date,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
        );
    }

    #[test]
    fn test_crisis_still_requires_reduction_indicators() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "crisis.csv",
            "date,city,injured,loss_millions,river_height_m,rain_24h_mm\n2024-05-01,Canoas,1,2.0,3.0,4.0\n",
        );

        assert!(matches!(
            load_crisis(&path),
            Err(FloodError::Schema { ref column, .. }) if column == "displaced"
        ));
    }

    #[test]
    fn test_empty_text_is_parse_error() {
        assert_eq!(Column::Region.column_type(), ColumnType::Text);

        let dir = TempDir::new().unwrap();
        let path = write_csv(
            &dir,
            "primary.csv",
            &format!("{}\n2023-04-01,CityA,,0,1,100,5.0,2.1,80\n", HEADER),
        );

        match load_primary(&path) {
            Err(FloodError::Parse { row, column, reason, .. }) => {
                assert_eq!(row, 1);
                assert_eq!(column, "region");
                assert_eq!(reason, "empty text");
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 5, 3);
        assert_eq!(parse_date("2024-05-03"), expected);
        assert_eq!(parse_date("2024-05-03 14:30:00"), expected);
        assert_eq!(parse_date("2024-05-03T14:30:00"), expected);
        assert_eq!(parse_date("03/05/2024"), None);
    }
}
