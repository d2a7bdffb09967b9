//! Correlation, outlier detection and descriptive statistics.
//!
//! These analyses only read the dataset. Quartiles use linear interpolation
//! at position `q * (n - 1)` over the sorted values.

use crate::error::{FloodError, Result};
use crate::models::{Dataset, EventRecord, Indicator};
use serde::Serialize;
use tracing::debug;

/// Default IQR multiplier for outlier bounds.
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;

/// Lower quartile, median and upper quartile of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Compute quartiles of a column.
pub fn quartiles(values: &[f64]) -> Result<Quartiles> {
    if values.is_empty() {
        return Err(FloodError::InsufficientData {
            analysis: "quartiles".to_string(),
            required: 1,
            found: 0,
        });
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    Ok(Quartiles {
        q1: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q3: quantile_sorted(&sorted, 0.75),
    })
}

fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

/// Pearson correlation over the requested indicators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    indicators: Vec<Indicator>,
    /// `None` where a coefficient is undefined (a constant column).
    values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    /// Coefficient for a pair of indicators.
    pub fn get(&self, a: Indicator, b: Indicator) -> Option<f64> {
        let i = self.indicators.iter().position(|x| *x == a)?;
        let j = self.indicators.iter().position(|x| *x == b)?;
        self.values[i][j]
    }

    /// Row of coefficients for the indicator at `index`.
    pub fn row(&self, index: usize) -> &[Option<f64>] {
        &self.values[index]
    }
}

/// Compute the correlation matrix for `columns`.
///
/// Each pair uses the records where both values are present. Fails if the
/// dataset, or any pair, has fewer than two values.
pub fn correlate(dataset: &Dataset, columns: &[Indicator]) -> Result<CorrelationMatrix> {
    for indicator in columns {
        dataset.require_indicator(*indicator)?;
    }
    if dataset.len() < 2 {
        return Err(FloodError::InsufficientData {
            analysis: "correlation".to_string(),
            required: 2,
            found: dataset.len(),
        });
    }

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];

    for i in 0..n {
        values[i][i] = Some(1.0);
        for j in (i + 1)..n {
            let pairs: Vec<(f64, f64)> = dataset
                .records()
                .iter()
                .filter_map(|r| Some((r.value(columns[i])?, r.value(columns[j])?)))
                .collect();

            if pairs.len() < 2 {
                return Err(FloodError::InsufficientData {
                    analysis: format!("correlation of {} and {}", columns[i], columns[j]),
                    required: 2,
                    found: pairs.len(),
                });
            }

            let r = pearson(&pairs);
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    debug!("Computed {}x{} correlation matrix", n, n);

    Ok(CorrelationMatrix {
        indicators: columns.to_vec(),
        values,
    })
}

fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if is_constant(pairs.iter().map(|p| p.0))
        || is_constant(pairs.iter().map(|p| p.1))
        || var_x == 0.0
        || var_y == 0.0
    {
        return None;
    }

    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Zero variance, decided on the raw values rather than on a rounded sum of
/// squared deviations.
fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

/// Records whose value falls strictly outside the IQR fences.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSet {
    pub indicator: Indicator,
    pub quartiles: Quartiles,
    pub multiplier: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// Outlying records, in dataset order.
    pub records: Vec<EventRecord>,
}

impl OutlierSet {
    pub fn iqr(&self) -> f64 {
        self.quartiles.iqr()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Flag outliers with the standard 1.5 multiplier.
pub fn find_outliers(dataset: &Dataset, column: Indicator) -> Result<OutlierSet> {
    find_outliers_with(dataset, column, DEFAULT_IQR_MULTIPLIER)
}

/// Flag outliers with a custom IQR multiplier.
pub fn find_outliers_with(
    dataset: &Dataset,
    column: Indicator,
    multiplier: f64,
) -> Result<OutlierSet> {
    dataset.require_indicator(column)?;

    let quartiles = quartiles(&dataset.values(column)).map_err(|_| FloodError::InsufficientData {
        analysis: format!("outliers of {}", column),
        required: 1,
        found: 0,
    })?;
    let lower_bound = quartiles.q1 - multiplier * quartiles.iqr();
    let upper_bound = quartiles.q3 + multiplier * quartiles.iqr();

    let records: Vec<EventRecord> = dataset
        .records()
        .iter()
        .filter(|r| {
            r.value(column)
                .is_some_and(|v| v < lower_bound || v > upper_bound)
        })
        .cloned()
        .collect();

    debug!(
        "Found {} {} outliers outside [{:.2}, {:.2}]",
        records.len(),
        column,
        lower_bound,
        upper_bound
    );

    Ok(OutlierSet {
        indicator: column,
        quartiles,
        multiplier,
        lower_bound,
        upper_bound,
        records,
    })
}

/// Descriptive statistics of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSummary {
    pub indicator: Indicator,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation, undefined below two values.
    pub std_dev: Option<f64>,
    pub min: f64,
    pub quartiles: Quartiles,
    pub max: f64,
}

/// Describe each requested indicator.
pub fn describe(dataset: &Dataset, columns: &[Indicator]) -> Result<Vec<IndicatorSummary>> {
    let mut summaries = Vec::with_capacity(columns.len());

    for indicator in columns {
        dataset.require_indicator(*indicator)?;
        let values = dataset.values(*indicator);
        if values.is_empty() {
            return Err(FloodError::InsufficientData {
                analysis: format!("summary of {}", indicator),
                required: 1,
                found: 0,
            });
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let std_dev = (count >= 2).then(|| {
            let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });

        summaries.push(IndicatorSummary {
            indicator: *indicator,
            count,
            mean,
            std_dev,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            quartiles: quartiles(&values)?,
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        });
    }

    Ok(summaries)
}
