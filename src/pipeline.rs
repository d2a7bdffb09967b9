//! End-to-end report pipeline.
//!
//! Loads the datasets, runs every analysis and assembles the numbered
//! report sections. Structural errors abort the run; analyses that lack
//! data degrade to an unavailable block.

use crate::analysis::views::{
    annual_view, city_view, crisis_daily_view, crisis_view, regional_view, seasonal_view,
};
use crate::analysis::{city_coverage, correlate, describe, find_outliers_with};
use crate::config::{Config, DEFAULT_CRISIS_FILE};
use crate::error::{FloodError, Result};
use crate::loader::{load_crisis, load_primary};
use crate::models::{Dataset, Indicator, DATE_FORMAT};
use crate::report::{assemble, format_count, format_decimal, Payload, Report, ReportSection};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where the crisis dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrisisSource {
    /// No crisis section.
    Skip,
    /// Default location. A missing file omits the crisis section.
    Fallback(PathBuf),
    /// Named by the user. A missing file is fatal.
    Declared(PathBuf),
}

/// Everything a run needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub primary: PathBuf,
    pub crisis: CrisisSource,
    pub title: String,
    pub outlier_indicator: Indicator,
    pub iqr_multiplier: f64,
    pub city_rank_indicator: Indicator,
    pub crisis_rank_indicator: Indicator,
    pub recommendations: Vec<String>,
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            primary: config.data.primary.clone(),
            crisis: match config.data.crisis {
                None => CrisisSource::Fallback(PathBuf::from(DEFAULT_CRISIS_FILE)),
                Some(ref path) if path.as_os_str().is_empty() => CrisisSource::Skip,
                Some(ref path) => CrisisSource::Declared(path.clone()),
            },
            title: config.report.title.clone(),
            outlier_indicator: config.analysis.outlier_indicator,
            iqr_multiplier: config.analysis.iqr_multiplier,
            city_rank_indicator: config.analysis.city_rank_indicator,
            crisis_rank_indicator: config.analysis.crisis_rank_indicator,
            recommendations: config.report.recommendations.clone(),
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Load the configured datasets and build the report.
pub fn run(options: &PipelineOptions) -> Result<Report> {
    let primary = load_primary(&options.primary)?;

    let crisis = match options.crisis {
        CrisisSource::Declared(ref path) => Some(load_crisis(path)?),
        CrisisSource::Fallback(ref path) => match load_crisis(path) {
            Err(FloodError::NotFound { .. }) => {
                warn!(
                    "Default crisis dataset {} not found, skipping crisis section",
                    path.display()
                );
                None
            }
            result => Some(result?),
        },
        CrisisSource::Skip => {
            info!("Crisis dataset disabled, skipping crisis section");
            None
        }
    };

    build_report(&primary, crisis.as_ref(), options)
}

/// Build the report from already loaded datasets.
pub fn build_report(
    primary: &Dataset,
    crisis: Option<&Dataset>,
    options: &PipelineOptions,
) -> Result<Report> {
    let mut sections = vec![
        executive_summary(primary, crisis),
        total_impacts(primary, options)?,
        temporal_analysis(primary)?,
        regional_analysis(primary)?,
        city_analysis(primary, options.city_rank_indicator)?,
    ];

    if let Some(crisis) = crisis {
        sections.push(crisis_analysis(primary, crisis, options.crisis_rank_indicator)?);
    }

    sections.push(recommendations(&options.recommendations));

    debug!("Assembling {} sections", sections.len());
    assemble(options.title.clone(), sections)
}

fn executive_summary(primary: &Dataset, crisis: Option<&Dataset>) -> ReportSection {
    let mut text = format!(
        "Period: {}\nRecords: {}\nCities: {}\nRegions: {}\n",
        format_period(primary.date_range()),
        primary.len(),
        primary.cities().len(),
        regions_list(primary),
    );
    if let Some(crisis) = crisis {
        text.push_str(&format!("Crisis records: {}\n", crisis.len()));
    }

    ReportSection::new(1, "Executive Summary").text(text)
}

fn total_impacts(primary: &Dataset, options: &PipelineOptions) -> Result<ReportSection> {
    let peak = |indicator: Indicator| {
        primary
            .peak(indicator)
            .map_or_else(|| "n/a".to_string(), |v| format_decimal(v, 2))
    };

    let totals = format!(
        "{}Peak river height (m): {}\nPeak rain in 24h (mm): {}\n",
        impact_totals(primary),
        peak(Indicator::RiverHeightM),
        peak(Indicator::Rain24hMm),
    );

    let indicators: Vec<Indicator> = primary.indicators().collect();

    let summary = or_unavailable(
        "Descriptive statistics",
        describe(primary, &indicators).map(Payload::Summary),
    )?;
    let correlation = or_unavailable(
        "Indicator correlations",
        correlate(primary, &indicators).map(Payload::Correlation),
    )?;
    let outliers = or_unavailable(
        "Outliers",
        find_outliers_with(primary, options.outlier_indicator, options.iqr_multiplier)
            .map(Payload::Outliers),
    )?;

    Ok(ReportSection::new(2, "Total Impacts")
        .text(totals)
        .push_titled("Descriptive statistics", summary)
        .push_titled("Indicator correlations", correlation)
        .push_titled(
            format!("{} outliers (IQR)", options.outlier_indicator.label()),
            outliers,
        ))
}

fn temporal_analysis(primary: &Dataset) -> Result<ReportSection> {
    Ok(ReportSection::new(3, "Temporal Analysis")
        .push_titled("Annual evolution", Payload::Table(annual_view(primary)?))
        .push_titled(
            "Seasonal pattern (monthly means)",
            Payload::Table(seasonal_view(primary)?),
        ))
}

fn regional_analysis(primary: &Dataset) -> Result<ReportSection> {
    Ok(ReportSection::new(4, "Regional Analysis").push(Payload::Table(regional_view(primary)?)))
}

fn city_analysis(primary: &Dataset, rank_by: Indicator) -> Result<ReportSection> {
    Ok(ReportSection::new(5, "City Analysis").push_titled(
        format!("Cities ranked by {}", rank_by.label()),
        Payload::Table(city_view(primary, rank_by)?),
    ))
}

fn crisis_analysis(
    primary: &Dataset,
    crisis: &Dataset,
    rank_by: Indicator,
) -> Result<ReportSection> {
    let overview = format!(
        "Period: {}\nRecords: {}\nCities affected: {}\n{}",
        format_period(crisis.date_range()),
        crisis.len(),
        crisis.cities().len(),
        impact_totals(crisis),
    );

    let coverage = city_coverage(primary, crisis);
    let coverage_text = if coverage.is_aligned() {
        format!(
            "All {} crisis cities appear in the multi-year dataset.",
            coverage.shared.len()
        )
    } else {
        warn!(
            "City sets differ: {} crisis-only, {} primary-only",
            coverage.crisis_only.len(),
            coverage.primary_only.len()
        );
        let mut lines = vec![format!("Cities in both datasets: {}", coverage.shared.len())];
        if !coverage.crisis_only.is_empty() {
            lines.push(format!("Only in crisis data: {}", coverage.crisis_only.join(", ")));
        }
        if !coverage.primary_only.is_empty() {
            lines.push(format!(
                "No crisis records: {}",
                coverage.primary_only.join(", ")
            ));
        }
        lines.join("\n")
    };

    Ok(ReportSection::new(6, "Crisis-Period Analysis")
        .text(overview)
        .push_titled("City coverage", Payload::Text(coverage_text))
        .push_titled(
            format!("Peak impact by city, ranked by {}", rank_by.label()),
            Payload::Table(crisis_view(crisis, rank_by)?),
        )
        .push_titled("Daily evolution", Payload::Table(crisis_daily_view(crisis)?)))
}

fn recommendations(items: &[String]) -> ReportSection {
    let text: String = items.iter().map(|item| format!("- {}\n", item)).collect();
    ReportSection::new(7, "Recommendations").text(text)
}

/// Headcount and loss totals, `n/a` for untracked columns.
fn impact_totals(dataset: &Dataset) -> String {
    let count = |indicator: Indicator| {
        dataset
            .total(indicator)
            .map_or_else(|| "n/a".to_string(), format_count)
    };

    format!(
        "Deaths: {}\nInjured: {}\nDisplaced: {}\nLoss (R$ M): {}\n",
        count(Indicator::Deaths),
        count(Indicator::Injured),
        count(Indicator::Displaced),
        dataset
            .total(Indicator::LossMillions)
            .map_or_else(|| "n/a".to_string(), |v| format_decimal(v, 1)),
    )
}

fn regions_list(dataset: &Dataset) -> String {
    let regions = dataset.regions();
    if regions.is_empty() {
        "n/a".to_string()
    } else {
        regions.join(", ")
    }
}

/// Turn a recoverable analysis error into an unavailable block.
fn or_unavailable(analysis: &str, result: Result<Payload>) -> Result<Payload> {
    match result {
        Ok(payload) => Ok(payload),
        Err(e) if e.is_recoverable() => {
            warn!("{} unavailable: {}", analysis, e);
            Ok(Payload::Unavailable {
                analysis: analysis.to_string(),
                reason: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}

fn format_period(range: Option<(NaiveDate, NaiveDate)>) -> String {
    match range {
        Some((start, end)) => format!(
            "{} to {}",
            start.format(DATE_FORMAT),
            end.format(DATE_FORMAT)
        ),
        None => "n/a".to_string(),
    }
}
