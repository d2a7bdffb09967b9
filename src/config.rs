//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `floodreport.toml` files.

use crate::analysis::DEFAULT_IQR_MULTIPLIER;
use crate::models::Indicator;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "floodreport.toml";

/// Crisis dataset read when none is declared, if it exists.
pub const DEFAULT_CRISIS_FILE: &str = "data/enchente_2024_detalhado.csv";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Input data sources.
    #[serde(default)]
    pub data: DataConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// Output format of the written report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// JSON
    Json,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report output path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Report format.
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            format: OutputFormat::default(),
        }
    }
}

fn default_output() -> PathBuf {
    PathBuf::from("outputs/flood_report.txt")
}

/// Input data sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Multi-year dataset.
    #[serde(default = "default_primary")]
    pub primary: PathBuf,

    /// Crisis-period dataset. When unset, `DEFAULT_CRISIS_FILE` is used if
    /// present. An empty path omits the crisis section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crisis: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            crisis: None,
        }
    }
}

fn default_primary() -> PathBuf {
    PathBuf::from("data/enchentes_rs.csv")
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Indicator checked for outliers.
    #[serde(default = "default_outlier_indicator")]
    pub outlier_indicator: Indicator,

    /// IQR multiplier for the outlier fences.
    #[serde(default = "default_iqr_multiplier")]
    pub iqr_multiplier: f64,

    /// Indicator used to rank cities in the city analysis.
    #[serde(default = "default_city_rank")]
    pub city_rank_indicator: Indicator,

    /// Indicator used to rank cities during the crisis.
    #[serde(default = "default_crisis_rank")]
    pub crisis_rank_indicator: Indicator,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            outlier_indicator: default_outlier_indicator(),
            iqr_multiplier: default_iqr_multiplier(),
            city_rank_indicator: default_city_rank(),
            crisis_rank_indicator: default_crisis_rank(),
        }
    }
}

fn default_outlier_indicator() -> Indicator {
    Indicator::Displaced
}

fn default_iqr_multiplier() -> f64 {
    DEFAULT_IQR_MULTIPLIER
}

fn default_city_rank() -> Indicator {
    Indicator::LossMillions
}

fn default_crisis_rank() -> Indicator {
    Indicator::Displaced
}

/// Report settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Report title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Static recommendations closing the report.
    #[serde(default = "default_recommendations")]
    pub recommendations: Vec<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            recommendations: default_recommendations(),
        }
    }
}

fn default_title() -> String {
    "Flood Impact Analysis Report".to_string()
}

fn default_recommendations() -> Vec<String> {
    vec![
        "Implement an early warning system",
        "Improve drainage infrastructure",
        "Develop regional contingency plans",
        "Invest in hydrological monitoring",
        "Train emergency response teams",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Check values serde cannot constrain.
    pub fn validate(&self) -> Result<()> {
        let k = self.analysis.iqr_multiplier;
        if !k.is_finite() || k <= 0.0 {
            bail!("iqr_multiplier must be a positive number, got {}", k);
        }
        if self.analysis.crisis_rank_indicator == Indicator::Deaths {
            bail!("crisis_rank_indicator cannot be 'deaths': the crisis view does not track it");
        }
        if self.report.title.trim().is_empty() {
            bail!("report title must not be empty");
        }
        Ok(())
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref primary) = args.primary {
            self.data.primary = primary.clone();
        }

        if args.no_crisis {
            self.data.crisis = Some(PathBuf::new());
        } else if let Some(ref crisis) = args.crisis {
            self.data.crisis = Some(crisis.clone());
        }

        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }
        if let Some(format) = args.format {
            self.general.format = format;
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
