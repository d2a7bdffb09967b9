//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// FloodReport - flood impact statistics and reporting
///
/// Loads a multi-year flood dataset and an optional crisis-period dataset,
/// aggregates impacts by year, month, region and city, and writes a
/// sectioned text (or JSON) report.
///
/// Examples:
///   floodreport
///   floodreport --primary data/enchentes_rs.csv --crisis data/enchente_2024_detalhado.csv
///   floodreport --no-crisis --format json -o outputs/report.json
///   floodreport --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Multi-year dataset (CSV)
    ///
    /// Overrides `data.primary` from the config file.
    #[arg(short, long, value_name = "FILE", env = "FLOODREPORT_PRIMARY")]
    pub primary: Option<PathBuf>,

    /// Crisis-period dataset (CSV)
    ///
    /// Overrides `data.crisis` from the config file.
    #[arg(long, value_name = "FILE", env = "FLOODREPORT_CRISIS")]
    pub crisis: Option<PathBuf>,

    /// Skip the crisis dataset and its report section
    #[arg(long, conflicts_with = "crisis")]
    pub no_crisis: bool,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for floodreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default floodreport.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref config) = self.config {
            if !config.is_file() {
                return Err(format!("Config file does not exist: {}", config.display()));
            }
        }

        if let Some(ref output) = self.output {
            if output.is_dir() {
                return Err(format!("Output path is a directory: {}", output.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            primary: Some(PathBuf::from("data/enchentes_rs.csv")),
            crisis: None,
            no_crisis: false,
            output: None,
            format: None,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "floodreport",
            "--primary",
            "a.csv",
            "--crisis",
            "b.csv",
            "--format",
            "json",
            "-o",
            "out.json",
        ])
        .unwrap();

        assert_eq!(args.primary, Some(PathBuf::from("a.csv")));
        assert_eq!(args.crisis, Some(PathBuf::from("b.csv")));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_crisis_conflicts_with_no_crisis() {
        let result = Args::try_parse_from(["floodreport", "--crisis", "b.csv", "--no-crisis"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_config_file() {
        let mut args = make_args();
        args.config = Some(PathBuf::from("does/not/exist.toml"));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
