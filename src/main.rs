//! FloodReport command-line entry point.
//!
//! Exit codes:
//!   0 - Report written
//!   1 - Runtime error (missing dataset, invalid data, bad config, etc.)

use anyhow::{Context, Result};
use floodreport::cli::Args;
use floodreport::config::{Config, OutputFormat, CONFIG_FILE};
use floodreport::pipeline::{self, CrisisSource, PipelineOptions};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is read before logging starts so `general.verbose` applies
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("FloodReport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_report(&config) {
        error!("Report failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default floodreport.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to change data paths, analysis settings and recommendations.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = if !args.quiet && config.general.verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the pipeline and write the report.
fn run_report(config: &Config) -> Result<()> {
    let start_time = Instant::now();
    let options = PipelineOptions::from(config);

    println!("📥 Loading data: {}", options.primary.display());
    match options.crisis {
        CrisisSource::Declared(ref crisis) => println!("   Crisis data: {}", crisis.display()),
        CrisisSource::Fallback(ref crisis) => {
            println!("   Crisis data: {} (if present)", crisis.display())
        }
        CrisisSource::Skip => {}
    }

    let report = pipeline::run(&options).context("Failed to build report")?;

    let output = match config.general.format {
        OutputFormat::Text => report.to_text(),
        OutputFormat::Json => report.to_json().context("Failed to serialize report")?,
    };

    let path = &config.general.output;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!("\n📊 Report Summary:");
    for section in report.sections() {
        println!("   {}. {}", section.number, section.title);
    }
    println!("   Duration: {:.1}s", start_time.elapsed().as_secs_f64());
    println!("\n✅ Report saved to: {}", path.display());

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    Ok(Config::load_default()?.unwrap_or_default())
}
