//! Command-line interface for IMU trial import.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::writers::write_bundle;
use crate::{read_trial_with_config, ImportConfig, SensorMapping};

#[derive(Parser)]
#[command(name = "imu-trial-import")]
#[command(about = "Import multi-sensor IMU exports into channel tables", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sensor mapping XML from name=fileId pairs
    Map {
        /// Output XML path
        #[arg(short, long)]
        output: PathBuf,
        /// Entries as name=fileId, in column order
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Read a trial and write its four channel tables
    Read {
        /// Sensor mapping XML
        #[arg(short, long)]
        mapping: PathBuf,
        /// Folder containing the export files (defaults to the working directory)
        #[arg(short, long)]
        folder: Option<PathBuf>,
        /// Trial name prefix, e.g. MT_012005D6_031-
        #[arg(short, long)]
        trial: String,
        /// Output directory (defaults to config, then the trial folder)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the summary without writing tables
        #[arg(long)]
        dry_run: bool,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Split a `name=fileId` argument.
fn parse_entry(entry: &str) -> Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((name, id)) if !name.trim().is_empty() && !id.trim().is_empty() => {
            Ok((name.trim(), id.trim()))
        }
        _ => bail!("expected name=fileId, got '{}'", entry),
    }
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match ImportConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                ImportConfig::default()
            }
        },
        None => ImportConfig::default(),
    };

    let result = match cli.command {
        Commands::Map { output, entries } => cmd_map(&output, &entries),
        Commands::Read { mapping, folder, trial, output, dry_run } => {
            cmd_read(&mapping, &folder.unwrap_or_default(), &trial, output, dry_run, &config)
        }
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn cmd_map(output: &Path, entries: &[String]) -> Result<()> {
    let start = Instant::now();

    let mut mapping = SensorMapping::new();
    for entry in entries {
        let (name, file_id) = parse_entry(entry)?;
        mapping.add_item(name, file_id)?;
    }

    mapping
        .to_xml(output)
        .with_context(|| format!("writing mapping to {}", output.display()))?;

    let names: Vec<&str> = mapping.iter().map(|(name, _)| name).collect();
    print_summary(
        "Mapping Written",
        &[
            ("Output file", output.display().to_string()),
            ("Sensors", names.join(", ")),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_read(
    mapping_path: &Path,
    folder: &Path,
    trial: &str,
    output: Option<PathBuf>,
    dry_run: bool,
    config: &ImportConfig,
) -> Result<()> {
    let start = Instant::now();

    let mapping = SensorMapping::from_xml(mapping_path)
        .with_context(|| format!("loading mapping {}", mapping_path.display()))?;

    println!("Reading trial '{}' ({} sensors)...", trial, mapping.len());
    println!("Folder: {}", folder.display());

    let spinner = create_spinner("Parsing sensor export files...");
    let bundle = read_trial_with_config(folder, trial, &mapping, &config.reader);
    spinner.finish_and_clear();
    let bundle = bundle.with_context(|| format!("reading trial '{}'", trial))?;

    let mut items: Vec<(&str, String)> = bundle
        .iter()
        .map(|(kind, table)| {
            (
                kind.as_str(),
                format!("{} rows x {} sensors", table.num_rows(), table.labels().len()),
            )
        })
        .collect();

    if !dry_run {
        let out_dir = output
            .or_else(|| config.output.directory.clone())
            .unwrap_or_else(|| folder.to_path_buf());
        let written = write_bundle(&out_dir, trial, &bundle, &config.output)
            .with_context(|| format!("writing tables to {}", out_dir.display()))?;
        items.push(("Output directory", out_dir.display().to_string()));
        items.push(("Files written", written.len().to_string()));
    }
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Trial Import Complete", &items);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_entry() {
        assert_eq!(parse_entry("shank=000_00B421AF").unwrap(), ("shank", "000_00B421AF"));
        assert!(parse_entry("shank").is_err());
        assert!(parse_entry("=000").is_err());
    }

    #[test]
    fn test_parse_read_command() {
        let cli = Cli::try_parse_from([
            "imu-trial-import",
            "-vv",
            "read",
            "--mapping",
            "map.xml",
            "--trial",
            "MT_012005D6_031-",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Read { trial, folder, dry_run, .. } => {
                assert_eq!(trial, "MT_012005D6_031-");
                assert!(folder.is_none());
                assert!(!dry_run);
            }
            _ => panic!("Expected Read command"),
        }
    }
}
