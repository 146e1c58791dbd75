//! drugline - Flatten DrugBank XML exports into CSV tables
//!
//! Reads a DrugBank XML export, extracts drug identifiers, structure and
//! target fields, and writes one row per drug/target pair (or per drug).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};

use drugline_core::{ConvertError, ProgressContext, fmt_num};
use drugline_drugbank::{IdPrefix, Strategy, Summary};

mod config;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "drugline")]
#[command(about = "Flatten a DrugBank XML export into a drug/target CSV table")]
#[command(version)]
struct Cli {
    /// DrugBank XML file, plain or gzip (default: drugbank.xml)
    #[arg(value_name = "INPUT", conflicts_with = "input")]
    input_path: Option<PathBuf>,

    /// CSV file to write (default: targets.csv)
    #[arg(value_name = "OUTPUT", conflicts_with = "output")]
    output_path: Option<PathBuf>,

    /// DrugBank XML file (same as INPUT)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// CSV file to write (same as OUTPUT)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Row layout
    #[arg(short, long, value_enum)]
    strategy: Option<StrategyArg>,

    /// Strip this prefix from DrugBank IDs when present (e.g. DB)
    #[arg(long)]
    strip_prefix: Option<IdPrefix>,

    /// Config file path (default: ./drugline.toml or ~/.config/drugline/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum, Debug, PartialEq, Eq)]
enum StrategyArg {
    /// One row per drug/target pair with PubMed references
    PerTarget,
    /// One row per drug with target ID and name lists
    PerDrug,
}

impl From<StrategyArg> for Strategy {
    fn from(s: StrategyArg) -> Self {
        match s {
            StrategyArg::PerTarget => Strategy::PerTarget,
            StrategyArg::PerDrug => Strategy::PerDrug,
        }
    }
}

/// Merge file config and CLI flags; flags win.
fn resolve(cli: Cli, file: Config) -> Result<drugline_drugbank::Config> {
    let id_prefix = match cli.strip_prefix {
        Some(prefix) => Some(prefix),
        None => file
            .ids
            .strip_prefix
            .as_deref()
            .map(IdPrefix::new)
            .transpose()?,
    };

    Ok(drugline_drugbank::Config {
        input: cli.input_path.or(cli.input).unwrap_or(file.input.path),
        output: cli.output_path.or(cli.output).unwrap_or(file.output.path),
        strategy: cli.strategy.map_or(file.output.strategy, Strategy::from),
        id_prefix,
    })
}

fn summary_table(config: &drugline_drugbank::Config, summary: &Summary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Metric").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    table.add_row(vec!["Input", &config.input.display().to_string()]);
    table.add_row(vec!["Output", &config.output.display().to_string()]);
    table.add_row(vec!["Strategy", config.strategy.as_str()]);
    table.add_row(vec![
        "ID prefix",
        config.id_prefix.as_ref().map_or("none", IdPrefix::as_str),
    ]);
    table.add_row(vec![
        "Drugs",
        &format!(
            "{} ({} without targets)",
            fmt_num(summary.drugs),
            fmt_num(summary.drugs_without_targets)
        ),
    ]);
    table.add_row(vec!["Targets", &fmt_num(summary.targets)]);
    table.add_row(vec!["References", &fmt_num(summary.references)]);
    table.add_row(vec!["Rows", &fmt_num(summary.rows)]);
    table.add_row(vec![
        "Time",
        &format!("{:.1}s", summary.elapsed.as_secs_f64()),
    ]);
    table
}

fn run(cli: Cli, progress: &ProgressContext) -> Result<()> {
    let file_config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    let config = resolve(cli, file_config)?;
    log::debug!("{config:?}");

    let summary = drugline_drugbank::run(&config, progress)?;
    progress.println(format!("\n{}", summary_table(&config, &summary)));
    Ok(())
}

/// Exit status for a failed run: the [`ConvertError`] code, or 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<ConvertError>()
        .map_or(1, ConvertError::exit_code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let progress = ProgressContext::new();

    // Logging:
    //   TTY:     quiet (warn) unless --debug, the progress bar shows activity
    //   non-TTY: info unless --quiet or --debug, logs are the only progress indicator
    let multi = progress.is_tty().then(|| progress.multi());
    let quiet = cli.quiet || (progress.is_tty() && !cli.debug);
    drugline_core::init_logging(quiet, cli.debug, multi);

    match run(cli, &progress) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}
