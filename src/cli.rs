//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig, RunSummary};
use crate::domain::config_validation::{
    parse_date, period_sections, strategy_names, validate_config, PERIOD_SECTION_PREFIX,
};
use crate::domain::error::LongshortError;
use crate::domain::period::{us_business_cycles, Period};
use crate::domain::prices::PriceStore;
use crate::domain::strategy::{strategy_from_name, Strategy};
use crate::ports::config_port::ConfigPort;
use crate::ports::price_port::{PricePort, SharedPricePort};

pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Parser, Debug)]
#[command(name = "longshort", about = "Long/short equity portfolio backtester")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every configured strategy over every configured period
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Price CSV, overrides [data] prices
        #[arg(long)]
        data: Option<PathBuf>,
        /// Output directory, overrides [data] output_dir
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Run units on a thread pool, overrides [backtest] parallel
        #[arg(long)]
        parallel: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the date range and tickers of a price file
    Info {
        #[arg(long)]
        data: PathBuf,
    },
}

impl Cli {
    /// Install the global tracing subscriber. `RUST_LOG` takes precedence
    /// over the verbosity flag.
    pub fn init_logging(&self) {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

pub fn run(cli: Cli) -> ExitCode {
    cli.init_logging();

    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            parallel,
        } => run_backtest(&config, data.as_deref(), output.as_deref(), parallel),
        Command::Validate { config } => run_validate(&config),
        Command::Info { data } => run_info(&data),
    }
}

fn fail(e: LongshortError) -> ExitCode {
    eprintln!("error: {e}");
    (&e).into()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        fail(LongshortError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, LongshortError> {
    let defaults = BacktestConfig::default();
    let top_n = config.get_int("backtest", "top_n", defaults.top_n as i64);
    let top_n = usize::try_from(top_n).map_err(|_| LongshortError::ConfigInvalid {
        section: "backtest".into(),
        key: "top_n".into(),
        reason: format!("{top_n} is not a valid asset count"),
    })?;

    Ok(BacktestConfig {
        top_n,
        min_abs_weight: config.get_double("backtest", "min_abs_weight", defaults.min_abs_weight),
        max_abs_weight: config.get_double("backtest", "max_abs_weight", defaults.max_abs_weight),
        risk_free_rate: config.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
        parallel: config.get_bool("backtest", "parallel", defaults.parallel),
        charts: config.get_bool("backtest", "charts", defaults.charts),
    })
}

/// Periods from `[period.*]` sections in name order, or the US business-cycle
/// preset when none are configured.
pub fn build_periods(config: &dyn ConfigPort) -> Result<Vec<Period>, LongshortError> {
    let sections = period_sections(config);
    if sections.is_empty() {
        return Ok(us_business_cycles());
    }

    sections
        .iter()
        .map(|section| {
            let start = parse_date(
                config.get_string(section, "start_date").as_deref(),
                section,
                "start_date",
            )?;
            let end = parse_date(
                config.get_string(section, "end_date").as_deref(),
                section,
                "end_date",
            )?;
            let label = config.get_string(section, "label").unwrap_or_else(|| {
                section
                    .strip_prefix(PERIOD_SECTION_PREFIX)
                    .unwrap_or(section)
                    .to_string()
            });
            Ok(Period::new(start, end, label))
        })
        .collect()
}

pub fn build_strategies(
    config: &dyn ConfigPort,
    store: SharedPricePort,
) -> Result<Vec<Box<dyn Strategy>>, LongshortError> {
    strategy_names(config)
        .iter()
        .map(|name| strategy_from_name(name, Arc::clone(&store)))
        .collect()
}

/// Price file path: `--data` first, then `[data] prices`.
pub fn resolve_data_path(
    data_override: Option<&Path>,
    config: &dyn ConfigPort,
) -> Result<PathBuf, LongshortError> {
    if let Some(p) = data_override {
        return Ok(p.to_path_buf());
    }
    config
        .get_string("data", "prices")
        .map(PathBuf::from)
        .ok_or_else(|| LongshortError::ConfigMissing {
            section: "data".into(),
            key: "prices".into(),
        })
}

pub fn resolve_output_dir(output_override: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    output_override
        .map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "output_dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

fn run_backtest(
    config_path: &Path,
    data_override: Option<&Path>,
    output_override: Option<&Path>,
    parallel_override: bool,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        return fail(e);
    }

    // Stage 2: Resolve settings
    let mut bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    bt_config.parallel |= parallel_override;

    let periods = match build_periods(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let data_path = match resolve_data_path(data_override, &adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };
    let output_dir = resolve_output_dir(output_override, &adapter);

    // Stage 3: Load prices
    eprintln!("Loading prices from {}", data_path.display());
    let store: Arc<PriceStore> = match CsvAdapter::new(data_path).load() {
        Ok(s) => Arc::new(s),
        Err(e) => return fail(e),
    };
    let shared: SharedPricePort = store.clone();

    let strategies = match build_strategies(&adapter, shared) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    // Stage 4: Run
    eprintln!(
        "Running {} strategies over {} periods{}...",
        strategies.len(),
        periods.len(),
        if bt_config.parallel { " in parallel" } else { "" }
    );
    let report = CsvReportAdapter::new(output_dir);
    let summary = backtest_engine::run(store.as_ref(), &periods, &strategies, &bt_config, &report);

    print_summary(&summary);
    eprintln!("Results written to {}", report.output_dir().display());
    ExitCode::SUCCESS
}

fn print_summary(summary: &RunSummary) {
    eprintln!();
    eprintln!(
        "{:<48} {:<18} {:>8} {:>10} {:>10} {:>10}",
        "Period", "Strategy", "Sharpe", "Ann.Ret%", "Ann.Vol%", "TotRet%"
    );
    for unit in &summary.completed {
        eprintln!(
            "{:<48} {:<18} {:>8.2} {:>10.2} {:>10.2} {:>10.3}",
            unit.period.label,
            unit.strategy_name,
            unit.results.sharpe_ratio,
            unit.results.annualized_return * 100.0,
            unit.results.annualized_volatility * 100.0,
            unit.results.total_return * 100.0,
        );
    }
    if !summary.skipped.is_empty() {
        eprintln!("\nSkipped:");
        for skipped in &summary.skipped {
            eprintln!(
                "  {} / {}: {}",
                skipped.period.label, skipped.strategy_name, skipped.reason
            );
        }
    }
    eprintln!(
        "\n{} completed, {} skipped",
        summary.completed.len(),
        summary.skipped.len()
    );
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_config(&adapter) {
        return fail(e);
    }

    let bt_config = match build_backtest_config(&adapter) {
        Ok(c) => c,
        Err(e) => return fail(e),
    };
    let periods = match build_periods(&adapter) {
        Ok(p) => p,
        Err(e) => return fail(e),
    };

    eprintln!("\nStrategies: {}", strategy_names(&adapter).join(", "));
    eprintln!(
        "Assets per leg: {}, weight bounds: [{}, {}], risk-free rate: {}",
        bt_config.top_n, bt_config.min_abs_weight, bt_config.max_abs_weight, bt_config.risk_free_rate
    );
    eprintln!("Periods:");
    for period in &periods {
        eprintln!("  {}  {}", period.range_label(), period.label);
    }
    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(data_path: &Path) -> ExitCode {
    let store = match CsvAdapter::new(data_path.to_path_buf()).load() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let (first, last) = match (store.first_date(), store.last_date()) {
        (Ok(f), Ok(l)) => (f, l),
        (Err(e), _) | (_, Err(e)) => return fail(e),
    };

    println!("File:         {}", data_path.display());
    println!("Date range:   {} to {}", first, last);
    println!("Trading days: {}", store.len());
    println!("Tickers:      {}", store.tickers().len());
    if let Some(latest) = store.prices_on(last) {
        println!("Priced on {}: {}", last, latest.len());
    }
    ExitCode::SUCCESS
}
