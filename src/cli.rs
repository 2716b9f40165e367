//! CLI definition and dispatch.

use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_strategy_adapter::JsonStrategyAdapter;
use crate::domain::config_validation::validate_backtest_config;
use crate::domain::date_range::decode_range;
use crate::domain::error::TraderError;
use crate::domain::evaluator::EvaluatorConfig;
use crate::domain::extractor::{ExtractionConfig, execute_trades};
use crate::domain::summary::TradeSummary;
use crate::domain::trade::{
    DEFAULT_STOP_LOSS_PIPS, DEFAULT_TAKE_PROFIT_PIPS, ProfitMode, Trade, TradeParams,
};
use crate::ports::config_port::ConfigPort;
use crate::ports::criteria_source::CriteriaSource;
use crate::ports::price_source::PriceSource;

#[derive(Parser, Debug)]
#[command(name = "sigtrader", about = "Signal-driven trade extraction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract trades for one symbol and strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        strategy: Option<String>,
        /// Start token (Y-n, W-n, W+n, H-n or a timestamp)
        #[arg(long)]
        start: Option<String>,
        /// End token (Y-n, W-n, W+n, H-n or a timestamp)
        #[arg(long)]
        end: Option<String>,
    },
    /// Parse a strategy file and print its criteria
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// List symbols in the configured data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List strategies in the configured strategy directory
    ListStrategies {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            strategy,
            start,
            end,
        } => run_backtest(
            &config,
            symbol.as_deref(),
            strategy.as_deref(),
            start.as_deref(),
            end.as_deref(),
        ),
        Command::Validate { strategy } => run_validate(&strategy),
        Command::ListSymbols { config } => run_list_symbols(&config),
        Command::ListStrategies { config } => run_list_strategies(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_backtest(
    config_path: &Path,
    symbol_override: Option<&str>,
    strategy_override: Option<&str>,
    start_override: Option<&str>,
    end_override: Option<&str>,
) -> Result<(), TraderError> {
    let now = chrono::Local::now().naive_local();

    // Stage 1: Load and validate config
    info!(path = %config_path.display(), "loading config");
    let adapter = FileConfigAdapter::from_file(config_path)?;
    validate_backtest_config(&adapter, now)?;

    // Stage 2: Resolve symbol, strategy and extraction settings
    let symbol = match symbol_override {
        Some(s) => s.to_string(),
        None => adapter.require_string("backtest", "symbol")?,
    };
    let strategy = match strategy_override {
        Some(s) => s.to_string(),
        None => adapter.require_string("strategy", "name")?,
    };
    let extraction = build_extraction_config(&adapter, start_override, end_override, now)?;

    // Stage 3: Run the pipeline against the file adapters
    let prices = CsvAdapter::new(PathBuf::from(adapter.require_string("data", "path")?));
    let strategies =
        JsonStrategyAdapter::new(PathBuf::from(adapter.require_string("strategy", "path")?));
    let trades = run_backtest_pipeline(&prices, &strategies, &symbol, &strategy, &extraction)?;

    // Stage 4: Print results
    print_trades(&symbol, &strategy, &trades);
    Ok(())
}

/// Build the extraction settings from `[backtest]`, letting CLI date tokens
/// override the configured ones.
pub fn build_extraction_config(
    adapter: &dyn ConfigPort,
    start_override: Option<&str>,
    end_override: Option<&str>,
    now: NaiveDateTime,
) -> Result<ExtractionConfig, TraderError> {
    let start = match start_override {
        Some(s) => s.to_string(),
        None => adapter.get_string("backtest", "start").unwrap_or_default(),
    };
    let end = match end_override {
        Some(s) => s.to_string(),
        None => adapter.get_string("backtest", "end").unwrap_or_default(),
    };
    let range = decode_range(&start, &end, now)?;

    let profit_mode = match adapter.get_string("backtest", "profit_mode") {
        Some(mode) => mode.parse::<ProfitMode>()?,
        None => ProfitMode::default(),
    };

    let rolling_column = adapter
        .get_string("backtest", "rolling_column")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| EvaluatorConfig::default().rolling_column);

    Ok(ExtractionConfig {
        start: range.start,
        end: range.end,
        trade: TradeParams {
            profit_mode,
            take_profit_pips: adapter.get_double(
                "backtest",
                "take_profit_pips",
                DEFAULT_TAKE_PROFIT_PIPS,
            ),
            stop_loss_pips: adapter.get_double(
                "backtest",
                "stop_loss_pips",
                DEFAULT_STOP_LOSS_PIPS,
            ),
        },
        evaluator: EvaluatorConfig { rolling_column },
    })
}

/// Load the table and criteria through the ports and extract trades.
pub fn run_backtest_pipeline(
    prices: &dyn PriceSource,
    strategies: &dyn CriteriaSource,
    symbol: &str,
    strategy: &str,
    config: &ExtractionConfig,
) -> Result<Vec<Trade>, TraderError> {
    info!(strategy, "loading strategy");
    let criteria = strategies.load_criteria(strategy)?;

    info!(symbol, "loading price table");
    let table = prices.load_table(symbol)?;

    info!(
        rows = table.len(),
        buy_criteria = criteria.buy_on.len(),
        sell_criteria = criteria.sell_on.len(),
        "extracting trades"
    );
    let trades = execute_trades(&criteria, &table, config)?;
    info!(trades = trades.len(), "extraction finished");
    Ok(trades)
}

fn print_trades(symbol: &str, strategy: &str, trades: &[Trade]) {
    println!("=== {} / {} ===", symbol, strategy);
    for trade in trades {
        println!("{}", trade);
    }
    println!();
    println!("{}", TradeSummary::compute(trades));
}

fn run_validate(strategy_path: &Path) -> Result<(), TraderError> {
    let criteria = JsonStrategyAdapter::load_file(strategy_path)?;
    println!("Strategy: {}", strategy_path.display());
    println!("  Buy when all of:");
    for c in &criteria.buy_on {
        println!("    {}", c);
    }
    println!("  Sell when any of:");
    for c in &criteria.sell_on {
        println!("    {}", c);
    }
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), TraderError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let prices = CsvAdapter::new(PathBuf::from(adapter.require_string("data", "path")?));
    for symbol in prices.list_symbols()? {
        println!("{}", symbol);
    }
    Ok(())
}

fn run_list_strategies(config_path: &Path) -> Result<(), TraderError> {
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let strategies =
        JsonStrategyAdapter::new(PathBuf::from(adapter.require_string("strategy", "path")?));
    for name in strategies.list_strategies()? {
        println!("{}", name);
    }
    Ok(())
}
