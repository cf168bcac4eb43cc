//! CLI definition and dispatch.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvCandleAdapter, CsvLedgerAdapter};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::strategy_file;
use crate::domain::candle::{self, Candle};
use crate::domain::config_validation::{
    self, validate_aggregate, validate_date, validate_fee, validate_range, validate_run_config,
    RunConfig,
};
use crate::domain::date_range;
use crate::domain::error::SimError;
use crate::domain::fields;
use crate::domain::presets;
use crate::domain::rule::rule_group_to_string;
use crate::domain::simulation::{self, OpType, SimulationResult};
use crate::domain::strategy::{StrategyDefinition, VarKind};
use crate::ports::candle_port::CandlePort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "rulesim", about = "Candle-by-candle rule strategy simulator")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a strategy over a candle series
    Simulate {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(long)]
        candles: Option<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Fee rate, e.g. 0.001 or 0,1%
        #[arg(long)]
        fee: Option<String>,
        /// Aggregate the 15 minute candles into this many minutes
        #[arg(long)]
        aggregate: Option<String>,
        /// First candle to simulate: a date, now, today, yesterday or e.g. -7d
        #[arg(long)]
        from: Option<String>,
        /// Last candle to simulate, same forms as --from
        #[arg(long)]
        to: Option<String>,
        /// Leave idle candles out of the ledger
        #[arg(long)]
        trades_only: bool,
        /// Print the full result as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Validate a strategy file
    Validate {
        #[arg(short, long)]
        strategy: PathBuf,
    },
    /// Print a strategy's variables, rules and functions
    Show {
        /// Defaults to the bundled base strategy
        #[arg(short, long)]
        strategy: Option<PathBuf>,
    },
    /// Write the bundled base strategy as JSON
    Preset {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Command-line values that take precedence over the run configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub strategy: Option<PathBuf>,
    pub candles: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub fee: Option<String>,
    pub aggregate: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Simulate {
            config,
            strategy,
            candles,
            output,
            fee,
            aggregate,
            from,
            to,
            trades_only,
            json,
        } => {
            let overrides = RunOverrides {
                strategy,
                candles,
                output,
                fee,
                aggregate,
                from,
                to,
            };
            run_simulate(config.as_ref(), overrides, trades_only, json)
        }
        Command::Validate { strategy } => run_validate(&strategy),
        Command::Show { strategy } => run_show(strategy.as_ref()),
        Command::Preset { output } => run_preset(output.as_ref()),
    }
}

fn fail(err: SimError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

/// Merge the optional INI file with command-line overrides into a checked
/// [`RunConfig`].
pub fn resolve_run_config(
    config_path: Option<&PathBuf>,
    overrides: RunOverrides,
) -> Result<RunConfig, SimError> {
    resolve_run_config_at(config_path, overrides, Utc::now())
}

/// [`resolve_run_config`] with relative dates taken from `now`.
pub fn resolve_run_config_at(
    config_path: Option<&PathBuf>,
    overrides: RunOverrides,
    now: DateTime<Utc>,
) -> Result<RunConfig, SimError> {
    let base = match config_path {
        Some(path) => {
            let adapter = FileConfigAdapter::from_file(path)?;
            Some(validate_run_config(&adapter, now)?)
        }
        None => None,
    };

    let missing = |key: &str| SimError::ConfigMissing {
        section: config_validation::SECTION.to_string(),
        key: key.to_string(),
    };

    let strategy = overrides
        .strategy
        .or_else(|| base.as_ref().map(|b| b.strategy.clone()))
        .ok_or_else(|| missing("strategy"))?;
    let candles = overrides
        .candles
        .or_else(|| base.as_ref().map(|b| b.candles.clone()))
        .ok_or_else(|| missing("candles"))?;
    let output = overrides
        .output
        .or_else(|| base.as_ref().and_then(|b| b.output.clone()));
    let fee = match overrides.fee {
        Some(raw) => Some(validate_fee(&raw)?),
        None => base.as_ref().and_then(|b| b.fee),
    };
    let aggregate_minutes = match overrides.aggregate {
        Some(raw) => Some(validate_aggregate(&raw)?),
        None => base.as_ref().and_then(|b| b.aggregate_minutes),
    };
    let from = match overrides.from {
        Some(raw) => Some(validate_date("from", &raw, now)?),
        None => base.as_ref().and_then(|b| b.from),
    };
    let to = match overrides.to {
        Some(raw) => Some(validate_date("to", &raw, now)?),
        None => base.as_ref().and_then(|b| b.to),
    };
    validate_range(from, to)?;

    Ok(RunConfig {
        strategy,
        candles,
        output,
        fee,
        aggregate_minutes,
        from,
        to,
    })
}

/// Load strategy and candles for `run`, simulate, and write the ledger when
/// an output path is set.
pub fn execute_run(run: &RunConfig, trades_only: bool) -> Result<SimulationResult, SimError> {
    let mut strategy = strategy_file::load_strategy(&run.strategy)?;
    if let Some(fee) = run.fee {
        strategy.set_initial_value(fields::FEE_RATE, serde_json::json!(fee));
    }

    let candles = load_candles(run)?;
    let result = simulation::run_simulation(&candles, &strategy)?;

    if let Some(output) = &run.output {
        if trades_only {
            CsvLedgerAdapter.write_trades(&result, output)?;
        } else {
            CsvLedgerAdapter.write(&result, output)?;
        }
    }
    Ok(result)
}

fn load_candles(run: &RunConfig) -> Result<Vec<Candle>, SimError> {
    let interval = run
        .aggregate_minutes
        .unwrap_or(config_validation::BASE_INTERVAL_MINUTES);
    let from = run.from.map(|t| date_range::align_to_interval(t, interval));
    let to = run.to.map(|t| date_range::align_to_interval(t, interval));
    let candles = CsvCandleAdapter::new(run.candles.clone()).fetch_candles(from, to)?;
    if from.is_some() || to.is_some() {
        log::info!(
            "{} candles between {} and {}",
            candles.len(),
            from.map(candle::format_time).unwrap_or_else(|| "start".into()),
            to.map(candle::format_time).unwrap_or_else(|| "end".into())
        );
    }
    Ok(match run.aggregate_minutes {
        Some(minutes) => {
            let aggregated =
                candle::aggregate_candles(&candles, minutes, config_validation::BASE_INTERVAL_MINUTES);
            log::info!(
                "aggregated {} candles into {} of {} minutes",
                candles.len(),
                aggregated.len(),
                minutes
            );
            aggregated
        }
        None => candles,
    })
}

fn run_simulate(
    config_path: Option<&PathBuf>,
    overrides: RunOverrides,
    trades_only: bool,
    json: bool,
) -> ExitCode {
    // Stage 1: Resolve configuration
    if let Some(path) = config_path {
        eprintln!("Loading config from {}", path.display());
    }
    let run = match resolve_run_config(config_path, overrides) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 2: Simulate
    eprintln!(
        "Simulating {} over {}",
        run.strategy.display(),
        run.candles.display()
    );
    let result = match execute_run(&run, trades_only) {
        Ok(r) => r,
        Err(e) => return fail(e),
    };

    // Stage 3: Report
    print_summary(&result);
    if let Some(output) = &run.output {
        eprintln!("Ledger written to {}", output.display());
    }
    if json {
        match serde_json::to_string_pretty(&result) {
            Ok(text) => println!("{}", text),
            Err(e) => return fail(e.into()),
        }
    }
    ExitCode::SUCCESS
}

pub fn print_summary(result: &SimulationResult) {
    let first_price = result.operations.first().map(|op| op.price).unwrap_or(0.0);
    let last_price = result.operations.last().map(|op| op.price).unwrap_or(0.0);
    let initial_equity = result.initial_usdt + result.initial_sol * first_price;
    let final_equity = result.final_usdt + result.final_sol * last_price;

    eprintln!("\n=== Simulation Results ===");
    eprintln!("Candles:        {}", result.operations.len());
    eprintln!("Buys:           {}", result.count(&OpType::Buy));
    eprintln!("Sells:          {}", result.count(&OpType::Sell));
    eprintln!("Resets:         {}", result.count(&OpType::Reset));
    eprintln!(
        "Trades:         {}",
        result.operations.iter().filter(|op| op.is_trade()).count()
    );
    eprintln!(
        "USDT:           {:.4} -> {:.4}",
        result.initial_usdt, result.final_usdt
    );
    eprintln!(
        "SOL:            {:.6} -> {:.6}",
        result.initial_sol, result.final_sol
    );
    eprintln!(
        "Equity (USDT):  {:.4} -> {:.4} ({:+.4})",
        initial_equity,
        final_equity,
        final_equity - initial_equity
    );
}

fn run_validate(strategy_path: &PathBuf) -> ExitCode {
    eprintln!("Validating strategy: {}", strategy_path.display());
    let strategy = match strategy_file::load_strategy(strategy_path) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    eprintln!(
        "  {} vars, {} rules, {} udfs",
        strategy.vars.len(),
        strategy.rules.len(),
        strategy.udfs.len()
    );
    eprintln!("\nStrategy is valid.");
    ExitCode::SUCCESS
}

fn run_show(strategy_path: Option<&PathBuf>) -> ExitCode {
    let strategy = match strategy_path {
        Some(path) => strategy_file::load_strategy(path),
        None => presets::base_strategy(),
    };
    match strategy {
        Ok(s) => {
            print!("{}", describe_strategy(&s));
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

/// Human-readable listing of a strategy.
pub fn describe_strategy(strategy: &StrategyDefinition) -> String {
    let mut out = String::from("Variables:\n");
    for var in &strategy.vars {
        let kind = match var.kind {
            VarKind::State => "state",
            VarKind::Candle => "candle",
            VarKind::Computed => "computed",
            VarKind::Function => "function",
        };
        let detail = match (&var.expr, &var.value) {
            _ if var.kind == VarKind::Function && var.side_effect => format!("{}, side effect", kind),
            (Some(expr), _) if var.kind == VarKind::Computed => format!("{} = {}", kind, expr),
            (_, Some(value)) => format!("{} = {}", kind, value),
            _ => kind.to_string(),
        };
        out.push_str(&format!("  {:<14} {}\n", var.name, detail));
    }

    out.push_str("\nRules:\n");
    for (i, rule) in strategy.rules.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, rule.descr));
        out.push_str(&format!("     if   {}\n", rule_group_to_string(&rule.condition)));
        out.push_str(&format!("     then {}\n", rule_group_to_string(&rule.action)));
        if !rule.stops_after_match() {
            out.push_str("     (continues to next rule)\n");
        }
    }

    if !strategy.udfs.is_empty() {
        out.push_str("\nFunctions:\n");
        for udf in &strategy.udfs {
            out.push_str(&format!("  {}() {}\n", udf.name, udf.descr));
            for block in &udf.blocks {
                out.push_str(&format!(
                    "     if   {}\n     then {}\n",
                    rule_group_to_string(&block.condition),
                    rule_group_to_string(&block.actions)
                ));
            }
        }
    }
    out
}

fn run_preset(output: Option<&PathBuf>) -> ExitCode {
    let strategy = match presets::base_strategy() {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    match output {
        Some(path) => match strategy_file::save_strategy(&strategy, path) {
            Ok(()) => {
                eprintln!("Base strategy written to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },
        None => match serde_json::to_string_pretty(&strategy) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => fail(e.into()),
        },
    }
}
