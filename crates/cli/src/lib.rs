pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use basket_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use basket_core::suggestions::Strategy;
use clap::{Parser, Subcommand, ValueEnum};
use commands::CommandResult;

#[derive(Debug, Parser)]
#[command(
    name = "basket",
    about = "Basket analysis operator CLI",
    long_about = "Normalize point-of-sale exports, mine frequent itemsets, and query basket suggestions.",
    after_help = "Examples:\n  basket normalize --input sales.json\n  basket mine\n  basket suggest --strategy indexed --selected 3,17\n  basket doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a basket.toml config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Directory holding normalized artifacts")]
    artifacts_dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Log level (trace|debug|info|warn|error)")]
    log_level: Option<String>,
    #[arg(long, global = true, value_enum, help = "Log output format")]
    log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Normalize a raw JSON sale export into dictionaries and transactions")]
    Normalize {
        #[arg(long, help = "JSON array of sale lines (check, date, empl, group, good)")]
        input: PathBuf,
    },
    #[command(about = "Mine frequent itemsets from the stored transactions")]
    Mine {
        #[arg(long, help = "Minimum support as a fraction of transactions")]
        min_support: Option<f64>,
    },
    #[command(about = "Compute confidence and lift of an association rule")]
    Stat {
        #[arg(long, help = "Comma separated good ids of the rule's left side")]
        antecedent: String,
        #[arg(long, help = "Comma separated good ids of the rule's right side")]
        consequent: String,
    },
    #[command(about = "Suggest goods for a basket")]
    Suggest {
        #[arg(long, value_enum, default_value_t = StrategyArg::Exact)]
        strategy: StrategyArg,
        #[arg(long, default_value_t = 0, help = "Transaction under study")]
        transaction: usize,
        #[arg(long, default_value = "", help = "Comma separated good ids already in the basket")]
        selected: String,
        #[arg(long, help = "Enable employee affinity suggestions")]
        affinity: bool,
    },
    #[command(about = "Browse the frequent itemset index")]
    Itemsets {
        #[arg(long, help = "Only itemsets with exactly this many goods")]
        len: Option<usize>,
        #[arg(long, help = "Comma separated good name fragments")]
        search: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Validate config and stored artifacts")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    Exact,
    Indexed,
    Affinity,
}

impl From<StrategyArg> for Strategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Exact => Strategy::Exact,
            StrategyArg::Indexed => Strategy::Indexed,
            StrategyArg::Affinity => Strategy::Affinity,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormatArg {
    Compact,
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Compact => LogFormat::Compact,
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

fn init_logging(config: &AppConfig) {
    use tracing::Level;
    use LogFormat::*;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed when commands run in-process.
    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let result = execute(cli);

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn execute(cli: Cli) -> CommandResult {
    let mut options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        overrides: ConfigOverrides {
            artifacts_dir: cli.artifacts_dir,
            log_level: cli.log_level,
            log_format: cli.log_format.map(LogFormat::from),
            ..ConfigOverrides::default()
        },
    };

    match cli.command {
        Command::Normalize { input } => {
            with_config("normalize", options, |config| commands::normalize::run(config, &input))
        }
        Command::Mine { min_support } => {
            options.overrides.min_support = min_support;
            with_config("mine", options, commands::mine::run)
        }
        Command::Stat { antecedent, consequent } => with_config("stat", options, |config| {
            commands::stat::run(config, &antecedent, &consequent)
        }),
        Command::Suggest { strategy, transaction, selected, affinity } => {
            if affinity {
                options.overrides.employee_affinity = Some(true);
            }
            with_config("suggest", options, |config| {
                commands::suggest::run(config, strategy.into(), transaction, &selected)
            })
        }
        Command::Itemsets { len, search } => with_config("itemsets", options, |config| {
            commands::itemsets::run(config, len, search.as_deref())
        }),
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    }
}

/// Loads configuration and starts logging, reporting load failures under `command`.
fn with_config(
    command: &str,
    options: LoadOptions,
    run: impl FnOnce(&AppConfig) -> CommandResult,
) -> CommandResult {
    match AppConfig::load(options) {
        Ok(config) => {
            init_logging(&config);
            run(&config)
        }
        Err(error) => CommandResult::from_error(command, error),
    }
}
