pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use cohort_core::config::{AppConfig, ConfigOverrides, LoadOptions, LogFormat};
use rust_decimal::Decimal;

#[derive(Debug, Parser)]
#[command(
    name = "cohort",
    about = "Customer segmentation dashboard CLI",
    long_about = "Score invoice sheets into RFM segments and CLTV tiers, then query segments, monthly purchases, and product recommendations.",
    after_help = "Examples:\n  cohort segment boya\n  cohort monthly \"Acme Boya\" 2024\n  cohort recommend rakip\n  cohort export-rfm --output rfm.csv\n  cohort doctor --json"
)]
pub struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every subcommand; each one overrides file and env config.
#[derive(Clone, Debug, Default, Args)]
pub struct GlobalArgs {
    #[arg(long, global = true, help = "Path to a cohort.toml config file")]
    pub config: Option<PathBuf>,
    #[arg(long, global = true, help = "Invoice line-item sheet (CSV)")]
    pub invoices: Option<PathBuf>,
    #[arg(long, global = true, help = "Competitor recommendation sheet (CSV)")]
    pub recommendations: Option<PathBuf>,
    #[arg(long, global = true, help = "Reference date for recency, YYYY-MM-DD")]
    pub reference_date: Option<NaiveDate>,
    #[arg(long, global = true, help = "Profit rate applied to customer value, e.g. 0.10")]
    pub profit_rate: Option<Decimal>,
    #[arg(long, global = true, help = "Log level: trace|debug|info|warn|error")]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config.clone(),
            require_file: self.config.is_some(),
            overrides: ConfigOverrides {
                invoices_path: self.invoices.clone(),
                recommendations_path: self.recommendations.clone(),
                reference_date: self.reference_date,
                profit_rate: self.profit_rate,
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Show RFM segment and CLTV tier for customers whose name contains the text")]
    Segment {
        #[arg(help = "Part of the customer name, matched case-insensitively")]
        name_part: String,
    },
    #[command(about = "Count a customer's invoices per month of one year")]
    Monthly {
        #[arg(help = "Exact customer display name")]
        customer_name: String,
        #[arg(help = "Calendar year, e.g. 2024")]
        year: i32,
    },
    #[command(about = "List recommended products for competitor products containing the text")]
    Recommend {
        #[arg(help = "Part of the competitor product name; omit to list the whole table")]
        product_part: Option<String>,
    },
    #[command(name = "export-rfm", about = "Write the scored RFM table to a delimited file")]
    ExportRfm {
        #[arg(long, help = "Output path (defaults to export.rfm_path)")]
        output: Option<PathBuf>,
        #[arg(long, help = "Single-character delimiter (defaults to export.delimiter)")]
        delimiter: Option<char>,
    },
    #[command(about = "List customer names and invoice years available for the monthly report")]
    Customers,
    #[command(
        about = "Inspect effective configuration values with source attribution"
    )]
    Config,
    #[command(about = "Validate config, source sheets, and scoring readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

fn init_logging(global: &GlobalArgs) {
    use tracing::Level;

    let (level, format) = match AppConfig::load(global.load_options()) {
        Ok(config) => (config.logging.level, config.logging.format),
        Err(_) => ("warn".to_string(), LogFormat::Compact),
    };
    let log_level = level.parse::<Level>().unwrap_or(Level::WARN);

    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_max_level(log_level);
    // A subscriber may already be installed when embedded; keep the existing one.
    let _ = match format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.global);

    let global = &cli.global;
    let result = match cli.command {
        Command::Segment { name_part } => commands::segment::run(global, &name_part),
        Command::Monthly { customer_name, year } => {
            commands::monthly::run(global, &customer_name, year)
        }
        Command::Recommend { product_part } => {
            commands::recommend::run(global, product_part.as_deref())
        }
        Command::ExportRfm { output, delimiter } => {
            commands::export::run(global, output, delimiter)
        }
        Command::Customers => commands::customers::run(global),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run(global) }
        }
        Command::Doctor { json } => commands::doctor::run(global, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
