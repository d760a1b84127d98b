pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use cohort_core::config::{AppConfig, LoadOptions, LogFormat};

#[derive(Debug, Parser)]
#[command(
    name = "cohort",
    about = "Cohort training and serving CLI",
    long_about = "Train the retail segmentation pipeline from an orders workbook and resolve \
                  per-customer product recommendations from the saved artifact bundle.",
    after_help = "Examples:\n  cohort train --source data/superstore.xlsx\n  cohort recommend CG-12520\n  cohort config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the offline training pass and persist the artifact bundle")]
    Train {
        #[arg(long, help = "Source workbook with `Orders` and `Returns` sheets")]
        source: PathBuf,
        #[arg(long, help = "Artifact directory override")]
        artifacts: Option<PathBuf>,
        #[arg(long, help = "Training-time cluster count override")]
        clusters: Option<usize>,
    },
    #[command(about = "Resolve recommendations for a customer id against the saved bundle")]
    Recommend {
        #[arg(help = "Customer id, e.g. CG-12520")]
        customer_id: String,
        #[arg(long, help = "Artifact directory override")]
        artifacts: Option<PathBuf>,
        #[arg(long, help = "Cluster-based recommendation count override")]
        top_n_cluster: Option<usize>,
        #[arg(long, help = "Overall-popular recommendation count override")]
        top_n_overall: Option<usize>,
    },
    #[command(about = "Inspect effective configuration values")]
    Config,
}

pub fn run() -> ExitCode {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Train { source, artifacts, clusters } => {
            commands::train::run(&commands::train::TrainArgs { source, artifacts, clusters })
        }
        Command::Recommend { customer_id, artifacts, top_n_cluster, top_n_overall } => {
            commands::recommend::run(&commands::recommend::RecommendArgs {
                customer_id,
                artifacts,
                top_n_cluster,
                top_n_overall,
            })
        }
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

fn init_logging() {
    use tracing::Level;

    // A broken config still gets default logging so the command that
    // follows can report the configuration error itself.
    let config = AppConfig::load(LoadOptions::default()).unwrap_or_default();
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        LogFormat::Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}
