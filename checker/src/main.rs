use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use std::process;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::FmtSubscriber;

use chartcheck::render::HelmCli;
use chartcheck::runner::{run_test, RunConfig};

#[derive(Parser)]
#[command(
    name = "chartcheck",
    version,
    about = "Validates helm template output against declarative expectation files"
)]
struct Cli {
    #[command(subcommand)]
    operation: Operation,
}

#[derive(Subcommand)]
enum Operation {
    /// Run a helm template test
    Test {
        /// Test file with values and expected/unexpected yaml blocks
        #[arg(long)]
        test_file: PathBuf,

        /// Chart directory passed to helm template
        #[arg(long, default_value = "charts")]
        chart: PathBuf,

        /// Keep the values.yaml and template.yaml files created during the
        /// run instead of deleting them when the test finishes
        #[arg(long)]
        retain_tmp_files: bool,

        /// Write verbose progress output
        #[arg(long)]
        verbose: bool,
    },
}

fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let log_level = env::var("LOG_LEVEL")
        .unwrap_or(String::from(default_level))
        .to_lowercase();

    if log_level == "none" {
        return;
    }

    let (level, filter) = if ["-1", "error"].contains(&log_level.as_str()) {
        (Level::ERROR, EnvFilter::new("error"))
    } else if ["0", "warn", "warning"].contains(&log_level.as_str()) {
        (Level::WARN, EnvFilter::new("warn"))
    } else if ["1", "info", "default"].contains(&log_level.as_str()) {
        (Level::INFO, EnvFilter::new("info"))
    } else if ["2", "debug"].contains(&log_level.as_str()) {
        (Level::DEBUG, EnvFilter::new("chartcheck=debug,chartmatch=debug")) // Debug only from these crates
    } else if ["3", "trace", "tracing"].contains(&log_level.as_str()) {
        (Level::TRACE, EnvFilter::new("chartcheck=trace,chartmatch=trace")) // Trace only from these crates
    } else if ["4"].contains(&log_level.as_str()) {
        (Level::DEBUG, EnvFilter::new("debug")) // Debug from all crates
    } else if ["5"].contains(&log_level.as_str()) {
        (Level::TRACE, EnvFilter::new("trace")) // Trace from all crates
    } else {
        (Level::INFO, EnvFilter::new("info")) // fallback in case our spelling sucks
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");
}

fn main() {
    let cli = Cli::parse();

    match cli.operation {
        Operation::Test {
            test_file,
            chart,
            retain_tmp_files,
            verbose,
        } => {
            init(verbose);

            info!(
                "chartcheck version {}",
                chartcheck::BUILD_VERSION.map_or(chartcheck::VERSION, |v| v)
            );

            let mut config = RunConfig::new(test_file);
            config.retain_tmp_files = retain_tmp_files;

            let helm_binary = env::var("HELM_BIN").unwrap_or(String::from("helm"));
            let engine = HelmCli::new(helm_binary, chart);

            if let Err(e) = run_test(&config, &engine) {
                eprintln!("Error: {}", e);
                eprintln!("Run 'chartcheck help' for more information");
                process::exit(1);
            }
        }
    }
}
