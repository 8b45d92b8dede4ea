//! `wsim` - run wireless network unit tests and reports from the command line.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;
use wsim_devices::{device_registry, test_registry};
use wsim_runner::{format_summary, list, run_report_command, run_test, RunnerError, ScenarioArgs};

#[derive(Parser)]
#[command(
    name = "wsim",
    about = "Discrete-event wireless network simulator",
    version
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered device types, unit tests and reports
    List,

    /// Run a unit test over many independent instances
    Test {
        /// Registered unit test id
        test_id: String,

        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Number of independent instances
        #[arg(short, long, default_value_t = 100)]
        iterations: usize,

        /// Print the batch summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Press buttons on one instance and print a report
    Report {
        /// Registered report id
        report_id: String,

        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Number of button presses, each on a random node
        #[arg(short, long, default_value_t = 1)]
        press_count: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    wsim_metrics::describe_metrics();

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, RunnerError> {
    let devices = device_registry();
    let tests = test_registry();

    match command {
        Commands::List => {
            print!("{}", list(&devices, &tests));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Test {
            test_id,
            scenario,
            iterations,
            json,
        } => {
            let summary = run_test(&devices, &tests, &test_id, &scenario, iterations)?;
            if json {
                let output = serde_json::json!({
                    "scenario": scenario,
                    "summary": summary,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", format_summary(&summary));
            }
            Ok(if summary.all_passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Report {
            report_id,
            scenario,
            press_count,
        } => {
            let report = run_report_command(&devices, &tests, &report_id, &scenario, press_count)?;
            println!("{report}");
            Ok(ExitCode::SUCCESS)
        }
    }
}
