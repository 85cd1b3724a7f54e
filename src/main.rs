use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use dotenv::dotenv;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

use stackctl::core::{render, EnvResult, Report, Settings};
use stackctl::environments::EnvironmentManager;
use stackctl::monitoring::{init_telemetry, log_outcome, TelemetryConfig};
use stackctl::orchestration::ComposeCli;
use stackctl::tools::{call, parse_args, tool_specs};

#[derive(Parser)]
#[command(author, version, about = "Manage docker-compose WordPress environments", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./stackctl.toml when present)
    #[arg(long, global = true, env = "STACKCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Root directory of all environments (overrides DOCKER_ENV_DIR)
    #[arg(long, global = true)]
    env_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and start a new environment
    Create {
        /// Name of the environment
        name: String,
        /// Type of environment
        #[arg(short, long, default_value = "wordpress")]
        kind: String,
        /// Host port to publish
        #[arg(short, long)]
        port: u16,
        /// JSON options, e.g. '{"plugins": ["woocommerce"]}'
        #[arg(short, long, default_value = "{}")]
        options: String,
    },
    /// Tear down and delete an environment
    Delete {
        /// Name of the environment
        name: String,
    },
    /// Stop an environment
    Stop {
        /// Name of the environment
        name: String,
    },
    /// Start an existing environment
    Start {
        /// Name of the environment
        name: String,
    },
    /// Change the port or install plugins
    Modify {
        /// Name of the environment
        name: String,
        /// JSON options, e.g. '{"port": 8081}'
        options: String,
    },
    /// List environments
    List {
        /// Include directories without a definition, with port and metadata
        #[arg(short, long)]
        all: bool,
    },
    /// Show the details of one environment
    Inspect {
        /// Name of the environment
        name: String,
    },
    /// Invoke a tool by name with JSON arguments
    Call {
        /// Tool name, e.g. env_create
        tool: String,
        /// JSON arguments
        #[arg(default_value = "{}")]
        args: String,
    },
    /// Print the tool descriptions as JSON
    Tools,
    /// Check that the compose tool is available
    DockerCheck,
}

fn print_outcome(operation: &str, subject: &str, outcome: EnvResult<Report>) -> ExitCode {
    log_outcome(operation, subject, &outcome);
    let text = render(&outcome);
    match outcome {
        Ok(_) => {
            println!("{}", text);
            ExitCode::SUCCESS
        }
        Err(_) => {
            eprintln!("{}", text);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.env_dir {
        settings.env_dir = dir;
    }

    let telemetry = TelemetryConfig::from_settings(&settings)?;
    init_telemetry(&telemetry)?;

    if let Commands::Tools = cli.command {
        let specs = serde_json::to_string_pretty(&tool_specs())
            .context("Failed to serialize tool descriptions")?;
        println!("{}", specs);
        return Ok(ExitCode::SUCCESS);
    }

    if let Commands::DockerCheck = cli.command {
        let compose = ComposeCli::from_settings(&settings)?;
        return Ok(if compose.is_available() {
            println!(
                "{} {} is available",
                style("✔").green(),
                style(&settings.compose_command).bold()
            );
            ExitCode::SUCCESS
        } else {
            println!(
                "{} {} was not found on PATH",
                style("✘").red(),
                style(compose.program()).bold()
            );
            ExitCode::FAILURE
        });
    }

    let manager = EnvironmentManager::from_settings(&settings).await?;
    info!(env_dir = %settings.env_dir.display(), "Environment manager ready");

    let code = match &cli.command {
        Commands::Create {
            name,
            kind,
            port,
            options,
        } => print_outcome("create", name, manager.create(name, kind, *port, options).await),
        Commands::Delete { name } => print_outcome("delete", name, manager.delete(name).await),
        Commands::Stop { name } => print_outcome("stop", name, manager.stop(name).await),
        Commands::Start { name } => print_outcome("start", name, manager.start(name).await),
        Commands::Modify { name, options } => {
            print_outcome("modify", name, manager.modify(name, options).await)
        }
        Commands::List { all } => {
            let outcome = if *all {
                manager.list_all().await
            } else {
                manager.list_scoped().await
            };
            print_outcome("list", "-", outcome)
        }
        Commands::Inspect { name } => print_outcome("inspect", name, manager.inspect(name).await),
        Commands::Call { tool, args } => {
            let outcome = match parse_args(args) {
                Ok(args) => call(&manager, tool, &args).await,
                Err(e) => Err(e),
            };
            print_outcome(tool, "-", outcome)
        }
        Commands::Tools | Commands::DockerCheck => ExitCode::SUCCESS,
    };

    Ok(code)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
