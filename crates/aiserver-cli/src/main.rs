//! aiserver CLI
//!
//! Provisions, starts and inspects the local AI stack.

mod commands;

use aiserver_installer::StdinPrompter;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Exit status after Ctrl-C
const INTERRUPTED: u8 = 130;

/// aiserver - local multi-GPU AI stack provisioner
#[derive(Parser, Debug)]
#[command(name = "aiserver")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Installation root (default: ~/.local-ai-server)
    #[arg(long, env = "AISERVER_ROOT", global = true)]
    root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Run privileged commands without sudo
    #[arg(long, global = true)]
    no_sudo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect hardware and recommend a model
    Detect {
        /// Where to write the JSON report (default: ~/hardware_report.json)
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Install drivers, runtimes and the service stack
    Install {
        /// Answer every question with its default
        #[arg(long)]
        auto: bool,
    },

    /// Start the services
    #[command(alias = "serve")]
    Start,

    /// Stop the services
    Stop,

    /// Show container, GPU and service health
    Status,

    /// Follow service logs
    Logs {
        /// Services to follow (default: all)
        services: Vec<String>,
    },

    /// Inspect and choose models
    #[command(subcommand)]
    Model(ModelCommands),
}

#[derive(Subcommand, Debug)]
enum ModelCommands {
    /// List catalog models, compatible ones first
    List,

    /// Show details of a catalog model
    Info {
        /// Model id (e.g., Qwen/Qwen3-32B-Instruct)
        id: String,
    },

    /// Configure the model to serve
    Set {
        /// Model id
        id: String,
    },

    /// Pre-download model weights into the models directory
    Download {
        /// Model id
        id: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    let ctx = commands::Context::new(cli.root, cli.no_sudo)?;

    match cli.command {
        Commands::Detect { report } => commands::detect(&ctx, report).await,
        Commands::Install { auto } => commands::install(&ctx, auto).await,
        Commands::Start => commands::start(&ctx).await,
        Commands::Stop => commands::stop(&ctx).await,
        Commands::Status => commands::status(&ctx).await,
        Commands::Logs { services } => commands::logs(&ctx, &services).await,
        Commands::Model(ModelCommands::List) => commands::model_list(&ctx).await,
        Commands::Model(ModelCommands::Info { id }) => commands::model_info(&id),
        Commands::Model(ModelCommands::Set { id }) => commands::model_set(&ctx, &id),
        Commands::Model(ModelCommands::Download { id }) => {
            commands::model_download(&ctx, &id, &StdinPrompter).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Dropping the command future kills any child it spawned.
    tokio::select! {
        result = run(cli) => match result {
            Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
            Err(e) => {
                eprintln!("Error: {:#}", e);
                ExitCode::from(1)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted; nothing was rolled back. Re-run to resume.");
            ExitCode::from(INTERRUPTED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_is_start() {
        let cli = Cli::try_parse_from(["aiserver", "serve"]).unwrap();
        assert!(matches!(cli.command, Commands::Start));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["aiserver", "install", "--auto", "--root", "/srv/ai", "--no-sudo"])
                .unwrap();
        assert!(matches!(cli.command, Commands::Install { auto: true }));
        assert_eq!(cli.root, Some(PathBuf::from("/srv/ai")));
        assert!(cli.no_sudo);
    }

    #[test]
    fn test_model_set_requires_id() {
        assert!(Cli::try_parse_from(["aiserver", "model", "set"]).is_err());
        let cli = Cli::try_parse_from(["aiserver", "model", "set", "Qwen/Qwen3-8B-Instruct"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Model(ModelCommands::Set { ref id }) if id == "Qwen/Qwen3-8B-Instruct"
        ));
    }

    #[test]
    fn test_model_download_parses() {
        assert!(Cli::try_parse_from(["aiserver", "model", "download"]).is_err());
        let cli = Cli::try_parse_from(["aiserver", "model", "download", "org/name"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Model(ModelCommands::Download { ref id }) if id == "org/name"
        ));
    }
}
