use anyhow::Result;
use clap::{Parser, Subcommand};
use servgraph_cli::{init_logging, Command, GenerateCommand, InitCommand, ValidateCommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cargo-servgraph")]
#[command(about = "Generate a GraphQL layer from service and model classes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate schema, contracts, resolver stubs and batch loaders
    Generate {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Path to the project
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
        /// Enable debug logging
        #[arg(long)]
        debug: bool,
    },
    /// Check the configuration and catalog without writing files
    Validate {
        /// Path to the configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Path to the project
        #[arg(short, long, default_value = ".")]
        path: PathBuf,
    },
    /// Write a starter configuration and catalog
    Init {
        /// Target directory
        #[arg(default_value = ".")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // `cargo servgraph ...` passes the subcommand name as the first argument
    let args = std::env::args_os()
        .enumerate()
        .filter(|(index, arg)| !(*index == 1 && arg == "servgraph"))
        .map(|(_, arg)| arg);
    let cli = Cli::parse_from(args);

    let command: Box<dyn Command> = match cli.command {
        Commands::Generate {
            config,
            path,
            debug,
        } => {
            init_logging(debug);
            Box::new(GenerateCommand {
                project_dir: path,
                config,
            })
        }
        Commands::Validate { config, path } => {
            init_logging(false);
            Box::new(ValidateCommand {
                project_dir: path,
                config,
            })
        }
        Commands::Init { dir } => {
            init_logging(false);
            Box::new(InitCommand { dir })
        }
    };

    command.execute().await
}
