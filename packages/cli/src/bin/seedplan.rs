use clap::{Parser, Subcommand};
use colored::*;
use std::process;

mod cli;

use cli::schema::SchemaKind;

#[derive(Parser)]
#[command(name = "seedplan")]
#[command(about = "Seedplan - turn a business idea into a location-specific plan")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive planning conversation
    Chat {
        /// Language for generated content (auto, en, hi, kn, ta, te, mr, bn, gu)
        #[arg(short, long)]
        language: Option<String>,
    },
    /// Print the JSON schema sent to the backend
    Schema {
        #[arg(value_enum)]
        kind: SchemaKind,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = handle_command(cli.command).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        process::exit(1);
    }
}

async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Chat { language } => cli::chat::run(language).await,
        Commands::Schema { kind } => cli::schema::print_schema(kind),
    }
}
