use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tollgate_server::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "tollgate", version, about = "Multi-device session server")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve {
        /// Path to tollgate.toml (defaults to $TOLLGATE_CONFIG, then ./tollgate.toml)
        #[arg(long, short)]
        config: Option<PathBuf>,
    },

    /// Key management
    Keys {
        #[command(subcommand)]
        cmd: KeysCommand,
    },
}

#[derive(Subcommand, Debug)]
enum KeysCommand {
    /// Generate an Ed25519 signing keypair
    Generate {
        /// Directory to write private.key and public.key into (prints to stdout otherwise)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Generate a 256-bit payload encryption key (hex)
    PayloadKey,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve { config } => commands::serve::run(config.as_deref()).await?,
        Command::Keys { cmd } => match cmd {
            KeysCommand::Generate { output } => commands::keys::generate(output)?,
            KeysCommand::PayloadKey => commands::keys::payload_key()?,
        },
    }

    Ok(())
}
