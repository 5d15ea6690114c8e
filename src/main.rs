//! MessageU - end-to-end encrypted messaging client
//!
//! Talks to a MessageU server. Run without a subcommand for the interactive
//! menu, or use a subcommand for a single request.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{
    connect, ClientsCommand, CommandExecutor, ConnectionArgs, PublicKeyCommand, PullCommand,
    RegisterCommand, ShellCommand,
};

/// MessageU - end-to-end encrypted messaging client
///
/// Messages are encrypted with per-peer AES session keys exchanged under
/// RSA. The server only ever relays ciphertext.
#[derive(Parser)]
#[command(name = "messageu")]
#[command(version)]
#[command(about = "End-to-end encrypted messaging client for a MessageU server")]
#[command(long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log protocol exchanges to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new user and save the identity file
    Register(RegisterCommand),

    /// List registered clients
    Clients(ClientsCommand),

    /// Fetch a user's public key and print its fingerprint
    PublicKey(PublicKeyCommand),

    /// Fetch and display waiting messages
    Pull,

    /// Interactive menu (default)
    Shell,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut client = connect(&cli.connection)?;

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Register(cmd) => cmd.execute(&mut client).await?,
        Commands::Clients(cmd) => cmd.execute(&mut client).await?,
        Commands::PublicKey(cmd) => cmd.execute(&mut client).await?,
        Commands::Pull => PullCommand.execute(&mut client).await?,
        Commands::Shell => ShellCommand.execute(&mut client).await?,
    }

    Ok(())
}

/// Logs go to stderr so they never mix with menu output.
/// `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "messageu=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
