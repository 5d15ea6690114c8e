//! Command module - Strategy pattern for CLI commands.
//!
//! Each command is a separate module implementing the `CommandExecutor` trait.
//! Commands run against an already connected [`Client`]; building one from
//! the configuration and command-line flags lives here too.

mod clients;
mod public_key;
mod pull;
mod register;
mod shell;

pub use clients::ClientsCommand;
pub use public_key::PublicKeyCommand;
pub use pull::PullCommand;
pub use register::RegisterCommand;
pub use shell::ShellCommand;

use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;
use tracing::debug;

use messageu::{
    BlobSink, Client, ClientConfig, DirectorySink, FileIdentityStore, IdentityStore,
    ServerAddress, TcpTransport, Transport,
};

/// The client the CLI talks to the server with.
pub type CliClient = Client<TcpTransport, FileIdentityStore, DirectorySink>;

/// Trait for command execution - Strategy pattern.
///
/// Each command struct holds its parsed arguments and implements
/// this trait to define its execution logic.
#[async_trait]
pub trait CommandExecutor {
    /// Executes the command against `client`.
    async fn execute<T, S, B>(&self, client: &mut Client<T, S, B>) -> Result<()>
    where
        T: Transport,
        S: IdentityStore,
        B: BlobSink;
}

/// Where the client finds its files. Each flag overrides the config file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// File with the server address (host:port)
    #[arg(long, global = true)]
    pub server_info: Option<PathBuf>,

    /// Identity file written at registration
    #[arg(long, global = true)]
    pub identity: Option<PathBuf>,

    /// Directory for received files (default: system temp dir)
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,
}

impl ConnectionArgs {
    /// Applies the flags on top of `config`.
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(path) = &self.server_info {
            config.server_info = path.clone();
        }
        if let Some(path) = &self.identity {
            config.identity_file = path.clone();
        }
        if let Some(dir) = &self.download_dir {
            config.download_dir = Some(dir.clone());
        }
        config
    }
}

/// Builds a client from the config file and `args`.
pub fn connect(args: &ConnectionArgs) -> Result<CliClient> {
    let config = args.apply(ClientConfig::load().context("Failed to load configuration")?);

    let address = ServerAddress::load(&config.server_info).with_context(|| {
        format!(
            "Failed to read server address from {}",
            config.server_info.display()
        )
    })?;
    debug!(server = %address, "using server");

    let transport = TcpTransport::new(address.to_string())
        .with_timeout(config.timeout())
        .with_max_response_bytes(config.max_response_bytes);
    let sink = match &config.download_dir {
        Some(dir) => DirectorySink::new(dir),
        None => DirectorySink::temp(),
    };
    let store = FileIdentityStore::new(&config.identity_file);

    Client::new(transport, store, sink).with_context(|| {
        format!(
            "Failed to load identity from {}",
            config.identity_file.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = ConnectionArgs {
            server_info: Some(PathBuf::from("/etc/messageu/server.info")),
            identity: None,
            download_dir: Some(PathBuf::from("/var/tmp/inbox")),
        };

        let config = args.apply(ClientConfig::default());
        assert_eq!(config.server_info, PathBuf::from("/etc/messageu/server.info"));
        assert_eq!(config.identity_file, PathBuf::from("my.info"));
        assert_eq!(config.download_dir, Some(PathBuf::from("/var/tmp/inbox")));
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let config = ConnectionArgs::default().apply(ClientConfig::default());
        assert_eq!(config, ClientConfig::default());
    }
}
