//! Clients command - list registered users.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;

use messageu::{BlobSink, Client, IdentityStore, Transport};

use super::CommandExecutor;

/// List the other clients registered with the server.
#[derive(Args, Debug, Clone, Default)]
pub struct ClientsCommand {
    /// Also print each client's id
    #[arg(long)]
    pub ids: bool,
}

#[async_trait]
impl CommandExecutor for ClientsCommand {
    async fn execute<T, S, B>(&self, client: &mut Client<T, S, B>) -> Result<()>
    where
        T: Transport,
        S: IdentityStore,
        B: BlobSink,
    {
        let entries = client
            .refresh_clients()
            .await
            .context("Failed to fetch clients list")?;

        if entries.is_empty() {
            println!("No other clients registered.");
            return Ok(());
        }

        println!("Clients list:");
        for entry in &entries {
            if self.ids {
                println!("- {} ({})", entry.name, entry.client_id);
            } else {
                println!("- {}", entry.name);
            }
        }
        Ok(())
    }
}
