//! Pull command - fetch and show waiting messages.

use anyhow::{Context, Result};
use async_trait::async_trait;

use messageu::{BlobSink, Client, IdentityStore, Transport};

use super::CommandExecutor;

/// Fetch and display messages waiting on the server.
///
/// Session keys received here are forgotten when the process exits;
/// use the shell to keep them for later messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct PullCommand;

#[async_trait]
impl CommandExecutor for PullCommand {
    async fn execute<T, S, B>(&self, client: &mut Client<T, S, B>) -> Result<()>
    where
        T: Transport,
        S: IdentityStore,
        B: BlobSink,
    {
        let reports = client
            .pull_messages()
            .await
            .context("Failed to fetch waiting messages")?;

        if reports.is_empty() {
            println!("No new messages.");
            return Ok(());
        }
        for report in &reports {
            println!("{}\n", report);
        }
        Ok(())
    }
}
