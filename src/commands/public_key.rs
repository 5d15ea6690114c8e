//! Public key command - fetch a peer's key and show its fingerprint.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;

use messageu::{fingerprint, BlobSink, Client, IdentityStore, KeyCacheOutcome, Transport};

use super::CommandExecutor;

/// Fetch a user's public key from the server.
///
/// Compare the fingerprint with your contact over another channel
/// (phone call, in person) before trusting it.
#[derive(Args, Debug, Clone)]
pub struct PublicKeyCommand {
    /// Username whose key to fetch
    pub name: String,

    /// Print the full key as hex
    #[arg(long)]
    pub full: bool,
}

#[async_trait]
impl CommandExecutor for PublicKeyCommand {
    async fn execute<T, S, B>(&self, client: &mut Client<T, S, B>) -> Result<()>
    where
        T: Transport,
        S: IdentityStore,
        B: BlobSink,
    {
        let lookup = client
            .fetch_public_key(&self.name)
            .await
            .with_context(|| format!("Failed to retrieve public key for {}", self.name))?;

        if lookup.outcome == KeyCacheOutcome::Conflict {
            eprintln!(
                "WARNING: the server sent a different key for {} than before; keeping the first one.",
                self.name
            );
        }

        println!("Public key for {}:", self.name);
        if self.full {
            println!("{}", hex::encode(lookup.public_key));
        }
        println!("Fingerprint: {}", fingerprint(&lookup.public_key));
        Ok(())
    }
}
