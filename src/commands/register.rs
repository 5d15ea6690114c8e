//! Register command - create an identity on the server.

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;

use messageu::{fingerprint, BlobSink, Client, IdentityStore, Transport};

use super::CommandExecutor;

/// Register a new user with the server.
///
/// Generates a key pair, registers the public key under NAME and writes
/// the identity file. Fails if an identity already exists.
#[derive(Args, Debug, Clone)]
pub struct RegisterCommand {
    /// Username to register (at most 255 bytes)
    pub name: String,
}

#[async_trait]
impl CommandExecutor for RegisterCommand {
    async fn execute<T, S, B>(&self, client: &mut Client<T, S, B>) -> Result<()>
    where
        T: Transport,
        S: IdentityStore,
        B: BlobSink,
    {
        let identity = client
            .register(&self.name)
            .await
            .context("Registration failed")?;

        println!("Registration successful.");
        println!("Client id:   {}", identity.client_id());
        println!("Fingerprint: {}", fingerprint(identity.public_key_bytes()));
        Ok(())
    }
}
