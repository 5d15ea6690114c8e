//! Shell command - the interactive numeric menu.
//!
//! Session keys and the peer cache only live as long as the client, so key
//! exchange followed by messaging has to happen within one shell session.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use messageu::{BlobSink, Client, ClientError, IdentityStore, PreconditionError, Transport};

use super::{ClientsCommand, CommandExecutor, PublicKeyCommand, PullCommand, RegisterCommand};

const MENU: &str = "\
MessageU client at your service.

110) Register
120) Request for clients list
130) Request for public key
140) Request for waiting messages
150) Send a text message
151) Send a request for symmetric key
152) Send your symmetric key
153) Send a file
0) Exit client";

/// One entry of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Register,
    ClientsList,
    PublicKey,
    PullMessages,
    SendText,
    RequestSymmetricKey,
    SendSymmetricKey,
    SendFile,
    Exit,
}

impl MenuChoice {
    /// Parses a menu number; surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().parse::<u16>().ok()? {
            110 => Some(Self::Register),
            120 => Some(Self::ClientsList),
            130 => Some(Self::PublicKey),
            140 => Some(Self::PullMessages),
            150 => Some(Self::SendText),
            151 => Some(Self::RequestSymmetricKey),
            152 => Some(Self::SendSymmetricKey),
            153 => Some(Self::SendFile),
            0 => Some(Self::Exit),
            _ => None,
        }
    }
}

/// Run the interactive menu (the default when no subcommand is given).
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommand;

#[async_trait]
impl CommandExecutor for ShellCommand {
    async fn execute<T, S, B>(&self, client: &mut Client<T, S, B>) -> Result<()>
    where
        T: Transport,
        S: IdentityStore,
        B: BlobSink,
    {
        let input = BufReader::new(tokio::io::stdin()).lines();
        run_shell(client, input).await
    }
}

/// Runs the menu loop until Exit or end of input.
///
/// Failed actions are reported and the loop goes on.
pub async fn run_shell<T, S, B, R>(client: &mut Client<T, S, B>, mut input: Lines<R>) -> Result<()>
where
    T: Transport,
    S: IdentityStore,
    B: BlobSink,
    R: AsyncBufRead + Unpin + Send,
{
    loop {
        println!("\n{}", MENU);
        let Some(line) = prompt(&mut input, "? ").await? else {
            break;
        };

        let Some(choice) = MenuChoice::parse(&line) else {
            println!("Invalid option.");
            continue;
        };
        if choice == MenuChoice::Exit {
            println!("Exiting...");
            break;
        }

        match run_choice(client, &mut input, choice).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => report(&e),
        }
    }
    Ok(())
}

/// Runs one menu action. Returns false when input ran out mid-prompt.
async fn run_choice<T, S, B, R>(
    client: &mut Client<T, S, B>,
    input: &mut Lines<R>,
    choice: MenuChoice,
) -> Result<bool>
where
    T: Transport,
    S: IdentityStore,
    B: BlobSink,
    R: AsyncBufRead + Unpin + Send,
{
    match choice {
        MenuChoice::Register => {
            let Some(name) = prompt(input, "Enter username: ").await? else {
                return Ok(false);
            };
            RegisterCommand { name }.execute(client).await?;
        }
        MenuChoice::ClientsList => ClientsCommand::default().execute(client).await?,
        MenuChoice::PublicKey => {
            let Some(name) = prompt(input, "Enter username to get public key for: ").await?
            else {
                return Ok(false);
            };
            PublicKeyCommand { name, full: false }.execute(client).await?;
        }
        MenuChoice::PullMessages => PullCommand.execute(client).await?,
        MenuChoice::SendText => {
            let Some(name) = prompt(input, "Enter username to send a message to: ").await? else {
                return Ok(false);
            };
            let Some(text) = prompt(input, "Enter message to send:\n").await? else {
                return Ok(false);
            };
            client.send_text(&name, &text).await?;
            println!("Message sent to {}.", name);
        }
        MenuChoice::RequestSymmetricKey => {
            let Some(name) =
                prompt(input, "Enter username to request a symmetric key from: ").await?
            else {
                return Ok(false);
            };
            client.request_symmetric_key(&name).await?;
            println!("Symmetric key request sent to {}.", name);
        }
        MenuChoice::SendSymmetricKey => {
            let Some(name) =
                prompt(input, "Enter username to send your symmetric key to: ").await?
            else {
                return Ok(false);
            };
            client.send_symmetric_key(&name).await?;
            println!("Symmetric key sent to {}.", name);
        }
        MenuChoice::SendFile => {
            let Some(name) = prompt(input, "Enter username to send a file to: ").await? else {
                return Ok(false);
            };
            let Some(path) = prompt(input, "Enter file path: ").await? else {
                return Ok(false);
            };
            let path = PathBuf::from(path);
            let contents = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            client.send_file(&name, contents).await?;
            println!("File sent to {}.", name);
        }
        MenuChoice::Exit => return Ok(false),
    }
    Ok(true)
}

/// Prints `message` and reads one trimmed line. `None` at end of input.
async fn prompt<R>(input: &mut Lines<R>, message: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    print!("{}", message);
    std::io::stdout().flush().context("Failed to flush stdout")?;
    let line = input.next_line().await.context("Failed to read input")?;
    Ok(line.map(|l| l.trim().to_string()))
}

fn report(error: &anyhow::Error) {
    eprintln!("Error: {:#}", error);
    if let Some(ClientError::Precondition(PreconditionError::MissingSymmetricKey(_))) =
        error.downcast_ref::<ClientError>()
    {
        eprintln!("Send a symmetric key (152) or have them send one to you.");
    }
}
