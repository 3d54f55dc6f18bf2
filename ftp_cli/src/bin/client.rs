//! Command-line client
//!
//! Run with: cargo run --bin ftp-client -- 127.0.0.1 2121 --user bob LIST

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::Parser;
use ftp_core::client::help_text;
use ftp_core::{Client, ClientError, Command, StatusCode};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ftp-client")]
#[command(about = "Minimal file transfer client")]
struct Args {
    /// Server host name or address
    host: String,

    /// Server control port
    port: u16,

    /// Identity to log in with
    #[arg(short, long)]
    user: String,

    /// Secret for the identity
    #[arg(short, long, env = "FTP_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Local directory that RETR writes into and STOR reads from
    #[arg(short, long, default_value = ".")]
    local_dir: PathBuf,

    /// Run one command and exit instead of reading commands from stdin
    command: Option<String>,

    /// Argument for COMMAND
    argument: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut client = Client::connect((args.host.as_str(), args.port)).await?;
    match client.login(&args.user, &args.password).await {
        Ok(()) => println!("{}", StatusCode::LoggedIn),
        Err(ClientError::Rejected) => {
            println!("{}", StatusCode::InvalidCredentials);
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    }

    if let Some(command) = &args.command {
        let argument = args.argument.as_deref().unwrap_or("");
        let command = parse_command(command)?;
        if command != Command::Quit {
            run_command(&mut client, command, argument, &args.local_dir).await?;
        }
        client.quit().await?;
        println!("{}", StatusCode::Closing);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"ftp> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (word, argument) = line.split_once(' ').unwrap_or((line, ""));
        let command = match parse_command(word) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        match run_command(&mut client, command, argument.trim(), &args.local_dir).await {
            Ok(()) => {}
            // The server drops the session after a failed transfer
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => println!("{}", e),
        }
    }

    client.quit().await?;
    println!("{}", StatusCode::Closing);
    Ok(())
}

fn parse_command(word: &str) -> Result<Command> {
    match Command::parse(word) {
        Some(Command::Account | Command::Password) | None => {
            bail!("Unknown command {:?}, try HELP", word)
        }
        Some(command) => Ok(command),
    }
}

async fn run_command(
    client: &mut Client,
    command: Command,
    argument: &str,
    local_dir: &Path,
) -> Result<()> {
    match command {
        Command::Help => print!("{}", help_text()),
        Command::List => {
            let listing = client.list().await?;
            print!("{}", String::from_utf8_lossy(&listing));
            println!("{}", StatusCode::TransferComplete);
        }
        Command::Retrieve => {
            let local = local_path(local_dir, argument)?;
            let bytes = client.retrieve(argument, &local).await?;
            println!("{} ({} bytes)", StatusCode::TransferComplete, bytes);
        }
        Command::Store => {
            let local = local_path(local_dir, argument)?;
            let bytes = client.store(&local, argument).await?;
            println!("{} ({} bytes)", StatusCode::TransferComplete, bytes);
        }
        other => {
            let status = client.execute(other, argument).await?;
            println!("{}", status);
        }
    }
    Ok(())
}

/// Local files are addressed by the final component of the remote name
fn local_path(local_dir: &Path, remote: &str) -> Result<PathBuf> {
    match Path::new(remote).file_name() {
        Some(name) => Ok(local_dir.join(name)),
        None => bail!("{:?} does not name a file", remote),
    }
}

fn is_fatal(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<ClientError>(),
        Some(ClientError::TransferAborted(_) | ClientError::ServerClosed)
    )
}
