//! Terminal client: stdin lines go to the server, server bytes go to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chat-client", version, about = "Connect to a linechat server")]
struct Cli {
    /// Server host
    #[arg(long, env = "CHAT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Server port
    #[arg(long, short, env = "CHAT_PORT", default_value_t = 9090)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let addr = format!("{}:{}", cli.host, cli.port);
    let socket = TcpStream::connect(&addr)
        .await
        .with_context(|| format!("connecting to {addr}"))?;

    let (mut reader, writer) = socket.into_split();

    let input = tokio::spawn(async move {
        if let Err(e) = forward_stdin(writer).await {
            tracing::warn!(error = %e, "sending failed");
        }
    });

    // server -> stdout, untouched
    let mut stdout = io::stdout();
    io::copy(&mut reader, &mut stdout).await.context("reading from server")?;
    stdout.flush().await?;

    input.abort();
    Ok(())
}

async fn forward_stdin(mut writer: OwnedWriteHalf) -> Result<()> {
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim_end_matches('\r') == "/quit" {
            writer.write_all(b"/quit\n").await?;
            writer.shutdown().await?;
            return Ok(());
        }

        writer.write_all(line.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.shutdown().await?;
    Ok(())
}
