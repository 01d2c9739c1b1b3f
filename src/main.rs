mod chat_client;
mod cli;
mod config;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::chat_client::ChatClient;
use crate::cli::chat::ChatContext;
use crate::config::ChatConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// URL of the chat service `/chat` endpoint [default: http://localhost:5000/chat]
    #[arg(long, env = "CHAT_ENDPOINT")]
    endpoint: Option<String>,

    /// Ask a single question, print the answer and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = ChatConfig::resolve(cli.endpoint.as_deref())?;
    let client = ChatClient::new(&config);
    info!("Using chat service at {}", client.endpoint());

    let interactive = cli.input.is_none();
    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        cli.input,
        interactive,
        Box::new(client),
    );
    chat_context.run().await
}
