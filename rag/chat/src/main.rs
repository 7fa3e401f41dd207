//! RAG Chat - Terminal Surface for the RAG Assistant
//!
//! Line-oriented chat against the backend's `/api/rag/*` endpoints. History
//! is kept per session id under the storage directory, so restarting with the
//! same `--session` resumes the conversation.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (http://localhost:3000, session "default")
//! rag-chat
//!
//! # Another backend and session
//! rag-chat --base-url https://example.org --session tab-2
//!
//! # Citation names from a catalog file
//! rag-chat --catalog ./characters.json
//!
//! # Verbose logging
//! RUST_LOG=debug rag-chat
//! ```
//!
//! # Commands
//!
//! - `/unlock <code>`: exchange an access code for the premium tier
//! - `/clear`: drop the conversation history
//! - `/citations on|off`: show or hide sources under answers
//! - `/status`: current tier and service availability
//! - `/help`, `/quit`
//!
//! Any other line is sent as a question.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use rag_core::{
    default_config_path, load_config_from_path, Citation, ConfigOverrides, ContentCatalog,
    Environment, FileStorage, HttpRagClient, Message, QueryOutcome, RagApi, RagClient,
    StatusSnapshot, TracingAnalytics,
};

/// RAG Chat - ask the assistant from a terminal
#[derive(Parser, Debug)]
#[command(name = "rag-chat")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "RAG_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend base URL
    #[arg(short = 'u', long, value_name = "URL")]
    base_url: Option<String>,

    /// Admin API key sent with every request
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,

    /// Session id; one conversation history per session
    #[arg(short = 's', long, value_name = "ID")]
    session: Option<String>,

    /// Root directory for session storage
    #[arg(long, value_name = "DIR")]
    storage_dir: Option<PathBuf>,

    /// Deployment environment (production, development, test)
    #[arg(short = 'e', long = "env", value_name = "ENV")]
    environment: Option<Environment>,

    /// JSON catalog used to name cited content
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "RAG_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

/// Initialize logging on stderr so it does not interleave with the chat
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("rag_chat={level},rag_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// One line of user input
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Ask(String),
    Unlock(String),
    Clear,
    Citations(bool),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parse a line; `Err` carries a usage hint
    fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Self::Ask(line.to_string()));
        };

        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(n, a)| (n, a.trim()));

        match name {
            "unlock" => Ok(Self::Unlock(arg.to_string())),
            "clear" => Ok(Self::Clear),
            "citations" => match arg {
                "on" => Ok(Self::Citations(true)),
                "off" => Ok(Self::Citations(false)),
                _ => Err("usage: /citations on|off".to_string()),
            },
            "status" => Ok(Self::Status),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(format!("unknown command /{other}, try /help")),
        }
    }
}

const HELP: &str = "\
Ask anything about characters, movies and parks.
  /unlock <code>       unlock the premium tier
  /clear               clear the conversation
  /citations on|off    show or hide sources
  /status              tier and service status
  /quit                leave";

fn format_status(status: &StatusSnapshot) -> String {
    let tier = status.tier.as_ref().map_or_else(
        || "tier unknown".to_string(),
        |t| format!("{} tier, {}/{} queries left this hour", t.tier, t.remaining, t.limit),
    );
    let service = match &status.availability {
        None => "service status unknown".to_string(),
        Some(a) if a.enabled => "service enabled".to_string(),
        Some(a) => match &a.message {
            Some(notice) => format!("service disabled: {notice}"),
            None => "service disabled".to_string(),
        },
    };
    format!("{tier}; {service}")
}

fn format_citation(index: usize, citation: &Citation, display_name: Option<&str>) -> String {
    let name = display_name.unwrap_or(&citation.content_name);
    let route = citation.route().unwrap_or_default();
    format!(
        "  [{}] {name} ({}%) {route}",
        index + 1,
        citation.similarity_percent()
    )
}

/// Catalog name for a cited item; `None` when no catalog was loaded
fn catalog_name(catalog: &ContentCatalog, citation: &Citation) -> Option<String> {
    if !catalog.is_initialized() {
        return None;
    }
    match catalog.resolve(citation) {
        Ok(entry) => entry.map(|e| e.name),
        Err(e) => {
            warn!(error = %e, "Catalog lookup failed");
            None
        }
    }
}

fn print_message<A>(client: &RagClient<A>, message: &Message, show_citations: bool)
where
    A: RagApi + ?Sized + 'static,
{
    let marker = if message.cached { " (cached)" } else { "" };
    println!("assistant{marker}: {}", message.text);

    if !show_citations {
        return;
    }
    for (i, citation) in message.citations.iter().flatten().enumerate() {
        let name = catalog_name(client.catalog(), citation);
        println!("{}", format_citation(i, citation, name.as_deref()));
    }
}

fn print_history<A>(client: &RagClient<A>, show_citations: bool)
where
    A: RagApi + ?Sized + 'static,
{
    for message in client.messages() {
        match message.role {
            rag_core::Role::User => println!("you: {}", message.text),
            rag_core::Role::Assistant => print_message(client, &message, show_citations),
        }
    }
}

/// Handle one line; returns `false` to quit
async fn handle_line<A>(client: &RagClient<A>, line: &str) -> Result<bool>
where
    A: RagApi + ?Sized + 'static,
{
    let command = match Command::parse(line) {
        Ok(command) => command,
        Err(hint) => {
            println!("{hint}");
            return Ok(true);
        }
    };

    match command {
        Command::Ask(question) => {
            let submission = match client.submit(&question) {
                Ok(submission) => submission,
                Err(rejected) => {
                    println!("{rejected}");
                    return Ok(true);
                }
            };
            let outcome = submission
                .outcome()
                .await
                .context("Query task did not complete")?;
            let show_citations = client.preferences().await.show_citations;
            if let Some(message) = client
                .messages()
                .into_iter()
                .find(|m| &m.id == outcome.message_id())
            {
                print_message(client, &message, show_citations);
            }
            if let QueryOutcome::Failed { kind, .. } = outcome {
                info!(kind = kind.code(), "Query failed");
            }
        }
        Command::Unlock(code) => match client.unlock(&code).await {
            Ok(tier) => println!("Unlocked {} tier: {} queries per hour", tier.tier, tier.limit),
            Err(e) => println!("{}", e.message()),
        },
        Command::Clear => {
            client.clear_history().await;
            println!("History cleared.");
        }
        Command::Citations(show) => {
            client.set_show_citations(show).await;
            println!("Citations {}.", if show { "on" } else { "off" });
        }
        Command::Status => println!("{}", format_status(&client.status())),
        Command::Help => println!("{HELP}"),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

/// Handle one line unless `interrupt` fires first; returns `false` to quit
///
/// An abandoned query keeps running in the background and still lands in
/// the history.
async fn handle_line_or_interrupt<A, F>(
    client: &RagClient<A>,
    line: &str,
    interrupt: F,
) -> Result<bool>
where
    A: RagApi + ?Sized + 'static,
    F: Future<Output = ()>,
{
    tokio::select! {
        keep_going = handle_line(client, line) => keep_going,
        () = interrupt => {
            info!("Interrupted");
            Ok(false)
        }
    }
}

/// Resolves on Ctrl-C; never, if the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config_path = args.config.clone().or_else(default_config_path);
    let mut config =
        load_config_from_path(config_path).context("Failed to load configuration")?;
    ConfigOverrides {
        base_url: args.base_url,
        api_key: args.api_key,
        session_id: args.session,
        storage_dir: args.storage_dir,
        environment: args.environment,
    }
    .apply(&mut config);
    config.validate().context("Invalid configuration")?;

    info!(
        base_url = %config.api.base_url,
        session = %config.storage.session_id,
        source = ?config.source(),
        "Starting rag-chat"
    );

    let api = Arc::new(HttpRagClient::new(&config.api).context("Failed to create HTTP client")?);
    let storage = Arc::new(FileStorage::new(
        &config.storage.dir,
        &config.storage.session_id,
    ));
    let mut client = RagClient::open(api, storage, &config, Arc::new(TracingAnalytics)).await;

    if let Some(ref path) = args.catalog {
        if let Err(e) = client.catalog().initialize_from_file(path).await {
            warn!(path = %path.display(), error = %e, "Catalog not loaded");
        }
    }

    client.start();

    let show_citations = client.preferences().await.show_citations;
    print_history(&client, show_citations);
    println!("Type a question, or /help.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                if !handle_line_or_interrupt(&client, &line, ctrl_c()).await? {
                    break;
                }
            }
            () = ctrl_c() => break,
        }
    }

    client.shutdown();
    info!("rag-chat stopped");
    Ok(())
}
