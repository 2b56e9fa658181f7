//! Parley CLI - Talk to a Dialogflow agent
//!
//! Drives the Dialogflow connector from a terminal: single turns,
//! interactive chat, and configuration checks.

mod config;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Input;
use parley::{BotMessage, Button, Capabilities, ChatConnector, UserMessage};
use parley_connector_dialogflow::config::SET_DIALOGFLOW_CONTEXT;
use parley_connector_dialogflow::DialogflowConnector;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing_subscriber::EnvFilter;

use config::{display_value, resolve_capabilities, Config, ENV_PREFIX};

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "Parley CLI - Talk to a Dialogflow agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Capabilities file (TOML or JSON) layered over the config file
    #[arg(long, global = true)]
    caps: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the replies
    Say {
        /// Message text
        text: Option<String>,
        /// Click a button with this payload (sent as an event)
        #[arg(short, long)]
        button: Option<String>,
        /// Set a context for this turn (name=lifespan), repeatable
        #[arg(short, long)]
        context: Vec<String>,
        /// Also print the raw request and query result
        #[arg(long)]
        raw: bool,
    },

    /// Interactive conversation (type /quit to end)
    Chat,

    /// Validate capabilities without contacting Dialogflow
    Validate,

    /// Show resolved capabilities, optionally updating the config file
    Config {
        /// Store a capability (KEY=VALUE), repeatable
        #[arg(long)]
        set: Vec<String>,
        /// Remove a stored capability, repeatable
        #[arg(long)]
        unset: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Before tracing, so RUST_LOG may come from .env
    load_dotenv(None)?;
    init_tracing(cli.verbose);

    let mut config = Config::load()?;
    if let Commands::Config { set, unset } = &cli.command {
        update_config(&mut config, set, unset)?;
    }
    let env = Capabilities::from_env(ENV_PREFIX);
    let caps = resolve_capabilities(&config, cli.caps.as_deref(), env)?;

    match cli.command {
        Commands::Say {
            text,
            button,
            context,
            raw,
        } => cmd_say(caps, text, button, context, raw).await,
        Commands::Chat => cmd_chat(caps).await,
        Commands::Validate => cmd_validate(caps),
        Commands::Config { .. } => cmd_config(&caps),
    }
}

/// Load a `.env` file into the process environment; a missing file is fine
fn load_dotenv(path: Option<&Path>) -> Result<()> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match loaded {
        Err(e) if !e.not_found() => Err(e).context("Failed to load .env file"),
        _ => Ok(()),
    }
}

fn log_filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "debug" } else { "warn" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn init_tracing(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .with_writer(std::io::stderr)
        .init();
}

// ============================================
// Command Implementations
// ============================================

/// A started connector and the receiving end of its sink
struct Conversation {
    connector: DialogflowConnector,
    replies: UnboundedReceiver<BotMessage>,
}

impl Conversation {
    async fn open(caps: Capabilities) -> Result<Self> {
        let (tx, replies) = mpsc::unbounded_channel();
        let mut connector = DialogflowConnector::new(caps, Arc::new(tx));

        connector.validate()?;
        connector.build().await.context("Failed to build connector")?;
        connector.start().await.context("Failed to start session")?;

        Ok(Self { connector, replies })
    }

    async fn send(&mut self, message: &mut UserMessage) -> Result<Vec<BotMessage>> {
        self.connector.user_says(message).await?;

        let mut received = Vec::new();
        while let Ok(reply) = self.replies.try_recv() {
            received.push(reply);
        }
        Ok(received)
    }

    async fn close(mut self) -> Result<()> {
        self.connector.stop().await?;
        self.connector.clean().await?;
        Ok(())
    }
}

async fn cmd_say(
    caps: Capabilities,
    text: Option<String>,
    button: Option<String>,
    contexts: Vec<String>,
    raw: bool,
) -> Result<()> {
    let mut message = match (text, button) {
        (None, None) => bail!("Nothing to say: give a message text or --button"),
        (text, button) => {
            let mut message = UserMessage::empty();
            message.message_text = text;
            if let Some(payload) = button {
                message = message.with_button(Button::text(&payload).with_payload(payload));
            }
            message
        }
    };

    if !contexts.is_empty() {
        message = message.with_custom(SET_DIALOGFLOW_CONTEXT, parse_context_args(&contexts)?);
    }

    let mut conversation = Conversation::open(caps).await?;
    let replies = conversation.send(&mut message).await?;

    if raw {
        eprintln!("{}", "Request:".dimmed());
        eprintln!("{}", serde_json::to_string_pretty(&message.source_data)?);
    }
    for reply in &replies {
        print_bot_message(reply);
        if raw {
            eprintln!("{}", "Query result:".dimmed());
            eprintln!("{}", serde_json::to_string_pretty(&reply.source_data)?);
        }
    }
    if replies.is_empty() {
        println!("{}", "(no reply)".dimmed());
    }

    conversation.close().await
}

async fn cmd_chat(caps: Capabilities) -> Result<()> {
    let mut conversation = Conversation::open(caps).await?;

    if let Some(path) = conversation.connector.session_path() {
        println!("{} {}", "Session:".dimmed(), path.dimmed());
    }
    println!("{}", "Type /quit to end the conversation.".dimmed());

    loop {
        let line: String = Input::new()
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()
            .context("Failed to read input")?;

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }

        match conversation.send(&mut UserMessage::text(line)).await {
            Ok(replies) => replies.iter().for_each(print_bot_message),
            Err(e) => eprintln!("{} {}", "Error:".red(), e),
        }
    }

    conversation.close().await
}

fn cmd_validate(caps: Capabilities) -> Result<()> {
    let connector = DialogflowConnector::new(caps, Arc::new(parley::CollectingSink::new()));

    match connector.validate() {
        Ok(()) => {
            println!("{} Capabilities are valid", "✓".green());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            bail!("Validation failed");
        }
    }
}

fn update_config(config: &mut Config, set: &[String], unset: &[String]) -> Result<()> {
    if set.is_empty() && unset.is_empty() {
        return Ok(());
    }

    for assignment in set {
        config.set_capability(assignment)?;
    }
    for key in unset {
        if !config.unset_capability(key) {
            eprintln!("{} {} was not set", "!".yellow(), key);
        }
    }

    config.save()?;
    println!("{} Config saved", "✓".green());
    Ok(())
}

fn cmd_config(caps: &Capabilities) -> Result<()> {
    println!("{}", "Configuration:".bold());
    println!("  Path: {:?}", Config::config_path()?);

    if caps.is_empty() {
        println!("  Capabilities: {}", "None".red());
        return Ok(());
    }

    println!("  Capabilities:");
    for (key, value) in caps.iter() {
        println!("    {} = {}", key.cyan(), display_value(key, value));
    }

    Ok(())
}

/// Parse `name=lifespan` pairs into a context update object
fn parse_context_args(args: &[String]) -> Result<Value> {
    let mut updates = Map::new();
    for arg in args {
        let (name, lifespan) = arg
            .split_once('=')
            .with_context(|| format!("Invalid context '{}', expected name=lifespan", arg))?;
        let lifespan: u32 = lifespan
            .trim()
            .parse()
            .with_context(|| format!("Invalid lifespan in context '{}'", arg))?;
        updates.insert(name.trim().to_string(), Value::from(lifespan));
    }
    Ok(Value::Object(updates))
}

fn print_bot_message(message: &BotMessage) {
    if let Some(nlp) = &message.nlp {
        let intent = nlp.intent.name.as_deref().unwrap_or("-");
        let confidence = nlp
            .intent
            .confidence
            .map(|c| format!(" {:.2}", c))
            .unwrap_or_default();
        let marker = if nlp.intent.incomprehension {
            intent.yellow()
        } else {
            intent.green()
        };
        println!("{} {}{}", "intent:".dimmed(), marker, confidence.dimmed());
        for entity in &nlp.entities {
            println!("  {} = {}", entity.name.cyan(), entity.value);
        }
    }

    if let Some(text) = &message.message_text {
        println!("{} {}", "bot:".bold(), text);
    }
    for media in &message.media {
        println!(
            "  {} {}",
            "[media]".dimmed(),
            media.media_uri.as_deref().unwrap_or("-")
        );
    }
    for card in &message.cards {
        println!(
            "  {} {}",
            "[card]".dimmed(),
            card.text.as_deref().unwrap_or("-").bold()
        );
        if let Some(subtext) = &card.subtext {
            println!("         {}", subtext.dimmed());
        }
        for button in &card.buttons {
            print_button(button, "         ");
        }
    }
    for button in &message.buttons {
        print_button(button, "  ");
    }
    for attachment in &message.attachments {
        println!(
            "  {} {} ({})",
            "[attachment]".dimmed(),
            attachment.name,
            attachment.mime_type
        );
    }
}

fn print_button(button: &Button, indent: &str) {
    let text = button.text.as_deref().unwrap_or("-");
    match &button.payload {
        Some(payload) => println!("{}[{}] {}", indent, text.cyan(), payload.dimmed()),
        None => println!("{}[{}]", indent, text.cyan()),
    }
}
