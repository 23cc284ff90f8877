//! Study Buddy - Main Entry Point
//!
//! Interactive chat loop: each line is parsed into study actions and executed
//! against a JSON file store (or memory when no path is configured).

use clap::Parser;
use inquire::{Confirm, InquireError, Text};
use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};
use study_buddy::config::AppConfig;
use study_buddy::logging::init_tracing;
use study_buddy::understanding::AgentResponse;
use study_buddy::{
    ConversationMemory, InMemoryStore, JsonFileStore, OpenRouterClient, StorageCollaborator,
    StudyAgent,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "study-buddy", version, about = "Chat with your study material")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file holding notes, flashcards and schedule entries
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Never call the LLM; use rule-based parsing and template content
    #[arg(long)]
    offline: bool,

    /// Log filter directive, overriding the config file
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: could not load {}: {}", path.display(), e);
                process::exit(1);
            }
        },
        None => AppConfig::default(),
    };
    init_tracing(args.log_level.as_deref().unwrap_or(&config.log_level));

    let agent = match build_agent(&args, &config) {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    print_banner(&agent);
    run_chat(agent, config.conversation.max_entries).await;
    println!("\nGood luck with your studies! Goodbye!");
}

fn build_agent(args: &Args, config: &AppConfig) -> study_buddy::Result<StudyAgent> {
    let storage: Arc<dyn StorageCollaborator> =
        match args.store.clone().or_else(|| config.storage.path.clone()) {
            Some(path) => {
                info!("Using store {}", path.display());
                Arc::new(JsonFileStore::open(path)?)
            }
            None => Arc::new(InMemoryStore::new()),
        };

    if args.offline {
        return Ok(StudyAgent::new(storage, config));
    }

    match OpenRouterClient::from_env(&config.openrouter) {
        Ok(client) => {
            info!("LLM parsing with model {}", client.model());
            Ok(StudyAgent::with_llm_client(storage, Arc::new(client), config))
        }
        Err(e) => {
            warn!("LLM disabled: {}", e);
            eprintln!(
                "Running offline. Set {} to enable LLM parsing and content.",
                config.openrouter.api_key_env
            );
            Ok(StudyAgent::new(storage, config))
        }
    }
}

fn print_banner(agent: &StudyAgent) {
    println!("╭─────────────────────────────────────────────────╮");
    println!("│  Study Buddy - notes, flashcards and schedule   │");
    println!("╰─────────────────────────────────────────────────╯");
    println!();
    println!(
        "LLM: {}",
        if agent.is_offline() { "Disabled" } else { "Enabled" }
    );
    println!("Tip: try \"make 5 flashcards about cells then detailed notes\"");
    println!("Type 'exit' to quit, Ctrl+C cancels a running request.");
    println!();
}

async fn run_chat(agent: StudyAgent, max_entries: usize) {
    let mut memory = ConversationMemory::with_capacity(max_entries);
    let current: Arc<Mutex<Option<CancellationToken>>> = Arc::new(Mutex::new(None));

    // Ctrl+C cancels the in-flight request instead of killing the session
    let watcher = current.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if let Some(token) = watcher.lock().ok().and_then(|slot| slot.clone()) {
                token.cancel();
            }
        }
    });

    loop {
        let input = match Text::new("You:").prompt() {
            Ok(input) => input,
            Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
            Err(e) => {
                eprintln!("ERROR: {}", e);
                break;
            }
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if matches!(input.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let token = CancellationToken::new();
        if let Ok(mut slot) = current.lock() {
            *slot = Some(token.clone());
        }
        let response = agent
            .understand_and_execute_with_cancel(input, Some(&memory), &token)
            .await;
        if let Ok(mut slot) = current.lock() {
            *slot = None;
        }

        println!("\n{}\n", response.summary);
        memory.record(input, &response.summary, response.topics.clone());
        confirm_pending(&agent, &response).await;
    }
}

async fn confirm_pending(agent: &StudyAgent, response: &AgentResponse) {
    for pending in &response.pending_confirmations {
        let answer = Confirm::new(&pending.prompt())
            .with_default(false)
            .prompt()
            .unwrap_or(false);
        if answer {
            println!("\n{}\n", agent.confirm(&pending.token).await.summary);
        } else {
            println!("Kept your {}.", pending.action.target.noun(pending.affected));
        }
    }
}
