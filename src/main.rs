//! RagBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ragbuddy::{
    backends::{Embedder, OllamaClient, QdrantSearch},
    cli::{Args, ChatInput, Commands, DisplayManager, InputHandler, Verbosity},
    conversation::ConversationStore,
    doctor::Doctor,
    ChatRequest, Config, Orchestrator, RagError, StreamEvent,
};

/// Install the log subscriber; `RUST_LOG` overrides the verbosity flags
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let verbosity = args.verbosity();
    init_tracing(verbosity);

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    match &args.command {
        Commands::Ask {
            query,
            conversation,
            simple,
            no_stream,
            json,
        } => {
            let mut request = ChatRequest::new(query.as_str());
            if let Some(id) = conversation {
                request = request.with_conversation(id.as_str());
            }
            if *simple {
                request = request.simple();
            }
            let orchestrator = Arc::new(build_orchestrator(&config)?);
            let mut display = DisplayManager::new(verbosity);

            let ok = if *no_stream {
                run_batch(&orchestrator, request, &mut display).await?
            } else {
                run_streamed(&orchestrator, request, &mut display, *json).await?
            };
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Search { query, top_k } => {
            let orchestrator = build_orchestrator(&config)?;
            let top_k = top_k.unwrap_or(config.retrieval.default_top_k);
            let outcome = orchestrator.search(query, top_k).await?;
            DisplayManager::new(verbosity).show_search(&outcome);
        }
        Commands::Chat { simple } => {
            run_chat(&config, verbosity, *simple).await?;
        }
        Commands::Collection { name } => {
            let embedder: Arc<dyn Embedder> = Arc::new(OllamaClient::new(&config.ollama)?);
            let search = QdrantSearch::new(&config.qdrant, embedder)?;
            let name = name.as_deref().unwrap_or(search.collection());
            let summary = search
                .collection_info(name)
                .await
                .with_context(|| format!("Failed to inspect collection {}", name))?;
            DisplayManager::new(verbosity).show_collection(&summary);
        }
        Commands::Doctor => {
            run_doctor(config).await?;
        }
        Commands::Config => {
            show_config(&args, &config)?;
        }
    }

    Ok(())
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let store = Arc::new(ConversationStore::new());
    Orchestrator::from_config(config, store).context("Failed to initialize collaborators")
}

/// Returns whether the run completed
async fn run_streamed(
    orchestrator: &Arc<Orchestrator>,
    request: ChatRequest,
    display: &mut DisplayManager,
    json: bool,
) -> Result<bool> {
    let mut events = orchestrator.stream(request)?;
    let mut completed = false;

    while let Some(event) = events.next().await {
        if matches!(event, StreamEvent::Complete { .. }) {
            completed = true;
        }
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            display.render_event(&event);
        }
        if event.is_terminal() {
            break;
        }
    }

    Ok(completed)
}

async fn run_batch(
    orchestrator: &Orchestrator,
    request: ChatRequest,
    display: &mut DisplayManager,
) -> Result<bool> {
    match orchestrator.process(request).await {
        Ok(response) => {
            display.show_response(&response);
            Ok(true)
        }
        Err(RagError::RunFailed(failure)) => {
            for thought in &failure.thought_trail {
                display.show_thought(thought);
            }
            display.show_error(&failure.error);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

/// Interactive conversation sharing one store and one conversation id
async fn run_chat(config: &Config, verbosity: Verbosity, simple: bool) -> Result<()> {
    let orchestrator = Arc::new(build_orchestrator(config)?);
    let mut display = DisplayManager::new(verbosity);
    let mut input = InputHandler::new()?;
    let mut conversation_id = ragbuddy::conversation::mint_conversation_id();

    display.show_banner(env!("CARGO_PKG_VERSION"), &config.ollama.model);

    while let Some(line) = input.read_line()? {
        match line {
            ChatInput::Exit => break,
            ChatInput::Empty => continue,
            ChatInput::Unknown(cmd) => display.show_warning(&format!("unknown command {}", cmd)),
            ChatInput::History => match orchestrator.conversation(&conversation_id) {
                Ok(turns) => display.show_history(&turns),
                Err(RagError::NotFound(_)) => display.show_info("no history yet"),
                Err(e) => display.show_error(&e.to_string()),
            },
            ChatInput::Clear => {
                let _ = orchestrator.delete_conversation(&conversation_id);
                conversation_id = ragbuddy::conversation::mint_conversation_id();
                display.show_info("conversation cleared");
            }
            ChatInput::Query(query) => {
                let mut request = ChatRequest::new(query).with_conversation(conversation_id.as_str());
                if simple {
                    request = request.simple();
                }
                if let Err(e) = run_streamed(&orchestrator, request, &mut display, false).await {
                    display.show_error(&e.to_string());
                }
            }
        }
    }

    input.save_history()?;
    Ok(())
}

async fn run_doctor(config: Config) -> Result<()> {
    let doctor = Doctor::new(config)?;
    let checks = doctor.run_diagnostics().await;
    Doctor::display_results(&checks);

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };

    println!("\n{}", "RagBuddy Configuration".bold().cyan());
    println!("{}\n", path.display().to_string().dimmed());
    println!("{}", toml::to_string_pretty(config)?);
    println!("Verbosity: {}", args.verbosity().as_str());

    Ok(())
}
