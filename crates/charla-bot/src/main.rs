//! charla - conversational assistant CLI
//!
//! A stdin/stdout front-end around the message orchestrator. The real
//! transport (a messaging platform) would call the same
//! `Orchestrator::handle_message` with its own user ids.

mod config;
mod lang;
mod memory;
mod orchestrator;
mod router;
mod tools;

use std::sync::Arc;

use charla_agent::{Agent, AgentConfig, BoxedTool};
use charla_ai::providers::GeminiProvider;
use clap::Parser;

use memory::ConversationStore;
use orchestrator::Orchestrator;
use tools::{CurrencyConverter, LibreBackend, LyricsClient, MyMemoryBackend, Translator};

/// User id for the local CLI session
const LOCAL_USER_ID: memory::UserId = 0;

/// System prompt for the tool-selection agent
const AGENT_PROMPT: &str = "\
Eres un asistente que resuelve peticiones usando herramientas.
Elige la herramienta adecuada (conversión de monedas, traducción o letras \
de canciones), úsala y responde en español con el resultado.";

/// charla - conversational assistant
#[derive(Parser, Debug)]
#[command(name = "charla")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Model to use (default: gemini-2.0-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// Run in non-interactive mode with a single message
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Display name used in the conversation
    #[arg(long, default_value = "amigo")]
    name: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("charla=debug")
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    // Load config file
    let cfg = config::Config::load();

    let Some(api_key) = cfg.get_api_key() else {
        eprintln!("Error: no API key found.");
        eprintln!("Set GEMINI_API_KEY or add api_key to {}", config::Config::config_path().display());
        std::process::exit(1);
    };

    let model = args
        .model
        .or(cfg.model.clone())
        .unwrap_or_else(|| charla_ai::providers::gemini::DEFAULT_MODEL.to_string());

    let backend = Arc::new(GeminiProvider::new(api_key).with_model(model));

    let orchestrator = build_orchestrator(&cfg, backend);

    // Single-shot mode
    if let Some(message) = args.command {
        let reply = orchestrator
            .handle_message(LOCAL_USER_ID, &args.name, &message)
            .await;
        println!("{}", reply);
        return Ok(());
    }

    run_interactive(&orchestrator, &args.name).await
}

/// Wire the store, tools, and agent into an orchestrator
fn build_orchestrator(cfg: &config::Config, backend: Arc<GeminiProvider>) -> Orchestrator {
    let store = Arc::new(ConversationStore::new(cfg.max_history, cfg.timeout_minutes));

    let mut currency = CurrencyConverter::new();
    if let Some(ref url) = cfg.currency_base_url {
        currency = currency.with_base_url(url);
    }
    let currency: BoxedTool = Arc::new(currency);

    let mut libre = LibreBackend::new();
    if let Some(ref url) = cfg.libre_base_url {
        libre = libre.with_base_url(url);
    }
    let mut mymemory = MyMemoryBackend::new();
    if let Some(ref url) = cfg.mymemory_base_url {
        mymemory = mymemory.with_base_url(url);
    }
    let translator: BoxedTool = Arc::new(Translator::with_backends(vec![
        Box::new(libre),
        Box::new(mymemory),
    ]));

    let mut lyrics = LyricsClient::new();
    if let Some(ref url) = cfg.lyrics_base_url {
        lyrics = lyrics.with_base_url(url);
    }
    let lyrics: BoxedTool = Arc::new(lyrics);

    let mut agent = Agent::new(
        AgentConfig {
            system_prompt: Some(AGENT_PROMPT.to_string()),
            max_iterations: cfg.agent_max_iterations,
            temperature: Some(0.7),
        },
        backend.clone(),
    );
    agent.add_tool(currency.clone());
    agent.add_tool(translator.clone());
    agent.add_tool(lyrics);
    tracing::debug!(tools = ?agent.tool_names(), "agent ready");

    Orchestrator::new(store, backend, agent, currency, translator)
}

/// Interactive stdin/stdout loop
async fn run_interactive(orchestrator: &Orchestrator, user_name: &str) -> anyhow::Result<()> {
    use std::io::{self, Write};

    println!("charla — escribe un mensaje, /help para ver los comandos");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            // EOF
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        // Handle slash commands
        if let Some(command) = input.strip_prefix('/') {
            match command {
                "help" => {
                    println!("/reset  - reiniciar la conversación");
                    println!("/stats  - estadísticas de memoria");
                    println!("/quit   - salir");
                }
                "reset" => {
                    println!("{}", orchestrator.reset(LOCAL_USER_ID));
                }
                "stats" => {
                    let stats = orchestrator.stats();
                    println!(
                        "usuarios activos: {} | mensajes guardados: {}",
                        stats.active_users, stats.total_messages
                    );
                    let summary = orchestrator.context_summary(LOCAL_USER_ID);
                    if !summary.is_empty() {
                        println!("--- contexto reciente ---\n{}", summary);
                    }
                }
                "quit" | "exit" => break,
                other => {
                    println!("Comando desconocido: /{}", other);
                    println!("Escribe /help para ver los comandos.");
                }
            }
            continue;
        }

        let reply = orchestrator
            .handle_message(LOCAL_USER_ID, user_name, input)
            .await;
        println!("{}", reply);
    }

    Ok(())
}
