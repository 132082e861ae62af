//! automind CLI
//!
//! Entry point: one-shot goal runs, an interactive chat session, a status
//! report, and first-time initialization of the config directory.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use dialoguer::Input;
use tracing_subscriber::EnvFilter;

use automind::agent::agent_loop::AgentLoop;
use automind::agent::limiter::ToolCallLimiter;
use automind::agent::word_filter::SensitiveWordScanner;
use automind::config::{get_config_path, load_config, resolve_path, save_config};
use automind::inference::HttpInferenceClient;
use automind::state::{MemoryStore, SqliteStore};
use automind::types::{default_config, AgentConfig, ConversationStore, LogLevel, RunOutcome};

const VERSION: &str = "0.1.0";

/// automind -- task-oriented agent runtime
#[derive(Parser, Debug)]
#[command(
    name = "automind",
    version = VERSION,
    about = "automind -- task-oriented agent runtime"
)]
struct Cli {
    /// Run one goal and print the outcome
    #[arg(long)]
    goal: Option<String>,

    /// Start an interactive chat session
    #[arg(long)]
    chat: bool,

    /// Show current configuration and status
    #[arg(long)]
    status: bool,

    /// Initialize the config directory with defaults
    #[arg(long)]
    init: bool,

    /// Keep conversation history in memory only (skip the SQLite store)
    #[arg(long)]
    no_persist: bool,
}

fn init_tracing(level: LogLevel) {
    let default_directive = match level {
        LogLevel::Debug => "automind=debug",
        LogLevel::Info => "automind=info",
        LogLevel::Warn => "automind=warn",
        LogLevel::Error => "automind=error",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

// ---- Init Command -----------------------------------------------------------

/// Create `~/.automind` with a default config and an empty vocabulary file.
fn run_init() -> Result<()> {
    let config = match load_config() {
        Some(existing) => {
            println!("Config already exists at {}", get_config_path().display());
            existing
        }
        None => {
            let config = default_config();
            save_config(&config).context("Failed to write default config")?;
            println!("Wrote default config to {}", get_config_path().display());
            config
        }
    };

    let words_path = resolve_path(&config.sensitive_words_path);
    if !std::path::Path::new(&words_path).exists() {
        fs::write(&words_path, "").context("Failed to create vocabulary file")?;
        println!("Created empty vocabulary file at {}", words_path);
    }

    let workspace = resolve_path(&config.workspace_dir);
    fs::create_dir_all(&workspace).context("Failed to create workspace directory")?;

    println!("{}", "Initialization complete.".green());
    println!("Set your API key in the config file or via AUTOMIND_API_KEY.");
    Ok(())
}

// ---- Status Command ---------------------------------------------------------

fn show_status() {
    let config = match load_config() {
        Some(config) => config,
        None => {
            println!("automind is not configured. Run: automind --init");
            return;
        }
    };

    println!(
        r#"
=== AUTOMIND STATUS ===
Name:         {}
Model:        {}
API URL:      {}
API key:      {}
Max steps:    {}
Tool cap:     {}
Vocabulary:   {}
Workspace:    {}
DB path:      {}
Version:      {}
=======================
"#,
        config.name,
        config.inference_model,
        config.inference_api_url,
        if config.inference_api_key.is_empty() {
            "missing".red().to_string()
        } else {
            "configured".green().to_string()
        },
        config.max_steps,
        config.tool_call_limit,
        resolve_path(&config.sensitive_words_path),
        resolve_path(&config.workspace_dir),
        resolve_path(&config.db_path),
        config.version,
    );
}

// ---- Runs -------------------------------------------------------------------

struct Runtime {
    config: AgentConfig,
    inference: Arc<HttpInferenceClient>,
    scanner: Arc<SensitiveWordScanner>,
    limiter: Arc<ToolCallLimiter>,
    store: Arc<dyn ConversationStore>,
}

fn build_runtime(no_persist: bool) -> Result<Runtime> {
    let config = load_config()
        .context("automind is not configured. Run: automind --init")?;

    if config.inference_api_key.is_empty() {
        anyhow::bail!("No API key configured. Set it in the config file or via AUTOMIND_API_KEY.");
    }

    let inference = Arc::new(HttpInferenceClient::new(
        config.inference_api_url.clone(),
        config.inference_api_key.clone(),
        config.inference_model.clone(),
        config.max_tokens_per_call,
    ));

    // A missing vocabulary file is fatal: the runtime does not start
    // without its content gate.
    let words_path = resolve_path(&config.sensitive_words_path);
    let scanner = Arc::new(SensitiveWordScanner::from_file(&words_path)?);

    let limiter = Arc::new(ToolCallLimiter::new(config.tool_call_limit));

    let store: Arc<dyn ConversationStore> = if no_persist {
        Arc::new(MemoryStore::new())
    } else {
        let db_path = resolve_path(&config.db_path);
        Arc::new(SqliteStore::open(&db_path).context("Failed to open conversation store")?)
    };

    Ok(Runtime {
        config,
        inference,
        scanner,
        limiter,
        store,
    })
}

fn print_outcome(outcome: &RunOutcome) {
    for step in &outcome.steps {
        let header = format!("[step {}]", step.step).dimmed();
        if !step.thought.is_empty() {
            println!("{} {}", header, step.thought);
        }
        if !step.tools.is_empty() {
            println!("{} tools: {}", header, step.tools.join(", ").cyan());
        }
        for file in &step.files {
            println!("{} wrote {} ({} bytes)", header, file.path, file.bytes);
        }
    }

    if outcome.blocked {
        println!("\n{}", outcome.answer.red());
    } else {
        println!("\n{}", outcome.answer.green());
    }
}

async fn run_goal(runtime: &Runtime, goal: &str) -> Result<()> {
    let mut agent = AgentLoop::new(
        runtime.config.clone(),
        runtime.inference.clone(),
        runtime.scanner.clone(),
        runtime.limiter.clone(),
        Some(runtime.store.clone()),
    )?;

    let outcome = agent.run(goal).await?;
    print_outcome(&outcome);
    Ok(())
}

async fn run_chat(runtime: &Runtime) -> Result<()> {
    println!(
        "{}",
        "Interactive session. Type 'exit' to quit.".dimmed()
    );

    loop {
        let goal: String = Input::new().with_prompt("you").interact_text()?;
        let goal = goal.trim().to_string();
        if goal.is_empty() {
            continue;
        }
        if goal == "exit" || goal == "quit" {
            break;
        }

        // Each goal gets a fresh loop; scanner, limiter, and store are shared.
        if let Err(err) = run_goal(runtime, &goal).await {
            eprintln!("{} {}", "error:".red(), err);
        }
    }

    Ok(())
}

// ---- Entry Point ------------------------------------------------------------

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.init {
        if let Err(e) = run_init() {
            eprintln!("Init failed: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    if cli.status {
        show_status();
        return;
    }

    let log_level = load_config()
        .map(|c| c.log_level)
        .unwrap_or(LogLevel::Info);
    init_tracing(log_level);

    if let Some(ref goal) = cli.goal {
        let result = async {
            let runtime = build_runtime(cli.no_persist)?;
            run_goal(&runtime, goal).await
        }
        .await;
        if let Err(e) = result {
            eprintln!("Fatal: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    if cli.chat {
        let result = async {
            let runtime = build_runtime(cli.no_persist)?;
            run_chat(&runtime).await
        }
        .await;
        if let Err(e) = result {
            eprintln!("Fatal: {:#}", e);
            std::process::exit(1);
        }
        return;
    }

    println!("Run \"automind --help\" for usage information.");
    println!("Run \"automind --goal '<task>'\" to execute a goal.");
}
