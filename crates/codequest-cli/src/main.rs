//! CodeQuest CLI
//!
//! Interactive terminal front end for the CodeQuest learning game: pick
//! levels, submit code for judging, ask for hints, and spend gems in the
//! cosmetic shop.

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use codequest_engine::{
    Catalog, Config, HintOutcome, LevelStatus, OfflineJudge, ProgressionController, QuestError,
    Session, ShopController, SubmitOutcome,
};
use codequest_judge::{
    GeminiJudge, GeminiOptions, HintRequest, Judge, JudgeRequest, JudgeVerdict,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

/// CodeQuest - Learn Programming Through Play
///
/// A gamified programming tutorial: complete coding levels judged by an AI
/// mentor, earn gems and stars, and unlock the next challenge.
#[derive(Parser, Debug)]
#[command(name = "codequest")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the level catalog file (overrides the config)
    #[arg(value_name = "LEVELS")]
    levels: Option<String>,

    /// Path to configuration file (default: codequest.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing subscriber with appropriate filter
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("CodeQuest starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run_codequest(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Either a live judge client or the offline fallback.
///
/// The progression controller is generic over its judge, so the choice
/// made at startup is wrapped in one concrete type here.
#[derive(Debug)]
enum JudgeBackend {
    Gemini(GeminiJudge),
    Offline(OfflineJudge),
}

impl Judge for JudgeBackend {
    async fn judge(&self, request: &JudgeRequest) -> JudgeVerdict {
        match self {
            Self::Gemini(judge) => judge.judge(request).await,
            Self::Offline(judge) => judge.judge(request).await,
        }
    }

    async fn hint(&self, request: &HintRequest) -> String {
        match self {
            Self::Gemini(judge) => judge.hint(request).await,
            Self::Offline(judge) => judge.hint(request).await,
        }
    }
}

/// Runs the interactive session.
///
/// 1. Load config and the level catalog
/// 2. Build the judge client (offline fallback without an API key)
/// 3. Drive the command loop until `quit` or EOF
async fn run_codequest(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI argument overrides
    if let Some(ref levels) = args.levels {
        config.levels.clone_from(levels);
    }
    config.validate()?;

    tracing::info!(levels = %config.levels, "Loading level catalog");
    let catalog = Arc::new(Catalog::load(&config.levels)?);
    println!("Loaded {} levels from {}", catalog.len(), config.levels);

    let judge = build_judge(&config);
    let controller = ProgressionController::new(
        Arc::clone(&catalog),
        judge,
        config.economy.starting_gems,
        config.economy.level_reward,
    );
    let shop = ShopController::new(controller.session(), config.economy.cosmetics.clone());

    println!();
    println!("Welcome to CodeQuest! Type 'help' for commands.");

    command_loop(&controller, &shop).await?;

    println!("Goodbye!");
    Ok(())
}

/// Builds the judge backend from configuration.
///
/// Falls back to the offline judge when the API key environment variable
/// is unset, so the session stays usable without network access.
fn build_judge(config: &Config) -> JudgeBackend {
    match std::env::var(&config.judge.api_key_env) {
        Ok(api_key) if !api_key.trim().is_empty() => {
            let options = GeminiOptions::new(&config.judge.endpoint, &config.judge.model, api_key)
                .with_timeout(Duration::from_secs(config.judge.timeout_secs))
                .with_language(&config.judge.language)
                .with_messages(config.messages.clone());
            JudgeBackend::Gemini(GeminiJudge::new(options))
        }
        _ => {
            tracing::warn!(
                env = %config.judge.api_key_env,
                "API key not set, judging will be unavailable"
            );
            println!(
                "Note: {} is not set. Submissions will fail until it is.",
                config.judge.api_key_env
            );
            JudgeBackend::Offline(OfflineJudge::new(config.messages.clone()))
        }
    }
}

/// Reads commands from stdin until `quit` or EOF.
async fn command_loop(
    controller: &ProgressionController<JudgeBackend>,
    shop: &ShopController,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"codequest> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let argument = parts.next();

        let result = match command {
            "levels" | "ls" => {
                print_levels(controller).await;
                Ok(())
            }
            "select" => run_select(controller, argument).await,
            "submit" => run_submit(controller, argument).await,
            "hint" => run_hint(controller, argument).await,
            "profile" => {
                print_profile(controller).await;
                Ok(())
            }
            "shop" => {
                print_shop(shop).await;
                Ok(())
            }
            "buy" => run_buy(shop, argument).await,
            "equip" => run_equip(shop, argument).await,
            "reset" => {
                controller.reset_progress().await;
                println!("Progress reset. Back to the first level!");
                Ok(())
            }
            "help" => {
                print_help();
                Ok(())
            }
            "quit" | "exit" => break,
            other => {
                println!("Unknown command '{other}'. Type 'help' for commands.");
                Ok(())
            }
        };

        if let Err(e) = result {
            if e.is_precondition() {
                println!("{e}");
            } else {
                return Err(e.into());
            }
        }
    }

    Ok(())
}

async fn run_select(
    controller: &ProgressionController<JudgeBackend>,
    argument: Option<&str>,
) -> Result<(), QuestError> {
    let Some(level_id) = argument else {
        println!("Usage: select <level-id>");
        return Ok(());
    };

    let level = controller.select_level(level_id).await?;

    println!();
    println!("=== {} - {} ===", level.id, level.title);
    if let Some(ref story) = level.story {
        println!();
        println!("{} {}: {}", story.avatar, story.character, story.text);
    }
    if let Some(ref concept) = level.concept {
        println!();
        println!("Concept: {}", concept.concept);
        println!("{}", concept.explanation);
        if !concept.example_code.is_empty() {
            println!();
            println!("{}", concept.example_code);
        }
    }
    println!();
    println!("Task: {}", level.task);
    if let Some(ref cheat_sheet) = level.cheat_sheet {
        println!();
        println!("Cheat sheet: {cheat_sheet}");
    }
    if !level.starter_code.is_empty() {
        println!();
        println!("Starter code:");
        println!("{}", level.starter_code);
    }
    Ok(())
}

async fn run_submit(
    controller: &ProgressionController<JudgeBackend>,
    argument: Option<&str>,
) -> Result<(), QuestError> {
    let Some(path) = argument else {
        println!("Usage: submit <source-file>");
        return Ok(());
    };
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            println!("Cannot read '{path}': {e}");
            return Ok(());
        }
    };

    println!("Judging...");
    let outcome = controller.submit(&source).await?;
    let verdict = outcome.verdict();

    println!();
    println!("--- Output ---");
    println!("{}", verdict.output);
    println!("--- Feedback ---");
    println!("{}", verdict.feedback);

    if !verdict.variables.is_empty() {
        println!("--- Variables ---");
        for var in &verdict.variables {
            println!("  {} {} = {}", var.type_name, var.name, var.value);
        }
    }

    match outcome {
        SubmitOutcome::Applied(ref verdict) if verdict.success => {
            let session = controller.session();
            let session = session.lock().await;
            println!();
            println!(
                "Level complete! +{} gems (balance: {})",
                controller.level_reward(),
                session.ledger().gems()
            );
        }
        SubmitOutcome::Applied(_) => {}
        SubmitOutcome::Stale(_) => {
            println!();
            println!("(You switched levels while this was being judged; result discarded.)");
        }
    }
    Ok(())
}

async fn run_hint(
    controller: &ProgressionController<JudgeBackend>,
    argument: Option<&str>,
) -> Result<(), QuestError> {
    let source = match argument {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(source) => source,
            Err(e) => {
                println!("Cannot read '{path}': {e}");
                return Ok(());
            }
        },
        None => String::new(),
    };

    let outcome = controller.request_hint(&source).await?;
    match outcome {
        HintOutcome::Delivered { depth, text } => {
            println!();
            println!("Hint ({depth}): {text}");
        }
        HintOutcome::Stale { text, .. } => {
            println!();
            println!("(Level changed while the mentor was thinking.)");
            println!("{text}");
        }
    }
    Ok(())
}

async fn run_buy(shop: &ShopController, argument: Option<&str>) -> Result<(), QuestError> {
    let Some(cosmetic_id) = argument else {
        println!("Usage: buy <cosmetic-id>");
        return Ok(());
    };
    shop.purchase(cosmetic_id).await?;
    println!("Purchased and equipped '{cosmetic_id}'.");
    Ok(())
}

async fn run_equip(shop: &ShopController, argument: Option<&str>) -> Result<(), QuestError> {
    let Some(cosmetic_id) = argument else {
        println!("Usage: equip <cosmetic-id>");
        return Ok(());
    };
    shop.equip(cosmetic_id).await?;
    println!("Equipped '{cosmetic_id}'.");
    Ok(())
}

/// Prints the level map with status, stars, and attempts.
async fn print_levels(controller: &ProgressionController<JudgeBackend>) {
    let session = controller.session();
    let session = session.lock().await;
    let active = session.active_level();

    println!();
    println!("=== Levels ===");
    for level in controller.catalog().iter() {
        let Some(record) = session.progress().get(&level.id) else {
            continue;
        };
        let marker = if active == Some(level.id.as_str()) {
            ">"
        } else {
            " "
        };
        let status = match record.status {
            LevelStatus::Locked => "[locked]   ",
            LevelStatus::Unlocked => "[unlocked] ",
            LevelStatus::Completed => "[completed]",
        };
        let stars = "*".repeat(usize::from(record.stars));
        println!(
            "{marker} {} {status} {} ({:?}) {stars}  attempts: {}",
            level.id, level.title, level.difficulty, record.attempts
        );
    }
}

/// Prints gems, stars, streak, and cosmetics for the session.
async fn print_profile(controller: &ProgressionController<JudgeBackend>) {
    let session = controller.session();
    let session = session.lock().await;

    println!();
    println!("=== Profile ===");
    print_profile_lines(&session);
}

fn print_profile_lines(session: &Session) {
    println!("Gems: {}", session.ledger().gems());
    println!("Stars: {}", session.progress().total_stars());
    println!(
        "Levels completed: {}/{}",
        session.progress().completed_count(),
        session.progress().iter().count()
    );
    println!("Streak: {} day(s)", session.ledger().streak());
    println!("Theme: {}", session.ledger().active_cosmetic());
    let owned: Vec<&str> = session.ledger().owned().collect();
    println!("Owned cosmetics: {}", owned.join(", "));
    println!("Session started: {}", session.started_at().to_rfc3339());
}

async fn print_shop(shop: &ShopController) {
    println!();
    println!("=== Shop ===");
    for entry in shop.entries().await {
        let state = if entry.equipped {
            "(equipped)"
        } else if entry.owned {
            "(owned)"
        } else {
            ""
        };
        println!(
            "  {:12} {:12} {:>4} gems {state}",
            entry.item.id, entry.item.name, entry.item.price
        );
    }
}

fn print_help() {
    println!();
    println!("Commands:");
    println!("  levels            Show the level map");
    println!("  select <id>       Activate an unlocked level");
    println!("  submit <file>     Submit a source file for judging");
    println!("  hint [file]       Ask the mentor for the next hint");
    println!("  profile           Show gems, stars, and cosmetics");
    println!("  shop              List cosmetics for sale");
    println!("  buy <id>          Purchase and equip a cosmetic");
    println!("  equip <id>        Equip an owned cosmetic");
    println!("  reset             Wipe all progress and start over");
    println!("  quit              Exit");
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}
