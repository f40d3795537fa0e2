use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use questionnaire::config::AppConfig;
use questionnaire::db::Database;
use questionnaire::models::Answer;
use questionnaire::navigation::{BootError, Navigator, NullRenderer};
use questionnaire::persistence::{
    SessionStore, ANSWER_HISTORY_KEY, CACHE_VERSION_KEY, CURRENT_QUESTION_KEY, RESULT_KEY,
};
use questionnaire::render::TerminalRenderer;
use questionnaire::storage::KeyValueStore;
use questionnaire::{api, tree};

#[derive(Parser)]
#[command(name = "questionnaire")]
#[command(about = "Answer yes/no questions until you reach a recommendation")]
struct Cli {
    /// Decision tree source: a JSON file path or an http(s) URL
    #[arg(long, global = true)]
    tree: Option<String>,

    /// Local storage database file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer the questionnaire in the terminal (default)
    Play,
    /// Serve the questionnaire as a JSON API
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Show the stored session
    Status,
    /// Forget all stored progress
    Reset,
    /// Check the decision tree for broken branches
    Validate,
    /// Print the effective configuration
    Config {
        /// Write it to the user config file
        #[arg(long)]
        save: bool,
    },
}

/// Initialize tracing with output to stderr (for play mode) or stdout
fn init_tracing(use_stderr: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "questionnaire=info,tower_http=info".into()),
    );

    if use_stderr {
        // Play mode: stdout is where the questions go
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<SessionStore<Database>> {
    let db = match &config.db_path {
        Some(path) => Database::open(path.clone())?,
        None => Database::open_default()?,
    };
    db.migrate()?;
    Ok(SessionStore::new(
        db,
        config.root(),
        config.cache_version.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let use_stderr = matches!(cli.command, None | Some(Commands::Play));
    init_tracing(use_stderr);

    let mut config = AppConfig::load();
    if let Some(tree) = cli.tree {
        config.tree_source = tree;
    }
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }

    match cli.command.unwrap_or(Commands::Play) {
        Commands::Play => play(&config).await?,
        Commands::Serve { port } => {
            let store = open_store(&config)?;
            let source = tree::TreeSource::parse(&config.tree_source);
            let navigator =
                Navigator::boot(&source, store, config.total_steps, Box::new(NullRenderer)).await?;

            let app = api::create_router(navigator);
            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("Questionnaire listening on http://127.0.0.1:{}", port);

            axum::serve(listener, app).await?;
        }
        Commands::Status => {
            let store = open_store(&config)?;
            for key in [
                CACHE_VERSION_KEY,
                CURRENT_QUESTION_KEY,
                ANSWER_HISTORY_KEY,
                RESULT_KEY,
            ] {
                let value = store.storage().get(key)?;
                println!("{:<18} {}", key, value.as_deref().unwrap_or("-"));
            }
        }
        Commands::Reset => {
            open_store(&config)?.clear_all()?;
            println!("Stored progress cleared.");
        }
        Commands::Validate => {
            let source = tree::TreeSource::parse(&config.tree_source);
            let tree = tree::load(&source).await?;
            let issues = tree.issues();
            for issue in &issues {
                println!("{}", issue);
            }
            let questions = tree.question_count();
            println!(
                "{} nodes, {} questions (progress total is {})",
                tree.len(),
                questions,
                config.total_steps
            );
            if !issues.is_empty() || questions != config.total_steps as usize {
                std::process::exit(1);
            }
        }
        Commands::Config { save } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if save {
                config.save()?;
            }
        }
    }

    Ok(())
}

async fn play(config: &AppConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let source = tree::TreeSource::parse(&config.tree_source);
    let renderer = Box::new(TerminalRenderer::new(std::io::stdout()));

    let mut navigator = match Navigator::boot(&source, store, config.total_steps, renderer).await
    {
        Ok(navigator) => navigator,
        Err(BootError::TreeLoad(_)) => std::process::exit(1),
        Err(e) => return Err(e.into()),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim().to_ascii_lowercase();
        let outcome = match input.as_str() {
            "q" | "quit" => break,
            "b" | "back" => navigator.go_back().map(|_| ()),
            "r" | "restart" => navigator.restart().map(|_| ()),
            "" => continue,
            other => match other.parse::<Answer>() {
                Ok(choice) => navigator.answer(choice).map(|_| ()),
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            },
        };

        if let Err(e) = outcome {
            println!("Could not continue: {}", e);
        }
    }

    Ok(())
}
