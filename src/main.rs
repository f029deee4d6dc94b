//! Binary entry point for stencil.
//!
//! This binary serves the HTTP API and exposes the engine operations on
//! the command line. Command output is JSON on stdout.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use stencil::http::{AppState, SessionResolver};
use stencil::models::NewBehavior;
use stencil::observability::{self, InitOptions};
use stencil::{
    BehaviorAction, Engine, ItemDetails, ItemType, StencilConfig, SuggestionRequest, UserId,
};

/// Stencil - behavior tracking and template suggestions.
#[derive(Parser)]
#[command(name = "stencil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve {
        /// Port to listen on (overrides config).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Record one behavior.
    Record {
        /// Numeric user id.
        user: i64,

        /// Action: view, implement, search, or favorite.
        action: String,

        /// Item type: template, file, or category.
        item_type: String,

        /// Item identifier.
        item_id: String,

        /// Item details as a JSON object.
        #[arg(short, long)]
        details: Option<String>,
    },

    /// Recompute a user's preference snapshot.
    Recompute {
        /// Numeric user id.
        user: i64,
    },

    /// Show suggestions for a user.
    Suggest {
        /// Numeric user id.
        user: i64,

        /// Maximum number of suggestions.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Skip the complexity strategy.
        #[arg(long)]
        no_complexity: bool,

        /// Skip the category strategy.
        #[arg(long)]
        no_categories: bool,

        /// Skip the tag strategy.
        #[arg(long)]
        no_tags: bool,
    },

    /// Show a user's recent behavior.
    History {
        /// Numeric user id.
        user: i64,

        /// Maximum number of records.
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },

    /// Show the resolved configuration.
    Config {
        /// Print the configuration.
        #[arg(long)]
        show: bool,
    },
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut config = match StencilConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };
    if let Commands::Serve { port: Some(port) } = cli.command {
        config.server.port = port;
    }

    let expose_metrics = matches!(cli.command, Commands::Serve { .. });
    let _observability = match observability::init_from_config(
        &config,
        InitOptions {
            verbose: cli.verbose,
            metrics_expose: expose_metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize observability: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Runs the selected command.
async fn run_command(
    command: Commands,
    config: StencilConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Commands::Config { show } = command {
        return cmd_config(&config, show);
    }

    let engine = Engine::open(&config)?;
    match command {
        Commands::Serve { .. } => cmd_serve(engine).await,
        Commands::Record {
            user,
            action,
            item_type,
            item_id,
            details,
        } => cmd_record(&engine, user, &action, &item_type, item_id, details),
        Commands::Recompute { user } => cmd_recompute(&engine, user),
        Commands::Suggest {
            user,
            limit,
            no_complexity,
            no_categories,
            no_tags,
        } => {
            let request = SuggestionRequest::new(
                limit.unwrap_or(engine.config().suggestions.default_limit),
            )
            .with_complexity(!no_complexity)
            .with_categories(!no_categories)
            .with_tags(!no_tags)
            .clamped(engine.config().suggestions.max_limit);
            print_json(&engine.composer().get_suggestions(UserId::new(user), &request))
        },
        Commands::History { user, limit } => {
            print_json(&engine.stores().behavior.recent(UserId::new(user), limit)?)
        },
        Commands::Config { .. } => Ok(()),
    }
}

/// Serves the HTTP API.
async fn cmd_serve(engine: Engine) -> Result<(), Box<dyn std::error::Error>> {
    let session = SessionResolver::from_env(engine.config().server.trust_user_header)?;
    let state = AppState::new(engine, session)?;
    stencil::http::serve(state).await?;
    Ok(())
}

/// Records one behavior.
fn cmd_record(
    engine: &Engine,
    user: i64,
    action: &str,
    item_type: &str,
    item_id: String,
    details: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let action =
        BehaviorAction::parse(action).ok_or_else(|| format!("unknown action '{action}'"))?;
    let item_type =
        ItemType::parse(item_type).ok_or_else(|| format!("unknown item type '{item_type}'"))?;
    let item_details = match details {
        Some(raw) => ItemDetails::from(serde_json::from_str::<serde_json::Value>(&raw)?),
        None => ItemDetails::default(),
    };

    let recorded = engine.recorder().record(&NewBehavior {
        user_id: UserId::new(user),
        action,
        item_type,
        item_id,
        item_details,
    });
    print_json(&json!({ "recorded": recorded }))?;
    if recorded {
        Ok(())
    } else {
        Err("behavior was not recorded".into())
    }
}

/// Recomputes and prints a snapshot.
fn cmd_recompute(engine: &Engine, user: i64) -> Result<(), Box<dyn std::error::Error>> {
    match engine.aggregator().recompute_preferences(UserId::new(user)) {
        Some(snapshot) => print_json(&snapshot),
        None => Err(format!("no behavior history for user {user}").into()),
    }
}

/// Prints the resolved configuration.
fn cmd_config(config: &StencilConfig, show: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !show {
        println!("Use --show to print the resolved configuration");
        return Ok(());
    }

    let s = &config.suggestions;
    print_json(&json!({
        "dataDir": config.data_dir.display().to_string(),
        "databasePath": config.database_path().display().to_string(),
        "server": {
            "bind": config.server.bind,
            "port": config.server.port,
            "maxBodyBytes": config.server.max_body_bytes,
            "trustUserHeader": config.server.trust_user_header,
        },
        "suggestions": {
            "historyWindow": s.history_window,
            "exclusionWindow": s.exclusion_window,
            "topCategories": s.top_categories,
            "topTags": s.top_tags,
            "defaultLimit": s.default_limit,
            "maxLimit": s.max_limit,
        },
        "capture": {
            "templatesList": config.capture.templates_list,
            "implement": config.capture.implement,
            "search": config.capture.search,
            "favorite": config.capture.favorite,
        },
        "features": {
            "behaviorCapture": config.features.behavior_capture,
            "lazyPreferences": config.features.lazy_preferences,
        },
        "metrics": {
            "enabled": config.metrics.enabled.unwrap_or(false),
            "port": config.metrics.port,
        },
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
