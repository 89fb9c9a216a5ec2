use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use deckstats::calculate::{
    card_totals, generate_card_stats, generate_decklist_matchups, generate_matchups, unique_cards,
    unique_decks,
};
use deckstats::config::AppConfig;
use deckstats::fetch::{Credentials, RetryPolicy, TrackobotClient};
use deckstats::models::{GameTable, ModeFilter};
use deckstats::normalize::{normalize, SchemaPolicy};
use deckstats::pipeline::{build_graphs, load_history_file, refresh_user, GraphSettings};
use deckstats::present::{heatmap, Field};
use deckstats::storage::{GraphStore, JsonlWriter, StorageConfig};

#[derive(Parser)]
#[command(name = "deckstats")]
#[command(about = "Match history statistics for Track-o-Bot exports")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull a user's history, refetching only when it changed
    Pull {
        #[arg(long)]
        username: String,

        #[arg(long)]
        token: String,

        /// Rebuild the stored graphs from the pulled history
        #[arg(long)]
        build_graphs: bool,
    },

    /// Normalize an exported history file
    Normalize {
        /// History JSON file
        #[arg(long)]
        input: PathBuf,

        /// Write the table as JSONL instead of printing it
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip records that fail validation instead of aborting
        #[arg(long)]
        skip_invalid: bool,
    },

    /// Win rates per deck matchup
    Matchups {
        #[arg(long)]
        input: PathBuf,

        /// ranked, casual or both
        #[arg(long)]
        mode: Option<String>,

        /// Keep matchups with more games than this
        #[arg(long)]
        threshold: Option<u32>,

        /// Print as a heatmap instead of rows
        #[arg(long)]
        heatmap: bool,
    },

    /// Card totals and per-turn card win rates
    Cards {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        mode: Option<String>,

        /// Keep card rows with more plays than this
        #[arg(long)]
        threshold: Option<u32>,

        /// Per-deck card win rates for the player's cards instead
        #[arg(long)]
        decklist: bool,
    },

    /// Decks and cards that pass the thresholds
    Decks {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        mode: Option<String>,
    },

    /// Build and query stored heatmaps
    Graphs {
        #[command(subcommand)]
        action: GraphsAction,
    },
}

#[derive(Subcommand)]
enum GraphsAction {
    /// Rebuild all graphs from a history file
    Build {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        mode: Option<String>,
    },

    /// List stored deck and card graph names
    List,

    /// Print one stored graph
    Show {
        /// Deck or card name
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {:?}", cli.config))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Initialize tracing; stdout is reserved for results
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            cli.json_logs
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!cli.json_logs)
                .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .init();

    info!("Starting deckstats v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(config.data_dir.clone());

    match cli.command {
        Commands::Pull {
            username,
            token,
            build_graphs: rebuild,
        } => {
            let credentials = Credentials::new(username, token);
            let client = TrackobotClient::new(&config.source, credentials.clone())?;
            let outcome = refresh_user(
                &client,
                &storage,
                &credentials,
                &config.analysis.normalize_options(),
                RetryPolicy::from_config(&config.source),
            )
            .await?;

            let mut graphs_built = None;
            if rebuild {
                let settings = graph_settings(&config, None)?;
                let graphs = build_graphs(&outcome.table, settings)?;
                GraphStore::new(&storage).replace_all(&graphs)?;
                graphs_built = Some(graphs.len());
            }

            print_json(&json!({
                "total_items": outcome.total_items,
                "games": outcome.table.len(),
                "refreshed": outcome.refreshed,
                "graphs_built": graphs_built,
            }))?;
        }

        Commands::Normalize {
            input,
            output,
            skip_invalid,
        } => {
            let raw = load_history_file(&input)?;
            let mut options = config.analysis.normalize_options();
            if skip_invalid {
                options.schema_policy = SchemaPolicy::SkipAndWarn;
            }
            let report = normalize(&raw, &options)?;

            match output {
                Some(path) => {
                    JsonlWriter::new(path.clone()).write_all(report.table.rows())?;
                    print_json(&json!({
                        "input": report.input,
                        "kept": report.table.len(),
                        "skipped": report.skipped,
                        "dropped_empty": report.dropped_empty,
                        "output": path,
                    }))?;
                }
                None => print_json(&report.table)?,
            }
        }

        Commands::Matchups {
            input,
            mode,
            threshold,
            heatmap: as_heatmap,
        } => {
            let table = load_table(&input, &config)?;
            let mode = parse_mode(mode.as_deref(), &config)?;
            let threshold = threshold.unwrap_or(config.analysis.game_threshold);
            let matchups = generate_matchups(&table, mode, threshold)?;

            if as_heatmap {
                let matrix = heatmap(
                    &matchups,
                    Field::OpponentDeckType,
                    Field::PlayerDeckType,
                    Field::WinPct,
                    format!("Matchup Win % ({})", mode),
                )?;
                print_json(&matrix)?;
            } else {
                print_json(&matchups)?;
            }
        }

        Commands::Cards {
            input,
            mode,
            threshold,
            decklist,
        } => {
            let table = load_table(&input, &config)?;
            let mode = parse_mode(mode.as_deref(), &config)?;
            let threshold = threshold.unwrap_or(config.analysis.card_threshold);

            if decklist {
                print_json(&generate_decklist_matchups(&table, mode, threshold)?)?;
            } else {
                print_json(&json!({
                    "totals": card_totals(&table, mode)?,
                    "stats": generate_card_stats(&table, mode, threshold)?,
                }))?;
            }
        }

        Commands::Decks { input, mode } => {
            let table = load_table(&input, &config)?;
            let mode = parse_mode(mode.as_deref(), &config)?;
            print_json(&json!({
                "decks": unique_decks(&table, mode, config.analysis.game_threshold, true)?,
                "cards": unique_cards(&table, mode, config.analysis.card_threshold)?,
            }))?;
        }

        Commands::Graphs { action } => {
            let store = GraphStore::new(&storage);
            match action {
                GraphsAction::Build { input, mode } => {
                    let table = load_table(&input, &config)?;
                    let graphs = build_graphs(&table, graph_settings(&config, mode.as_deref())?)?;
                    let count = store.replace_all(&graphs)?;
                    info!("Stored {} graphs", count);
                    print_json(&json!({ "graphs_built": count }))?;
                }
                GraphsAction::List => {
                    let (decks, cards) = store.name_lists()?;
                    print_json(&json!({ "decks": decks, "cards": cards }))?;
                }
                GraphsAction::Show { name } => match store.get(&name)? {
                    Some(graph) => print_json(&graph)?,
                    None => anyhow::bail!("No graph named {:?}", name),
                },
            }
        }
    }

    Ok(())
}

fn load_table(input: &Path, config: &AppConfig) -> Result<GameTable> {
    let raw = load_history_file(input)?;
    let report = normalize(&raw, &config.analysis.normalize_options())?;
    info!(
        "Loaded {} games from {:?} ({} skipped, {} without card plays)",
        report.table.len(),
        input,
        report.skipped,
        report.dropped_empty
    );
    Ok(report.table)
}

fn parse_mode(flag: Option<&str>, config: &AppConfig) -> Result<ModeFilter> {
    flag.unwrap_or(&config.analysis.game_mode)
        .parse()
        .map_err(anyhow::Error::msg)
}

fn graph_settings(config: &AppConfig, mode: Option<&str>) -> Result<GraphSettings> {
    Ok(GraphSettings {
        mode: parse_mode(mode, config)?,
        threshold: config.analysis.graph_threshold,
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
