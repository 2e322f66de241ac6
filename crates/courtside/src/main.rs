use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use courtside_agents::DecisionContext;
use courtside_models::{DecisionType, GameState, Phase};
use courtside_reward::TradeScoring;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "courtside", about = "Autonomous general manager for Basketball GM")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/courtside.toml")]
    config: PathBuf,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse the trade feedback log and print one record per line
    Extract,

    /// Train the trade model from the feedback log and print its metrics
    Train,

    /// Score a trade description
    Score {
        /// Read the description from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Consult a specialist without executing anything
    Decide {
        #[arg(short, long)]
        decision_type: DecisionType,

        /// Read GameState JSON from a file instead of stdin
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Extra DecisionContext JSON
        #[arg(long)]
        context: Option<PathBuf>,
    },

    /// Show what happens to a session at `phase` with `remaining` moves left
    Advance {
        #[arg(short, long)]
        phase: Phase,

        /// Moves left in the phase; defaults to zero
        #[arg(short, long, default_value_t = 0)]
        remaining: u32,

        #[arg(short, long, default_value_t = 1)]
        season: u32,
    },
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read input: {}", p.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = courtside::load_config(&cli.config)?;

    match &cli.command {
        Command::Extract => {
            let records = courtside::feedback_log(&config)
                .load()
                .context("Failed to read feedback log")?;
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
            let accepted = records.iter().filter(|r| r.is_accepted()).count();
            tracing::info!(records = records.len(), accepted, "Extracted trade records");
        }

        Command::Train => {
            let scorer = courtside::build_scorer(&config);
            let model = scorer
                .retrain(&courtside::feedback_log(&config), &config.reward)
                .await
                .context("Training failed")?;
            print_json(&model.metadata, cli.pretty)?;
        }

        Command::Score { input } => {
            let text = read_input(input.as_ref())?;
            let text = text.trim();
            anyhow::ensure!(!text.is_empty(), "Trade description is empty");
            let evaluation = courtside::build_scorer(&config).score(text).await;
            print_json(&evaluation, cli.pretty)?;
        }

        Command::Decide {
            decision_type,
            state,
            context,
        } => {
            let raw = read_input(state.as_ref())?;
            let state: GameState =
                serde_json::from_str(&raw).context("Failed to parse GameState JSON")?;
            state
                .validate(config.phases.roster_cap)
                .map_err(|e| anyhow::anyhow!("Invalid GameState: {e}"))?;
            let context: DecisionContext = match context {
                Some(path) => serde_json::from_str(&read_input(Some(path))?)
                    .context("Failed to parse DecisionContext JSON")?,
                None => DecisionContext::default(),
            };

            let orchestrator =
                courtside::build_orchestrator(&config).context("Failed to build orchestrator")?;
            let gated = orchestrator
                .evaluate(&state, *decision_type, &context)
                .await;
            let reason = gated
                .hold_reason()
                .unwrap_or_else(|| "dry run".to_string());
            orchestrator
                .log()
                .record(&gated.decision, false, Some(reason))
                .await
                .context("Failed to write decision log")?;

            print_json(
                &serde_json::json!({
                    "decision": gated.decision,
                    "passes_gate": gated.passes_gate,
                    "threshold": gated.threshold,
                }),
                cli.pretty,
            )?;
        }

        Command::Advance {
            phase,
            remaining,
            season,
        } => {
            let phases = courtside::build_phase_manager(&config);
            let mut session = phases.start(*season, *phase);
            session.remaining = *remaining;

            if session.remaining > 0 {
                print_json(
                    &serde_json::json!({ "session": session, "transition": null }),
                    cli.pretty,
                )?;
            } else {
                let transition = phases
                    .on_budget_exhausted(&mut session)
                    .context("Cannot advance")?;
                print_json(
                    &serde_json::json!({ "session": session, "transition": transition }),
                    cli.pretty,
                )?;
            }
        }
    }

    Ok(())
}
