//! Arena CLI — run a forecaster tournament over a log of round scores.
//!
//! Commands:
//! - `run` — load a TOML config and a JSONL score log, run all four phases,
//!   print the outcome as pretty JSON
//! - `check-config` — validate a TOML config and print its content hash

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use arena_core::RoundScore;
use arena_runner::{Tournament, TournamentConfig};

#[derive(Parser)]
#[command(
    name = "arena",
    about = "Arena CLI — four-phase tournament for probabilistic forecasters"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a tournament over a JSONL log of round scores.
    Run {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSONL file, one `{"model_id", "score"}` or `{"model_id", "failed_round"}` per line.
        #[arg(long)]
        scores: PathBuf,

        /// Extra model ids to register even if they have no scores.
        #[arg(long, value_delimiter = ',')]
        models: Vec<String>,

        /// Write the outcome JSON here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a config file and print its content hash.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

/// One line of the score log.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScoreLine {
    Scored { model_id: String, score: RoundScore },
    Failed { model_id: String, failed_round: u32 },
}

impl ScoreLine {
    fn model_id(&self) -> &str {
        match self {
            Self::Scored { model_id, .. } | Self::Failed { model_id, .. } => model_id,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::level_filters::LevelFilter::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            scores,
            models,
            output,
        } => run_tournament_cmd(config.as_deref(), &scores, models, output.as_deref()),
        Commands::CheckConfig { config } => {
            let config = TournamentConfig::from_file(&config)
                .with_context(|| format!("loading config {}", config.display()))?;
            println!("{}", config.config_hash());
            Ok(())
        }
    }
}

fn run_tournament_cmd(
    config_path: Option<&Path>,
    scores_path: &Path,
    extra_models: Vec<String>,
    output: Option<&Path>,
) -> Result<()> {
    let config = match config_path {
        Some(path) => TournamentConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TournamentConfig::default(),
    };

    let lines = read_score_log(scores_path)?;
    if lines.is_empty() && extra_models.is_empty() {
        bail!("no models: {} is empty and --models was not given", scores_path.display());
    }

    // Registration order: first appearance in the log, then --models.
    let mut seen = HashSet::new();
    let model_ids: Vec<String> = lines
        .iter()
        .map(|l| l.model_id().to_string())
        .chain(extra_models)
        .filter(|id| seen.insert(id.clone()))
        .collect();

    let mut tournament = Tournament::new(config, model_ids)?;
    let mut scored = 0usize;
    let mut failed = 0usize;
    for (i, line) in lines.into_iter().enumerate() {
        match line {
            ScoreLine::Scored { model_id, score } => {
                tournament
                    .add_round_score(&model_id, score)
                    .with_context(|| format!("{}:{}", scores_path.display(), i + 1))?;
                scored += 1;
            }
            ScoreLine::Failed {
                model_id,
                failed_round,
            } => {
                tournament.record_failed_round(&model_id, failed_round)?;
                failed += 1;
            }
        }
    }
    info!(
        models = tournament.manager().len(),
        scored,
        failed,
        "score log loaded"
    );
    if scored == 0 {
        warn!("score log has no scored rounds; every phase will skip");
    }

    let outcome = tournament.run()?;
    eprintln!("{}", outcome.summary);

    let json = serde_json::to_string_pretty(&outcome)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("Outcome saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn read_score_log(path: &Path) -> Result<Vec<ScoreLine>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut lines = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let parsed: ScoreLine = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed score line", path.display(), i + 1))?;
        lines.push(parsed);
    }
    Ok(lines)
}
