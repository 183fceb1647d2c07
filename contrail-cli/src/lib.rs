//! contrail-cli library - command definitions and handlers
//!
//! Thin command surface over `contrail-core`: inspect a signal store,
//! move signals in and out as JSON, fit confidence tubes, and score
//! signals against a saved tube. The handlers live here rather than in
//! the binary so integration tests can drive whole pipelines in-process.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use contrail_core::{
    ConfidenceTube, ExcursionHighlighter, OpenMode, SignalStore, SignalTable, TubeBuilder,
    TubeScorer,
};

pub mod config;

/// Command-line arguments for contrail
#[derive(Parser, Debug)]
#[command(name = "contrail")]
#[command(about = "Confidence tubes over stored signal populations")]
#[command(version)]
pub struct Cli {
    /// Store container path
    #[arg(short, long, global = true, env = "CONTRAIL_STORE")]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored signals with row counts and variables
    Ls,
    /// Put a signal from a JSON table file
    Import {
        /// JSON file holding one signal table
        file: PathBuf,
        /// Signal id (a fresh uuid when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Write one signal out as JSON
    Export {
        id: String,
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fit a confidence tube over signals in the store
    Fit {
        /// Variables to fit, comma separated
        #[arg(long, value_delimiter = ',', required = true)]
        variables: Vec<String>,
        /// Grid resolution (number of normalized positions)
        #[arg(short = 'k', long, default_value_t = contrail_core::tube::builder::DEFAULT_GRID_RESOLUTION)]
        grid_resolution: usize,
        /// Robustness quantile: tail mass trimmed on each side
        #[arg(short = 'a', long, default_value_t = contrail_core::tube::builder::DEFAULT_ROBUSTNESS_QUANTILE)]
        alpha: f64,
        /// Restrict the reference population to these ids
        #[arg(long, value_delimiter = ',')]
        ids: Option<Vec<String>>,
        /// Where to save the fitted tube (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Score one stored signal against a saved tube
    Score {
        id: String,
        /// Tube JSON produced by `fit`
        #[arg(long)]
        tube: PathBuf,
    },
}

/// Execute one parsed command against the resolved store.
pub async fn run(cli: Cli) -> Result<()> {
    let store_path = config::resolve_store_path(cli.store)?;

    match cli.command {
        Command::Ls => {
            let store = open_store(&store_path, OpenMode::ReadOnly).await?;
            let mut meta = store.describe().await?;
            meta.sort_by(|a, b| a.signal_id.cmp(&b.signal_id));
            for m in meta {
                println!(
                    "{}\t{} rows\t[{}]",
                    m.signal_id,
                    m.row_count,
                    m.variables.join(", ")
                );
            }
        }
        Command::Import { file, id } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let table: SignalTable = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a valid signal table", file.display()))?;
            let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

            let mode = if store_path.exists() {
                OpenMode::ReadWrite
            } else {
                OpenMode::Create { overwrite: false }
            };
            let store = open_store(&store_path, mode).await?;
            store.put(&id, &table).await?;
            info!(%id, rows = table.len(), "imported signal");
            println!("{id}");
        }
        Command::Export { id, output } => {
            let store = open_store(&store_path, OpenMode::ReadOnly).await?;
            let table = store.get(&id).await?;
            let json = serde_json::to_string_pretty(&table)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
        Command::Fit {
            variables,
            grid_resolution,
            alpha,
            ids,
            output,
        } => {
            let store = open_store(&store_path, OpenMode::ReadOnly).await?;
            let mut ids = match ids {
                Some(ids) => ids,
                None => store.list_ids().await?,
            };
            ids.sort();
            if ids.is_empty() {
                bail!("store holds no signals to fit from");
            }
            let mut reference = Vec::with_capacity(ids.len());
            for id in &ids {
                reference.push(store.get(id).await?);
            }

            let tube = TubeBuilder::new(grid_resolution, alpha)?.fit(&reference, &variables)?;
            tube.save_json(&output)
                .with_context(|| format!("failed to save tube to {}", output.display()))?;
            println!(
                "fitted tube over {} signals, {} variables -> {}",
                tube.reference_count(),
                variables.len(),
                output.display()
            );
        }
        Command::Score { id, tube } => {
            let tube = ConfidenceTube::load_json(&tube)
                .with_context(|| format!("failed to load tube from {}", tube.display()))?;
            let store = open_store(&store_path, OpenMode::ReadOnly).await?;
            let signal = store.get(&id).await?;
            let series = TubeScorer::evaluate(&tube, &signal)?;

            for variable in series.variables() {
                let worst = series.max_margin(&variable).unwrap_or(f64::NEG_INFINITY);
                let verdict = if worst > 0.0 { "OUT" } else { "in" };
                println!("{variable}\tworst margin {worst:+.6}\t{verdict}");
                for seg in ExcursionHighlighter::segments(&series, &variable)? {
                    println!(
                        "  excursion rows {}..={} (positions {:.3}..{:.3}), peak {:+.6}",
                        seg.start_row, seg.end_row, seg.start_position, seg.end_position,
                        seg.peak_margin
                    );
                }
            }
            if let Some(overall) = series.max_margin_overall() {
                println!("overall\tworst margin {overall:+.6}");
            }
        }
    }

    Ok(())
}

async fn open_store(path: &std::path::Path, mode: OpenMode) -> Result<SignalStore> {
    SignalStore::open(path, mode)
        .await
        .with_context(|| format!("failed to open store at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
