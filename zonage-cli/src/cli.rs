//! Définition et implémentation des commandes CLI
//!
//! - `apply`: un cycle, rapport et exports
//! - `watch`: cycles périodiques
//! - `batch`: une sélection par tournée
//! - `normalize`: forme canonique de clés

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Subcommand;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use zonage::key::normalize;
use zonage::{Snapshot, ZoneKey};
use zonage_cli::batch::{load_items, run_batch};
use zonage_cli::export::{export_driver_groups, export_zones};
use zonage_cli::{Config, CycleOutcome, CycleReport, FileSource, Pipeline};

#[derive(Subcommand)]
pub enum Commands {
    /// Run one selection cycle and print the summary
    Apply {
        /// Write the cycle report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// Write the visible zones as GeoJSON
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write one MultiPolygon per driver as GeoJSON
        #[arg(long)]
        drivers_export: Option<PathBuf>,
    },

    /// Run selection cycles periodically until interrupted
    Watch {
        /// Refresh period in seconds (défaut : refresh_secs de la config)
        #[arg(long)]
        interval: Option<u64>,

        /// Rewrite the cycle report after each cycle
        #[arg(long)]
        report: Option<PathBuf>,

        /// Rewrite the visible zones GeoJSON after each cycle
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Resolve one selection per batch item, plus an overview
    Batch {
        /// JSON array of batch items
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory for GeoJSON files and batch-report.json
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the canonical form of zone keys
    Normalize {
        /// Raw keys (e.g. w01_ne)
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

/// Exécute un cycle unique
pub async fn cmd_apply(
    config: Config,
    report_path: Option<&Path>,
    export_path: Option<&Path>,
    drivers_path: Option<&Path>,
) -> Result<()> {
    let pipeline = Pipeline::new(FileSource, config)?;
    let report = completed(pipeline.run_cycle().await)?;

    report.print_summary();
    if let Some(path) = report_path {
        report.save_json(path)?;
        info!(path = %path.display(), "Report saved");
    }

    let snapshot = current_snapshot(&pipeline)?;
    write_exports(&snapshot, export_path, drivers_path)?;

    Ok(())
}

/// Cycles périodiques ; un tick manqué est sauté, jamais rattrapé
pub async fn cmd_watch(
    config: Config,
    interval: Option<u64>,
    report_path: Option<&Path>,
    export_path: Option<&Path>,
) -> Result<()> {
    let period = interval.unwrap_or(config.refresh_secs);
    if period == 0 {
        anyhow::bail!("Refresh interval must be greater than 0");
    }

    let pipeline = Pipeline::new(FileSource, config)?;
    let mut ticker = tokio::time::interval(Duration::from_secs(period));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(period_secs = period, "Watching inputs");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match pipeline.run_cycle().await {
                    CycleOutcome::Completed(report) => {
                        if let Some(path) = report_path {
                            if let Err(e) = report.save_json(path) {
                                warn!(error = %e, "Failed to save report");
                            }
                        }
                        if let Some(snapshot) = pipeline.snapshot() {
                            if let Err(e) = write_exports(&snapshot, export_path, None) {
                                warn!(error = %e, "Failed to export zones");
                            }
                        }
                    }
                    CycleOutcome::Skipped => {}
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

/// Exécute un cycle puis résout chaque item du batch
pub async fn cmd_batch(config: Config, input: &Path, output: &Path) -> Result<()> {
    let items = load_items(input)?;
    info!(items = items.len(), "Batch loaded");

    let pipeline = Pipeline::new(FileSource, config)?;
    let cycle = completed(pipeline.run_cycle().await)?;
    for w in &cycle.warnings {
        warn!(source = %w.source, "{}", w.message);
    }

    let snapshot = current_snapshot(&pipeline)?;
    let report = tokio::task::block_in_place(|| run_batch(&snapshot, &items, output))?;

    for item in &report.items {
        println!(
            "{:<24} {:>3} active, {:>3} unmatched, {:>5} customers",
            item.name,
            item.active_keys.len(),
            item.unmatched_keys.len(),
            item.inside_selected
        );
    }
    println!(
        "{:<24} {:>3} active, {:>3} unmatched, {:>5} customers",
        "overview",
        report.overview.active_keys.len(),
        report.overview.unmatched_keys.len(),
        report.overview.inside_selected
    );

    let report_path = output.join("batch-report.json");
    let json = serde_json::to_string_pretty(&report)?;
    std::fs::write(&report_path, json)
        .context(format!("Failed to write report: {}", report_path.display()))?;
    info!(path = %report_path.display(), "Batch report saved");

    Ok(())
}

/// Affiche la forme canonique de chaque clé
pub fn cmd_normalize(keys: &[String]) {
    for raw in keys {
        let key = ZoneKey::new(raw);
        let shape = if key.is_well_formed() {
            key.tier().as_str()
        } else {
            "unrecognized"
        };
        println!("{}\t{}\t{}", raw, normalize(raw), shape);
    }
}

fn completed(outcome: CycleOutcome) -> Result<CycleReport> {
    match outcome {
        CycleOutcome::Completed(report) => Ok(report),
        CycleOutcome::Skipped => anyhow::bail!("Another cycle is already running"),
    }
}

fn current_snapshot(pipeline: &Pipeline<FileSource>) -> Result<Arc<Snapshot>> {
    pipeline
        .snapshot()
        .context("No snapshot available after cycle")
}

fn write_exports(
    snapshot: &Snapshot,
    export_path: Option<&Path>,
    drivers_path: Option<&Path>,
) -> Result<()> {
    if let Some(path) = export_path {
        let count = export_zones(snapshot, path)?;
        info!(path = %path.display(), zones = count, "Zones exported");
    }
    if let Some(path) = drivers_path {
        let count = export_driver_groups(snapshot, path)?;
        info!(path = %path.display(), drivers = count, "Driver groups exported");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed() {
        assert!(completed(CycleOutcome::Skipped).is_err());
        assert!(completed(CycleOutcome::Completed(CycleReport::new())).is_ok());
    }
}
