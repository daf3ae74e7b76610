//! Mode batch : une sélection par tournée, plus une vue d'ensemble
//!
//! Chaque item ne fournit que ses clés ; elles sont résolues contre le
//! catalogue du dernier cycle, indépendamment des autres items.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use zonage::{SelectionSet, Snapshot};

use crate::export::export_zones;

/// Fichier de la vue d'ensemble, réservé
const OVERVIEW_FILE: &str = "overview.geojson";

/// Une tournée à résoudre
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchItem {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub driver: String,
    #[serde(default)]
    pub name: String,
    pub keys: Vec<String>,

    /// Nom du fichier GeoJSON des zones sélectionnées
    #[serde(default, alias = "outName")]
    pub out_name: Option<String>,

    /// Statistiques libres transmises telles quelles
    #[serde(default)]
    pub stats: serde_json::Value,
}

/// Résultat d'une tournée
#[derive(Debug, Clone, Serialize)]
pub struct BatchItemReport {
    pub name: String,
    pub day: String,
    pub driver: String,
    pub requested_keys: usize,
    pub active_keys: Vec<String>,
    pub unmatched_keys: Vec<String>,
    pub overridden_keys: Vec<String>,
    pub selected_zones: usize,
    pub inside_selected: usize,
    pub export: Option<PathBuf>,
    pub stats: serde_json::Value,
}

/// Rapport du batch complet
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItemReport>,
    pub overview: BatchItemReport,
}

/// Instantané calculé pour un item
pub struct BatchResult<'a> {
    pub item: &'a BatchItem,
    pub snapshot: Snapshot,
}

/// Charge la liste des items depuis un fichier JSON
pub fn load_items(path: &Path) -> Result<Vec<BatchItem>> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read batch file: {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse batch JSON")
}

/// Union ordonnée des clés de tous les items
pub fn overview_selection(items: &[BatchItem]) -> SelectionSet {
    items
        .iter()
        .map(|item| SelectionSet::from_keys(&item.keys))
        .fold(SelectionSet::new(), |acc, set| acc.union(&set))
}

/// Résout chaque item en parallèle contre le catalogue de `base`
///
/// Les affectations et les clients de `base` sont réutilisés tels quels.
pub fn run_items<'a>(base: &Snapshot, items: &'a [BatchItem]) -> Vec<BatchResult<'a>> {
    items
        .par_iter()
        .map(|item| {
            let selection = SelectionSet::from_keys(&item.keys);
            debug!(name = %item.name, keys = selection.len(), "Resolving batch item");
            BatchResult {
                item,
                snapshot: rebuild(base, selection),
            }
        })
        .collect()
}

fn rebuild(base: &Snapshot, selection: SelectionSet) -> Snapshot {
    Snapshot::build(
        Arc::clone(&base.catalog),
        selection,
        base.assignments.clone(),
        Arc::clone(&base.customers),
    )
}

/// Résout les items et la vue d'ensemble, écrit les exports demandés
///
/// Échoue avant toute écriture si deux items visent le même fichier ou si
/// un item vise le fichier de la vue d'ensemble.
pub fn run_batch(base: &Snapshot, items: &[BatchItem], output_dir: &Path) -> Result<BatchReport> {
    check_export_names(items)?;

    std::fs::create_dir_all(output_dir)
        .context(format!("Failed to create directory: {}", output_dir.display()))?;

    let results = run_items(base, items);
    let mut reports = Vec::with_capacity(results.len());

    for result in &results {
        let export = match &result.item.out_name {
            Some(out_name) => {
                let path = output_dir.join(export_file_name(out_name));
                export_zones(&result.snapshot, &path)?;
                Some(path)
            }
            None => None,
        };
        reports.push(item_report(result.item, &result.snapshot, export));
    }

    let overview_snapshot = rebuild(base, overview_selection(items));
    let overview_path = output_dir.join(OVERVIEW_FILE);
    export_zones(&overview_snapshot, &overview_path)?;

    let overview_item = BatchItem {
        day: String::new(),
        driver: String::new(),
        name: "overview".to_string(),
        keys: Vec::new(),
        out_name: None,
        stats: serde_json::Value::Null,
    };
    let overview = item_report(&overview_item, &overview_snapshot, Some(overview_path));

    info!(
        items = reports.len(),
        overview_keys = overview.active_keys.len(),
        "Batch resolved"
    );

    Ok(BatchReport {
        items: reports,
        overview,
    })
}

fn check_export_names(items: &[BatchItem]) -> Result<()> {
    let mut taken: HashSet<String> = HashSet::from([OVERVIEW_FILE.to_string()]);
    for item in items {
        let Some(out_name) = &item.out_name else {
            continue;
        };
        let file = export_file_name(out_name);
        if !taken.insert(file.to_lowercase()) {
            anyhow::bail!(
                "Batch item {:?}: output file {} is already used",
                item.name,
                file
            );
        }
    }
    Ok(())
}

fn item_report(item: &BatchItem, snapshot: &Snapshot, export: Option<PathBuf>) -> BatchItemReport {
    let keys = |keys: &[zonage::ZoneKey]| keys.iter().map(|k| k.as_str().to_string()).collect();
    let resolution = &snapshot.resolution;

    BatchItemReport {
        name: item.name.clone(),
        day: item.day.clone(),
        driver: item.driver.clone(),
        requested_keys: resolution.requested(),
        active_keys: keys(resolution.selected_active_keys()),
        unmatched_keys: keys(resolution.unmatched_keys()),
        overridden_keys: keys(resolution.overridden_keys()),
        selected_zones: resolution.selected_count(),
        inside_selected: snapshot.classification.inside_selected,
        export,
        stats: item.stats.clone(),
    }
}

/// Nom de fichier sûr, extension `.geojson` ajoutée si absente
fn export_file_name(out_name: &str) -> String {
    let cleaned: String = out_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || "-_.".contains(c) { c } else { '_' })
        .collect();

    if cleaned.ends_with(".geojson") {
        cleaned
    } else {
        format!("{}.geojson", cleaned)
    }
}
