//! Rapport de cycle avec graceful degradation
//!
//! Ce module collecte le résultat d'un cycle de sélection (clés actives,
//! comptes clients, chauffeurs) et les problèmes non fatals rencontrés.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use zonage::{ExtractionMethod, Snapshot, ZoneKey};

/// Statut global du cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleStatus {
    /// Toutes les entrées lues, sélection appliquée
    Success,
    /// Sélection appliquée, mais une entrée manquait ou était suspecte
    Degraded,
    /// Sélection vide : toutes les zones affichées, aucune sélectionnée
    Fallback,
}

/// Niveau de sévérité des problèmes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorLevel {
    /// Entrée illisible, ignorée pour ce cycle
    Error,
    /// Entrée lue avec dégradation
    Warning,
}

/// Problème non fatal rencontré pendant un cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleWarning {
    pub level: ErrorLevel,
    /// Entrée concernée (couche, sélection, affectations, clients)
    pub source: String,
    pub message: String,
}

/// Rapport complet d'un cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub status: CycleStatus,
    pub duration_secs: f64,

    /// Résolution reprise du cycle précédent (entrées inchangées)
    pub reused_resolution: bool,

    // Catalogue
    pub zones_loaded: usize,
    pub zones_by_tier: BTreeMap<String, usize>,

    // Sélection
    pub requested_keys: usize,
    pub active_keys: Vec<String>,
    pub unmatched_keys: Vec<String>,
    pub overridden_keys: Vec<String>,
    /// `[min_x, min_y, max_x, max_y]`
    pub selection_bounds: Option<[f64; 4]>,
    pub visible_zones: usize,
    pub selected_zones: usize,

    // Clients
    pub customers: usize,
    pub customers_skipped: usize,
    pub inside_selected: usize,
    pub outside_selected: usize,
    pub per_day_selected: BTreeMap<String, usize>,

    // Chauffeurs
    pub assignment_method: String,
    pub assignments: usize,
    pub drivers: BTreeMap<String, usize>,
    pub unassigned: usize,

    pub warnings: Vec<CycleWarning>,
}

impl Default for CycleReport {
    fn default() -> Self {
        Self {
            status: CycleStatus::Success,
            duration_secs: 0.0,
            reused_resolution: false,
            zones_loaded: 0,
            zones_by_tier: BTreeMap::new(),
            requested_keys: 0,
            active_keys: Vec::new(),
            unmatched_keys: Vec::new(),
            overridden_keys: Vec::new(),
            selection_bounds: None,
            visible_zones: 0,
            selected_zones: 0,
            customers: 0,
            customers_skipped: 0,
            inside_selected: 0,
            outside_selected: 0,
            per_day_selected: BTreeMap::new(),
            assignment_method: String::new(),
            assignments: 0,
            drivers: BTreeMap::new(),
            unassigned: 0,
            warnings: Vec::new(),
        }
    }
}

fn key_strings(keys: &[ZoneKey]) -> Vec<String> {
    keys.iter().map(|k| k.as_str().to_string()).collect()
}

impl CycleReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enregistre un problème non fatal
    pub fn record_warning(&mut self, level: ErrorLevel, source: &str, message: impl Into<String>) {
        self.warnings.push(CycleWarning {
            level,
            source: source.to_string(),
            message: message.into(),
        });
    }

    pub fn set_assignment_method(&mut self, method: ExtractionMethod) {
        self.assignment_method = match method {
            ExtractionMethod::Header { row, .. } => format!("header (row {})", row + 1),
            ExtractionMethod::Fallback => "fallback scan".to_string(),
            ExtractionMethod::NoMatch => "none".to_string(),
        };
    }

    /// Reporte les résultats d'un instantané
    pub fn fill_from_snapshot(&mut self, snapshot: &Snapshot) {
        let resolution = &snapshot.resolution;

        self.zones_loaded = snapshot.catalog.len();
        self.zones_by_tier = snapshot
            .catalog
            .tier_counts()
            .into_iter()
            .map(|(tier, count)| (tier.as_str().to_string(), count))
            .collect();

        self.requested_keys = resolution.requested();
        self.active_keys = key_strings(resolution.selected_active_keys());
        self.unmatched_keys = key_strings(resolution.unmatched_keys());
        self.overridden_keys = key_strings(resolution.overridden_keys());
        self.selection_bounds = resolution
            .selection_bounds()
            .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y]);
        self.visible_zones = resolution.visible_count();
        self.selected_zones = resolution.selected_count();

        let classification = &snapshot.classification;
        self.customers = snapshot.customers.len();
        self.customers_skipped = snapshot.customers.skipped;
        self.inside_selected = classification.inside_selected;
        self.outside_selected = classification.outside_selected;
        self.per_day_selected = classification.per_day_selected.clone();

        self.assignments = snapshot.assignments.len();
        self.drivers = snapshot.tally.counts.clone();
        self.unassigned = snapshot.tally.unassigned;
    }

    /// Définit la durée du cycle
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self, fallback: bool) {
        self.status = if fallback {
            CycleStatus::Fallback
        } else if !self.warnings.is_empty() {
            CycleStatus::Degraded
        } else {
            CycleStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn print_summary(&self) {
        println!("\n{}", "=".repeat(60));
        println!("ZONE SELECTION REPORT");
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        if self.reused_resolution {
            println!("Selection unchanged, resolution reused");
        }

        println!("\n--- ZONES ---");
        let tiers: Vec<String> = self
            .zones_by_tier
            .iter()
            .map(|(tier, count)| format!("{} {}", count, tier))
            .collect();
        println!("Loaded: {} ({})", self.zones_loaded, tiers.join(", "));
        println!(
            "Visible: {}, selected: {}",
            self.visible_zones, self.selected_zones
        );

        println!("\n--- SELECTION ---");
        println!("Requested keys: {}", self.requested_keys);
        println!("Active: {}", self.active_keys.join(", "));
        if !self.overridden_keys.is_empty() {
            println!("Overridden: {}", self.overridden_keys.join(", "));
        }
        if !self.unmatched_keys.is_empty() {
            println!("Unmatched: {}", self.unmatched_keys.join(", "));
        }

        println!("\n--- CUSTOMERS ---");
        println!(
            "{} points ({} skipped): {} inside selection, {} outside",
            self.customers, self.customers_skipped, self.inside_selected, self.outside_selected
        );
        for (day, count) in &self.per_day_selected {
            println!("  {}: {}", day, count);
        }

        println!("\n--- DRIVERS ({}) ---", self.assignment_method);
        for (driver, count) in &self.drivers {
            println!("  {}: {}", driver, count);
        }
        if self.unassigned > 0 {
            println!("  (unassigned): {}", self.unassigned);
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(20) {
                println!("  {:?} [{}] {}", w.level, w.source, w.message);
            }
            if self.warnings.len() > 20 {
                println!("  ... and {} more", self.warnings.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .context(format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour les logs
    pub fn summary(&self) -> String {
        format!(
            "{:?}: {} active keys, {} inside / {} outside, {} drivers, {} warnings",
            self.status,
            self.active_keys.len(),
            self.inside_selected,
            self.outside_selected,
            self.drivers.len(),
            self.warnings.len()
        )
    }
}
