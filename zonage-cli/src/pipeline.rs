//! Cycle « appliquer la sélection » : entrées → instantané
//!
//! Un seul cycle à la fois : un cycle demandé pendant qu'un autre est en
//! cours est abandonné (`CycleOutcome::Skipped`), jamais entrelacé. Les
//! lecteurs n'obtiennent que des instantanés complets (`Arc<Snapshot>`).
//!
//! Les lectures sont attendues l'une après l'autre. Une lecture en échec
//! devient un warning du rapport et le cycle continue avec ce qu'il a :
//! - couche illisible → absente du catalogue
//! - sélection illisible → sélection vide, repli « jamais vide »
//! - affectations illisibles → table d'amorçage seule
//! - clients illisibles → clients du cycle précédent

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use zonage::assignment::extract;
use zonage::customer::parse_customer_rows;
use zonage::layer::decode_layer;
use zonage::selection::{parse_selection_rows, resolve};
use zonage::table::{decode_text, parse_rows, Rows};
use zonage::{
    AssignmentMap, CustomerSet, ExtractionMethod, SelectionSet, Snapshot, ZoneCatalog,
};

use crate::config::{Config, LayerSource};
use crate::report::{CycleReport, ErrorLevel};
use crate::source::Source;

/// Résultat d'une demande de cycle
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Un autre cycle était en cours
    Skipped,
}

/// État conservé d'un cycle à l'autre, possédé par le cycle en cours
#[derive(Default)]
struct CycleState {
    catalog: Option<Arc<ZoneCatalog>>,
    catalog_fingerprint: Option<blake3::Hash>,
    inputs_fingerprint: Option<blake3::Hash>,
    customers: Arc<CustomerSet>,
}

pub struct Pipeline<S> {
    source: S,
    config: Config,
    state: Mutex<CycleState>,
    current: RwLock<Option<Arc<Snapshot>>>,
}

impl<S: Source> Pipeline<S> {
    /// Prépare le pipeline
    ///
    /// Les couches sont redécouvertes à chaque cycle ; ce premier passage ne
    /// sert qu'à rejeter une configuration inutilisable.
    pub fn new(source: S, config: Config) -> Result<Self> {
        if config.layer_sources()?.is_empty() {
            warn!("No geometry layer configured");
        }

        Ok(Self {
            source,
            config,
            state: Mutex::new(CycleState::default()),
            current: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Dernier instantané complet
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn publish(&self, snapshot: Arc<Snapshot>) {
        match self.current.write() {
            Ok(mut guard) => *guard = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }

    /// Exécute un cycle complet, sauf si un cycle est déjà en cours
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Ok(mut state) = self.state.try_lock() else {
            info!("Cycle already in flight, skipping");
            return CycleOutcome::Skipped;
        };

        let start = Instant::now();
        let mut report = CycleReport::new();

        let (catalog, catalog_changed) = self.refresh_catalog(&mut state, &mut report).await;

        let selection_rows = self
            .fetch_rows(self.config.selection.as_deref(), "selection", &mut report)
            .await;
        let selection = self.selection_from(selection_rows.as_ref(), &mut report);

        let assignments = if self.config.assignments_path() == self.config.selection.as_deref() {
            self.assignments_from(selection_rows.as_ref(), &mut report)
        } else {
            let rows = self
                .fetch_rows(self.config.assignments_path(), "assignments", &mut report)
                .await;
            self.assignments_from(rows.as_ref(), &mut report)
        };

        if let Some(customers) = self.fetch_customers(&mut report).await {
            state.customers = Arc::new(customers);
        }
        let customers = Arc::clone(&state.customers);

        let fingerprint = inputs_fingerprint(&selection, &assignments);
        let previous = self.snapshot();
        let reusable = !catalog_changed && state.inputs_fingerprint == Some(fingerprint);

        let snapshot = match previous {
            Some(previous) if reusable => {
                debug!("Selection and assignments unchanged, reclassifying customers only");
                report.reused_resolution = true;
                previous.with_customers(customers)
            }
            _ => {
                let resolution = resolve(&selection, &catalog);
                Snapshot::from_resolution(catalog, selection, resolution, assignments, customers)
            }
        };
        state.inputs_fingerprint = Some(fingerprint);

        self.check_unmatched(&snapshot, &mut report);

        report.fill_from_snapshot(&snapshot);
        report.set_duration(start.elapsed());
        report.finalize(snapshot.resolution.is_fallback());

        self.publish(Arc::new(snapshot));
        info!("{}", report.summary());

        CycleOutcome::Completed(report)
    }

    /// Redécouvre puis relit toutes les couches, une par une
    ///
    /// Le catalogue n'est reconstruit que si le contenu a changé ; le booléen
    /// indique un nouveau catalogue.
    async fn refresh_catalog(
        &self,
        state: &mut CycleState,
        report: &mut CycleReport,
    ) -> (Arc<ZoneCatalog>, bool) {
        let layers = match self.config.layer_sources() {
            Ok(layers) => layers,
            Err(e) => {
                warn!(error = %e, "Layer discovery failed, using explicit layers only");
                report.record_warning(ErrorLevel::Error, "layers", format!("{:#}", e));
                self.config.layers.clone()
            }
        };

        let fetched: Vec<(&LayerSource, Result<String>)> = stream::iter(layers.iter())
            .then(|layer| async move { (layer, self.source.fetch_layer(layer).await) })
            .collect()
            .await;

        let mut hasher = blake3::Hasher::new();
        let mut contents = Vec::with_capacity(fetched.len());

        for (layer, result) in fetched {
            match result {
                Ok(content) => {
                    hasher.update(layer.name().as_bytes());
                    hasher.update(b"\0");
                    hasher.update(content.as_bytes());
                    hasher.update(b"\0");
                    contents.push((layer, content));
                }
                Err(e) => {
                    warn!(layer = %layer.name(), error = %e, "Layer unavailable");
                    report.record_warning(ErrorLevel::Error, &layer.name(), format!("{:#}", e));
                }
            }
        }

        let fingerprint = hasher.finalize();
        if let Some(catalog) = &state.catalog {
            if state.catalog_fingerprint == Some(fingerprint) {
                debug!("Layers unchanged, keeping catalog");
                return (Arc::clone(catalog), false);
            }
        }

        let fields = self.config.layer_fields();
        let mut catalog = ZoneCatalog::new();

        for (layer, content) in contents {
            let name = layer.name();
            let tier = match layer.tier() {
                Ok(tier) => tier,
                Err(e) => {
                    report.record_warning(ErrorLevel::Error, &name, e.to_string());
                    continue;
                }
            };

            match decode_layer(&name, &content, &fields) {
                Ok(decoded) => {
                    for skipped in &decoded.skipped {
                        report.record_warning(ErrorLevel::Warning, &name, skipped.to_string());
                    }
                    let added = catalog.load(tier, &layer.day, decoded.records);
                    debug!(layer = %name, zones = added, "Layer loaded");
                }
                Err(e) => {
                    warn!(layer = %name, error = %e, "Layer skipped");
                    report.record_warning(ErrorLevel::Error, &name, e.to_string());
                }
            }
        }

        info!(zones = catalog.len(), layers = layers.len(), "Catalog built");
        let catalog = Arc::new(catalog);
        state.catalog = Some(Arc::clone(&catalog));
        state.catalog_fingerprint = Some(fingerprint);
        (catalog, true)
    }

    async fn fetch_rows(&self, path: Option<&Path>, what: &str, report: &mut CycleReport) -> Option<Rows> {
        let Some(path) = path else {
            report.record_warning(ErrorLevel::Warning, what, "No table configured");
            return None;
        };

        match self.source.fetch_table(path).await {
            Ok(bytes) => Some(parse_rows(&decode_text(&bytes))),
            Err(e) => {
                warn!(table = what, error = %e, "Table unavailable");
                report.record_warning(ErrorLevel::Error, what, format!("{:#}", e));
                None
            }
        }
    }

    fn selection_from(&self, rows: Option<&Rows>, report: &mut CycleReport) -> SelectionSet {
        let Some(rows) = rows else {
            return SelectionSet::new();
        };

        let parsed = parse_selection_rows(rows);
        if parsed.header.is_none() {
            report.record_warning(ErrorLevel::Warning, "selection", "No zone keys header found");
        } else if parsed.selection.is_empty() {
            report.record_warning(ErrorLevel::Warning, "selection", "Zone keys column is empty");
        }
        parsed.selection
    }

    fn assignments_from(&self, rows: Option<&Rows>, report: &mut CycleReport) -> AssignmentMap {
        let seed = self.config.seed_map();
        let Some(rows) = rows else {
            report.set_assignment_method(ExtractionMethod::NoMatch);
            return seed;
        };

        let extraction = extract(rows, &self.config.known_drivers);
        report.set_assignment_method(extraction.method);
        if extraction.method == ExtractionMethod::NoMatch {
            report.record_warning(ErrorLevel::Warning, "assignments", "No driver assignment found");
        }

        AssignmentMap::merged(&seed, &extraction.map)
    }

    async fn fetch_customers(&self, report: &mut CycleReport) -> Option<CustomerSet> {
        let path = self.config.customers.as_deref()?;

        match self.source.fetch_table(path).await {
            Ok(bytes) => {
                let rows = parse_rows(&decode_text(&bytes));
                Some(parse_customer_rows(&rows, &self.config.customer_columns()))
            }
            Err(e) => {
                warn!(error = %e, "Customers unavailable, keeping previous points");
                report.record_warning(ErrorLevel::Error, "customers", format!("{:#}", e));
                None
            }
        }
    }

    fn check_unmatched(&self, snapshot: &Snapshot, report: &mut CycleReport) {
        let resolution = &snapshot.resolution;
        if resolution.requested() == 0 {
            return;
        }

        let ratio = resolution.unmatched_ratio();
        if ratio > self.config.unmatched_warn_ratio {
            warn!(
                unmatched = resolution.unmatched_keys().len(),
                requested = resolution.requested(),
                "Many selection keys match no zone"
            );
            report.record_warning(
                ErrorLevel::Warning,
                "selection",
                format!(
                    "{} of {} keys match no zone",
                    resolution.unmatched_keys().len(),
                    resolution.requested()
                ),
            );
        }
    }
}

/// Empreinte de la sélection (ordre compris) et des affectations
fn inputs_fingerprint(selection: &SelectionSet, assignments: &AssignmentMap) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for key in selection.iter() {
        hasher.update(key.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(b"\0");

    let mut entries: Vec<(&str, &str)> = assignments.iter().map(|(k, d)| (k.as_str(), d)).collect();
    entries.sort_unstable();
    for (key, driver) in entries {
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(driver.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize()
}
