//! # zonage-cli
//!
//! Application autour de `zonage` : lecture des entrées, cycles de
//! sélection, rapports et exports.
//!
//! ## Features
//!
//! - Configuration JSON (couches, tables CSV, colonnes, chauffeurs)
//! - Un seul cycle à la fois, instantanés immuables pour les lecteurs
//! - Dégradation progressive : une entrée manquante devient un warning
//! - Mode batch (une sélection par tournée + vue d'ensemble)
//! - Export GeoJSON des zones visibles et des zones par chauffeur
//!
//! ## Usage CLI
//!
//! ```bash
//! # Un cycle, rapport JSON et export des zones
//! zonage --config zonage.json apply --report report.json --export zones.geojson
//!
//! # Rafraîchissement périodique
//! zonage --config zonage.json watch
//!
//! # Tournées
//! zonage --config zonage.json batch --input routes.json --output ./routes/
//! ```

pub mod batch;
pub mod config;
pub mod export;
pub mod pipeline;
pub mod report;
pub mod source;

pub use config::Config;
pub use pipeline::{CycleOutcome, Pipeline};
pub use report::{CycleReport, CycleStatus};
pub use source::{FileSource, Source};
