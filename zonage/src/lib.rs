//! # zonage
//!
//! Résolution de la sélection de zones de livraison (base → quadrant →
//! sous-quadrant) et attribution des clients aux zones et aux chauffeurs.
//!
//! ## Features
//!
//! - Normalisation des clés de zone (`w01_ne` → `W1_NE`)
//! - Règle de priorité : une sélection plus fine masque ses ancêtres
//! - Repli « jamais vide » quand la sélection est vide ou illisible
//! - Extraction heuristique des affectations chauffeur → zones
//! - Classification point-dans-polygone avec types `geo`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zonage::{layer, Snapshot, SelectionSet, Tier, ZoneCatalog};
//!
//! let mut catalog = ZoneCatalog::new();
//! let decoded = layer::decode_layer("quadrant-monday", &geojson, &Default::default())?;
//! catalog.load(Tier::Quadrant, "Monday", decoded.records);
//!
//! let snapshot = Snapshot::build(
//!     Arc::new(catalog),
//!     SelectionSet::from_text("W1_NE; W1_NE_TL"),
//!     Default::default(),
//!     Default::default(),
//! );
//! println!("Actives: {:?}", snapshot.resolution.selected_active_keys());
//! ```

pub mod aggregate;
pub mod assignment;
pub mod catalog;
pub mod classify;
pub mod customer;
pub mod engine;
pub mod error;
pub mod key;
pub mod layer;
pub mod selection;
pub mod table;
pub mod types;

pub use aggregate::{DriverGroup, DriverTally};
pub use assignment::{AssignmentMap, Extraction, ExtractionMethod};
pub use catalog::ZoneCatalog;
pub use classify::Classification;
pub use customer::{CustomerColumns, CustomerSet};
pub use engine::Snapshot;
pub use error::ZonageError;
pub use key::{Tier, ZoneKey};
pub use layer::LayerFields;
pub use selection::{Resolution, SelectionSet};
pub use types::{CustomerPoint, VisibilityDecision, Zone, ZoneId, ZoneRecord};
