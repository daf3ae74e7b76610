//! Résolution de la sélection de zones
//!
//! Règle de priorité : une sélection plus fine masque ses ancêtres plus
//! grossiers sur la même zone de base, jamais les zones sœurs.
//!
//! - `set` : ensemble ordonné de clés demandées (et lecture depuis CSV)
//! - `precedence` : les trois ensembles précalculés de la règle de priorité
//! - `resolve` : décision de visibilité par zone, clés actives, emprise

pub mod precedence;
pub mod resolve;
pub mod set;

pub use precedence::PrecedenceSets;
pub use resolve::{resolve, Resolution};
pub use set::{parse_selection_rows, split_keys, SelectionParse, SelectionSet};
