//! Modules d'export (GeoJSON)

pub mod geojson;

pub use self::geojson::{export_driver_groups, export_zones};
