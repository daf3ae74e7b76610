//! Types d'erreurs pour le crate zonage

use thiserror::Error;

/// Erreurs pouvant survenir lors du chargement des couches et des tables
///
/// Les heuristiques (extraction des chauffeurs, classification) ne renvoient
/// jamais d'erreur : elles dégradent vers un résultat vide.
#[derive(Debug, Error)]
pub enum ZonageError {
    /// Document GeoJSON illisible
    #[error("Invalid GeoJSON in {layer}: {reason}")]
    InvalidGeoJson { layer: String, reason: String },

    /// Le document n'est pas une FeatureCollection
    #[error("Layer {0} is not a FeatureCollection")]
    NotAFeatureCollection(String),

    /// Géométrie non polygonale ou non convertible
    #[error("Unsupported geometry for {key}: {reason}")]
    UnsupportedGeometry { key: String, reason: String },

    /// Propriété de clé absente d'une feature
    #[error("Missing property {property} on feature #{index}")]
    MissingProperty { property: String, index: usize },

    /// Couche sans aucune zone exploitable
    #[error("Layer {0} contains no usable zone")]
    EmptyLayer(String),
}

impl ZonageError {
    /// Crée une erreur GeoJSON avec contexte
    pub fn invalid_geojson(layer: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeoJson {
            layer: layer.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de géométrie non supportée
    pub fn unsupported_geometry(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedGeometry {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
