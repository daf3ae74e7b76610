//! Sources des données d'entrée (couches, tables CSV)
//!
//! Le pipeline n'accède aux entrées qu'à travers `Source` : chaque lecture
//! est une opération asynchrone attendue l'une après l'autre.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::LayerSource;

/// Fournisseur des couches de géométrie et des tables brutes
#[allow(async_fn_in_trait)]
pub trait Source {
    /// Contenu GeoJSON d'une couche
    async fn fetch_layer(&self, layer: &LayerSource) -> Result<String>;

    /// Octets bruts d'une table (l'encodage est détecté au décodage)
    async fn fetch_table(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Lecture depuis le système de fichiers local
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl Source for FileSource {
    async fn fetch_layer(&self, layer: &LayerSource) -> Result<String> {
        tokio::fs::read_to_string(&layer.path)
            .await
            .context(format!("Failed to read layer: {}", layer.path.display()))
    }

    async fn fetch_table(&self, path: &Path) -> Result<Vec<u8>> {
        tokio::fs::read(path)
            .await
            .context(format!("Failed to read table: {}", path.display()))
    }
}
