//! Configuration du système

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use zonage::{AssignmentMap, CustomerColumns, LayerFields, Tier};

/// Variable d'environnement désignant le fichier de configuration
pub const CONFIG_ENV: &str = "ZONAGE_CONFIG";

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Couches déclarées explicitement (chargées dans cet ordre)
    pub layers: Vec<LayerSource>,

    /// Répertoire parcouru pour `<niveau>-<jour>.geojson`
    pub layers_dir: Option<PathBuf>,

    /// Propriété GeoJSON portant la clé de zone
    pub key_property: String,

    /// Propriété GeoJSON portant le libellé
    pub label_property: String,

    /// Table CSV de sélection
    pub selection: Option<PathBuf>,

    /// Table CSV des affectations (défaut : la table de sélection)
    pub assignments: Option<PathBuf>,

    /// Table CSV des clients
    pub customers: Option<PathBuf>,

    pub coordinates_column: String,
    pub note_column: String,

    /// Affectations d'amorçage, écrasées par celles extraites du CSV
    pub seed_assignments: BTreeMap<String, String>,

    /// Chauffeurs connus ; vide = motif permissif
    pub known_drivers: Vec<String>,

    /// Période de rafraîchissement (commande `watch`)
    pub refresh_secs: u64,

    /// Au-delà de ce ratio de clés sans zone, un warning est émis
    pub unmatched_warn_ratio: f64,
}

/// Une couche de géométrie (niveau + jour)
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LayerSource {
    /// `base`, `quadrant` ou `subquadrant`
    pub tier: String,
    pub day: String,
    pub path: PathBuf,
}

impl LayerSource {
    pub fn tier(&self) -> Result<Tier> {
        self.tier.parse::<Tier>().map_err(anyhow::Error::msg)
    }

    /// Nom lisible pour les logs et les rapports
    pub fn name(&self) -> String {
        format!("{}-{}", self.tier, self.day)
    }
}

impl Default for Config {
    fn default() -> Self {
        let columns = CustomerColumns::default();
        let fields = LayerFields::default();
        Self {
            layers: Vec::new(),
            layers_dir: None,
            key_property: fields.key_property,
            label_property: fields.label_property,
            selection: None,
            assignments: None,
            customers: None,
            coordinates_column: columns.coordinates,
            note_column: columns.note,
            seed_assignments: BTreeMap::new(),
            known_drivers: Vec::new(),
            refresh_secs: 300,
            unmatched_warn_ratio: 0.5,
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    ///
    /// Les chemins relatifs sont résolus depuis le répertoire du fichier.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;

        if let Some(dir) = path.parent() {
            config.rebase(dir);
        }
        config.validate()?;
        Ok(config)
    }

    /// Configuration depuis `--config`, puis `ZONAGE_CONFIG`, sinon défauts
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                warn!("No config file given (--config or {}), using defaults", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }

    fn rebase(&mut self, dir: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = dir.join(&*p);
            }
        };

        for layer in &mut self.layers {
            join(&mut layer.path);
        }
        for path in [
            &mut self.layers_dir,
            &mut self.selection,
            &mut self.assignments,
            &mut self.customers,
        ]
        .into_iter()
        .flatten()
        {
            join(path);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_secs == 0 {
            anyhow::bail!("refresh_secs must be greater than 0");
        }
        if !(0.0..=1.0).contains(&self.unmatched_warn_ratio) {
            anyhow::bail!(
                "unmatched_warn_ratio must be between 0 and 1, got {}",
                self.unmatched_warn_ratio
            );
        }
        for layer in &self.layers {
            layer
                .tier()
                .with_context(|| format!("Invalid layer {}", layer.path.display()))?;
        }
        Ok(())
    }

    /// Couches explicites puis couches découvertes dans `layers_dir`
    ///
    /// Les couches découvertes sont triées par niveau puis par jour, pour
    /// que l'ordre du catalogue ne dépende pas du système de fichiers.
    pub fn layer_sources(&self) -> Result<Vec<LayerSource>> {
        let mut sources = self.layers.clone();

        let Some(dir) = &self.layers_dir else {
            return Ok(sources);
        };

        let pattern = dir.join("*.geojson");
        let pattern = pattern.to_string_lossy();
        let mut discovered = Vec::new();

        for entry in glob::glob(&pattern).context("Invalid layers_dir pattern")? {
            let path = entry.context("Failed to read layers_dir entry")?;
            match layer_from_file_name(&path) {
                Some((tier, layer)) => discovered.push((tier, layer)),
                None => warn!(path = %path.display(), "Ignoring layer file, expected <tier>-<day>.geojson"),
            }
        }

        discovered.sort_by(|(ta, a), (tb, b)| ta.cmp(tb).then_with(|| a.day.cmp(&b.day)));
        debug!(count = discovered.len(), dir = %dir.display(), "Layers discovered");

        sources.extend(
            discovered
                .into_iter()
                .map(|(_, layer)| layer)
                .filter(|layer| !self.layers.iter().any(|l| l.path == layer.path)),
        );
        Ok(sources)
    }

    pub fn layer_fields(&self) -> LayerFields {
        LayerFields {
            key_property: self.key_property.clone(),
            label_property: self.label_property.clone(),
        }
    }

    pub fn customer_columns(&self) -> CustomerColumns {
        CustomerColumns {
            coordinates: self.coordinates_column.clone(),
            note: self.note_column.clone(),
        }
    }

    pub fn seed_map(&self) -> AssignmentMap {
        self.seed_assignments.iter().collect()
    }

    /// Table des affectations, la table de sélection à défaut
    pub fn assignments_path(&self) -> Option<&Path> {
        self.assignments.as_deref().or(self.selection.as_deref())
    }
}

/// `quadrant-monday.geojson` → (Quadrant, couche)
fn layer_from_file_name(path: &Path) -> Option<(Tier, LayerSource)> {
    let stem = path.file_stem()?.to_str()?;
    let (tier_text, day) = stem.rsplit_once('-')?;
    let tier = tier_text.parse::<Tier>().ok()?;
    if day.is_empty() {
        return None;
    }

    Some((
        tier,
        LayerSource {
            tier: tier.as_str().to_string(),
            day: day.to_string(),
            path: path.to_path_buf(),
        },
    ))
}
