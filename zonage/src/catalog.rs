//! Catalogue des zones chargées (base, quadrant, sous-quadrant)

use std::collections::HashMap;

use tracing::debug;

use crate::key::{Tier, ZoneKey};
use crate::types::{Zone, ZoneId, ZoneRecord};

/// Index en mémoire des zones, reconstruit à chaque chargement de couches
///
/// L'ordre d'insertion est conservé : il sert d'ordre d'itération pour la
/// classification (première zone contenant un point = attribution).
/// Les trois niveaux ne sont jamais dédupliqués entre eux.
#[derive(Debug, Default, Clone)]
pub struct ZoneCatalog {
    zones: Vec<Zone>,
    by_key: HashMap<ZoneKey, Vec<ZoneId>>,
    by_base: HashMap<ZoneKey, Vec<ZoneId>>,
}

impl ZoneCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute les zones d'une couche (niveau + jour)
    ///
    /// Les enregistrements sans clé sont ignorés. Retourne le nombre de
    /// zones ajoutées.
    pub fn load(&mut self, tier: Tier, day: &str, records: Vec<ZoneRecord>) -> usize {
        let before = self.zones.len();

        for record in records {
            if record.raw_key.trim().is_empty() {
                continue;
            }

            let id = self.zones.len();
            let zone = Zone::from_record(id, tier, day, record);

            self.by_key.entry(zone.key.clone()).or_default().push(id);
            self.by_base
                .entry(zone.base_key.clone())
                .or_default()
                .push(id);
            self.zones.push(zone);
        }

        let added = self.zones.len() - before;
        debug!(tier = %tier, day = day, added, "Layer indexed");
        added
    }

    /// Toutes les zones, éventuellement filtrées par niveau, en ordre d'insertion
    pub fn all_zones(&self, tier: Option<Tier>) -> impl Iterator<Item = &Zone> + '_ {
        self.zones
            .iter()
            .filter(move |z| tier.map_or(true, |t| z.tier == t))
    }

    /// Zones partageant la même zone de base (tous niveaux confondus)
    pub fn zones_by_base_key(&self, key: &ZoneKey) -> Vec<&Zone> {
        let base = key.base_key();
        self.by_base
            .get(&base)
            .map(|ids| ids.iter().map(|&id| &self.zones[id]).collect())
            .unwrap_or_default()
    }

    /// Zones portant exactement cette clé (une par jour au plus en pratique)
    pub fn zones_by_key(&self, key: &ZoneKey) -> Vec<&Zone> {
        self.by_key
            .get(key)
            .map(|ids| ids.iter().map(|&id| &self.zones[id]).collect())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &ZoneKey) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn get(&self, id: ZoneId) -> Option<&Zone> {
        self.zones.get(id)
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Nombre de zones par niveau
    pub fn tier_counts(&self) -> HashMap<Tier, usize> {
        let mut counts = HashMap::new();
        for zone in &self.zones {
            *counts.entry(zone.tier).or_insert(0) += 1;
        }
        counts
    }
}
