//! Décision de visibilité pour l'ensemble du catalogue

use std::collections::{HashMap, HashSet};

use geo::{coord, Rect};
use tracing::debug;

use crate::catalog::ZoneCatalog;
use crate::key::ZoneKey;
use crate::selection::{PrecedenceSets, SelectionSet};
use crate::types::{VisibilityDecision, Zone, ZoneId};

/// Résultat de la résolution d'une sélection
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Décision par zone, indexée par `ZoneId`
    decisions: Vec<VisibilityDecision>,

    /// Clés effectivement affichées, dans l'ordre de la demande
    active_keys: Vec<ZoneKey>,

    /// Clés demandées sans zone correspondante dans le catalogue
    unmatched: Vec<ZoneKey>,

    /// Clés demandées masquées par une sélection plus fine
    overridden: Vec<ZoneKey>,

    /// Union des emprises des zones sélectionnées
    bounds: Option<Rect<f64>>,

    /// Repli « jamais vide » appliqué (sélection vide)
    fallback: bool,

    requested: usize,
}

/// Applique la règle de priorité au catalogue
///
/// Sélection vide : toutes les zones de tous les niveaux sont visibles et
/// aucune n'est sélectionnée, pour que la carte ne soit jamais vide.
pub fn resolve(selection: &SelectionSet, catalog: &ZoneCatalog) -> Resolution {
    if selection.is_empty() {
        debug!(zones = catalog.len(), "Empty selection, showing every zone");
        return Resolution {
            decisions: vec![VisibilityDecision::SHOWN; catalog.len()],
            fallback: true,
            ..Default::default()
        };
    }

    let sets = PrecedenceSets::from_selection(selection);

    let mut decisions = Vec::with_capacity(catalog.len());
    let mut shown_keys: HashSet<&ZoneKey> = HashSet::new();
    let mut bounds: Option<Rect<f64>> = None;

    for zone in catalog.zones() {
        if sets.is_selected(selection, zone.tier, &zone.key, &zone.base_key) {
            decisions.push(VisibilityDecision::SELECTED);
            shown_keys.insert(&zone.key);
            bounds = union_bounds(bounds, zone.bounds);
        } else {
            decisions.push(VisibilityDecision::HIDDEN);
        }
    }

    let mut active_keys = Vec::new();
    let mut unmatched = Vec::new();
    let mut overridden = Vec::new();

    for key in selection.iter() {
        if shown_keys.contains(key) {
            active_keys.push(key.clone());
        } else if catalog.contains_key(key) {
            overridden.push(key.clone());
        } else {
            unmatched.push(key.clone());
        }
    }

    debug!(
        requested = selection.len(),
        active = active_keys.len(),
        overridden = overridden.len(),
        unmatched = unmatched.len(),
        "Selection resolved"
    );

    Resolution {
        decisions,
        active_keys,
        unmatched,
        overridden,
        bounds,
        fallback: false,
        requested: selection.len(),
    }
}

fn union_bounds(acc: Option<Rect<f64>>, next: Option<Rect<f64>>) -> Option<Rect<f64>> {
    match (acc, next) {
        (Some(a), Some(b)) => Some(Rect::new(
            coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
            coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
        )),
        (a, b) => a.or(b),
    }
}

impl Resolution {
    pub fn decision(&self, id: ZoneId) -> VisibilityDecision {
        self.decisions.get(id).copied().unwrap_or_default()
    }

    /// Visibilité par clé (vraie si au moins une zone de cette clé est visible)
    pub fn visible_map(&self, catalog: &ZoneCatalog) -> HashMap<ZoneKey, bool> {
        let mut map: HashMap<ZoneKey, bool> = HashMap::new();
        for zone in catalog.zones() {
            let visible = self.decision(zone.id).is_visible();
            *map.entry(zone.key.clone()).or_insert(false) |= visible;
        }
        map
    }

    /// Clés affichées, dans l'ordre de première apparition de la demande
    pub fn selected_active_keys(&self) -> &[ZoneKey] {
        &self.active_keys
    }

    pub fn unmatched_keys(&self) -> &[ZoneKey] {
        &self.unmatched
    }

    pub fn overridden_keys(&self) -> &[ZoneKey] {
        &self.overridden
    }

    pub fn selection_bounds(&self) -> Option<Rect<f64>> {
        self.bounds
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Nombre de clés demandées
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Part des clés demandées sans zone correspondante
    pub fn unmatched_ratio(&self) -> f64 {
        if self.requested == 0 {
            0.0
        } else {
            self.unmatched.len() as f64 / self.requested as f64
        }
    }

    /// Zones visibles, en ordre du catalogue
    pub fn visible_zones<'a>(
        &'a self,
        catalog: &'a ZoneCatalog,
    ) -> impl Iterator<Item = &'a Zone> + 'a {
        catalog
            .zones()
            .iter()
            .filter(move |z| self.decision(z.id).is_visible())
    }

    /// Zones visibles et sélectionnées, en ordre du catalogue
    pub fn selected_zones<'a>(
        &'a self,
        catalog: &'a ZoneCatalog,
    ) -> impl Iterator<Item = &'a Zone> + 'a {
        catalog
            .zones()
            .iter()
            .filter(move |z| self.decision(z.id).is_selected())
    }

    pub fn visible_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_visible()).count()
    }

    pub fn selected_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.is_selected()).count()
    }
}
