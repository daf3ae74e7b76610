//! Classification des points clients dans les zones visibles
//!
//! Chaque point est attribué à au plus une zone « visible » et au plus une
//! zone « sélectionnée » : la première zone qui le contient, dans l'ordre
//! du catalogue. Si des géométries se chevauchent, l'ordre d'insertion
//! tranche, de façon déterministe.
//!
//! L'inclusion utilise `CoordinatePosition` : un point sur le bord d'un
//! polygone (extérieur ou trou) est considéré comme dedans. Les calculs
//! d'orientation sont robustes, le résultat ne varie pas d'un run à l'autre.

use std::collections::{BTreeMap, HashMap};

use geo::coordinate_position::{CoordPos, CoordinatePosition};

use crate::catalog::ZoneCatalog;
use crate::key::ZoneKey;
use crate::types::{CustomerPoint, Zone, ZoneId};

/// Résultat de la classification d'un lot de points
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Zone visible contenant chaque point (même ordre que l'entrée)
    pub per_point_any_zone: Vec<Option<ZoneId>>,

    /// Zone sélectionnée contenant chaque point
    pub per_point_selected_zone: Vec<Option<ZoneId>>,

    /// Points par zone visible
    pub any_counts: HashMap<ZoneId, usize>,

    /// Points par zone sélectionnée
    pub sel_counts: HashMap<ZoneId, usize>,

    pub inside_selected: usize,
    pub outside_selected: usize,

    /// Points dans la sélection, par jour de livraison
    pub per_day_selected: BTreeMap<String, usize>,
}

/// Première zone de la liste contenant le point
pub fn first_containing<'a, I>(point: &CustomerPoint, zones: I) -> Option<&'a Zone>
where
    I: IntoIterator<Item = &'a Zone>,
{
    let coord = point.coord();
    zones
        .into_iter()
        .find(|zone| {
            zone.may_contain(coord) && zone.geometry.coordinate_position(&coord) != CoordPos::Outside
        })
}

/// Classe les points contre les zones visibles et les zones sélectionnées
///
/// Les deux listes sont parcourues dans l'ordre donné (ordre du catalogue
/// attendu). Un point hors de toute zone sélectionnée compte « hors sélection ».
pub fn classify(
    points: &[CustomerPoint],
    all_visible_zones: &[&Zone],
    selected_zones: &[&Zone],
) -> Classification {
    let mut result = Classification {
        per_point_any_zone: Vec::with_capacity(points.len()),
        per_point_selected_zone: Vec::with_capacity(points.len()),
        ..Default::default()
    };

    for point in points {
        let any = first_containing(point, all_visible_zones.iter().copied());
        if let Some(zone) = any {
            *result.any_counts.entry(zone.id).or_insert(0) += 1;
        }
        result.per_point_any_zone.push(any.map(|z| z.id));

        let selected = first_containing(point, selected_zones.iter().copied());
        match selected {
            Some(zone) => {
                *result.sel_counts.entry(zone.id).or_insert(0) += 1;
                *result
                    .per_day_selected
                    .entry(zone.day.clone())
                    .or_insert(0) += 1;
                result.inside_selected += 1;
            }
            None => result.outside_selected += 1,
        }
        result.per_point_selected_zone.push(selected.map(|z| z.id));
    }

    result
}

impl Classification {
    /// Comptes des zones visibles regroupés par clé
    pub fn any_counts_by_key(&self, catalog: &ZoneCatalog) -> BTreeMap<ZoneKey, usize> {
        fold_by_key(&self.any_counts, catalog)
    }

    /// Comptes des zones sélectionnées regroupés par clé
    pub fn sel_counts_by_key(&self, catalog: &ZoneCatalog) -> BTreeMap<ZoneKey, usize> {
        fold_by_key(&self.sel_counts, catalog)
    }

    pub fn sel_count(&self, id: ZoneId) -> usize {
        self.sel_counts.get(&id).copied().unwrap_or(0)
    }

    pub fn any_count(&self, id: ZoneId) -> usize {
        self.any_counts.get(&id).copied().unwrap_or(0)
    }
}

fn fold_by_key(counts: &HashMap<ZoneId, usize>, catalog: &ZoneCatalog) -> BTreeMap<ZoneKey, usize> {
    let mut by_key = BTreeMap::new();
    for (&id, &count) in counts {
        if let Some(zone) = catalog.get(id) {
            *by_key.entry(zone.key.clone()).or_insert(0) += count;
        }
    }
    by_key
}
