//! Agrégation des clients par chauffeur

use std::collections::BTreeMap;

use geo::MultiPolygon;

use crate::assignment::AssignmentMap;
use crate::classify::Classification;
use crate::types::{Zone, ZoneId};

/// Comptes de clients par chauffeur
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverTally {
    /// Chauffeur → clients dans ses zones sélectionnées
    pub counts: BTreeMap<String, usize>,

    /// Clients de zones sans chauffeur résolu
    pub unassigned: usize,
}

impl DriverTally {
    pub fn total(&self) -> usize {
        self.counts.values().sum::<usize>() + self.unassigned
    }

    pub fn get(&self, driver: &str) -> usize {
        self.counts.get(driver).copied().unwrap_or(0)
    }
}

/// Zones visibles sélectionnées d'un chauffeur et leur géométrie réunie
#[derive(Debug, Clone)]
pub struct DriverGroup {
    pub driver: String,
    pub zones: Vec<ZoneId>,
    pub geometry: MultiPolygon<f64>,
}

/// Somme les clients « dans la sélection » par chauffeur
///
/// Le chauffeur d'une zone est cherché sur la clé exacte puis sur la clé de
/// base. Une zone sans chauffeur ne compte pour personne (compteur
/// `unassigned`), ce n'est pas une erreur.
pub fn aggregate(
    selected_zones: &[&Zone],
    classification: &Classification,
    assignments: &AssignmentMap,
) -> DriverTally {
    let mut tally = DriverTally::default();

    for zone in selected_zones {
        let count = classification.sel_count(zone.id);
        if count == 0 {
            continue;
        }
        match assignments.driver_for(zone) {
            Some(driver) => *tally.counts.entry(driver.to_string()).or_insert(0) += count,
            None => tally.unassigned += count,
        }
    }

    tally
}

/// Regroupe la géométrie des zones sélectionnées par chauffeur
///
/// Les zones sans chauffeur sont ignorées. L'ordre des zones dans un groupe
/// suit l'ordre d'entrée.
pub fn driver_groups(selected_zones: &[&Zone], assignments: &AssignmentMap) -> Vec<DriverGroup> {
    let mut groups: BTreeMap<&str, DriverGroup> = BTreeMap::new();

    for zone in selected_zones {
        let Some(driver) = assignments.driver_for(zone) else {
            continue;
        };
        let group = groups.entry(driver).or_insert_with(|| DriverGroup {
            driver: driver.to_string(),
            zones: Vec::new(),
            geometry: MultiPolygon::new(Vec::new()),
        });
        group.zones.push(zone.id);
        group.geometry.0.extend(zone.geometry.0.iter().cloned());
    }

    groups.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_catalog;
    use crate::classify::classify;
    use crate::key::ZoneKey;
    use crate::selection::{resolve, SelectionSet};
    use crate::types::CustomerPoint;

    fn points() -> Vec<CustomerPoint> {
        [(2.5, 3.5), (2.6, 3.6), (0.5, 0.5), (11.0, 1.0), (50.0, 50.0)]
            .iter()
            .map(|&(x, y)| CustomerPoint::new(y, x, "").unwrap())
            .collect()
    }

    #[test]
    fn test_aggregate_exact_and_base_fallback() {
        let catalog = sample_catalog();
        let resolution = resolve(&SelectionSet::from_text("W1_NE_TL, W1_SW, W2"), &catalog);
        let visible: Vec<&Zone> = resolution.visible_zones(&catalog).collect();
        let selected: Vec<&Zone> = resolution.selected_zones(&catalog).collect();
        let classification = classify(&points(), &visible, &selected);

        let assignments: AssignmentMap = [("W1_NE_TL", "Alex"), ("W1", "Kim")].into_iter().collect();
        let tally = aggregate(&selected, &classification, &assignments);

        assert_eq!(tally.get("Alex"), 2);
        // W1_SW n'a pas d'entrée exacte : repli sur W1
        assert_eq!(tally.get("Kim"), 1);
        // W2 n'a aucun chauffeur
        assert_eq!(tally.unassigned, 1);
        assert_eq!(tally.total(), classification.inside_selected);
    }

    #[test]
    fn test_tally_matches_inside_count_when_fully_assigned() {
        let catalog = sample_catalog();
        let resolution = resolve(&SelectionSet::from_text("W1, W2"), &catalog);
        let visible: Vec<&Zone> = resolution.visible_zones(&catalog).collect();
        let selected: Vec<&Zone> = resolution.selected_zones(&catalog).collect();
        let classification = classify(&points(), &visible, &selected);

        let assignments: AssignmentMap = [("W1", "Alex"), ("W2", "Sam")].into_iter().collect();
        let tally = aggregate(&selected, &classification, &assignments);

        assert_eq!(tally.unassigned, 0);
        assert_eq!(tally.counts.values().sum::<usize>(), classification.inside_selected);
        assert_eq!(tally.get("Alex"), 3);
        assert_eq!(tally.get("Sam"), 1);
    }

    #[test]
    fn test_empty_assignments_are_all_unassigned() {
        let catalog = sample_catalog();
        let resolution = resolve(&SelectionSet::from_text("W1"), &catalog);
        let selected: Vec<&Zone> = resolution.selected_zones(&catalog).collect();
        let classification = classify(&points(), &selected, &selected);

        let tally = aggregate(&selected, &classification, &AssignmentMap::new());
        assert!(tally.counts.is_empty());
        assert_eq!(tally.unassigned, 3);
    }

    #[test]
    fn test_driver_groups() {
        let catalog = sample_catalog();
        let resolution = resolve(&SelectionSet::from_text("W1_NE_TL, W1_SW, W2"), &catalog);
        let selected: Vec<&Zone> = resolution.selected_zones(&catalog).collect();
        let assignments: AssignmentMap = [("W1", "Kim"), ("W2", "Alex")].into_iter().collect();

        let groups = driver_groups(&selected, &assignments);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].driver, "Alex");
        assert_eq!(groups[1].driver, "Kim");
        assert_eq!(groups[1].zones.len(), 2);
        assert_eq!(groups[1].geometry.0.len(), 2);

        let first = catalog.get(groups[1].zones[0]).unwrap();
        assert_eq!(first.base_key, ZoneKey::new("W1"));
    }
}
