//! Instantané immuable d'un cycle de sélection
//!
//! Chaque étape prend des valeurs et en rend de nouvelles : catalogue →
//! résolution → affectations → classification → comptes. Les lecteurs
//! externes ne reçoivent que des instantanés complets.

use std::sync::Arc;

use crate::aggregate::{aggregate, driver_groups, DriverGroup, DriverTally};
use crate::assignment::AssignmentMap;
use crate::catalog::ZoneCatalog;
use crate::classify::{classify, Classification};
use crate::customer::CustomerSet;
use crate::selection::{resolve, Resolution, SelectionSet};
use crate::types::Zone;

/// Résultat complet d'un cycle
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub catalog: Arc<ZoneCatalog>,
    pub selection: SelectionSet,
    pub resolution: Resolution,
    pub assignments: AssignmentMap,
    pub customers: Arc<CustomerSet>,
    pub classification: Classification,
    pub tally: DriverTally,
}

impl Snapshot {
    /// Exécute toutes les étapes pour une sélection
    pub fn build(
        catalog: Arc<ZoneCatalog>,
        selection: SelectionSet,
        assignments: AssignmentMap,
        customers: Arc<CustomerSet>,
    ) -> Self {
        let resolution = resolve(&selection, &catalog);
        Self::from_resolution(catalog, selection, resolution, assignments, customers)
    }

    /// Reprend une résolution déjà calculée (sélection inchangée)
    pub fn from_resolution(
        catalog: Arc<ZoneCatalog>,
        selection: SelectionSet,
        resolution: Resolution,
        assignments: AssignmentMap,
        customers: Arc<CustomerSet>,
    ) -> Self {
        let (classification, tally) =
            classify_and_tally(&catalog, &resolution, &assignments, &customers);

        Self {
            catalog,
            selection,
            resolution,
            assignments,
            customers,
            classification,
            tally,
        }
    }

    /// Nouvel instantané avec d'autres clients ; la résolution est conservée
    pub fn with_customers(&self, customers: Arc<CustomerSet>) -> Self {
        Self::from_resolution(
            Arc::clone(&self.catalog),
            self.selection.clone(),
            self.resolution.clone(),
            self.assignments.clone(),
            customers,
        )
    }

    pub fn visible_zones(&self) -> Vec<&Zone> {
        self.resolution.visible_zones(&self.catalog).collect()
    }

    pub fn selected_zones(&self) -> Vec<&Zone> {
        self.resolution.selected_zones(&self.catalog).collect()
    }

    pub fn driver_groups(&self) -> Vec<DriverGroup> {
        driver_groups(&self.selected_zones(), &self.assignments)
    }
}

fn classify_and_tally(
    catalog: &ZoneCatalog,
    resolution: &Resolution,
    assignments: &AssignmentMap,
    customers: &CustomerSet,
) -> (Classification, DriverTally) {
    let visible: Vec<&Zone> = resolution.visible_zones(catalog).collect();
    let selected: Vec<&Zone> = resolution.selected_zones(catalog).collect();

    let classification = classify(&customers.points, &visible, &selected);
    let tally = aggregate(&selected, &classification, assignments);
    (classification, tally)
}
