//! Règle de priorité entre niveaux, indépendante de la géométrie

use std::collections::HashSet;

use crate::key::{Tier, ZoneKey};
use crate::selection::SelectionSet;

/// Les trois ensembles dérivés de la sélection avant la passe principale
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrecedenceSets {
    /// Bases ayant au moins un quadrant sélectionné
    pub quad_bases: HashSet<ZoneKey>,

    /// Bases ayant au moins un sous-quadrant sélectionné
    pub subq_bases: HashSet<ZoneKey>,

    /// Couples `base_quadrant` ayant au moins un sous-quadrant sélectionné
    pub subq_quads: HashSet<ZoneKey>,
}

impl PrecedenceSets {
    pub fn from_selection(selection: &SelectionSet) -> Self {
        let mut sets = Self::default();

        for key in selection.iter() {
            if key.is_sub_quadrant() {
                sets.subq_bases.insert(key.base_key());
                if let Some(quad) = key.base_plus_quadrant() {
                    sets.subq_quads.insert(quad);
                }
            } else if key.is_quadrant() {
                sets.quad_bases.insert(key.base_key());
            }
        }

        sets
    }

    /// Base masquée par une sélection plus fine dans la même famille
    pub fn base_suppressed(&self, base_key: &ZoneKey) -> bool {
        self.quad_bases.contains(base_key) || self.subq_bases.contains(base_key)
    }

    /// Quadrant masqué par un de ses propres sous-quadrants
    pub fn quadrant_suppressed(&self, quadrant_key: &ZoneKey) -> bool {
        quadrant_key
            .base_plus_quadrant()
            .is_some_and(|quad| self.subq_quads.contains(&quad))
    }

    /// Vrai si la zone est visible et sélectionnée
    ///
    /// Les sous-quadrants ne sont jamais masqués : seule leur présence dans
    /// la sélection compte.
    pub fn is_selected(
        &self,
        selection: &SelectionSet,
        tier: Tier,
        key: &ZoneKey,
        base_key: &ZoneKey,
    ) -> bool {
        if !selection.contains(key) {
            return false;
        }
        match tier {
            Tier::Base => !self.base_suppressed(base_key),
            Tier::Quadrant => !self.quadrant_suppressed(key),
            Tier::SubQuadrant => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> ZoneKey {
        ZoneKey::new(s)
    }

    fn selected(selection: &SelectionSet, raw: &str) -> bool {
        let k = key(raw);
        let sets = PrecedenceSets::from_selection(selection);
        sets.is_selected(selection, k.tier(), &k, &k.base_key())
    }

    #[test]
    fn test_sets_from_selection() {
        let selection = SelectionSet::from_text("W1, W2_NE, W3_SW_TL, W3_SW");
        let sets = PrecedenceSets::from_selection(&selection);

        assert!(sets.quad_bases.contains(&key("W2")));
        assert!(sets.quad_bases.contains(&key("W3")));
        assert!(sets.subq_bases.contains(&key("W3")));
        assert!(sets.subq_quads.contains(&key("W3_SW")));
        assert!(!sets.quad_bases.contains(&key("W1")));
    }

    #[test]
    fn test_quadrant_overrides_base() {
        let selection = SelectionSet::from_text("W1,W1_NE");
        assert!(!selected(&selection, "W1"));
        assert!(selected(&selection, "W1_NE"));
    }

    #[test]
    fn test_sub_quadrant_overrides_quadrant_not_sibling() {
        let selection = SelectionSet::from_text("W1_NE,W1_NE_TL,W1_SW");
        assert!(!selected(&selection, "W1_NE"));
        assert!(selected(&selection, "W1_NE_TL"));
        assert!(selected(&selection, "W1_SW"));
    }

    #[test]
    fn test_sub_quadrant_overrides_base() {
        let selection = SelectionSet::from_text("W1,W1_SE_LR");
        assert!(!selected(&selection, "W1"));
        assert!(selected(&selection, "W1_SE_LR"));
    }

    #[test]
    fn test_other_families_unaffected() {
        let selection = SelectionSet::from_text("W1,W2_NE,W2_NE_TL");
        assert!(selected(&selection, "W1"));
        assert!(!selected(&selection, "W2_NE"));
    }

    #[test]
    fn test_unselected_key_never_selected() {
        let selection = SelectionSet::from_text("W1_NE");
        assert!(!selected(&selection, "W1_NW"));
        assert!(!selected(&selection, "W1"));
    }

    proptest! {
        /// Une zone sélectionnée n'a aucun descendant dans la sélection
        #[test]
        fn prop_selected_zone_has_no_selected_descendant(
            raw in proptest::collection::vec(
                "W[1-3](_(NE|NW|SE|SW)(_(TL|TR|LL|LR))?)?", 0..12
            )
        ) {
            let selection = SelectionSet::from_keys(&raw);
            let sets = PrecedenceSets::from_selection(&selection);
            for k in selection.iter() {
                let is_selected = sets.is_selected(&selection, k.tier(), k, &k.base_key());
                let prefix = format!("{}_", k.as_str());
                let has_descendant = selection.iter().any(|o| o.as_str().starts_with(&prefix));
                prop_assert_eq!(is_selected, !has_descendant);
            }
        }
    }
}
