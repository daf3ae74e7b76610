//! Types de données pour le crate zonage

use geo::{BoundingRect, Coord, MultiPolygon, Rect};

use crate::key::{Tier, ZoneKey};

/// Index stable d'une zone dans le catalogue (ordre d'insertion)
pub type ZoneId = usize;

/// Enregistrement brut d'une couche avant indexation
#[derive(Debug, Clone)]
pub struct ZoneRecord {
    /// Clé telle que lue dans la couche (non normalisée)
    pub raw_key: String,

    /// Nom affiché
    pub label: String,

    /// Géométrie (Polygon promu en MultiPolygon)
    pub geometry: MultiPolygon<f64>,
}

/// Une zone de livraison indexée
#[derive(Debug, Clone)]
pub struct Zone {
    pub id: ZoneId,

    /// Clé canonique
    pub key: ZoneKey,

    /// Clé de la zone de base (`W1` pour `W1_NE_TL`)
    pub base_key: ZoneKey,

    pub tier: Tier,

    /// Jour de livraison de la couche d'origine
    pub day: String,

    pub label: String,

    pub geometry: MultiPolygon<f64>,

    /// Emprise précalculée (`None` pour une géométrie vide)
    pub bounds: Option<Rect<f64>>,
}

impl Zone {
    pub(crate) fn from_record(id: ZoneId, tier: Tier, day: &str, record: ZoneRecord) -> Self {
        let key = ZoneKey::new(&record.raw_key);
        let base_key = key.base_key();
        let bounds = record.geometry.bounding_rect();
        let label = if record.label.trim().is_empty() {
            key.to_string()
        } else {
            record.label
        };

        Self {
            id,
            key,
            base_key,
            tier,
            day: day.to_string(),
            label,
            geometry: record.geometry,
            bounds,
        }
    }

    /// Test rapide sur l'emprise avant le test d'inclusion complet
    pub fn may_contain(&self, coord: Coord<f64>) -> bool {
        self.bounds.is_some_and(|r| {
            let (min, max) = (r.min(), r.max());
            coord.x >= min.x && coord.x <= max.x && coord.y >= min.y && coord.y <= max.y
        })
    }
}

/// Décision de visibilité d'une zone pour un cycle de sélection
///
/// Une zone sélectionnée est toujours visible : les constructeurs sont
/// les seuls moyens de créer une décision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VisibilityDecision {
    visible: bool,
    selected: bool,
}

impl VisibilityDecision {
    pub const HIDDEN: Self = Self {
        visible: false,
        selected: false,
    };

    /// Visible sans style de sélection (repli « jamais vide »)
    pub const SHOWN: Self = Self {
        visible: true,
        selected: false,
    };

    pub const SELECTED: Self = Self {
        visible: true,
        selected: true,
    };

    pub fn is_visible(self) -> bool {
        self.visible
    }

    pub fn is_selected(self) -> bool {
        self.selected
    }
}

/// Point client à classer
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerPoint {
    pub lat: f64,
    pub lng: f64,

    /// Note libre (commande, consigne...)
    pub note: String,
}

impl CustomerPoint {
    /// Crée un point si les coordonnées sont dans les bornes WGS84
    pub fn new(lat: f64, lng: f64, note: impl Into<String>) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return None;
        }
        Some(Self {
            lat,
            lng,
            note: note.into(),
        })
    }

    /// Coordonnée GeoJSON (x = longitude, y = latitude)
    pub fn coord(&self) -> Coord<f64> {
        Coord {
            x: self.lng,
            y: self.lat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    #[test]
    fn test_customer_point_bounds() {
        assert!(CustomerPoint::new(45.0, 5.0, "").is_some());
        assert!(CustomerPoint::new(-90.0, 180.0, "").is_some());
        assert!(CustomerPoint::new(91.0, 5.0, "").is_none());
        assert!(CustomerPoint::new(45.0, -181.0, "").is_none());
        assert!(CustomerPoint::new(f64::NAN, 5.0, "").is_none());
    }

    #[test]
    fn test_zone_from_record() {
        let record = ZoneRecord {
            raw_key: "w01_ne".to_string(),
            label: " ".to_string(),
            geometry: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 2.0, y: 0.0),
                (x: 2.0, y: 2.0),
                (x: 0.0, y: 2.0)
            ]]),
        };
        let zone = Zone::from_record(3, Tier::Quadrant, "Monday", record);

        assert_eq!(zone.key.as_str(), "W1_NE");
        assert_eq!(zone.base_key.as_str(), "W1");
        assert_eq!(zone.label, "W1_NE");
        assert!(zone.may_contain(Coord { x: 1.0, y: 1.0 }));
        assert!(!zone.may_contain(Coord { x: 3.0, y: 1.0 }));
    }

    #[test]
    fn test_visibility_invariant() {
        assert!(VisibilityDecision::SELECTED.is_visible());
        assert!(!VisibilityDecision::SHOWN.is_selected());
        assert_eq!(VisibilityDecision::default(), VisibilityDecision::HIDDEN);
    }
}
