//! Normalisation des clés de zone
//!
//! Grammaire canonique : `<Lettre><Numéro>[_<Quadrant>[_<SousQuadrant>]]`,
//! par exemple `W1`, `W1_NE`, `W1_NE_TL`. Le numéro n'a pas de zéro en tête,
//! la forme canonique est en majuscules.

use std::borrow::Borrow;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Lettre + numéro (avec zéros en tête éventuels) + suffixe optionnel
fn leading_zero_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Z])0*([0-9]+)(_.*)?$").expect("valid regex"))
}

fn base_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([A-Z])0*([0-9]+)").expect("valid regex"))
}

/// Suffixe quadrant / sous-quadrant en fin de chaîne
fn suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"_(NE|NW|SE|SW)(?:_(TL|TR|LL|LR))?$").expect("valid regex")
    })
}

/// Clé complète bien formée, insensible à la casse (utilisée par les heuristiques)
pub(crate) fn key_shape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^[A-Z][0-9]+(?:_(?:NE|NW|SE|SW)(?:_(?:TL|TR|LL|LR))?)?$")
            .expect("valid regex")
    })
}

/// Niveau de granularité d'une zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Base,
    Quadrant,
    SubQuadrant,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Base => "base",
            Tier::Quadrant => "quadrant",
            Tier::SubQuadrant => "subquadrant",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "base" | "zone" | "zones" => Ok(Tier::Base),
            "quadrant" | "quadrants" | "quad" => Ok(Tier::Quadrant),
            "subquadrant" | "subquadrants" | "subq" => Ok(Tier::SubQuadrant),
            _ => Err(format!(
                "Invalid tier: {}. Use: base, quadrant, subquadrant",
                s
            )),
        }
    }
}

/// Quadrant d'une zone de base
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quadrant {
    NE,
    NW,
    SE,
    SW,
}

impl Quadrant {
    pub fn as_str(self) -> &'static str {
        match self {
            Quadrant::NE => "NE",
            Quadrant::NW => "NW",
            Quadrant::SE => "SE",
            Quadrant::SW => "SW",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "NE" => Some(Quadrant::NE),
            "NW" => Some(Quadrant::NW),
            "SE" => Some(Quadrant::SE),
            "SW" => Some(Quadrant::SW),
            _ => None,
        }
    }
}

/// Sous-division d'un quadrant (haut/bas, gauche/droite)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubQuadrant {
    TL,
    TR,
    LL,
    LR,
}

impl SubQuadrant {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "TL" => Some(SubQuadrant::TL),
            "TR" => Some(SubQuadrant::TR),
            "LL" => Some(SubQuadrant::LL),
            "LR" => Some(SubQuadrant::LR),
            _ => None,
        }
    }
}

/// Canonicalise une clé brute.
///
/// Met en majuscules, supprime les espaces et retire les zéros en tête du
/// numéro (`w01_ne` → `W1_NE`). Une entrée hors grammaire est renvoyée
/// telle quelle (trim + majuscules), jamais d'erreur.
pub fn normalize(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    match leading_zero_pattern().captures(&upper) {
        Some(caps) => format!(
            "{}{}{}",
            &caps[1],
            &caps[2],
            caps.get(3).map_or("", |m| m.as_str())
        ),
        None => upper,
    }
}

/// Réduit une clé à sa zone de base (`W1_NE_TL` → `W1`)
pub fn base_key_from(key: &str) -> String {
    let upper = key.trim().to_uppercase();
    match base_pattern().captures(&upper) {
        Some(caps) => format!("{}{}", &caps[1], &caps[2]),
        None => upper,
    }
}

/// Extrait quadrant et sous-quadrant depuis le suffixe de la clé
pub fn quadrant_and_sub_parts(key: &str) -> (Option<Quadrant>, Option<SubQuadrant>) {
    let upper = key.trim().to_uppercase();
    let Some(caps) = suffix_pattern().captures(&upper) else {
        return (None, None);
    };
    let quadrant = caps.get(1).and_then(|m| Quadrant::parse(m.as_str()));
    let sub = caps.get(2).and_then(|m| SubQuadrant::parse(m.as_str()));
    (quadrant, sub)
}

/// Clé de quadrant (sans sous-quadrant)
pub fn is_quadrant_key(key: &str) -> bool {
    matches!(quadrant_and_sub_parts(key), (Some(_), None))
}

pub fn is_sub_quadrant_key(key: &str) -> bool {
    matches!(quadrant_and_sub_parts(key), (Some(_), Some(_)))
}

/// `base_quadrant` d'une clé de quadrant ou de sous-quadrant
///
/// `W1_NE_TL` → `W1_NE`, `W1_NE` → `W1_NE`, `W1` → `None`.
pub fn base_plus_quadrant(key: &str) -> Option<String> {
    let (quadrant, _) = quadrant_and_sub_parts(key);
    let quadrant = quadrant?;
    Some(format!("{}_{}", base_key_from(key), quadrant.as_str()))
}

/// Clé de zone canonique
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ZoneKey(String);

impl ZoneKey {
    /// Normalise puis encapsule une clé brute
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn base_key(&self) -> ZoneKey {
        Self(base_key_from(&self.0))
    }

    pub fn parts(&self) -> (Option<Quadrant>, Option<SubQuadrant>) {
        quadrant_and_sub_parts(&self.0)
    }

    pub fn is_quadrant(&self) -> bool {
        is_quadrant_key(&self.0)
    }

    pub fn is_sub_quadrant(&self) -> bool {
        is_sub_quadrant_key(&self.0)
    }

    pub fn base_plus_quadrant(&self) -> Option<ZoneKey> {
        base_plus_quadrant(&self.0).map(Self)
    }

    /// Granularité déduite de la forme de la clé
    pub fn tier(&self) -> Tier {
        match self.parts() {
            (Some(_), Some(_)) => Tier::SubQuadrant,
            (Some(_), None) => Tier::Quadrant,
            _ => Tier::Base,
        }
    }

    /// Vrai si la clé suit la grammaire complète
    pub fn is_well_formed(&self) -> bool {
        key_shape_pattern().is_match(&self.0)
    }
}

impl fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ZoneKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ZoneKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ZoneKey {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_strips_leading_zeros() {
        assert_eq!(normalize("W01_NE"), "W1_NE");
        assert_eq!(normalize("  w007_sw_tl "), "W7_SW_TL");
        assert_eq!(normalize("W000"), "W0");
        assert_eq!(normalize("e10"), "E10");
    }

    #[test]
    fn test_normalize_leaves_other_input() {
        assert_eq!(normalize(" route 5 "), "ROUTE 5");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("W1NE"), "W1NE");
    }

    #[test]
    fn test_base_key_from() {
        assert_eq!(base_key_from("W1_NE_TL"), "W1");
        assert_eq!(base_key_from("W01_NE"), "W1");
        assert_eq!(base_key_from("W12"), "W12");
        assert_eq!(base_key_from("north"), "NORTH");
    }

    #[test]
    fn test_quadrant_parts() {
        assert_eq!(quadrant_and_sub_parts("W1"), (None, None));
        assert_eq!(quadrant_and_sub_parts("W1_NE"), (Some(Quadrant::NE), None));
        assert_eq!(
            quadrant_and_sub_parts("w1_sw_lr"),
            (Some(Quadrant::SW), Some(SubQuadrant::LR))
        );
        assert_eq!(quadrant_and_sub_parts("W1_XX"), (None, None));
    }

    #[test]
    fn test_key_predicates() {
        assert!(is_quadrant_key("W1_NE"));
        assert!(!is_quadrant_key("W1_NE_TL"));
        assert!(is_sub_quadrant_key("W1_NE_TL"));
        assert!(!is_sub_quadrant_key("W1"));
    }

    #[test]
    fn test_base_plus_quadrant() {
        assert_eq!(base_plus_quadrant("W1_NE_TL").as_deref(), Some("W1_NE"));
        assert_eq!(base_plus_quadrant("W01_NE").as_deref(), Some("W1_NE"));
        assert_eq!(base_plus_quadrant("W1"), None);
    }

    #[test]
    fn test_zone_key_tier() {
        assert_eq!(ZoneKey::new("W1").tier(), Tier::Base);
        assert_eq!(ZoneKey::new("W1_se").tier(), Tier::Quadrant);
        assert_eq!(ZoneKey::new("W1_se_tr").tier(), Tier::SubQuadrant);
        assert!(ZoneKey::new("w02_se_tr").is_well_formed());
        assert!(!ZoneKey::new("Monday").is_well_formed());
    }

    #[test]
    fn test_tier_from_str() {
        assert_eq!("Sub-Quadrant".parse::<Tier>(), Ok(Tier::SubQuadrant));
        assert_eq!("quadrants".parse::<Tier>(), Ok(Tier::Quadrant));
        assert!("district".parse::<Tier>().is_err());
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(raw in "\\PC{0,16}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalize_idempotent_on_keys(
            letter in "[a-zA-Z]",
            zeros in "0{0,3}",
            number in 0u32..500,
            suffix in "(_(ne|NW|se|SW)(_(tl|TR|ll|LR))?)?",
        ) {
            let raw = format!("{}{}{}{}", letter, zeros, number, suffix);
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(ZoneKey::new(&raw).is_well_formed());
        }

        #[test]
        fn prop_sub_quadrant_strips_to_quadrant(
            number in 0u32..500,
            quad in "(NE|NW|SE|SW)",
            sub in "(TL|TR|LL|LR)",
        ) {
            let key = format!("W{}_{}_{}", number, quad, sub);
            prop_assert!(is_sub_quadrant_key(&key));
            let parent = base_plus_quadrant(&key).unwrap();
            prop_assert!(is_quadrant_key(&parent));
            prop_assert_eq!(base_key_from(&parent), base_key_from(&key));
        }
    }
}
