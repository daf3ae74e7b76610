//! Extraction heuristique des affectations chauffeur → zones
//!
//! Les tables d'affectation sont saisies à la main : l'extraction est un
//! classifieur à règles, au mieux. Elle ne renvoie jamais d'erreur, seulement
//! une table vide quand rien n'est reconnu.
//!
//! 1. Recherche d'une ligne d'en-tête (50 premières lignes) avec une colonne
//!    « chauffeur » et une colonne « clés » (prédicats ordonnés).
//! 2. À défaut, balayage des 40 premières lignes : la première cellule qui
//!    ressemble à un nom donne le chauffeur, toutes les cellules en forme de
//!    clé de la ligne lui sont attribuées.
//!
//! Les fenêtres comptent les lignes non vides : `parse_rows` a déjà retiré
//! les lignes blanches.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::key::{key_shape_pattern, ZoneKey};
use crate::selection::split_keys;
use crate::table::header_token;
use crate::types::Zone;

const HEADER_SCAN_ROWS: usize = 50;
const FALLBACK_SCAN_ROWS: usize = 40;

/// Jours de la semaine (et abréviations) rejetés comme faux noms
const WEEKDAY_TOKENS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "mon", "tue",
    "tues", "wed", "thu", "thur", "thurs", "fri", "sat", "sun", "weekday", "weekend",
];

/// Prédicat sur la forme normalisée d'une cellule d'en-tête
#[derive(Debug, Clone, Copy)]
enum HeaderRule {
    Exact(&'static [&'static str]),
    Contains(&'static str),
    Suffix(&'static str),
}

impl HeaderRule {
    fn matches(self, token: &str) -> bool {
        match self {
            HeaderRule::Exact(words) => words.contains(&token),
            HeaderRule::Contains(part) => token.contains(part),
            HeaderRule::Suffix(part) => token.ends_with(part),
        }
    }
}

/// En-têtes chauffeur, du plus spécifique au plus permissif
const DRIVER_HEADER_RULES: &[HeaderRule] = &[
    HeaderRule::Exact(&["driver", "drivername"]),
    HeaderRule::Contains("driver"),
    HeaderRule::Suffix("name"),
    HeaderRule::Contains("assigned"),
];

/// En-têtes clés, du plus spécifique au plus permissif
const KEYS_HEADER_RULES: &[HeaderRule] = &[
    HeaderRule::Exact(&["zonekeys", "keys"]),
    HeaderRule::Contains("key"),
    HeaderRule::Contains("zone"),
    HeaderRule::Contains("route"),
];

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\p{L}][\p{L} '\-]{1,30}$").expect("valid regex"))
}

/// Table zone → chauffeur (clé exacte, ou clé de base en repli)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentMap {
    entries: HashMap<ZoneKey, String>,
}

impl AssignmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: ZoneKey, driver: impl Into<String>) {
        self.entries.insert(key, driver.into());
    }

    pub fn get(&self, key: &ZoneKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Chauffeur d'une zone : clé exacte d'abord, puis clé de base
    pub fn driver_for(&self, zone: &Zone) -> Option<&str> {
        self.get(&zone.key).or_else(|| self.get(&zone.base_key))
    }

    /// Fusionne une table d'amorçage avec une table extraite ;
    /// l'extraite l'emporte en cas de collision
    pub fn merged(seed: &AssignmentMap, extracted: &AssignmentMap) -> AssignmentMap {
        let mut merged = seed.clone();
        for (key, driver) in &extracted.entries {
            merged.entries.insert(key.clone(), driver.clone());
        }
        merged
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ZoneKey, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for AssignmentMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, driver) in iter {
            map.insert(ZoneKey::new(key.as_ref()), driver);
        }
        map
    }
}

/// Méthode ayant produit l'extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// En-tête reconnu à la ligne `row`
    Header {
        row: usize,
        driver_column: usize,
        keys_column: usize,
    },
    /// Balayage ligne à ligne sans en-tête
    Fallback,
    /// Rien de reconnu
    NoMatch,
}

/// Résultat typé de l'extraction
#[derive(Debug, Clone)]
pub struct Extraction {
    pub map: AssignmentMap,
    pub method: ExtractionMethod,
}

/// Reconnaît les noms de chauffeurs
#[derive(Debug, Clone, Default)]
pub struct NameMatcher {
    /// Minuscules → orthographe configurée
    known: HashMap<String, String>,
}

impl NameMatcher {
    /// `known` vide : motif permissif (lettres, espaces, apostrophes, tirets)
    pub fn new<I, S>(known: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known: known
                .into_iter()
                .map(|n| n.as_ref().trim().to_string())
                .filter(|n| !n.is_empty())
                .map(|n| (n.to_lowercase(), n))
                .collect(),
        }
    }

    /// Retourne le nom nettoyé si la cellule ressemble à un nom
    ///
    /// Avec une liste de noms connus, c'est l'orthographe configurée qui est
    /// retournée, quelle que soit la casse de la cellule.
    pub fn name_in<'a>(&'a self, cell: &'a str) -> Option<&'a str> {
        let name = cell.trim();
        if name.is_empty() {
            return None;
        }

        if !self.known.is_empty() {
            return self.known.get(&name.to_lowercase()).map(String::as_str);
        }

        if !name_pattern().is_match(name) {
            return None;
        }
        if WEEKDAY_TOKENS.contains(&name.to_lowercase().as_str()) {
            return None;
        }
        Some(name)
    }
}

/// Extrait la table chauffeur → zones depuis des lignes CSV
pub fn extract<I, S>(rows: &[Vec<String>], known_names: I) -> Extraction
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let matcher = NameMatcher::new(known_names);

    if let Some((row, driver_column, keys_column)) = find_assignment_header(rows) {
        let map = extract_with_header(rows, row, driver_column, keys_column, &matcher);
        debug!(row, entries = map.len(), "Assignment header found");
        return Extraction {
            map,
            method: ExtractionMethod::Header {
                row,
                driver_column,
                keys_column,
            },
        };
    }

    let map = extract_fallback(rows, &matcher);
    let method = if map.is_empty() {
        ExtractionMethod::NoMatch
    } else {
        ExtractionMethod::Fallback
    };
    debug!(entries = map.len(), ?method, "Assignment fallback scan");

    Extraction { map, method }
}

/// Ligne d'en-tête et colonnes (chauffeur, clés)
fn find_assignment_header(rows: &[Vec<String>]) -> Option<(usize, usize, usize)> {
    rows.iter()
        .take(HEADER_SCAN_ROWS)
        .enumerate()
        .find_map(|(r, row)| {
            let tokens: Vec<String> = row.iter().map(|c| header_token(c)).collect();
            let driver = first_column(&tokens, DRIVER_HEADER_RULES, None)?;
            let keys = first_column(&tokens, KEYS_HEADER_RULES, Some(driver))?;
            Some((r, driver, keys))
        })
}

/// Première colonne satisfaisant la règle la plus prioritaire possible
fn first_column(tokens: &[String], rules: &[HeaderRule], exclude: Option<usize>) -> Option<usize> {
    rules.iter().find_map(|rule| {
        tokens
            .iter()
            .enumerate()
            .find(|(i, t)| Some(*i) != exclude && !t.is_empty() && rule.matches(t))
            .map(|(i, _)| i)
    })
}

fn extract_with_header(
    rows: &[Vec<String>],
    header_row: usize,
    driver_column: usize,
    keys_column: usize,
    matcher: &NameMatcher,
) -> AssignmentMap {
    let mut map = AssignmentMap::new();

    for row in &rows[header_row + 1..] {
        let Some(driver) = row.get(driver_column).and_then(|c| matcher.name_in(c)) else {
            continue;
        };
        let Some(keys_cell) = row.get(keys_column) else {
            continue;
        };
        for key in split_keys(keys_cell) {
            map.insert(ZoneKey::new(key), driver);
        }
    }

    map
}

fn extract_fallback(rows: &[Vec<String>], matcher: &NameMatcher) -> AssignmentMap {
    let mut map = AssignmentMap::new();

    for row in rows.iter().take(FALLBACK_SCAN_ROWS) {
        let Some(driver) = row.iter().find_map(|c| matcher.name_in(c)) else {
            continue;
        };
        for cell in row {
            for token in split_keys(cell) {
                if key_shape_pattern().is_match(token) {
                    map.insert(ZoneKey::new(token), driver);
                }
            }
        }
    }

    map
}
