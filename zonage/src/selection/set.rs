//! Ensemble ordonné de clés sélectionnées

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::key::ZoneKey;
use crate::table::find_header;

/// Nombre de lignes examinées pour trouver l'en-tête de la colonne de clés
const HEADER_SCAN_ROWS: usize = 50;

/// En-têtes reconnus pour la colonne de clés (forme `header_token`)
const KEY_HEADERS: &[&str] = &[
    "zonekeys",
    "zonekey",
    "keys",
    "routekeys",
    "routekey",
    "selectedkeys",
    "selectedkey",
];

fn key_separator() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[;,/|\r\n]+").expect("valid regex"))
}

/// Découpe une cellule de clés sur `;`, `,`, `/`, `|` (et retours à la ligne)
pub fn split_keys(text: &str) -> impl Iterator<Item = &str> {
    key_separator()
        .split(text)
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Séquence ordonnée de clés normalisées, sans doublon (première occurrence conservée)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    keys: Vec<ZoneKey>,
    seen: HashSet<ZoneKey>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Construit un ensemble depuis des clés brutes (normalisées ici)
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for key in keys {
            set.push(key.as_ref());
        }
        set
    }

    /// Construit un ensemble depuis du texte délimité (`"W1; W1_NE/W2"`)
    pub fn from_text(text: &str) -> Self {
        Self::from_keys(split_keys(text))
    }

    /// Ajoute une clé ; retourne `false` si elle est vide ou déjà présente
    pub fn push(&mut self, raw: &str) -> bool {
        let key = ZoneKey::new(raw);
        if key.is_empty() || self.seen.contains(&key) {
            return false;
        }
        self.seen.insert(key.clone());
        self.keys.push(key);
        true
    }

    /// Union ordonnée : les clés de `self` puis les nouvelles clés de `other`
    pub fn union(&self, other: &SelectionSet) -> SelectionSet {
        let mut merged = self.clone();
        for key in &other.keys {
            merged.push(key.as_str());
        }
        merged
    }

    pub fn contains(&self, key: &ZoneKey) -> bool {
        self.seen.contains(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZoneKey> + '_ {
        self.keys.iter()
    }

    pub fn keys(&self) -> &[ZoneKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_keys(iter)
    }
}

/// Résultat de la lecture d'une table de sélection
#[derive(Debug, Clone, Default)]
pub struct SelectionParse {
    pub selection: SelectionSet,

    /// Position `(ligne, colonne)` de l'en-tête trouvé, `None` si absent
    pub header: Option<(usize, usize)>,
}

/// Lit la colonne « Zone Keys » d'une table de sélection
///
/// Toutes les lignes sous l'en-tête contribuent, dans l'ordre. Sans en-tête
/// reconnu, la sélection est vide (le résolveur applique alors le repli
/// « jamais vide »).
pub fn parse_selection_rows(rows: &[Vec<String>]) -> SelectionParse {
    let Some((header_row, column)) =
        find_header(rows, HEADER_SCAN_ROWS, |token| KEY_HEADERS.contains(&token))
    else {
        return SelectionParse::default();
    };

    let selection = rows[header_row + 1..]
        .iter()
        .filter_map(|row| row.get(column))
        .flat_map(|cell| split_keys(cell))
        .collect();

    SelectionParse {
        selection,
        header: Some((header_row, column)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_rows;

    fn keys(set: &SelectionSet) -> Vec<&str> {
        set.iter().map(ZoneKey::as_str).collect()
    }

    #[test]
    fn test_duplicates_collapse_to_first() {
        let set = SelectionSet::from_keys(["w01_ne", "W2", "W1_NE", "w2", " "]);
        assert_eq!(keys(&set), vec!["W1_NE", "W2"]);
    }

    #[test]
    fn test_split_keys() {
        let parts: Vec<&str> = split_keys("W1; W1_NE/W2 | W3,,W4\nW5").collect();
        assert_eq!(parts, vec!["W1", "W1_NE", "W2", "W3", "W4", "W5"]);
    }

    #[test]
    fn test_union_preserves_order() {
        let a = SelectionSet::from_text("W1,W2");
        let b = SelectionSet::from_text("W3,W1");
        assert_eq!(keys(&a.union(&b)), vec!["W1", "W2", "W3"]);
    }

    #[test]
    fn test_parse_selection_rows() {
        let rows = parse_rows("Day,Zone Keys\nMonday,\"W01, W1_NE\"\nMonday,W2|W1\n");
        let parsed = parse_selection_rows(&rows);
        assert_eq!(parsed.header, Some((0, 1)));
        assert_eq!(keys(&parsed.selection), vec!["W1", "W1_NE", "W2"]);
    }

    #[test]
    fn test_parse_selection_header_variants() {
        for header in ["zone key", "KEYS", "Route-Keys", "Selected Keys:"] {
            let rows = vec![
                vec![header.to_string()],
                vec!["W7".to_string()],
            ];
            let parsed = parse_selection_rows(&rows);
            assert_eq!(keys(&parsed.selection), vec!["W7"], "header {}", header);
        }
    }

    #[test]
    fn test_header_window_is_fifty_rows() {
        let table = |filler: usize| parse_rows(&format!("{}Zone Keys\nW1\n", "note,\n".repeat(filler)));

        let parsed = parse_selection_rows(&table(49));
        assert_eq!(parsed.header, Some((49, 0)));
        assert_eq!(keys(&parsed.selection), vec!["W1"]);

        let parsed = parse_selection_rows(&table(50));
        assert!(parsed.header.is_none());
        assert!(parsed.selection.is_empty());
    }

    #[test]
    fn test_blank_lines_before_header_are_not_counted() {
        let rows = parse_rows(&format!("{}Zone Keys\nW1\n", "\n,\n".repeat(80)));
        let parsed = parse_selection_rows(&rows);
        assert_eq!(parsed.header, Some((0, 0)));
        assert_eq!(keys(&parsed.selection), vec!["W1"]);
    }

    #[test]
    fn test_parse_selection_without_header() {
        let rows = parse_rows("Driver,Zones\nAlex,W1\n");
        let parsed = parse_selection_rows(&rows);
        assert!(parsed.header.is_none());
        assert!(parsed.selection.is_empty());
    }
}
