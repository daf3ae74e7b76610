//! Lecture des points clients depuis la table CSV

use tracing::debug;

use crate::table::{find_header, header_token};
use crate::types::CustomerPoint;

const HEADER_SCAN_ROWS: usize = 50;

/// Libellés des colonnes de la table clients
#[derive(Debug, Clone)]
pub struct CustomerColumns {
    pub coordinates: String,
    pub note: String,
}

impl Default for CustomerColumns {
    fn default() -> Self {
        Self {
            coordinates: "Verified Coordinates".to_string(),
            note: "Order Note".to_string(),
        }
    }
}

/// Points clients valides et nombre de lignes écartées
#[derive(Debug, Clone, Default)]
pub struct CustomerSet {
    pub points: Vec<CustomerPoint>,

    /// Lignes dont les coordonnées sont absentes ou invalides
    pub skipped: usize,
}

impl CustomerSet {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Parse un texte `"lat, lng"` (séparateur virgule, point-virgule ou espace)
///
/// Retourne `None` si le texte est mal formé ou hors bornes.
pub fn parse_lat_lng(text: &str) -> Option<(f64, f64)> {
    let mut parts = text
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|p| !p.is_empty());

    let lat: f64 = fast_float::parse(parts.next()?).ok()?;
    let lng: f64 = fast_float::parse(parts.next()?).ok()?;
    if parts.next().is_some() {
        return None;
    }

    CustomerPoint::new(lat, lng, "").map(|p| (p.lat, p.lng))
}

/// Extrait les points clients d'une table
///
/// L'en-tête est la première ligne contenant la colonne de coordonnées.
/// Sans cette colonne, aucun point n'est classable : l'ensemble est vide.
pub fn parse_customer_rows(rows: &[Vec<String>], columns: &CustomerColumns) -> CustomerSet {
    let coords_token = header_token(&columns.coordinates);
    let note_token = header_token(&columns.note);

    let Some((header_row, coords_column)) =
        find_header(rows, HEADER_SCAN_ROWS, |token| token == coords_token)
    else {
        debug!(column = %columns.coordinates, "No coordinates column found");
        return CustomerSet::default();
    };

    let note_column = rows[header_row]
        .iter()
        .position(|cell| header_token(cell) == note_token);

    let mut set = CustomerSet::default();

    for row in &rows[header_row + 1..] {
        let parsed = row
            .get(coords_column)
            .and_then(|cell| parse_lat_lng(cell));

        let Some((lat, lng)) = parsed else {
            set.skipped += 1;
            continue;
        };

        let note = note_column
            .and_then(|c| row.get(c))
            .map(|n| n.trim().to_string())
            .unwrap_or_default();

        if let Some(point) = CustomerPoint::new(lat, lng, note) {
            set.points.push(point);
        }
    }

    debug!(points = set.points.len(), skipped = set.skipped, "Customers parsed");
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::parse_rows;

    #[test]
    fn test_parse_lat_lng() {
        assert_eq!(parse_lat_lng("45.19, 5.72"), Some((45.19, 5.72)));
        assert_eq!(parse_lat_lng(" -33.9;18.4 "), Some((-33.9, 18.4)));
        assert_eq!(parse_lat_lng("45.19 5.72"), Some((45.19, 5.72)));
        assert_eq!(parse_lat_lng("95, 5"), None);
        assert_eq!(parse_lat_lng("45.1"), None);
        assert_eq!(parse_lat_lng("abc, def"), None);
        assert_eq!(parse_lat_lng("1, 2, 3"), None);
        assert_eq!(parse_lat_lng(""), None);
    }

    #[test]
    fn test_parse_customer_rows() {
        let rows = parse_rows(
            "Name,Verified Coordinates,Order Note\nA,\"1.5, 2.5\",ring twice\nB,,\nC,\"nope\",x\nD,\"3, 4\"\n",
        );
        let set = parse_customer_rows(&rows, &CustomerColumns::default());

        assert_eq!(set.len(), 2);
        assert_eq!(set.skipped, 2);
        assert_eq!(set.points[0].lat, 1.5);
        assert_eq!(set.points[0].lng, 2.5);
        assert_eq!(set.points[0].note, "ring twice");
        assert_eq!(set.points[1].note, "");
    }

    #[test]
    fn test_stray_quote_in_note_keeps_later_rows() {
        let rows = parse_rows(
            "Name,Verified Coordinates,Order Note\nA,\"1, 2\",Door 5\" wide\nB,\"3, 4\",ok\nC,\"5, 6\",ok\n",
        );
        let set = parse_customer_rows(&rows, &CustomerColumns::default());

        assert_eq!(set.len(), 3);
        assert_eq!(set.skipped, 0);
        assert_eq!(set.points[0].note, "Door 5\" wide");
        assert_eq!(set.points[2].lat, 5.0);
    }

    #[test]
    fn test_configurable_columns() {
        let rows = parse_rows("GPS,Memo\n\"10, 20\",gate code\n");
        let columns = CustomerColumns {
            coordinates: "gps".to_string(),
            note: "memo".to_string(),
        };
        let set = parse_customer_rows(&rows, &columns);
        assert_eq!(set.len(), 1);
        assert_eq!(set.points[0].note, "gate code");
    }

    #[test]
    fn test_missing_coordinates_column() {
        let rows = parse_rows("Name,Order Note\nA,hello\n");
        let set = parse_customer_rows(&rows, &CustomerColumns::default());
        assert!(set.is_empty());
        assert_eq!(set.skipped, 0);
    }
}
