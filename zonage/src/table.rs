//! Lecture des tables CSV (sélection, affectations, clients)
//!
//! Les exports de tableur arrivent en UTF-8 (avec ou sans BOM) ou en
//! Windows-1252 ; le découpage suit RFC 4180 (guillemets, `""`, CRLF,
//! retours à la ligne dans un champ).

use std::borrow::Cow;

use memchr::memchr3;

/// Une table : lignes de cellules texte
pub type Rows = Vec<Vec<String>>;

/// Décode les bytes d'un export CSV
pub fn decode_text(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    match simdutf8::basic::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(data);
            decoded
        }
    }
}

/// Découpe un texte CSV en lignes de cellules
///
/// Les lignes entièrement vides sont ignorées. Un guillemet n'ouvre un
/// champ quoté qu'en tête de champ ; ailleurs il est gardé tel quel.
pub fn parse_rows(text: &str) -> Rows {
    let bytes = text.as_bytes();
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut pos = 0;
    let mut in_quotes = false;
    let mut field_start = true;

    while pos < bytes.len() {
        if in_quotes {
            // Chercher le prochain guillemet
            match memchr::memchr(b'"', &bytes[pos..]) {
                Some(offset) => {
                    field.push_str(&text[pos..pos + offset]);
                    pos += offset + 1;
                    if bytes.get(pos) == Some(&b'"') {
                        field.push('"');
                        pos += 1;
                    } else {
                        in_quotes = false;
                    }
                }
                None => {
                    // Guillemet non fermé : le reste du texte appartient au champ
                    field.push_str(&text[pos..]);
                    pos = bytes.len();
                }
            }
            continue;
        }

        match memchr3(b',', b'"', b'\n', &bytes[pos..]) {
            Some(offset) => {
                field.push_str(&text[pos..pos + offset]);
                let sep = bytes[pos + offset];
                let opens_field = field_start && offset == 0;
                pos += offset + 1;
                match sep {
                    b',' => {
                        row.push(std::mem::take(&mut field));
                        field_start = true;
                    }
                    b'"' if opens_field => {
                        in_quotes = true;
                        field_start = false;
                    }
                    b'"' => {
                        field.push('"');
                        field_start = false;
                    }
                    _ => {
                        row.push(std::mem::take(&mut field));
                        push_row(&mut rows, std::mem::take(&mut row));
                        field_start = true;
                    }
                }
            }
            None => {
                field.push_str(&text[pos..]);
                pos = bytes.len();
            }
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        push_row(&mut rows, row);
    }

    rows
}

fn push_row(rows: &mut Rows, mut row: Vec<String>) {
    // CRLF : retirer le \r final du dernier champ
    if let Some(last) = row.last_mut() {
        if last.ends_with('\r') {
            last.pop();
        }
    }
    if row.iter().any(|cell| !cell.trim().is_empty()) {
        rows.push(row);
    }
}

/// Forme comparable d'un en-tête : minuscules, sans espaces ni ponctuation
///
/// `"Zone Keys"`, `"zone_keys"` et `"ZONE-KEYS:"` donnent tous `"zonekeys"`.
pub fn header_token(cell: &str) -> String {
    cell.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Cherche la première ligne contenant une cellule d'en-tête acceptée
///
/// Retourne `(index_ligne, index_colonne)`.
pub fn find_header<F>(rows: &[Vec<String>], max_rows: usize, accept: F) -> Option<(usize, usize)>
where
    F: Fn(&str) -> bool,
{
    rows.iter().take(max_rows).enumerate().find_map(|(r, row)| {
        row.iter()
            .position(|cell| accept(&header_token(cell)))
            .map(|c| (r, c))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_rows() {
        let rows = parse_rows("a,b,c\n1,2,3\n");
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_parse_quoted_fields() {
        let rows = parse_rows("Driver,Zone Keys\r\n\"Alex\",\"W1, W1_NE\"\r\n\"Sam \"\"S\"\"\",\"W2\nW3\"");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["Driver", "Zone Keys"]);
        assert_eq!(rows[1], vec!["Alex", "W1, W1_NE"]);
        assert_eq!(rows[2], vec!["Sam \"S\"", "W2\nW3"]);
    }

    #[test]
    fn test_parse_quote_inside_unquoted_field_is_literal() {
        let rows = parse_rows(
            "Name,Verified Coordinates,Order Note\nA,\"1, 2\",Door 5\" wide\nB,\"3, 4\",ok\nC,\"5, 6\",ok\n",
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1], vec!["A", "1, 2", "Door 5\" wide"]);
        assert_eq!(rows[2], vec!["B", "3, 4", "ok"]);
        assert_eq!(rows[3], vec!["C", "5, 6", "ok"]);

        // Après un champ quoté fermé, un guillemet reste littéral
        assert_eq!(parse_rows("\"a\"b\"c,d"), vec![vec!["ab\"c", "d"]]);
    }

    #[test]
    fn test_parse_skips_blank_lines_and_keeps_empty_cells() {
        let rows = parse_rows("a,,c\n\n,,\nx\n");
        assert_eq!(rows, vec![vec!["a", "", "c"], vec!["x"]]);
    }

    #[test]
    fn test_decode_text_fallback() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFZone Keys"), "Zone Keys");
        // "Zoé" en Windows-1252
        assert_eq!(decode_text(b"Zo\xE9"), "Zoé");
    }

    #[test]
    fn test_header_token() {
        assert_eq!(header_token(" Zone Keys "), "zonekeys");
        assert_eq!(header_token("ROUTE_KEYS:"), "routekeys");
        assert_eq!(header_token("Verified Coordinates"), "verifiedcoordinates");
    }

    #[test]
    fn test_find_header() {
        let rows = parse_rows("report,,\n,Selected Keys,\n,W1,\n");
        assert_eq!(find_header(&rows, 10, |t| t == "selectedkeys"), Some((1, 1)));
        assert_eq!(find_header(&rows, 1, |t| t == "selectedkeys"), None);
    }
}
