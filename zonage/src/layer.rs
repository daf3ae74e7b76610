//! Décodage des couches GeoJSON (une FeatureCollection par niveau et par jour)

use geo::{Geometry, MultiPolygon, Polygon};
use geojson::{Feature, GeoJson, JsonValue};
use tracing::warn;

use crate::types::ZoneRecord;
use crate::ZonageError;

/// Noms des propriétés portant la clé et le libellé
#[derive(Debug, Clone)]
pub struct LayerFields {
    pub key_property: String,
    pub label_property: String,
}

impl Default for LayerFields {
    fn default() -> Self {
        Self {
            key_property: "key".to_string(),
            label_property: "name".to_string(),
        }
    }
}

/// Résultat du décodage d'une couche
#[derive(Debug, Default)]
pub struct DecodedLayer {
    pub records: Vec<ZoneRecord>,

    /// Features ignorées (non fatales)
    pub skipped: Vec<ZonageError>,
}

/// Décode une FeatureCollection en enregistrements de zones
///
/// # Errors
///
/// Retourne `ZonageError` si le document est illisible, n'est pas une
/// FeatureCollection ou ne contient aucune zone exploitable. Les features
/// isolées invalides sont reportées dans `skipped`.
pub fn decode_layer(
    layer_name: &str,
    content: &str,
    fields: &LayerFields,
) -> Result<DecodedLayer, ZonageError> {
    let geojson: GeoJson = content
        .parse()
        .map_err(|e: geojson::Error| ZonageError::invalid_geojson(layer_name, e.to_string()))?;

    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(ZonageError::NotAFeatureCollection(layer_name.to_string()));
    };

    let mut decoded = DecodedLayer::default();

    for (index, feature) in collection.features.into_iter().enumerate() {
        match decode_feature(index, feature, fields) {
            Ok(record) => decoded.records.push(record),
            Err(e) => {
                warn!(layer = layer_name, index, error = %e, "Feature skipped");
                decoded.skipped.push(e);
            }
        }
    }

    if decoded.records.is_empty() {
        return Err(ZonageError::EmptyLayer(layer_name.to_string()));
    }

    Ok(decoded)
}

fn decode_feature(
    index: usize,
    feature: Feature,
    fields: &LayerFields,
) -> Result<ZoneRecord, ZonageError> {
    let raw_key = property_text(&feature, &fields.key_property)
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| ZonageError::MissingProperty {
            property: fields.key_property.clone(),
            index,
        })?;

    let label = property_text(&feature, &fields.label_property).unwrap_or_default();

    let Some(geometry) = feature.geometry else {
        return Err(ZonageError::unsupported_geometry(raw_key, "no geometry"));
    };

    let geometry = Geometry::<f64>::try_from(geometry)
        .map_err(|e| ZonageError::unsupported_geometry(&raw_key, e.to_string()))?;

    let polygons = collect_polygons(geometry);
    if polygons.is_empty() {
        return Err(ZonageError::unsupported_geometry(
            raw_key,
            "geometry is not polygonal",
        ));
    }

    Ok(ZoneRecord {
        raw_key,
        label,
        geometry: MultiPolygon::new(polygons),
    })
}

/// Aplati une géométrie en liste de polygones (les parties non surfaciques sont ignorées)
fn collect_polygons(geometry: Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc.0.into_iter().flat_map(collect_polygons).collect(),
        _ => Vec::new(),
    }
}

/// Lit une propriété texte ou numérique, avec repli insensible à la casse sur le nom
fn property_text(feature: &Feature, name: &str) -> Option<String> {
    let value = feature.property(name).or_else(|| {
        feature
            .properties
            .as_ref()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    })?;

    match value {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYER: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"Key": "w01_ne", "name": "West 1 NE"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,1],[0,0]]]}
            },
            {
                "type": "Feature",
                "properties": {"key": "W2"},
                "geometry": {"type": "MultiPolygon", "coordinates": [
                    [[[2,0],[3,0],[3,1],[2,1],[2,0]]],
                    [[[4,0],[5,0],[5,1],[4,1],[4,0]]]
                ]}
            },
            {
                "type": "Feature",
                "properties": {"key": "W3"},
                "geometry": {"type": "Point", "coordinates": [0, 0]}
            },
            {
                "type": "Feature",
                "properties": {"name": "no key"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}
            }
        ]
    }"#;

    #[test]
    fn test_decode_layer() {
        let decoded = decode_layer("quadrant-monday", LAYER, &LayerFields::default()).unwrap();

        assert_eq!(decoded.records.len(), 2);
        assert_eq!(decoded.records[0].raw_key, "w01_ne");
        assert_eq!(decoded.records[0].label, "West 1 NE");
        assert_eq!(decoded.records[1].geometry.0.len(), 2);
        assert_eq!(decoded.skipped.len(), 2);
        assert!(matches!(
            decoded.skipped[1],
            ZonageError::MissingProperty { index: 3, .. }
        ));
    }

    #[test]
    fn test_numeric_key_property() {
        let layer = r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","properties":{"zone":12},
             "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}
        ]}"#;
        let fields = LayerFields {
            key_property: "zone".to_string(),
            label_property: "label".to_string(),
        };
        let decoded = decode_layer("base", layer, &fields).unwrap();
        assert_eq!(decoded.records[0].raw_key, "12");
        assert_eq!(decoded.records[0].label, "");
    }

    #[test]
    fn test_invalid_documents() {
        let fields = LayerFields::default();
        assert!(matches!(
            decode_layer("x", "not json", &fields),
            Err(ZonageError::InvalidGeoJson { .. })
        ));
        assert!(matches!(
            decode_layer(
                "x",
                r#"{"type":"Point","coordinates":[0,0]}"#,
                &fields
            ),
            Err(ZonageError::NotAFeatureCollection(_))
        ));
        assert!(matches!(
            decode_layer("x", r#"{"type":"FeatureCollection","features":[]}"#, &fields),
            Err(ZonageError::EmptyLayer(_))
        ));
    }
}
