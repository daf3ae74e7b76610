//! Export vers GeoJSON avec geozero (streaming)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use geo::{Geometry, MultiPolygon};
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

use zonage::{DriverGroup, Snapshot, VisibilityDecision, Zone};

/// Exporte les zones visibles d'un instantané
///
/// Propriétés : `key`, `label`, `day`, `tier`, `selected`, `driver`,
/// `customers` (points attribués à la zone). Retourne le nombre de
/// features écrites.
pub fn export_zones(snapshot: &Snapshot, output_path: &Path) -> Result<usize> {
    let mut writer = create(output_path)?;
    write!(writer, r#"{{"type":"FeatureCollection","features":["#)?;

    let mut written = 0;
    for zone in snapshot.visible_zones() {
        if written > 0 {
            write!(writer, ",")?;
        }
        let decision = snapshot.resolution.decision(zone.id);
        let driver = snapshot.assignments.driver_for(zone);
        let customers = if decision.is_selected() {
            snapshot.classification.sel_count(zone.id)
        } else {
            snapshot.classification.any_count(zone.id)
        };
        write_zone_feature(&mut writer, zone, decision, driver, customers)?;
        written += 1;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(written)
}

/// Exporte une MultiPolygon par chauffeur (zones sélectionnées réunies)
pub fn export_driver_groups(snapshot: &Snapshot, output_path: &Path) -> Result<usize> {
    let groups = snapshot.driver_groups();

    let mut writer = create(output_path)?;
    write!(writer, r#"{{"type":"FeatureCollection","features":["#)?;

    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        let customers = snapshot.tally.get(&group.driver);
        write_group_feature(&mut writer, snapshot, group, customers)?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(groups.len())
}

fn create(output_path: &Path) -> Result<BufWriter<File>> {
    if let Some(dir) = output_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .context(format!("Failed to create directory: {}", dir.display()))?;
    }
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    Ok(BufWriter::new(file))
}

/// Écrit une zone en GeoJSON
fn write_zone_feature<W: Write>(
    writer: &mut W,
    zone: &Zone,
    decision: VisibilityDecision,
    driver: Option<&str>,
    customers: usize,
) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"Feature","id":"{}","#,
        escape_json(zone.key.as_str())
    )?;

    write!(writer, r#""geometry":"#)?;
    write_geometry(writer, &zone.geometry)?;

    write!(
        writer,
        r#","properties":{{"key":"{}","label":"{}","day":"{}","tier":"{}","selected":{},"driver":{},"customers":{}}}}}"#,
        escape_json(zone.key.as_str()),
        escape_json(&zone.label),
        escape_json(&zone.day),
        zone.tier,
        decision.is_selected(),
        json_string_or_null(driver),
        customers
    )?;

    Ok(())
}

fn write_group_feature<W: Write>(
    writer: &mut W,
    snapshot: &Snapshot,
    group: &DriverGroup,
    customers: usize,
) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"Feature","id":"{}","#,
        escape_json(&group.driver)
    )?;

    write!(writer, r#""geometry":"#)?;
    write_geometry(writer, &group.geometry)?;

    let keys: Vec<String> = group
        .zones
        .iter()
        .filter_map(|&id| snapshot.catalog.get(id))
        .map(|zone| format!("\"{}\"", escape_json(zone.key.as_str())))
        .collect();

    write!(
        writer,
        r#","properties":{{"driver":"{}","zones":[{}],"customers":{}}}}}"#,
        escape_json(&group.driver),
        keys.join(","),
        customers
    )?;

    Ok(())
}

/// Géométrie via geozero
fn write_geometry<W: Write>(writer: &mut W, geometry: &MultiPolygon<f64>) -> Result<()> {
    let geometry = Geometry::MultiPolygon(geometry.clone());
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    geometry.process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;
    Ok(())
}

fn json_string_or_null(value: Option<&str>) -> String {
    match value {
        Some(v) => format!("\"{}\"", escape_json(v)),
        None => "null".to_string(),
    }
}

/// Échappe une chaîne pour JSON
fn escape_json(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {
                result.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => result.push(c),
        }
    }
    result
}
