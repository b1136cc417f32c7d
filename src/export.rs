use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::table::FeatureTable;

#[derive(Debug, Serialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    geometry: Geometry,
    properties: Properties,
}

#[derive(Debug, Serialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: &'static str,
    coordinates: Vec<Vec<[f64; 2]>>,
}

#[derive(Debug, Serialize)]
struct Properties {
    cell_id: String,
    label: i64,
    color: String,
}

/// Assign one palette color per cell, indexed by final label.
///
/// The palette must cover every label present: its length has to exceed the
/// largest label value.
pub fn assign_colors(
    table: &FeatureTable,
    label_column: &str,
    palette: &[String],
) -> Result<Vec<String>> {
    let labels = table.final_labels(label_column)?;
    let max = labels.iter().copied().max().unwrap_or(0);
    if (palette.len() as i64) <= max {
        return Err(Error::Configuration(format!(
            "palette has {} colors but labels go up to {}",
            palette.len(),
            max
        )));
    }
    Ok(labels
        .into_iter()
        .map(|l| palette[l as usize].clone())
        .collect())
}

/// Serialize the labeled table as a GeoJSON `FeatureCollection`: one feature
/// per cell with its polygon, final label and palette color. Every cell must
/// carry geometry by this point.
pub fn to_geojson(
    table: &FeatureTable,
    label_column: &str,
    palette: &[String],
) -> Result<String> {
    let labels = table.final_labels(label_column)?;
    let colors = assign_colors(table, label_column, palette)?;

    let mut features = Vec::with_capacity(table.n_cells());
    for (row, id) in table.ids().iter().enumerate() {
        let polygon = table.geometry(row).ok_or_else(|| {
            Error::InvalidInput(format!("cell '{id}' has no geometry"))
        })?;
        features.push(Feature {
            kind: "Feature",
            geometry: Geometry {
                kind: "Polygon",
                coordinates: polygon.geojson_coordinates(),
            },
            properties: Properties {
                cell_id: id.clone(),
                label: labels[row],
                color: colors[row].clone(),
            },
        });
    }

    let collection = FeatureCollection {
        kind: "FeatureCollection",
        features,
    };
    serde_json::to_string_pretty(&collection)
        .map_err(|e| Error::InvalidInput(format!("GeoJSON serialization failed: {e}")))
}

pub fn write_geojson(
    table: &FeatureTable,
    label_column: &str,
    palette: &[String],
    path: &Path,
) -> Result<()> {
    let geojson = to_geojson(table, label_column, palette)?;
    fs::write(path, geojson)?;
    debug!(path = %path.display(), "wrote labeled GeoJSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Polygon;

    fn palette(colors: &[&str]) -> Vec<String> {
        colors.iter().map(|s| s.to_string()).collect()
    }

    fn labeled_table() -> FeatureTable {
        let mut t =
            FeatureTable::new(vec!["a".to_string(), "b".to_string(), "c".to_string()]).unwrap();
        t.set_geometry(vec![
            Polygon::hexagon((0.0, 51.0), 0.01),
            Polygon::hexagon((0.02, 51.0), 0.01),
            Polygon::hexagon((0.04, 51.0), 0.01),
        ])
        .unwrap();
        t.set_labels("label_6_tier", vec![Some(0), Some(2), Some(5)])
            .unwrap();
        t
    }

    #[test]
    fn test_assign_colors_by_label() {
        let t = labeled_table();
        let colors = assign_colors(
            &t,
            "label_6_tier",
            &palette(&["red", "maroon", "dodgerblue", "greenyellow", "forestgreen", "orange"]),
        )
        .unwrap();
        assert_eq!(colors, vec!["red", "dodgerblue", "orange"]);
    }

    #[test]
    fn test_undersized_palette_rejected() {
        let t = labeled_table();
        let result = assign_colors(&t, "label_6_tier", &palette(&["red", "maroon"]));
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_geojson_structure() {
        let t = labeled_table();
        let text = to_geojson(
            &t,
            "label_6_tier",
            &palette(&["red", "maroon", "dodgerblue", "greenyellow", "forestgreen", "orange"]),
        )
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().unwrap().len(), 3);
        assert_eq!(value["features"][1]["properties"]["label"], 2);
        assert_eq!(value["features"][1]["properties"]["color"], "dodgerblue");
        assert_eq!(value["features"][0]["geometry"]["type"], "Polygon");
    }

    #[test]
    fn test_missing_geometry_rejected() {
        let mut t = FeatureTable::new(vec!["a".to_string()]).unwrap();
        t.set_labels("label_6_tier", vec![Some(0)]).unwrap();
        let result = to_geojson(&t, "label_6_tier", &palette(&["red"]));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_write_geojson_file() {
        let t = labeled_table();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels.geojson");
        write_geojson(
            &t,
            "label_6_tier",
            &palette(&["red", "maroon", "dodgerblue", "greenyellow", "forestgreen", "orange"]),
            &path,
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("FeatureCollection"));
    }
}
