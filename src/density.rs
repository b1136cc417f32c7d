use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::table::FeatureTable;

const GRID_POINTS: usize = 200;

/// Write per-column density curves segmented by cluster label as CSV.
///
/// For every clustering column and every label, a Gaussian kernel density
/// estimate is evaluated on a fixed grid and written as
/// `column,label,color,x,density` rows. Presentation side effect only; the
/// labels on the table are not touched.
///
/// Bandwidth follows Scott's rule. Groups with fewer than two members or
/// zero spread are skipped, a density curve is meaningless for them.
pub fn write_density_report(
    table: &FeatureTable,
    columns: &[String],
    label_column: &str,
    palette: &[String],
    path: &Path,
) -> Result<()> {
    let labels = table
        .labels(label_column)
        .ok_or_else(|| Error::InvalidInput(format!("no label column '{label_column}'")))?;
    let distinct = table.distinct_labels(label_column)?;

    let mut out = String::from("column,label,color,x,density\n");
    for name in columns {
        let values = table
            .feature(name)
            .ok_or_else(|| Error::InvalidInput(format!("required column '{name}' is missing")))?;
        for &label in &distinct {
            let color = palette
                .get(label as usize)
                .map(String::as_str)
                .unwrap_or("");
            let group: Vec<f64> = values
                .iter()
                .zip(labels)
                .filter(|(_, l)| **l == Some(label))
                .map(|(v, _)| *v)
                .collect();
            if group.len() < 2 {
                continue;
            }

            let n = group.len() as f64;
            let mean = group.iter().sum::<f64>() / n;
            let sigma = (group.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n).sqrt();
            if sigma == 0.0 {
                continue;
            }
            let bandwidth = sigma * n.powf(-0.2);

            let min = group.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = group.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let lo = min - 3.0 * bandwidth;
            let hi = max + 3.0 * bandwidth;
            let step = (hi - lo) / (GRID_POINTS - 1) as f64;

            let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
            for g in 0..GRID_POINTS {
                let x = lo + step * g as f64;
                let density: f64 = group
                    .iter()
                    .map(|v| (-0.5 * ((x - v) / bandwidth).powi(2)).exp())
                    .sum::<f64>()
                    * norm;
                let _ = writeln!(out, "{name},{label},{color},{x:.6},{density:.8}");
            }
        }
    }

    fs::write(path, out)?;
    debug!(path = %path.display(), label_column, "wrote density report");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labeled_table() -> FeatureTable {
        let ids = (0..6).map(|i| format!("cell{i}")).collect();
        let mut t = FeatureTable::new(ids).unwrap();
        t.insert_feature(
            "population_density",
            vec![10.0, 12.0, 11.0, 900.0, 910.0, 905.0],
        )
        .unwrap();
        t.set_labels(
            "tier",
            vec![Some(0), Some(0), Some(0), Some(1), Some(1), Some(1)],
        )
        .unwrap();
        t
    }

    #[test]
    fn test_report_has_rows_per_label() {
        let t = labeled_table();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("density.csv");
        write_density_report(
            &t,
            &["population_density".to_string()],
            "tier",
            &["red".to_string(), "dodgerblue".to_string()],
            &path,
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("column,label,color,x,density\n"));
        assert!(text.contains("population_density,0,red,"));
        assert!(text.contains("population_density,1,dodgerblue,"));
    }

    #[test]
    fn test_density_integrates_to_one() {
        let t = labeled_table();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("density.csv");
        write_density_report(
            &t,
            &["population_density".to_string()],
            "tier",
            &["red".to_string(), "dodgerblue".to_string()],
            &path,
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut xs = Vec::new();
        let mut ds = Vec::new();
        for line in text.lines().skip(1) {
            let fields: Vec<&str> = line.split(',').collect();
            if fields[1] == "0" {
                xs.push(fields[3].parse::<f64>().unwrap());
                ds.push(fields[4].parse::<f64>().unwrap());
            }
        }
        let step = xs[1] - xs[0];
        let mass: f64 = ds.iter().sum::<f64>() * step;
        assert!((mass - 1.0).abs() < 0.05, "density mass {mass}");
    }

    #[test]
    fn test_singleton_group_skipped() {
        let mut t = FeatureTable::new(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .unwrap();
        t.insert_feature("population_density", vec![1.0, 2.0, 50.0])
            .unwrap();
        t.set_labels("tier", vec![Some(0), Some(0), Some(1)]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("density.csv");
        write_density_report(
            &t,
            &["population_density".to_string()],
            "tier",
            &["red".to_string(), "maroon".to_string()],
            &path,
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("population_density,1,"));
    }
}
