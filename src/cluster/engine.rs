use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::KMeans;
use crate::density;
use crate::error::{Error, Result};
use crate::metrics::{self, ClusterMetrics};
use crate::preprocessing::StandardScaler;
use crate::table::FeatureTable;

/// Optional per-stage side effect: per-column density curves segmented by
/// the resulting label, written to `path`, one palette color per cluster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DensityReport {
    pub path: PathBuf,
    pub palette: Vec<String>,
}

/// Typed configuration for one clustering invocation: which columns feed
/// the distance computation, how many clusters, and where the labels land.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StageConfig {
    pub label_column: String,
    pub columns: Vec<String>,
    pub k: usize,
    #[serde(default)]
    pub density_report: Option<DensityReport>,
}

impl StageConfig {
    pub fn new(label_column: &str, columns: &[&str], k: usize) -> Self {
        Self {
            label_column: label_column.to_string(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            k,
            density_report: None,
        }
    }

    pub fn with_density_report(mut self, path: impl Into<PathBuf>, palette: &[&str]) -> Self {
        self.density_report = Some(DensityReport {
            path: path.into(),
            palette: palette.iter().map(|s| s.to_string()).collect(),
        });
        self
    }
}

/// Standardize the configured columns, partition the rows into `cfg.k`
/// groups, append the stage's label column and return the evaluation
/// metrics.
///
/// The palette check runs before any clustering work: a mis-sized palette
/// is a configuration error regardless of the data.
pub fn cluster_table(
    table: &mut FeatureTable,
    cfg: &StageConfig,
    seed: u64,
) -> Result<ClusterMetrics> {
    if cfg.columns.is_empty() {
        return Err(Error::Configuration(
            "no clustering columns configured".to_string(),
        ));
    }
    if let Some(report) = &cfg.density_report {
        if report.palette.len() != cfg.k {
            return Err(Error::Configuration(format!(
                "palette has {} colors for {} clusters",
                report.palette.len(),
                cfg.k
            )));
        }
    }

    let x = table.matrix(&cfg.columns)?;
    let scaled = StandardScaler::new().fit_transform(&x)?;

    let mut kmeans = KMeans::new(cfg.k).seed(seed);
    let labels = kmeans.fit_predict(&scaled)?;
    table.set_labels(
        &cfg.label_column,
        labels.iter().map(|&l| Some(l as i64)).collect(),
    )?;

    let result = ClusterMetrics {
        silhouette: metrics::silhouette_score(&scaled, &labels)?,
        davies_bouldin: metrics::davies_bouldin_score(&scaled, &labels)?,
        inertia: kmeans.inertia.unwrap_or(0.0),
    };
    info!(
        stage = %cfg.label_column,
        k = cfg.k,
        cells = table.n_cells(),
        silhouette = result.silhouette,
        davies_bouldin = result.davies_bouldin,
        inertia = result.inertia,
        "clustering stage finished"
    );

    if let Some(report) = &cfg.density_report {
        density::write_density_report(
            table,
            &cfg.columns,
            &cfg.label_column,
            &report.palette,
            &report.path,
        )?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with_bands() -> FeatureTable {
        let ids = (0..6).map(|i| format!("cell{i}")).collect();
        let mut t = FeatureTable::new(ids).unwrap();
        t.insert_feature(
            "population_density",
            vec![10.0, 12.0, 500.0, 520.0, 1000.0, 1010.0],
        )
        .unwrap();
        t
    }

    #[test]
    fn test_two_band_scenario() {
        let mut t = table_with_bands();
        let cfg = StageConfig::new("tier", &["population_density"], 2);
        let m = cluster_table(&mut t, &cfg, 0).unwrap();

        let labels = t.labels("tier").unwrap();
        // Contiguous density pairs stay together and the top band is split
        // from the bottom one.
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[4], labels[5]);
        assert_ne!(labels[0], labels[4]);
        assert!(labels.iter().all(|l| matches!(l, Some(0) | Some(1))));
        assert!(m.silhouette > 0.5);
    }

    #[test]
    fn test_palette_mismatch_fails_before_clustering() {
        let mut t = table_with_bands();
        // The table is also invalid for this config (missing column), but
        // the palette check must win: it runs before any clustering work.
        let cfg = StageConfig::new("tier", &["no_such_column"], 3)
            .with_density_report("unused.csv", &["red", "maroon"]);
        let result = cluster_table(&mut t, &cfg, 0);
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn test_missing_column_is_invalid_input() {
        let mut t = table_with_bands();
        let cfg = StageConfig::new("tier", &["avg_age"], 2);
        let result = cluster_table(&mut t, &cfg, 0);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_empty_column_list_rejected() {
        let mut t = table_with_bands();
        let cfg = StageConfig::new("tier", &[], 2);
        assert!(matches!(
            cluster_table(&mut t, &cfg, 0),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_deterministic_across_runs() {
        let cfg = StageConfig::new("tier", &["population_density"], 2);
        let mut a = table_with_bands();
        let mut b = table_with_bands();
        cluster_table(&mut a, &cfg, 99).unwrap();
        cluster_table(&mut b, &cfg, 99).unwrap();
        assert_eq!(a.labels("tier").unwrap(), b.labels("tier").unwrap());
    }
}
