use std::fmt;

use serde::Serialize;

use crate::Matrix;
use crate::cluster::kmeans::squared_distance;
use crate::error::{Error, Result};

/// Internal evaluation scores for one clustering invocation.
///
/// Computed immediately after a clustering stage and consumed only for
/// reporting; never written back onto the table.
#[derive(Clone, Debug, Serialize)]
pub struct ClusterMetrics {
    /// Cohesion/separation score in [-1, 1], higher is better.
    pub silhouette: f64,
    /// Cluster-validity score in [0, inf), lower is better.
    pub davies_bouldin: f64,
    /// Within-cluster sum of squared distances, lower is better (depends on k).
    pub inertia: f64,
}

impl fmt::Display for ClusterMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<22} {:<10} {:<8} {}",
            "Type of Score", "Range", "Best", "Value"
        )?;
        writeln!(
            f,
            "{:<22} {:<10} {:<8} {:.4}",
            "Silhouette Score", "[-1, 1]", "Higher", self.silhouette
        )?;
        writeln!(
            f,
            "{:<22} {:<10} {:<8} {:.4}",
            "Davies-Bouldin Index", "[0, Inf)", "Lower", self.davies_bouldin
        )?;
        writeln!(
            f,
            "{:<22} {:<10} {:<8} {:.4}",
            "Inertia", "[0, Inf)", "Lower", self.inertia
        )
    }
}

/// Named metric records collected across clustering invocations, rendered
/// for a caller-supplied selection of invocation names.
#[derive(Debug, Default)]
pub struct MetricsReport {
    entries: Vec<(String, ClusterMetrics)>,
}

impl MetricsReport {
    pub fn push(&mut self, name: &str, metrics: ClusterMetrics) {
        self.entries.push((name.to_string(), metrics));
    }

    pub fn get(&self, name: &str) -> Option<&ClusterMetrics> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn render(&self, selection: &[&str]) -> String {
        let mut out = String::new();
        for (name, metrics) in &self.entries {
            if selection.contains(&name.as_str()) {
                out.push_str(name);
                out.push('\n');
                out.push_str(&metrics.to_string());
                out.push('\n');
            }
        }
        out
    }
}

/// Mean silhouette coefficient over all samples.
///
/// A sample in a singleton cluster contributes 0. Gaps in the label values
/// (empty clusters) are fine; at least two clusters must have members.
pub fn silhouette_score(x: &Matrix, labels: &[usize]) -> Result<f64> {
    check_labels(x, labels)?;
    let clusters = members_by_cluster(labels);
    if clusters.len() < 2 {
        return Err(Error::InvalidInput(
            "silhouette score requires at least 2 non-empty clusters".to_string(),
        ));
    }

    let n = x.nrows();
    let mut total = 0.0;
    for i in 0..n {
        let own = &clusters[&labels[i]];
        if own.len() == 1 {
            continue; // s(i) = 0 for singleton clusters
        }
        let a = own
            .iter()
            .filter(|&&j| j != i)
            .map(|&j| distance(x, i, j))
            .sum::<f64>()
            / (own.len() - 1) as f64;

        let mut b = f64::INFINITY;
        for (&label, members) in &clusters {
            if label == labels[i] {
                continue;
            }
            let mean = members.iter().map(|&j| distance(x, i, j)).sum::<f64>()
                / members.len() as f64;
            if mean < b {
                b = mean;
            }
        }

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Ok(total / n as f64)
}

/// Davies-Bouldin index: mean over clusters of the worst ratio of summed
/// within-cluster dispersions to centroid separation.
pub fn davies_bouldin_score(x: &Matrix, labels: &[usize]) -> Result<f64> {
    check_labels(x, labels)?;
    let clusters = members_by_cluster(labels);
    if clusters.len() < 2 {
        return Err(Error::InvalidInput(
            "Davies-Bouldin index requires at least 2 non-empty clusters".to_string(),
        ));
    }

    let keys: Vec<usize> = clusters.keys().copied().collect();
    let d = x.ncols();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(keys.len());
    let mut dispersion: Vec<f64> = Vec::with_capacity(keys.len());
    for &label in &keys {
        let members = &clusters[&label];
        let mut c = vec![0.0; d];
        for &i in members {
            for j in 0..d {
                c[j] += x[[i, j]];
            }
        }
        for v in c.iter_mut() {
            *v /= members.len() as f64;
        }
        let s = members
            .iter()
            .map(|&i| {
                (0..d)
                    .map(|j| (x[[i, j]] - c[j]).powi(2))
                    .sum::<f64>()
                    .sqrt()
            })
            .sum::<f64>()
            / members.len() as f64;
        centroids.push(c);
        dispersion.push(s);
    }

    let centroid_distance = |a: &[f64], b: &[f64]| -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    };

    let mut total = 0.0;
    for i in 0..keys.len() {
        let mut worst = 0.0f64;
        for j in 0..keys.len() {
            if i == j {
                continue;
            }
            let sep = centroid_distance(&centroids[i], &centroids[j]);
            let ratio = if sep > 0.0 {
                (dispersion[i] + dispersion[j]) / sep
            } else {
                f64::INFINITY
            };
            worst = worst.max(ratio);
        }
        total += worst;
    }
    Ok(total / keys.len() as f64)
}

fn check_labels(x: &Matrix, labels: &[usize]) -> Result<()> {
    if labels.len() != x.nrows() {
        return Err(Error::InvalidInput(format!(
            "{} labels for {} samples",
            labels.len(),
            x.nrows()
        )));
    }
    Ok(())
}

fn members_by_cluster(labels: &[usize]) -> std::collections::BTreeMap<usize, Vec<usize>> {
    let mut clusters: std::collections::BTreeMap<usize, Vec<usize>> = Default::default();
    for (i, &label) in labels.iter().enumerate() {
        clusters.entry(label).or_default().push(i);
    }
    clusters
}

fn distance(x: &Matrix, i: usize, j: usize) -> f64 {
    squared_distance(&x.row(i), &x.row(j)).sqrt()
}
