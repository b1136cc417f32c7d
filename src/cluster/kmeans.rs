use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Matrix;
use crate::error::{Error, Result};

/// Seeded k-means with k-means++ initialization and restarts.
///
/// Convergence: Lloyd iterations stop when cluster assignments stop changing
/// or the iteration cap is reached. Each of the `n_init` restarts reaches
/// only a local optimum of its initialization; the restart with the lowest
/// inertia wins. Identical input and identical seed produce identical label
/// assignments; ties in the assignment step go to the lowest-index centroid.
#[derive(Clone, Debug)]
pub struct KMeans {
    pub centroids: Option<Matrix>,
    pub labels: Option<Vec<usize>>,
    pub inertia: Option<f64>,
    k: usize,
    max_iter: usize,
    n_init: usize,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            centroids: None,
            labels: None,
            inertia: None,
            k,
            max_iter: 300,
            n_init: 10,
            seed: 0,
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init.max(1);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn fit(&mut self, x: &Matrix) -> Result<()> {
        if self.k == 0 {
            return Err(Error::Configuration("cluster count must be > 0".to_string()));
        }
        if x.nrows() == 0 || x.ncols() == 0 {
            return Err(Error::InvalidInput(
                "input matrix must have at least one sample and one feature".to_string(),
            ));
        }
        if x.nrows() < self.k {
            return Err(Error::Configuration(format!(
                "n_samples={} must be >= cluster count {}",
                x.nrows(),
                self.k
            )));
        }

        // One rng drives every restart, so the whole fit is a function of
        // the seed.
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Vec<usize>, Matrix)> = None;

        for _ in 0..self.n_init.max(1) {
            let mut centroids = self.init_plus_plus(x, &mut rng);
            let mut labels = assign(x, &centroids);

            for _ in 0..self.max_iter {
                update_centroids(x, &labels, &mut centroids);
                let next = assign(x, &centroids);
                if next == labels {
                    break;
                }
                labels = next;
            }

            let mut inertia = 0.0;
            for (i, &label) in labels.iter().enumerate() {
                inertia += squared_distance(&x.row(i), &centroids.row(label));
            }
            if best.as_ref().is_none_or(|(b, _, _)| inertia < *b) {
                best = Some((inertia, labels, centroids));
            }
        }

        let (inertia, labels, centroids) = best.unwrap();
        self.centroids = Some(centroids);
        self.labels = Some(labels);
        self.inertia = Some(inertia);
        Ok(())
    }

    pub fn fit_predict(&mut self, x: &Matrix) -> Result<Vec<usize>> {
        self.fit(x)?;
        Ok(self.labels.clone().unwrap())
    }

    /// k-means++: the first centroid is a uniformly random sample, each
    /// further centroid is drawn with probability proportional to its
    /// squared distance to the nearest centroid chosen so far.
    fn init_plus_plus(&self, x: &Matrix, rng: &mut StdRng) -> Matrix {
        let n = x.nrows();
        let mut centroids = Matrix::zeros((self.k, x.ncols()));

        let first = rng.gen_range(0..n);
        centroids.row_mut(0).assign(&x.row(first));

        let mut dist2 = vec![f64::INFINITY; n];
        for c in 1..self.k {
            for i in 0..n {
                let d = squared_distance(&x.row(i), &centroids.row(c - 1));
                if d < dist2[i] {
                    dist2[i] = d;
                }
            }
            let total: f64 = dist2.iter().sum();
            let chosen = if total > 0.0 {
                let target = rng.r#gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut idx = n - 1;
                for (i, &d) in dist2.iter().enumerate() {
                    cumulative += d;
                    if cumulative >= target {
                        idx = i;
                        break;
                    }
                }
                idx
            } else {
                // All remaining points coincide with a centroid.
                rng.gen_range(0..n)
            };
            centroids.row_mut(c).assign(&x.row(chosen));
        }
        centroids
    }
}

fn assign(x: &Matrix, centroids: &Matrix) -> Vec<usize> {
    let mut labels = vec![0usize; x.nrows()];
    for i in 0..x.nrows() {
        let mut min_distance = f64::INFINITY;
        let mut closest = 0;
        for k in 0..centroids.nrows() {
            let d = squared_distance(&x.row(i), &centroids.row(k));
            // Strict comparison keeps the lowest index on ties.
            if d < min_distance {
                min_distance = d;
                closest = k;
            }
        }
        labels[i] = closest;
    }
    labels
}

fn update_centroids(x: &Matrix, labels: &[usize], centroids: &mut Matrix) {
    for k in 0..centroids.nrows() {
        let members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|&(_, &label)| label == k)
            .map(|(i, _)| i)
            .collect();
        // An empty cluster keeps its previous centroid.
        if members.is_empty() {
            continue;
        }
        for j in 0..x.ncols() {
            let sum: f64 = members.iter().map(|&i| x[[i, j]]).sum();
            centroids[[k, j]] = sum / members.len() as f64;
        }
    }
}

pub(crate) fn squared_distance(a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_separated_clusters() {
        let x = array![
            [10.0, 1.0],
            [12.0, 1.1],
            [1000.0, 9.0],
            [1010.0, 9.2],
            [11.0, 0.9],
            [1005.0, 8.8]
        ];
        let mut kmeans = KMeans::new(2).seed(7);
        let labels = kmeans.fit_predict(&x).unwrap();

        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[4]);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[2], labels[5]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_labels_in_range() {
        let x = array![
            [1.0, 1.0],
            [1.5, 2.0],
            [3.0, 4.0],
            [5.0, 7.0],
            [3.5, 5.0],
            [4.5, 5.0],
            [3.5, 4.5]
        ];
        let mut kmeans = KMeans::new(3).seed(1);
        let labels = kmeans.fit_predict(&x).unwrap();
        assert_eq!(labels.len(), x.nrows());
        assert!(labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_same_seed_same_labels() {
        let x = array![
            [1.0, 1.0],
            [1.2, 0.8],
            [8.0, 8.0],
            [8.3, 7.9],
            [4.0, 4.2],
            [4.1, 3.8],
            [0.9, 1.1],
            [7.8, 8.2]
        ];
        let a = KMeans::new(3).seed(42).fit_predict(&x).unwrap();
        let b = KMeans::new(3).seed(42).fit_predict(&x).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_inertia_decreases_with_k() {
        let x = array![
            [1.0, 1.0],
            [2.0, 2.0],
            [8.0, 8.0],
            [9.0, 9.0],
            [15.0, 1.0],
            [16.0, 2.0]
        ];
        let mut k2 = KMeans::new(2).seed(3);
        k2.fit(&x).unwrap();
        let mut k3 = KMeans::new(3).seed(3);
        k3.fit(&x).unwrap();
        assert!(k3.inertia.unwrap() <= k2.inertia.unwrap());
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let x = array![[1.0], [2.0]];
        let mut kmeans = KMeans::new(0);
        assert!(matches!(kmeans.fit(&x), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_insufficient_samples() {
        let x = array![[1.0, 2.0]];
        let mut kmeans = KMeans::new(2);
        assert!(matches!(kmeans.fit(&x), Err(Error::Configuration(_))));
    }

    #[test]
    fn test_duplicate_points_do_not_hang() {
        let x = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0], [5.0, 5.0]];
        let mut kmeans = KMeans::new(2).seed(11);
        let labels = kmeans.fit_predict(&x).unwrap();
        assert_eq!(labels.len(), 4);
    }
}
