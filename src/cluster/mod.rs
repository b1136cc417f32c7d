//! Clustering: the seeded k-means core and the table-level engine.
//!
//! `KMeans` works on a raw matrix; `cluster_table` is the pipeline-facing
//! wrapper that validates a [`StageConfig`], standardizes the selected
//! columns, appends the label column and computes the evaluation metrics.
//!
//! ```rust
//! use hextier::{FeatureTable, StageConfig, cluster_table};
//!
//! let mut table = FeatureTable::new(vec![
//!     "a".into(), "b".into(), "c".into(), "d".into(),
//! ]).unwrap();
//! table.insert_feature("population_density", vec![5.0, 7.0, 900.0, 910.0]).unwrap();
//!
//! let cfg = StageConfig::new("tier", &["population_density"], 2);
//! let metrics = cluster_table(&mut table, &cfg, 0).unwrap();
//!
//! let labels = table.labels("tier").unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//! assert!(metrics.silhouette > 0.5);
//! ```

pub(crate) mod engine;
pub(crate) mod kmeans;

pub use engine::{DensityReport, StageConfig, cluster_table};
pub use kmeans::KMeans;
