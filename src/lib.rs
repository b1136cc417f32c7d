//! Settlement-type classification over a hexagonal spatial grid.
//!
//! A [`FeatureTable`] holds one row per hexagonal cell (population density,
//! average age, average household size, land-use areas, road lengths plus
//! the cell polygon). The pipeline standardizes the configured columns,
//! partitions the cells with seeded k-means, composes a two-stage
//! hierarchical label (urban / mid / rural with subclasses, up to six
//! terminal categories) and exports the labeled cells as GeoJSON.
//!
//! The flow is strictly one way: table → coarse clustering → bucket
//! partition → secondary clustering → label composition.

pub use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

pub mod cluster;
pub mod compose;
pub mod config;
pub mod density;
pub mod error;
pub mod export;
pub mod geometry;
pub mod metrics;
pub mod preprocessing;
pub mod table;

pub type Vector = Array1<f64>;
pub type Matrix = Array2<f64>;

pub use cluster::{DensityReport, KMeans, StageConfig, cluster_table};
pub use compose::{ComposeOutcome, TwoStageConfig, run_two_stage};
pub use config::{PipelineConfig, SourceVariant};
pub use error::{Error, Result};
pub use geometry::Polygon;
pub use metrics::{ClusterMetrics, MetricsReport};
pub use preprocessing::StandardScaler;
pub use table::FeatureTable;
