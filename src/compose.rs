use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cluster::{StageConfig, cluster_table};
use crate::error::Result;
use crate::metrics::MetricsReport;
use crate::table::FeatureTable;

/// Report names for the three clustering invocations.
pub const COARSE_STAGE: &str = "3 tier clustering";
pub const MID_STAGE: &str = "middle subclustering";
pub const RURAL_STAGE: &str = "rural subclustering";

/// Provisional label value of the mid bucket after the relabel step.
pub const MID_PROVISIONAL: i64 = 0;
/// Provisional label value of the rural bucket after the relabel step. The
/// coarse stage emits 1 for this bucket; it is renamed to 3 so the rural
/// subclass values can later sit directly above all other final classes.
pub const RURAL_PROVISIONAL: i64 = 3;

/// Configuration of the full two-stage classification.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TwoStageConfig {
    pub coarse: StageConfig,
    pub mid: StageConfig,
    pub rural: StageConfig,
    pub seed: u64,
}

impl Default for TwoStageConfig {
    /// The settlement study setup: coarse urban/mid/rural split over census
    /// features, secondary splits over density and land-use/road features.
    fn default() -> Self {
        let secondary = [
            "population_density",
            "area_residential",
            "length_residential",
            "length_tertiary",
        ];
        Self {
            coarse: StageConfig::new(
                "label_3_tier",
                &["population_density", "avg_age", "avg_household_size"],
                3,
            ),
            mid: StageConfig::new("middle_label_subclass", &secondary, 2),
            rural: StageConfig::new("rural_label_subclass", &secondary, 3),
            seed: 0,
        }
    }
}

/// Result of the composition: the name of the final label column and the
/// metric records of the three invocations.
#[derive(Debug)]
pub struct ComposeOutcome {
    pub final_column: String,
    pub report: MetricsReport,
}

/// Produce one hierarchical label per cell.
///
/// 1. coarse clustering over the whole table (urban/mid/rural);
/// 2. relabel provisional 1 to [`RURAL_PROVISIONAL`];
/// 3. cluster the mid bucket into `cfg.mid.k` subclasses;
/// 4. cluster the rural bucket into `cfg.rural.k` subclasses and offset the
///    values above every non-rural final class;
/// 5. merge: rural subclass, else mid subclass, else provisional label.
///
/// With the default configuration the final label space is mid {0, 1},
/// urban {2}, rural {3, 4, 5}. Every cell ends with exactly one label; a
/// cell with zero or two labels fails with `MergeConsistency`.
pub fn run_two_stage(table: &mut FeatureTable, cfg: &TwoStageConfig) -> Result<ComposeOutcome> {
    let mut report = MetricsReport::default();

    report.push(COARSE_STAGE, cluster_table(table, &cfg.coarse, cfg.seed)?);
    table.map_labels(&cfg.coarse.label_column, |v| {
        if v == 1 { RURAL_PROVISIONAL } else { v }
    })?;

    let mut mid = table.filter_by_label(&cfg.coarse.label_column, MID_PROVISIONAL)?;
    report.push(MID_STAGE, cluster_table(&mut mid, &cfg.mid, cfg.seed)?);

    let mut rural = table.filter_by_label(&cfg.coarse.label_column, RURAL_PROVISIONAL)?;
    report.push(RURAL_STAGE, cluster_table(&mut rural, &cfg.rural, cfg.seed)?);
    let offset = rural_offset(cfg);
    rural.map_labels(&cfg.rural.label_column, |v| v + offset)?;

    let final_column = merge_stages(table, cfg, &mid, &rural)?;
    info!(
        %final_column,
        cells = table.n_cells(),
        "two-stage composition finished"
    );
    Ok(ComposeOutcome { final_column, report })
}

/// Count of final classes not produced by the rural subclustering: the mid
/// subclasses plus the coarse buckets that get no secondary stage. 3 with
/// the default configuration, reproducing the source's offset-by-3 rule.
fn rural_offset(cfg: &TwoStageConfig) -> i64 {
    (cfg.mid.k + cfg.coarse.k - 2) as i64
}

/// Fold the secondary labels into one final column on the main table.
///
/// Rural values are folded first, then mid values (a cell in both buckets is
/// a `MergeConsistency` error), then every still-unset cell keeps its own
/// provisional label. Urban cells therefore pass through both merges
/// unchanged. The folded-in columns only ever existed on the bucket
/// snapshots, so the main table is left with the provisional and final
/// columns only.
fn merge_stages(
    table: &mut FeatureTable,
    cfg: &TwoStageConfig,
    mid: &FeatureTable,
    rural: &FeatureTable,
) -> Result<String> {
    let n_classes = cfg.rural.k + cfg.mid.k + 1;
    let final_column = format!("label_{n_classes}_tier");

    table.new_label_column(&final_column);
    table.fill_label_from_table(&final_column, rural, &cfg.rural.label_column)?;
    table.fill_label_from_table(&final_column, mid, &cfg.mid.label_column)?;
    table.fill_label_from(&final_column, &cfg.coarse.label_column)?;

    // Invariant check: exactly one label per cell.
    table.final_labels(&final_column)?;
    Ok(final_column)
}
