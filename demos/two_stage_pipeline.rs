use hextier::compose::{COARSE_STAGE, MID_STAGE, RURAL_STAGE};
use hextier::{
    FeatureTable, Polygon, SourceVariant, TwoStageConfig, run_two_stage,
};

/// Synthetic hexagon grid with three settlement profiles: sparse rural
/// cells, a mid-density band and a dense urban core. Each band varies
/// internally so the secondary stages have structure to find.
fn synthetic_grid(cells_per_band: usize) -> Result<FeatureTable, hextier::Error> {
    let n = cells_per_band * 3;
    let ids = (0..n).map(|i| format!("hex{i:03}")).collect();
    let mut table = FeatureTable::new(ids)?;

    let mut density = Vec::with_capacity(n);
    let mut age = Vec::with_capacity(n);
    let mut household = Vec::with_capacity(n);
    let mut area_res = Vec::with_capacity(n);
    let mut len_res = Vec::with_capacity(n);
    let mut len_ter = Vec::with_capacity(n);
    let mut geometry = Vec::with_capacity(n);

    for i in 0..n {
        let band = i / cells_per_band;
        let jitter = (i % cells_per_band) as f64 / cells_per_band as f64;
        let (d, a, h) = match band {
            0 => (15.0 + 40.0 * jitter, 47.0 + 3.0 * jitter, 2.0 + 0.2 * jitter),
            1 => (600.0 + 500.0 * jitter, 40.0 - 3.0 * jitter, 2.4 + 0.2 * jitter),
            _ => (4500.0 + 2000.0 * jitter, 33.0 - 4.0 * jitter, 2.9 + 0.3 * jitter),
        };
        density.push(d);
        age.push(a);
        household.push(h);
        area_res.push(0.02 + 0.15 * band as f64 + 0.05 * jitter);
        len_res.push(80.0 + 600.0 * band as f64 + 150.0 * jitter);
        len_ter.push(40.0 + 150.0 * band as f64 + 60.0 * jitter);

        let row = (i / 10) as f64;
        let col = (i % 10) as f64;
        geometry.push(Polygon::hexagon((-2.0 + col * 0.02, 53.0 + row * 0.02), 0.009));
    }

    table.insert_feature("population_density", density)?;
    table.insert_feature("avg_age", age)?;
    table.insert_feature("avg_household_size", household)?;
    table.insert_feature("area_residential", area_res)?;
    table.insert_feature("length_residential", len_res)?;
    table.insert_feature("length_tertiary", len_ter)?;
    table.set_geometry(geometry)?;
    Ok(table)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    println!("=== Two-stage settlement classification ===\n");

    let source = SourceVariant::Uniform;
    let out_dir = std::path::Path::new("outputs").join(source.data_dir());
    std::fs::create_dir_all(&out_dir)?;

    let mut table = synthetic_grid(20)?;
    println!(
        "Grid: {} cells at resolution h{}, {} feature columns",
        table.n_cells(),
        source.resolution(),
        table.feature_names().count()
    );

    let base = TwoStageConfig::default();
    let cfg = TwoStageConfig {
        coarse: base.coarse.with_density_report(
            out_dir.join("3_tier_post_analysis.csv"),
            &["red", "greenyellow", "dodgerblue"],
        ),
        mid: base.mid.with_density_report(
            out_dir.join("middle_sub_clustering_post_analysis.csv"),
            &["red", "maroon"],
        ),
        rural: base.rural.with_density_report(
            out_dir.join("rural_sub_clustering_post_analysis.csv"),
            &["greenyellow", "forestgreen", "orange"],
        ),
        seed: 42,
    };

    let outcome = run_two_stage(&mut table, &cfg)?;
    println!("\nFinal label column: {}", outcome.final_column);

    let finals = table.final_labels(&outcome.final_column)?;
    for label in 0..6 {
        let count = finals.iter().filter(|&&l| l == label).count();
        println!("  class {label}: {count} cells");
    }

    // Report the sub-clustering scores, the selection the study inspected.
    println!("\n{}", outcome.report.render(&[MID_STAGE, RURAL_STAGE]));
    if let Some(coarse) = outcome.report.get(COARSE_STAGE) {
        println!("Coarse silhouette: {:.4}", coarse.silhouette);
    }

    let palette: Vec<String> = ["red", "maroon", "dodgerblue", "greenyellow", "forestgreen", "orange"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let geojson_path = out_dir.join(source.label_snapshot_name());
    hextier::export::write_geojson(&table, &outcome.final_column, &palette, &geojson_path)?;
    println!("Labeled grid written to {}", geojson_path.display());

    Ok(())
}
