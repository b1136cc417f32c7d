use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A cell polygon: a closed exterior ring of (lon, lat) pairs.
///
/// Geometry is carried through the pipeline for output and merge keys only;
/// it is never clustering input.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    exterior: Vec<(f64, f64)>,
}

impl Polygon {
    /// The ring must be closed (first point equals last) and contain at
    /// least four points including the closing one.
    pub fn new(exterior: Vec<(f64, f64)>) -> Result<Self> {
        if exterior.len() < 4 {
            return Err(Error::InvalidInput(format!(
                "polygon ring needs at least 4 points, got {}",
                exterior.len()
            )));
        }
        if exterior.first() != exterior.last() {
            return Err(Error::InvalidInput(
                "polygon ring must be closed (first point must equal last)".to_string(),
            ));
        }
        Ok(Self { exterior })
    }

    /// Regular hexagon centred on `(lon, lat)`, the shape of one grid cell.
    pub fn hexagon(center: (f64, f64), radius: f64) -> Self {
        let (cx, cy) = center;
        let mut ring: Vec<(f64, f64)> = (0..6)
            .map(|i| {
                let angle = std::f64::consts::PI / 3.0 * i as f64;
                (cx + radius * angle.cos(), cy + radius * angle.sin())
            })
            .collect();
        ring.push(ring[0]);
        Self { exterior: ring }
    }

    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.exterior
    }

    /// GeoJSON `Polygon` coordinates: a list of rings, each a list of
    /// [lon, lat] positions.
    pub fn geojson_coordinates(&self) -> Vec<Vec<[f64; 2]>> {
        vec![self.exterior.iter().map(|&(x, y)| [x, y]).collect()]
    }
}
