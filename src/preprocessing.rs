use ndarray::Axis;

use crate::error::{Error, Result};
use crate::{Matrix, Vector};

/// Rescales each column to zero mean and unit variance.
///
/// Standardization is a required step before clustering: without it a
/// large-scale feature such as population density dominates the Euclidean
/// distance over small-scale ones such as average household size.
pub struct StandardScaler {
    mean: Option<Vector>,
    std: Option<Vector>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self { mean: None, std: None }
    }

    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        if data.nrows() == 0 {
            return Err(Error::InvalidInput(
                "cannot standardize an empty matrix".to_string(),
            ));
        }
        let mean = data
            .mean_axis(Axis(0))
            .ok_or_else(|| Error::InvalidInput("failed to compute column means".to_string()))?;
        let std = data.std_axis(Axis(0), 0.0);
        if let Some(col) = std.iter().position(|&s| s == 0.0) {
            return Err(Error::InvalidInput(format!(
                "column {col} has zero variance and cannot be standardized"
            )));
        }

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("scaler not fitted, call fit() first".to_string()))?;
        let std = self
            .std
            .as_ref()
            .ok_or_else(|| Error::InvalidInput("scaler not fitted, call fit() first".to_string()))?;

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(Axis(0)) {
            row -= mean;
            row /= std;
        }
        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zero_mean_unit_variance() {
        let data = array![[1.0, 200.0], [3.0, 400.0], [5.0, 600.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&data).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        let std = scaled.std_axis(Axis(0), 0.0);
        for &m in mean.iter() {
            assert!(m.abs() < 1e-10);
        }
        for &s in std.iter() {
            assert!((s - 1.0).abs() < 1e-10);
        }
    }

    #[test]
    fn test_standardization_is_idempotent() {
        let data = array![[10.0, 0.1], [500.0, 0.5], [1000.0, 0.2], [12.0, 0.9]];
        let once = StandardScaler::new().fit_transform(&data).unwrap();
        let twice = StandardScaler::new().fit_transform(&once).unwrap();

        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-10);
        }
    }

    #[test]
    fn test_zero_variance_column_rejected() {
        let data = array![[1.0, 7.0], [2.0, 7.0], [3.0, 7.0]];
        let mut scaler = StandardScaler::new();
        assert!(matches!(scaler.fit(&data), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let data = array![[1.0], [2.0]];
        let scaler = StandardScaler::new();
        assert!(scaler.transform(&data).is_err());
    }
}
