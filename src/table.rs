use std::collections::{BTreeMap, HashMap, HashSet};

use crate::Matrix;
use crate::error::{Error, Result};
use crate::geometry::Polygon;

/// Column-oriented table with one row per spatial cell.
///
/// Holds the cell identifiers, an optional polygon per cell, named numeric
/// feature columns and named integer label columns. Label entries stay
/// `None` until a clustering stage or the final composition fills them in.
///
/// The table is the single mutable structure passed through the pipeline:
/// each stage appends a label column or reads a row subset, and the final
/// composition folds intermediate label columns into one.
#[derive(Clone, Debug, Default)]
pub struct FeatureTable {
    ids: Vec<String>,
    geometry: Vec<Option<Polygon>>,
    features: BTreeMap<String, Vec<f64>>,
    labels: BTreeMap<String, Vec<Option<i64>>>,
}

impl FeatureTable {
    /// Cell identifiers must be unique across the table.
    pub fn new(ids: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(ids.len());
        for id in &ids {
            if !seen.insert(id.as_str()) {
                return Err(Error::InvalidInput(format!("duplicate cell id '{id}'")));
            }
        }
        let n = ids.len();
        Ok(Self {
            ids,
            geometry: vec![None; n],
            features: BTreeMap::new(),
            labels: BTreeMap::new(),
        })
    }

    pub fn n_cells(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn insert_feature(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.ids.len() {
            return Err(Error::InvalidInput(format!(
                "column '{}' has {} values for {} cells",
                name,
                values.len(),
                self.ids.len()
            )));
        }
        self.features.insert(name.to_string(), values);
        Ok(())
    }

    pub fn feature(&self, name: &str) -> Option<&[f64]> {
        self.features.get(name).map(Vec::as_slice)
    }

    pub fn feature_names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    pub fn set_geometry(&mut self, geometry: Vec<Polygon>) -> Result<()> {
        if geometry.len() != self.ids.len() {
            return Err(Error::InvalidInput(format!(
                "{} geometries for {} cells",
                geometry.len(),
                self.ids.len()
            )));
        }
        self.geometry = geometry.into_iter().map(Some).collect();
        Ok(())
    }

    pub fn geometry(&self, row: usize) -> Option<&Polygon> {
        self.geometry.get(row).and_then(Option::as_ref)
    }

    /// Extract the named columns as a dense row-major matrix, one row per
    /// cell in table order. Fails when a column is missing or holds a
    /// non-finite value, since standardization and distance computation are
    /// undefined over NaN or infinity.
    pub fn matrix(&self, columns: &[String]) -> Result<Matrix> {
        let mut data = Vec::with_capacity(self.ids.len() * columns.len());
        let mut cols = Vec::with_capacity(columns.len());
        for name in columns {
            let values = self.features.get(name).ok_or_else(|| {
                Error::InvalidInput(format!("required column '{name}' is missing"))
            })?;
            for (row, &v) in values.iter().enumerate() {
                if !v.is_finite() {
                    return Err(Error::InvalidInput(format!(
                        "column '{}' has non-finite value at cell '{}'",
                        name, self.ids[row]
                    )));
                }
            }
            cols.push(values.as_slice());
        }
        for row in 0..self.ids.len() {
            for col in &cols {
                data.push(col[row]);
            }
        }
        Matrix::from_shape_vec((self.ids.len(), columns.len()), data)
            .map_err(|e| Error::InvalidInput(e.to_string()))
    }

    pub fn set_labels(&mut self, column: &str, values: Vec<Option<i64>>) -> Result<()> {
        if values.len() != self.ids.len() {
            return Err(Error::InvalidInput(format!(
                "label column '{}' has {} values for {} cells",
                column,
                values.len(),
                self.ids.len()
            )));
        }
        self.labels.insert(column.to_string(), values);
        Ok(())
    }

    /// Add an all-unset label column, to be filled by composition.
    pub fn new_label_column(&mut self, column: &str) {
        self.labels
            .insert(column.to_string(), vec![None; self.ids.len()]);
    }

    pub fn labels(&self, column: &str) -> Option<&[Option<i64>]> {
        self.labels.get(column).map(Vec::as_slice)
    }

    pub fn drop_label_column(&mut self, column: &str) {
        self.labels.remove(column);
    }

    /// Apply `f` to every set entry of a label column. Used for the
    /// provisional relabel and the rural offset.
    pub fn map_labels(&mut self, column: &str, f: impl Fn(i64) -> i64) -> Result<()> {
        let values = self
            .labels
            .get_mut(column)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{column}'")))?;
        for v in values.iter_mut() {
            if let Some(x) = *v {
                *v = Some(f(x));
            }
        }
        Ok(())
    }

    /// Sorted distinct set values of a label column.
    pub fn distinct_labels(&self, column: &str) -> Result<Vec<i64>> {
        let values = self
            .labels
            .get(column)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{column}'")))?;
        let mut distinct: Vec<i64> = values.iter().filter_map(|v| *v).collect();
        distinct.sort_unstable();
        distinct.dedup();
        Ok(distinct)
    }

    /// Snapshot of the rows whose label equals `value`. Carries all feature
    /// columns and geometry; label columns are not carried, the subset gets
    /// its own from the secondary clustering stage.
    pub fn filter_by_label(&self, column: &str, value: i64) -> Result<FeatureTable> {
        let labels = self
            .labels
            .get(column)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{column}'")))?;
        let rows: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, v)| **v == Some(value))
            .map(|(i, _)| i)
            .collect();

        let mut subset = FeatureTable {
            ids: rows.iter().map(|&i| self.ids[i].clone()).collect(),
            geometry: rows.iter().map(|&i| self.geometry[i].clone()).collect(),
            features: BTreeMap::new(),
            labels: BTreeMap::new(),
        };
        for (name, values) in &self.features {
            subset.features.insert(
                name.clone(),
                rows.iter().map(|&i| values[i]).collect(),
            );
        }
        Ok(subset)
    }

    /// Fill unset entries of `dst` from another label column of the same
    /// table. Set entries keep their value.
    pub fn fill_label_from(&mut self, dst: &str, src: &str) -> Result<()> {
        let src_values = self
            .labels
            .get(src)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{src}'")))?
            .clone();
        let dst_values = self
            .labels
            .get_mut(dst)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{dst}'")))?;
        for (d, s) in dst_values.iter_mut().zip(src_values) {
            if d.is_none() {
                *d = s;
            }
        }
        Ok(())
    }

    /// Fill `dst` from a label column of another table, matched by cell id.
    /// A cell that already holds a value and would receive a second one is a
    /// composition bug and fails with `MergeConsistency`.
    pub fn fill_label_from_table(
        &mut self,
        dst: &str,
        other: &FeatureTable,
        src: &str,
    ) -> Result<()> {
        let src_values = other
            .labels
            .get(src)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{src}'")))?;
        let index: HashMap<&str, usize> = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let dst_values = self
            .labels
            .get_mut(dst)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{dst}'")))?;
        for (other_row, value) in src_values.iter().enumerate() {
            let Some(value) = value else { continue };
            let id = other.ids[other_row].as_str();
            let Some(&row) = index.get(id) else {
                return Err(Error::MergeConsistency(format!(
                    "cell '{id}' is not present in the target table"
                )));
            };
            if dst_values[row].is_some() {
                return Err(Error::MergeConsistency(format!(
                    "cell '{id}' would receive a second label"
                )));
            }
            dst_values[row] = Some(*value);
        }
        Ok(())
    }

    /// Read a label column that composition has completed: every entry must
    /// be set, anything else is a `MergeConsistency` violation.
    pub fn final_labels(&self, column: &str) -> Result<Vec<i64>> {
        let values = self
            .labels
            .get(column)
            .ok_or_else(|| Error::InvalidInput(format!("no label column '{column}'")))?;
        values
            .iter()
            .enumerate()
            .map(|(row, v)| {
                v.ok_or_else(|| {
                    Error::MergeConsistency(format!(
                        "cell '{}' ended composition with no label",
                        self.ids[row]
                    ))
                })
            })
            .collect()
    }

    /// Outer merge by cell id, zero-filling features a side is missing.
    /// Geometry is taken from whichever table has it. Label columns are not
    /// merged; merging happens before any clustering stage runs.
    pub fn merge_zero_fill(&self, other: &FeatureTable) -> Result<FeatureTable> {
        let mut ids = self.ids.clone();
        let index: HashSet<&str> = self.ids.iter().map(String::as_str).collect();
        for id in &other.ids {
            if !index.contains(id.as_str()) {
                ids.push(id.clone());
            }
        }
        let mut merged = FeatureTable::new(ids)?;

        let row_of = |table: &FeatureTable, id: &str| -> Option<usize> {
            table.ids.iter().position(|x| x == id)
        };
        merged.geometry = merged
            .ids
            .iter()
            .map(|id| {
                row_of(self, id)
                    .and_then(|r| self.geometry[r].clone())
                    .or_else(|| row_of(other, id).and_then(|r| other.geometry[r].clone()))
            })
            .collect();

        let mut names: Vec<&String> = self.features.keys().chain(other.features.keys()).collect();
        names.sort();
        names.dedup();
        for name in names {
            let values: Vec<f64> = merged
                .ids
                .iter()
                .map(|id| {
                    row_of(self, id)
                        .and_then(|r| self.features.get(name).map(|c| c[r]))
                        .or_else(|| row_of(other, id).and_then(|r| other.features.get(name).map(|c| c[r])))
                        .unwrap_or(0.0)
                })
                .collect();
            merged.features.insert(name.clone(), values);
        }
        Ok(merged)
    }
}
