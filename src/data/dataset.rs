//! User-facing training dataset.
//!
//! This is the canonical entry point for the training API. Columns are
//! bound by name against the fixed schema in [`crate::features`]; an
//! identifier column, if the caller has one, is simply not passed in.

use crate::features::{FEATURE_NAMES, N_FEATURES};

/// A single named feature column.
///
/// Missing numeric values are represented as `f32::NAN`.
#[derive(Debug, Clone)]
pub struct FeatureColumn {
    name: String,
    values: Vec<f32>,
}

impl FeatureColumn {
    /// Create a column from a name and its values.
    pub fn new(name: impl Into<String>, values: Vec<f32>) -> Self {
        Self { name: name.into(), values }
    }

    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column values (one per row).
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Number of rows in this column.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Dataset construction/validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset has no rows")]
    Empty,

    #[error("required feature column missing: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("unknown column {name:?}: not part of the feature schema")]
    UnknownColumn { name: String },

    #[error("column {name:?} was provided more than once")]
    DuplicateColumn { name: String },

    #[error("inconsistent number of rows: column {name:?} has {got}, expected {expected}")]
    InconsistentRows {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("number of labels ({labels}) does not match number of rows ({rows})")]
    LabelLenMismatch { rows: usize, labels: usize },

    #[error("label at row {row} is {value}, expected 0 or 1")]
    NonBinaryLabel { row: usize, value: f32 },
}

/// A validated training dataset.
///
/// Holds the ten feature columns in canonical order plus binary labels.
/// Construction performs all schema validation, so a `Dataset` value is
/// always well-formed: every required column present, consistent row
/// counts, labels strictly in {0, 1}.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// Feature values in canonical column order, one `Vec` per feature.
    columns: Vec<Vec<f32>>,
    /// Binary labels (0.0 or 1.0), one per row.
    labels: Vec<f32>,
    n_rows: usize,
}

impl Dataset {
    /// Create a dataset from named feature columns and a label vector.
    ///
    /// Columns may arrive in any order; they are aligned by name against
    /// the canonical schema. Missing columns are reported together, by
    /// name. Labels must be exactly 0 or 1.
    pub fn new(features: Vec<FeatureColumn>, labels: Vec<f32>) -> Result<Self, DatasetError> {
        let n_rows = labels.len();
        if n_rows == 0 {
            return Err(DatasetError::Empty);
        }

        // Align by name, rejecting columns outside the schema.
        let mut slots: Vec<Option<Vec<f32>>> = (0..N_FEATURES).map(|_| None).collect();
        for col in features {
            let idx = FEATURE_NAMES
                .iter()
                .position(|&n| n == col.name())
                .ok_or_else(|| DatasetError::UnknownColumn { name: col.name.clone() })?;
            if col.len() != n_rows {
                return Err(DatasetError::InconsistentRows {
                    name: col.name,
                    expected: n_rows,
                    got: col.values.len(),
                });
            }
            if slots[idx].is_some() {
                return Err(DatasetError::DuplicateColumn { name: col.name });
            }
            slots[idx] = Some(col.values);
        }

        let missing: Vec<String> = slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .map(|(i, _)| FEATURE_NAMES[i].to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DatasetError::MissingColumns(missing));
        }

        for (row, &label) in labels.iter().enumerate() {
            if label != 0.0 && label != 1.0 {
                return Err(DatasetError::NonBinaryLabel { row, value: label });
            }
        }

        let columns: Vec<Vec<f32>> = slots.into_iter().flatten().collect();
        Ok(Self { columns, labels, n_rows })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Feature columns in canonical order.
    pub fn columns(&self) -> &[Vec<f32>] {
        &self.columns
    }

    /// One feature column by canonical index.
    pub fn column(&self, feature: usize) -> &[f32] {
        &self.columns[feature]
    }

    /// Binary labels.
    pub fn labels(&self) -> &[f32] {
        &self.labels
    }

    /// Fraction of positive labels.
    pub fn positive_rate(&self) -> f64 {
        let pos: f64 = self.labels.iter().map(|&l| l as f64).sum();
        pos / self.n_rows as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_columns(n_rows: usize) -> Vec<FeatureColumn> {
        FEATURE_NAMES
            .iter()
            .map(|&name| FeatureColumn::new(name, vec![0.5; n_rows]))
            .collect()
    }

    #[test]
    fn builds_from_all_columns() {
        let ds = Dataset::new(full_columns(4), vec![0.0, 1.0, 0.0, 1.0]).unwrap();
        assert_eq!(ds.n_rows(), 4);
        assert_eq!(ds.columns().len(), N_FEATURES);
        assert!((ds.positive_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn aligns_columns_by_name_not_position() {
        let mut cols = full_columns(2);
        // Give the age column distinctive values, then shuffle it to the back.
        let age_pos = cols.iter().position(|c| c.name() == "age").unwrap();
        let mut age = cols.remove(age_pos);
        age.values = vec![30.0, 60.0];
        cols.push(age);

        let ds = Dataset::new(cols, vec![0.0, 1.0]).unwrap();
        assert_eq!(ds.column(1), &[30.0, 60.0]);
    }

    #[test]
    fn missing_columns_reported_by_name() {
        let mut cols = full_columns(2);
        cols.retain(|c| c.name() != "MonthlyIncome" && c.name() != "DebtRatio");

        let err = Dataset::new(cols, vec![0.0, 1.0]).unwrap_err();
        match err {
            DatasetError::MissingColumns(names) => {
                assert_eq!(names, vec!["DebtRatio".to_string(), "MonthlyIncome".to_string()]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_column() {
        let mut cols = full_columns(2);
        cols.push(FeatureColumn::new("Unnamed: 0", vec![0.0, 1.0]));

        assert!(matches!(
            Dataset::new(cols, vec![0.0, 1.0]),
            Err(DatasetError::UnknownColumn { .. })
        ));
    }

    #[test]
    fn rejects_duplicate_column() {
        let mut cols = full_columns(2);
        cols.push(FeatureColumn::new("age", vec![30.0, 60.0]));

        let err = Dataset::new(cols, vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateColumn { name } if name == "age"));
    }

    #[test]
    fn rejects_non_binary_label() {
        let err = Dataset::new(full_columns(2), vec![0.0, 0.5]).unwrap_err();
        assert!(matches!(err, DatasetError::NonBinaryLabel { row: 1, .. }));
    }

    #[test]
    fn rejects_empty_dataset() {
        assert!(matches!(Dataset::new(vec![], vec![]), Err(DatasetError::Empty)));
    }

    #[test]
    fn rejects_row_count_mismatch() {
        let mut cols = full_columns(3);
        cols[2] = FeatureColumn::new(FEATURE_NAMES[2], vec![0.0; 2]);

        assert!(matches!(
            Dataset::new(cols, vec![0.0, 1.0, 0.0]),
            Err(DatasetError::InconsistentRows { .. })
        ));
    }
}
