use std::fmt;

use crate::ProphetError;

/// Dense offline × online weight matrix, stored row-major by offline vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl WeightMatrix {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        }
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, ProphetError> {
        let row_count = rows.len();
        let col_count = rows.first().map(Vec::len).unwrap_or(0);
        if row_count == 0 || col_count == 0 {
            return Err(ProphetError::InvalidInput(
                "weight matrix must have at least one row and one column".to_string(),
            ));
        }
        let mut values = Vec::with_capacity(row_count * col_count);
        for (offline, row) in rows.into_iter().enumerate() {
            if row.len() != col_count {
                return Err(ProphetError::InvalidInput(format!(
                    "row {offline} has {} columns, expected {col_count}",
                    row.len()
                )));
            }
            for (online, value) in row.into_iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(ProphetError::InvalidSample {
                        offline,
                        online,
                        value,
                    });
                }
                values.push(value);
            }
        }
        Ok(Self {
            rows: row_count,
            cols: col_count,
            values,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, offline: usize, online: usize) -> f64 {
        self.values[offline * self.cols + online]
    }

    #[inline]
    pub fn set(&mut self, offline: usize, online: usize, value: f64) {
        self.values[offline * self.cols + online] = value;
    }

    pub fn row(&self, offline: usize) -> &[f64] {
        let start = offline * self.cols;
        &self.values[start..start + self.cols]
    }

    /// Weights seen by one online vertex, indexed by offline vertex.
    pub fn column(&self, online: usize) -> Vec<f64> {
        (0..self.rows).map(|offline| self.get(offline, online)).collect()
    }

    pub fn max_value(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

impl fmt::Display for WeightMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for offline in 0..self.rows {
            let line = self
                .row(offline)
                .iter()
                .map(|value| format!("{value:.6}"))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "[{offline}] {line}")?;
        }
        Ok(())
    }
}
