//! Заполнение пропусков средним по колонке

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeanImputer {
    means: Option<Array1<f64>>,
}

impl MeanImputer {
    pub fn new() -> Self {
        Self { means: None }
    }

    /// Средние считаются только по наблюдаемым значениям (NaN пропускаются).
    /// `columns` нужны лишь для сообщения об ошибке.
    pub fn fit(&mut self, X: &Array2<f64>, columns: &[String]) -> Result<()> {
        if X.nrows() == 0 {
            return Err(PipelineError::Data("Empty dataset".to_string()));
        }

        let mut means = Array1::zeros(X.ncols());
        for (j, column) in X.axis_iter(Axis(1)).enumerate() {
            let (sum, count) = column
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));

            if count == 0 {
                let name = columns.get(j).map(String::as_str).unwrap_or("?");
                return Err(PipelineError::Data(format!(
                    "Column '{}' has no observed values, mean is undefined",
                    name
                )));
            }
            means[j] = sum / count as f64;
        }

        self.means = Some(means);
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let means = self
            .means
            .as_ref()
            .ok_or_else(|| PipelineError::Data("Imputer not fitted".to_string()))?;

        if X.ncols() != means.len() {
            return Err(PipelineError::Shape {
                expected: means.len(),
                actual: X.ncols(),
            });
        }

        let mut imputed = X.clone();
        for mut row in imputed.rows_mut() {
            for (j, val) in row.iter_mut().enumerate() {
                if val.is_nan() {
                    *val = means[j];
                }
            }
        }

        Ok(imputed)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>, columns: &[String]) -> Result<Array2<f64>> {
        self.fit(X, columns)?;
        self.transform(X)
    }

    pub fn means(&self) -> Option<&Array1<f64>> {
        self.means.as_ref()
    }
}

impl Default for MeanImputer {
    fn default() -> Self {
        Self::new()
    }
}
