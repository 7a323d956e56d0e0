//! Стандартизация признаков

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Array1<f64>>,
    std: Option<Array1<f64>>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            std: None,
        }
    }

    pub fn fit(&mut self, X: &Array2<f64>) -> Result<()> {
        if X.nrows() == 0 {
            return Err(PipelineError::Data("Empty dataset".to_string()));
        }

        // Среднее и стандартное отклонение (ddof = 0) по каждому признаку
        let mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| PipelineError::Data("Failed to compute mean".to_string()))?;
        let mut std = X.std_axis(Axis(0), 0.0);

        // Избегаем деления на ноль
        for val in std.iter_mut() {
            if *val < 1e-10 {
                *val = 1.0;
            }
        }

        self.mean = Some(mean);
        self.std = Some(std);
        Ok(())
    }

    pub fn transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        let (mean, std) = match (&self.mean, &self.std) {
            (Some(mean), Some(std)) => (mean, std),
            _ => return Err(PipelineError::Data("Scaler not fitted".to_string())),
        };

        if X.ncols() != mean.len() {
            return Err(PipelineError::Shape {
                expected: mean.len(),
                actual: X.ncols(),
            });
        }

        // Нормализация: (X - mean) / std
        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - mean[i]) / std[i];
            }
        }

        Ok(normalized)
    }

    pub fn fit_transform(&mut self, X: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(X)?;
        self.transform(X)
    }

    pub fn n_features(&self) -> Option<usize> {
        self.mean.as_ref().map(|m| m.len())
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
    fn test_training_columns_standardized() {
        let X = array![
            [1.0, 100.0, 5.0],
            [2.0, 300.0, 5.0],
            [3.0, 200.0, 5.0],
            [10.0, 0.0, 5.0]
        ];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&X).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        let std = scaled.std_axis(Axis(0), 0.0);
        for j in 0..2 {
            assert!(mean[j].abs() < 1e-9, "column {} mean {}", j, mean[j]);
            assert!((std[j] - 1.0).abs() < 1e-9, "column {} std {}", j, std[j]);
        }
        // Константный признак не делится на ноль
        assert!(scaled.column(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_test_split_uses_training_parameters() {
        let train = array![[0.0], [2.0]];
        let test = array![[4.0], [4.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&train).unwrap();

        // mean = 1, std = 1 -> (4 - 1) / 1
        assert_eq!(scaler.transform(&test).unwrap(), array![[3.0], [3.0]]);
    }

    #[test]
    fn test_width_mismatch() {
        let mut scaler = StandardScaler::new();
        scaler.fit(&array![[1.0, 2.0]]).unwrap();
        let err = scaler.transform(&array![[1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Shape { expected: 2, actual: 1 }));
    }
}
