//! Feature engineering для модели цены устройства

#![allow(non_snake_case)]

use ndarray::{concatenate, Array2, Axis};

use crate::error::{PipelineError, Result};
use crate::types::{PIXEL_DENSITY_COLUMN, PIXEL_HEIGHT_COLUMN, PIXEL_WIDTH_COLUMN};

pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Дописывает колонку `px_density = px_width * px_height` в конец матрицы.
    /// Состояния нет, поэтому одинаково для обучения и инференса.
    pub fn add_pixel_density(
        columns: &[String],
        X: &Array2<f64>,
    ) -> Result<(Vec<String>, Array2<f64>)> {
        if columns.len() != X.ncols() {
            return Err(PipelineError::Shape {
                expected: columns.len(),
                actual: X.ncols(),
            });
        }
        if columns.iter().any(|c| c == PIXEL_DENSITY_COLUMN) {
            return Err(PipelineError::Data(format!(
                "Column '{}' is derived and must not be supplied",
                PIXEL_DENSITY_COLUMN
            )));
        }

        let width = Self::require(columns, PIXEL_WIDTH_COLUMN)?;
        let height = Self::require(columns, PIXEL_HEIGHT_COLUMN)?;

        let density = (&X.column(width) * &X.column(height)).insert_axis(Axis(1));
        let features = concatenate(Axis(1), &[X.view(), density.view()])
            .map_err(|e| PipelineError::Data(format!("Failed to append {}: {}", PIXEL_DENSITY_COLUMN, e)))?;

        let mut names = columns.to_vec();
        names.push(PIXEL_DENSITY_COLUMN.to_string());

        Ok((names, features))
    }

    fn require(columns: &[String], name: &str) -> Result<usize> {
        columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PipelineError::Data(format!("Missing required column '{}'", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_density_is_exact_product() {
        let columns = cols(&["px_height", "ram", "px_width"]);
        let X = array![
            [0.0, 512.0, 1920.0],
            [1080.0, 1024.0, 0.0],
            [1279.0, 2048.0, 1919.0],
            [-3.5, 1.0, 2.0]
        ];
        let (names, out) = FeatureEngineer::add_pixel_density(&columns, &X).unwrap();

        assert_eq!(names.last().map(String::as_str), Some("px_density"));
        assert_eq!(out.ncols(), 4);
        for i in 0..X.nrows() {
            assert_eq!(out[[i, 3]], X[[i, 2]] * X[[i, 0]]);
            assert_eq!(out.row(i).slice(ndarray::s![..3]), X.row(i));
        }
    }

    #[test]
    fn test_missing_source_column() {
        let err = FeatureEngineer::add_pixel_density(&cols(&["px_width"]), &array![[1.0]]).unwrap_err();
        assert!(matches!(err, PipelineError::Data(msg) if msg.contains("px_height")));
    }

    #[test]
    fn test_supplied_density_rejected() {
        let columns = cols(&["px_width", "px_height", "px_density"]);
        let result = FeatureEngineer::add_pixel_density(&columns, &array![[1.0, 2.0, 2.0]]);
        assert!(result.is_err());
    }
}
