//! Модуль предобработки данных
//!
//! Порядок: схема -> импутация -> производный признак -> стандартизация.
//! Все параметры подбираются только на обучающей таблице.

pub mod feature_engineering;
pub mod imputation;
pub mod normalization;
pub mod schema;

pub use feature_engineering::FeatureEngineer;
pub use imputation::MeanImputer;
pub use normalization::StandardScaler;
pub use schema::FeatureSchema;

use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::dataset::Table;
use crate::error::{PipelineError, Result};
use crate::types::LABEL_COLUMN;

/// Обученное состояние предобработки; сохраняется вместе с моделью
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preprocessor {
    schema: FeatureSchema,
    imputer: MeanImputer,
    scaler: StandardScaler,
    feature_names: Vec<String>,
}

/// Результат подготовки обучающей и тестовой таблиц
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x_train: Array2<f64>,
    pub y_train: Array1<usize>,
    pub x_test: Array2<f64>,
    pub preprocessor: Preprocessor,
}

impl Preprocessor {
    /// Подбор импьютера и скейлера на обучающей таблице
    pub fn fit(train: &Table) -> Result<(Self, Array2<f64>, Array1<usize>)> {
        let labels = train
            .column(LABEL_COLUMN)
            .ok_or_else(|| PipelineError::Data(format!("Missing label column '{}'", LABEL_COLUMN)))?;
        let labels = extract_labels(labels.iter().copied())?;

        let schema = FeatureSchema::from_table(train);
        if schema.is_empty() {
            return Err(PipelineError::Data("No feature columns".to_string()));
        }
        let raw = schema.align(train)?;

        let mut imputer = MeanImputer::new();
        let imputed = imputer.fit_transform(&raw, schema.columns())?;

        let (feature_names, engineered) =
            FeatureEngineer::add_pixel_density(schema.columns(), &imputed)?;

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&engineered)?;

        tracing::info!(
            "Preprocessor fitted on {} rows, {} features",
            scaled.nrows(),
            feature_names.len()
        );

        Ok((
            Self {
                schema,
                imputer,
                scaler,
                feature_names,
            },
            scaled,
            labels,
        ))
    }

    /// Применение уже подобранных параметров; ничего не переобучается
    pub fn transform(&self, table: &Table) -> Result<Array2<f64>> {
        let raw = self.schema.align(table)?;
        let imputed = self.imputer.transform(&raw)?;
        let (_, engineered) = FeatureEngineer::add_pixel_density(self.schema.columns(), &imputed)?;
        self.scaler.transform(&engineered)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Имена признаков на входе сети, включая производный
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn input_dim(&self) -> usize {
        self.feature_names.len()
    }

    /// Проверка согласованности после десериализации
    pub fn validate(&self) -> Result<()> {
        let expected = self.schema.len() + 1;
        let imputed = self.imputer.means().map(|m| m.len());
        let scaled = self.scaler.n_features();

        if self.feature_names.len() != expected
            || imputed != Some(self.schema.len())
            || scaled != Some(expected)
        {
            return Err(PipelineError::ModelLoad(
                "Preprocessing state is inconsistent with the feature schema".to_string(),
            ));
        }
        Ok(())
    }
}

/// Подготовка обучающей и тестовой таблиц одним набором параметров
pub fn prepare(train: &Table, test: &Table) -> Result<PreparedData> {
    let (preprocessor, x_train, y_train) = Preprocessor::fit(train)?;
    let x_test = preprocessor.transform(test)?;

    Ok(PreparedData {
        x_train,
        y_train,
        x_test,
        preprocessor,
    })
}

pub fn prepare_files(train_path: &Path, test_path: &Path) -> Result<PreparedData> {
    let train = Table::from_csv_path(train_path)?;
    let test = Table::from_csv_path(test_path)?;
    tracing::info!(
        "Loaded {} training rows from {}, {} test rows from {}",
        train.nrows(),
        train_path.display(),
        test.nrows(),
        test_path.display()
    );
    prepare(&train, &test)
}

/// Верхняя граница номера класса
const MAX_CLASS_LABEL: f64 = u16::MAX as f64;

fn extract_labels(values: impl Iterator<Item = f64>) -> Result<Array1<usize>> {
    values
        .enumerate()
        .map(|(row, v)| {
            if v.is_finite() && (0.0..=MAX_CLASS_LABEL).contains(&v) && v.fract() == 0.0 {
                Ok(v as usize)
            } else {
                Err(PipelineError::Data(format!(
                    "Row {}: '{}' must be an integer class in 0..={}, got {}",
                    row + 1,
                    LABEL_COLUMN,
                    MAX_CLASS_LABEL,
                    v
                )))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Axis};

    fn table(columns: &[&str], values: Array2<f64>) -> Table {
        Table::new(columns.iter().map(|s| s.to_string()).collect(), values).unwrap()
    }

    fn train_table() -> Table {
        table(
            &["px_width", "px_height", "ram", "price_range"],
            array![
                [100.0, 10.0, 512.0, 0.0],
                [200.0, f64::NAN, 1024.0, 1.0],
                [f64::NAN, 30.0, 2048.0, 2.0],
                [400.0, 40.0, f64::NAN, 3.0]
            ],
        )
    }

    #[test]
    fn test_prepare_pipeline() {
        let test = table(
            &["ram", "px_height", "px_width"],
            array![[1024.0, 20.0, 300.0], [f64::NAN, f64::NAN, f64::NAN]],
        );
        let prepared = prepare(&train_table(), &test).unwrap();

        assert_eq!(prepared.y_train, array![0, 1, 2, 3]);
        assert_eq!(prepared.x_train.dim(), (4, 4));
        assert_eq!(prepared.x_test.dim(), (2, 4));
        assert_eq!(
            prepared.preprocessor.feature_names(),
            &["px_width", "px_height", "ram", "px_density"]
        );

        // Обучающие признаки стандартизованы
        let mean = prepared.x_train.mean_axis(Axis(0)).unwrap();
        let std = prepared.x_train.std_axis(Axis(0), 0.0);
        for j in 0..4 {
            assert!(mean[j].abs() < 1e-9);
            assert!((std[j] - 1.0).abs() < 1e-9);
        }

        // Полностью пустая тестовая строка заполняется обучающими средними,
        // значит ram и ширина попадают ровно в 0 после стандартизации
        assert!(prepared.x_test[[1, 0]].abs() < 1e-9);
        assert!(prepared.x_test[[1, 2]].abs() < 1e-9);
    }

    #[test]
    fn test_transform_matches_fit_output() {
        let train = train_table();
        let (preprocessor, x_train, _) = Preprocessor::fit(&train).unwrap();
        assert_eq!(preprocessor.transform(&train).unwrap(), x_train);
        preprocessor.validate().unwrap();
    }

    #[test]
    fn test_missing_label_column() {
        let train = table(&["px_width", "px_height"], array![[1.0, 2.0]]);
        let err = Preprocessor::fit(&train).unwrap_err();
        assert!(matches!(err, PipelineError::Data(msg) if msg.contains("price_range")));
    }

    #[test]
    fn test_fractional_label_rejected() {
        let train = table(
            &["px_width", "px_height", "price_range"],
            array![[1.0, 2.0, 0.5]],
        );
        assert!(Preprocessor::fit(&train).is_err());
    }

    #[test]
    fn test_huge_label_rejected() {
        let train = table(
            &["px_width", "px_height", "price_range"],
            array![[1.0, 2.0, 0.0], [3.0, 4.0, 1e30]],
        );
        let err = Preprocessor::fit(&train).unwrap_err();
        assert!(matches!(err, PipelineError::Data(msg) if msg.contains("Row 2")));

        let labels = extract_labels([0.0, 3.0, MAX_CLASS_LABEL].into_iter()).unwrap();
        assert_eq!(labels.to_vec(), vec![0, 3, u16::MAX as usize]);
        assert!(extract_labels([MAX_CLASS_LABEL + 1.0].into_iter()).is_err());
    }

    #[test]
    fn test_test_table_must_match_schema() {
        let test = table(&["px_width", "px_height"], array![[1.0, 2.0]]);
        let err = prepare(&train_table(), &test).unwrap_err();
        assert!(matches!(err, PipelineError::Data(msg) if msg.contains("missing: [ram]")));
    }
}
