//! Сохраненная модель и обработчик предсказаний поверх нее
//!
//! Артефакт - один JSON-файл: размерности и веса сети (запись burn) и
//! обученное состояние предобработки. Инференс использует только сохраненные параметры.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{argmax_rows, Classifier, MlpClassifier, NetworkState};
use crate::dataset::Table;
use crate::error::{PipelineError, Result};
use crate::preprocessing::Preprocessor;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub trained_at: DateTime<Utc>,
    pub preprocessor: Preprocessor,
    pub network: NetworkState,
}

impl ModelArtifact {
    pub fn new(preprocessor: Preprocessor, network: &MlpClassifier) -> Result<Self> {
        if preprocessor.input_dim() != network.input_dim() {
            return Err(PipelineError::Shape {
                expected: preprocessor.input_dim(),
                actual: network.input_dim(),
            });
        }
        Ok(Self {
            format_version: FORMAT_VERSION,
            trained_at: Utc::now(),
            preprocessor,
            network: network.to_state()?,
        })
    }

    /// Запись на диск; родительская директория создается при необходимости
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        tracing::info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::FileNotFound {
                what: "Model",
                path: path.to_path_buf(),
            },
            _ => PipelineError::ModelLoad(format!("{}: {}", path.display(), e)),
        })?;

        let artifact: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| PipelineError::ModelLoad(format!("{}: {}", path.display(), e)))?;

        if artifact.format_version != FORMAT_VERSION {
            return Err(PipelineError::ModelLoad(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version, FORMAT_VERSION
            )));
        }
        artifact.preprocessor.validate()?;
        if artifact.preprocessor.input_dim() != artifact.network.input_dim {
            return Err(PipelineError::ModelLoad(format!(
                "network expects {} features, preprocessing produces {}",
                artifact.network.input_dim,
                artifact.preprocessor.input_dim()
            )));
        }
        MlpClassifier::from_state(artifact.network.clone())?;

        tracing::info!(
            "Model loaded from {} (trained at {}, {} features, {} classes)",
            path.display(),
            artifact.trained_at,
            artifact.network.input_dim,
            artifact.network.n_classes
        );
        Ok(artifact)
    }

    pub fn into_predictor(self) -> Result<PricePredictor> {
        let network = MlpClassifier::from_state(self.network)?;
        PricePredictor::new(self.preprocessor, network)
    }
}

/// Обработчик предсказаний: подготовка сырых строк + классификатор.
/// Только чтение после создания; клонирование дешевое.
#[derive(Clone)]
pub struct PricePredictor {
    preprocessor: Arc<Preprocessor>,
    classifier: Arc<dyn Classifier>,
}

impl PricePredictor {
    pub fn new(preprocessor: Preprocessor, classifier: impl Classifier + 'static) -> Result<Self> {
        if preprocessor.input_dim() != classifier.input_dim() {
            return Err(PipelineError::Shape {
                expected: preprocessor.input_dim(),
                actual: classifier.input_dim(),
            });
        }
        Ok(Self {
            preprocessor: Arc::new(preprocessor),
            classifier: Arc::new(classifier),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        ModelArtifact::load(path)?.into_predictor()
    }

    pub fn n_classes(&self) -> usize {
        self.classifier.n_classes()
    }

    pub fn feature_names(&self) -> &[String] {
        self.preprocessor.feature_names()
    }

    pub fn predict_proba(&self, table: &Table) -> Result<Array2<f64>> {
        let features = self.preprocessor.transform(table)?;
        self.classifier.predict_proba(&features)
    }

    pub fn predict_group(&self, table: &Table) -> Result<Vec<usize>> {
        let proba = self.predict_proba(table)?;
        Ok(argmax_rows(&proba).to_vec())
    }

    /// Класс и вектор вероятностей для таблицы ровно из одной строки
    pub fn predict_single(&self, table: &Table) -> Result<(usize, Vec<f64>)> {
        if table.nrows() != 1 {
            return Err(PipelineError::Data(format!(
                "Expected a single row, got {}",
                table.nrows()
            )));
        }
        let features = self.preprocessor.transform(table)?;
        let class = self.classifier.predict_single(features.row(0))?;
        let proba = self.classifier.predict_proba(&features)?;
        Ok((class, proba.row(0).to_vec()))
    }
}
