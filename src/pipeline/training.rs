//! Обучение: подготовка -> валидационный сплит -> обучение -> оценка -> сохранение

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use linfa::DatasetBase;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};
use crate::models::{Classifier, MlpClassifier, ModelArtifact, TrainConfig};
use crate::preprocessing::prepare_files;
use crate::types::{Evaluation, TrainingHistory};

/// Фиксированные параметры запуска обучения
#[derive(Debug, Clone)]
pub struct TrainingPlan {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub model_path: PathBuf,
    pub validation_fraction: f32,
    pub split_seed: u64,
    pub config: TrainConfig,
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            train_path: PathBuf::from("data/train - train.csv"),
            test_path: PathBuf::from("data/test - test.csv"),
            model_path: PathBuf::from(crate::config::DEFAULT_MODEL_PATH),
            validation_fraction: 0.2,
            split_seed: 42,
            config: TrainConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history: TrainingHistory,
    pub evaluation: Evaluation,
    pub model_path: PathBuf,
    pub history_path: PathBuf,
}

pub fn run(plan: &TrainingPlan) -> Result<TrainingReport> {
    let prepared = prepare_files(&plan.train_path, &plan.test_path)?;
    tracing::info!(
        "Prepared {} training rows and {} test rows with {} features",
        prepared.x_train.nrows(),
        prepared.x_test.nrows(),
        prepared.x_train.ncols()
    );

    let n_classes = prepared
        .y_train
        .iter()
        .max()
        .and_then(|max| max.checked_add(1))
        .ok_or_else(|| PipelineError::Training("No class labels in training data".to_string()))?;
    let (train, valid) = split_validation(
        prepared.x_train,
        prepared.y_train,
        plan.validation_fraction,
        plan.split_seed,
    )?;

    let mut classifier = MlpClassifier::new(train.records.ncols(), n_classes, plan.config.seed)?;
    tracing::info!(
        "Training on {} rows, validating on {} rows, {} classes",
        train.records.nrows(),
        valid.records.nrows(),
        n_classes
    );
    let history = classifier.train(
        &train.records,
        &train.targets,
        Some((&valid.records, &valid.targets)),
        &plan.config,
    )?;

    tracing::info!("Evaluating model on validation data");
    let evaluation = classifier.evaluate(&valid.records, &valid.targets)?;

    let history_path = history_path_for(&plan.model_path);
    let artifact = ModelArtifact::new(prepared.preprocessor, &classifier)?;
    artifact.save(&plan.model_path)?;
    write_history(&history, &history_path)?;

    Ok(TrainingReport {
        history,
        evaluation,
        model_path: plan.model_path.clone(),
        history_path,
    })
}

/// Признаки и одномерный вектор классов
pub type LabeledSplit = DatasetBase<Array2<f64>, Array1<usize>>;

/// Перемешивание с фиксированным seed и отделение доли строк под валидацию
pub fn split_validation(
    features: Array2<f64>,
    labels: Array1<usize>,
    validation_fraction: f32,
    seed: u64,
) -> Result<(LabeledSplit, LabeledSplit)> {
    if !(0.0..1.0).contains(&validation_fraction) || validation_fraction == 0.0 {
        return Err(PipelineError::Training(format!(
            "Validation fraction must be in (0, 1), got {}",
            validation_fraction
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let (train, valid) = DatasetBase::new(features, labels)
        .shuffle(&mut rng)
        .split_with_ratio(1.0 - validation_fraction);

    if train.records.nrows() == 0 || valid.records.nrows() == 0 {
        return Err(PipelineError::Training(format!(
            "Not enough rows for a {} validation split",
            validation_fraction
        )));
    }
    Ok((train, valid))
}

/// `saved_models/model.json` -> `saved_models/model_history.json`
pub fn history_path_for(model_path: &Path) -> PathBuf {
    let stem = model_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());
    model_path.with_file_name(format!("{}_history.json", stem))
}

fn write_history(history: &TrainingHistory, path: &Path) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, history)?;
    tracing::info!("Training history written to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write as _;

    fn write_csv(path: &Path, with_label: bool, rows: usize) {
        let mut csv = String::from("battery_power,px_height,px_width,ram,wifi");
        if with_label {
            csv.push_str(",price_range");
        }
        csv.push('\n');
        for i in 0..rows {
            let class = i % 4;
            let ram = 500 + class * 1000 + (i % 7) * 10;
            let wifi = if i % 3 == 0 { String::new() } else { (i % 2).to_string() };
            write!(csv, "{},{},{},{},{}", 800 + i, 100 + class * 300, 400 + class * 200, ram, wifi).unwrap();
            if with_label {
                write!(csv, ",{}", class).unwrap();
            }
            csv.push('\n');
        }
        std::fs::write(path, csv).unwrap();
    }

    #[test]
    fn test_split_is_reproducible() {
        let features = Array2::from_shape_fn((10, 2), |(i, j)| (i * 2 + j) as f64);
        let labels = Array1::from_iter(0..10);

        let (train_a, valid_a) = split_validation(features.clone(), labels.clone(), 0.2, 42).unwrap();
        let (train_b, valid_b) = split_validation(features, labels, 0.2, 42).unwrap();

        assert_eq!(train_a.records.nrows() + valid_a.records.nrows(), 10);
        assert!(valid_a.records.nrows() >= 1 && valid_a.records.nrows() <= 3);
        assert_eq!(train_a.targets, train_b.targets);
        assert_eq!(valid_a.targets, valid_b.targets);
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        let features = Array2::zeros((4, 1));
        let labels = Array1::zeros(4);
        assert!(split_validation(features, labels, 1.5, 0).is_err());
    }

    #[test]
    fn test_run_rejects_huge_label() {
        let dir = tempfile::tempdir().unwrap();
        let train_path = dir.path().join("train.csv");
        let test_path = dir.path().join("test.csv");
        std::fs::write(&train_path, "ram,price_range\n512,0\n1024,1e30\n2048,1\n").unwrap();
        write_csv(&test_path, false, 2);

        let plan = TrainingPlan {
            train_path,
            test_path,
            model_path: dir.path().join("model.json"),
            ..TrainingPlan::default()
        };
        let err = run(&plan).unwrap_err();
        assert!(matches!(err, PipelineError::Data(msg) if msg.contains("price_range")));
        assert!(!plan.model_path.exists());
    }

    #[test]
    fn test_history_path() {
        assert_eq!(
            history_path_for(Path::new("saved_models/device.json")),
            PathBuf::from("saved_models/device_history.json")
        );
    }

    #[test]
    fn test_run_writes_artifact_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let train_path = dir.path().join("train.csv");
        let test_path = dir.path().join("test.csv");
        write_csv(&train_path, true, 40);
        write_csv(&test_path, false, 5);

        let plan = TrainingPlan {
            train_path,
            test_path,
            model_path: dir.path().join("saved_models").join("model.json"),
            config: TrainConfig {
                epochs: 4,
                batch_size: 8,
                ..TrainConfig::default()
            },
            ..TrainingPlan::default()
        };
        let report = run(&plan).unwrap();

        assert_eq!(report.history.epochs.len(), 4);
        assert!(report.evaluation.accuracy >= 0.0 && report.evaluation.accuracy <= 1.0);
        assert!(report.model_path.exists());
        assert!(report.history_path.exists());

        let artifact = ModelArtifact::load(&report.model_path).unwrap();
        assert_eq!(artifact.network.n_classes, 4);
        assert_eq!(artifact.preprocessor.input_dim(), 6);
    }
}
