/// ML модели

pub mod artifact;
pub mod network;

pub use artifact::{ModelArtifact, PricePredictor};
pub use network::{MlpClassifier, NetworkState, TrainConfig};

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::error::{PipelineError, Result};
use crate::types::Evaluation;

/// Классификатор над уже подготовленной матрицей признаков.
///
/// Реализации только читают свое состояние, поэтому один экземпляр можно
/// разделять между параллельными запросами без блокировок.
pub trait Classifier: Send + Sync {
    fn input_dim(&self) -> usize;

    fn n_classes(&self) -> usize;

    /// Вектор softmax-вероятностей на каждую строку
    fn predict_proba(&self, features: &Array2<f64>) -> Result<Array2<f64>>;

    fn predict_group(&self, features: &Array2<f64>) -> Result<Array1<usize>> {
        let proba = self.predict_proba(features)?;
        Ok(argmax_rows(&proba))
    }

    fn predict_single(&self, row: ArrayView1<f64>) -> Result<usize> {
        let features = row.to_owned().insert_axis(Axis(0));
        let classes = self.predict_group(&features)?;
        classes
            .get(0)
            .copied()
            .ok_or_else(|| PipelineError::Data("Empty prediction".to_string()))
    }

    fn evaluate(&self, features: &Array2<f64>, labels: &Array1<usize>) -> Result<Evaluation> {
        let proba = self.predict_proba(features)?;
        let evaluation = evaluate_proba(&proba, labels)?;
        tracing::info!(
            "Evaluation on {} rows: loss {:.4}, accuracy {:.4}",
            labels.len(),
            evaluation.loss,
            evaluation.accuracy
        );
        Ok(evaluation)
    }
}

/// Индекс максимальной вероятности в каждой строке
pub fn argmax_rows(proba: &Array2<f64>) -> Array1<usize> {
    proba
        .rows()
        .into_iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, &p)| {
                    if p > best.1 {
                        (i, p)
                    } else {
                        best
                    }
                })
                .0
        })
        .collect()
}

/// Sparse categorical cross-entropy и точность
pub fn evaluate_proba(proba: &Array2<f64>, labels: &Array1<usize>) -> Result<Evaluation> {
    if proba.nrows() != labels.len() {
        return Err(PipelineError::Data(format!(
            "{} predictions for {} labels",
            proba.nrows(),
            labels.len()
        )));
    }
    if labels.is_empty() {
        return Err(PipelineError::Data("Empty dataset".to_string()));
    }
    if let Some(&label) = labels.iter().find(|&&l| l >= proba.ncols()) {
        return Err(PipelineError::Data(format!(
            "Label {} outside of {} classes",
            label,
            proba.ncols()
        )));
    }

    let n = labels.len() as f64;
    let loss = labels
        .iter()
        .enumerate()
        .map(|(i, &label)| -proba[[i, label]].max(1e-12).ln())
        .sum::<f64>()
        / n;

    let predicted = argmax_rows(proba);
    let correct = predicted
        .iter()
        .zip(labels.iter())
        .filter(|(p, l)| p == l)
        .count();

    Ok(Evaluation {
        loss,
        accuracy: correct as f64 / n,
    })
}
