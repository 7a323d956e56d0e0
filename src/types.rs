/// Типы данных и константы схемы

use serde::{Deserialize, Serialize};

/// Колонка с целевой переменной в обучающей таблице
pub const LABEL_COLUMN: &str = "price_range";

/// Колонка, которую дописывает пакетное предсказание
pub const PREDICTION_COLUMN: &str = "predicted_price_range";

/// Производный признак и его исходные колонки
pub const PIXEL_DENSITY_COLUMN: &str = "px_density";
pub const PIXEL_WIDTH_COLUMN: &str = "px_width";
pub const PIXEL_HEIGHT_COLUMN: &str = "px_height";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinglePredictionOutput {
    pub prediction: usize,
    pub probability: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPredictionOutput {
    pub predictions: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub error: String,
}

/// Метрики одной эпохи обучения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    #[serde(default)]
    pub val_loss: Option<f64>,
    #[serde(default)]
    pub val_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Итог оценки модели на отложенной выборке
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
}
