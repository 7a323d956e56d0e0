//! Полносвязная сеть для классификации ценового диапазона
//!
//! Архитектура фиксирована: Dense(64, ReLU) -> Dense(32, ReLU) -> Dense(K, softmax).
//! Слои, cross-entropy, обратный проход и Adam берутся из burn (бэкенд NdArray);
//! здесь только цикл по эпохам, перевод ndarray <-> тензоры и сохранение весов.

#![allow(non_snake_case)]

use std::sync::{Mutex, MutexGuard};

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::nn::loss::{CrossEntropyLoss, CrossEntropyLossConfig};
use burn::nn::{Linear, LinearConfig, Relu};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder};
use burn::tensor::activation::softmax;
use burn::tensor::TensorData;
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::{evaluate_proba, Classifier};
use crate::error::{PipelineError, Result as PResult};
use crate::types::{EpochMetrics, TrainingHistory};

type InferenceBackend = NdArray<f32>;
type TrainingBackend = Autodiff<InferenceBackend>;

/// Конфигурация сети
#[derive(Config, Debug)]
pub struct PriceNetConfig {
    pub input_dim: usize,
    pub n_classes: usize,
    #[config(default = "64")]
    pub hidden1: usize,
    #[config(default = "32")]
    pub hidden2: usize,
}

impl PriceNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> PriceNet<B> {
        PriceNet {
            hidden1: LinearConfig::new(self.input_dim, self.hidden1).init(device),
            hidden2: LinearConfig::new(self.hidden1, self.hidden2).init(device),
            output: LinearConfig::new(self.hidden2, self.n_classes).init(device),
            activation: Relu::new(),
        }
    }
}

#[derive(Module, Debug)]
pub struct PriceNet<B: Backend> {
    hidden1: Linear<B>,
    hidden2: Linear<B>,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> PriceNet<B> {
    /// Логиты; softmax применяется отдельно
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.hidden1.forward(x));
        let x = self.activation.forward(self.hidden2.forward(x));
        self.output.forward(x)
    }

    fn layer_dims(&self) -> [[usize; 2]; 3] {
        [
            self.hidden1.weight.val().dims(),
            self.hidden2.weight.val().dims(),
            self.output.weight.val().dims(),
        ]
    }
}

/// Параметры обучения
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 50,
            batch_size: 32,
            learning_rate: 1e-3,
            seed: 42,
        }
    }
}

/// Сериализуемое состояние сети: размерности и веса в формате записи burn
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkState {
    pub input_dim: usize,
    pub n_classes: usize,
    pub weights: Vec<u8>,
}

/// Модуль burn не `Sync`, поэтому инференс идет под мьютексом
#[derive(Debug)]
pub struct MlpClassifier {
    config: PriceNetConfig,
    model: Mutex<PriceNet<InferenceBackend>>,
}

impl MlpClassifier {
    pub fn new(input_dim: usize, n_classes: usize, seed: u64) -> PResult<Self> {
        let config = Self::config_for(input_dim, n_classes).map_err(PipelineError::Training)?;
        InferenceBackend::seed(seed);
        let model = config.init::<InferenceBackend>(&NdArrayDevice::default());

        Ok(Self {
            config,
            model: Mutex::new(model),
        })
    }

    /// Обучение фиксированное число эпох, без ранней остановки
    pub fn train(
        &mut self,
        X: &Array2<f64>,
        y: &Array1<usize>,
        validation: Option<(&Array2<f64>, &Array1<usize>)>,
        config: &TrainConfig,
    ) -> PResult<TrainingHistory> {
        self.check_training_data(X, y)?;
        if let Some((X_val, y_val)) = validation {
            self.check_training_data(X_val, y_val)?;
        }
        if config.batch_size == 0 {
            return Err(PipelineError::Training("Batch size must be positive".to_string()));
        }

        let device = NdArrayDevice::default();
        let weights = record_bytes(self.lock()?.clone())?;
        let mut model: PriceNet<TrainingBackend> = load_model(&self.config, weights, &device)
            .map_err(PipelineError::Training)?;
        let mut optimizer = AdamConfig::new()
            .with_epsilon(1e-7)
            .init::<TrainingBackend, PriceNet<TrainingBackend>>();
        let loss_fn: CrossEntropyLoss<TrainingBackend> = CrossEntropyLossConfig::new().init(&device);

        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut indices: Vec<usize> = (0..X.nrows()).collect();
        let mut history = TrainingHistory::default();

        for epoch in 1..=config.epochs {
            indices.shuffle(&mut rng);

            for batch in indices.chunks(config.batch_size) {
                let inputs = to_features(&X.select(Axis(0), batch), &device);
                let targets = to_labels(batch.iter().map(|&i| y[i]), &device);

                let loss = loss_fn.forward(model.forward(inputs), targets);
                let gradients = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(config.learning_rate, model, gradients);
            }

            let snapshot = model.valid();
            let train = evaluate_proba(&probabilities(&snapshot, X)?, y)?;
            let val = validation
                .map(|(X_val, y_val)| evaluate_proba(&probabilities(&snapshot, X_val)?, y_val))
                .transpose()?;

            let metrics = EpochMetrics {
                epoch,
                loss: train.loss,
                accuracy: train.accuracy,
                val_loss: val.map(|v| v.loss),
                val_accuracy: val.map(|v| v.accuracy),
            };
            match (metrics.val_loss, metrics.val_accuracy) {
                (Some(val_loss), Some(val_accuracy)) => tracing::info!(
                    "Epoch {}/{}: loss {:.4}, accuracy {:.4}, val_loss {:.4}, val_accuracy {:.4}",
                    epoch,
                    config.epochs,
                    metrics.loss,
                    metrics.accuracy,
                    val_loss,
                    val_accuracy
                ),
                _ => tracing::info!(
                    "Epoch {}/{}: loss {:.4}, accuracy {:.4}",
                    epoch,
                    config.epochs,
                    metrics.loss,
                    metrics.accuracy
                ),
            }
            history.epochs.push(metrics);
        }

        *self.lock()? = model.valid();
        Ok(history)
    }

    pub fn to_state(&self) -> PResult<NetworkState> {
        Ok(NetworkState {
            input_dim: self.config.input_dim,
            n_classes: self.config.n_classes,
            weights: record_bytes(self.lock()?.clone())?,
        })
    }

    /// Восстановление с проверкой топологии; любая несовместимость -> `ModelLoad`
    pub fn from_state(state: NetworkState) -> PResult<Self> {
        let config =
            Self::config_for(state.input_dim, state.n_classes).map_err(PipelineError::ModelLoad)?;
        let model: PriceNet<InferenceBackend> =
            load_model(&config, state.weights, &NdArrayDevice::default())
                .map_err(PipelineError::ModelLoad)?;

        let expected = [
            [config.input_dim, config.hidden1],
            [config.hidden1, config.hidden2],
            [config.hidden2, config.n_classes],
        ];
        let actual = model.layer_dims();
        if actual != expected {
            return Err(PipelineError::ModelLoad(format!(
                "layer shapes {:?} do not match expected {:?}",
                actual, expected
            )));
        }

        Ok(Self {
            config,
            model: Mutex::new(model),
        })
    }

    fn config_for(input_dim: usize, n_classes: usize) -> std::result::Result<PriceNetConfig, String> {
        if input_dim == 0 {
            return Err("Input dimensionality must be positive".to_string());
        }
        if n_classes < 2 {
            return Err(format!("Need at least 2 classes, got {}", n_classes));
        }
        Ok(PriceNetConfig::new(input_dim, n_classes))
    }

    fn lock(&self) -> PResult<MutexGuard<'_, PriceNet<InferenceBackend>>> {
        self.model
            .lock()
            .map_err(|_| PipelineError::Training("Model lock poisoned".to_string()))
    }

    fn check_training_data(&self, X: &Array2<f64>, y: &Array1<usize>) -> PResult<()> {
        if X.nrows() == 0 {
            return Err(PipelineError::Training("Empty dataset".to_string()));
        }
        if X.ncols() != self.config.input_dim {
            return Err(PipelineError::Shape {
                expected: self.config.input_dim,
                actual: X.ncols(),
            });
        }
        if X.nrows() != y.len() {
            return Err(PipelineError::Training(format!(
                "{} rows but {} labels",
                X.nrows(),
                y.len()
            )));
        }
        if let Some(&label) = y.iter().find(|&&l| l >= self.config.n_classes) {
            return Err(PipelineError::Training(format!(
                "Label {} outside of {} classes",
                label, self.config.n_classes
            )));
        }
        Ok(())
    }
}

impl Classifier for MlpClassifier {
    fn input_dim(&self) -> usize {
        self.config.input_dim
    }

    fn n_classes(&self) -> usize {
        self.config.n_classes
    }

    fn predict_proba(&self, features: &Array2<f64>) -> PResult<Array2<f64>> {
        if features.ncols() != self.config.input_dim {
            return Err(PipelineError::Shape {
                expected: self.config.input_dim,
                actual: features.ncols(),
            });
        }
        if features.nrows() == 0 {
            return Ok(Array2::zeros((0, self.config.n_classes)));
        }
        let model = self.lock()?;
        probabilities(&model, features)
    }
}

fn to_features<B: Backend>(X: &Array2<f64>, device: &B::Device) -> Tensor<B, 2> {
    let values: Vec<f32> = X.iter().map(|&v| v as f32).collect();
    Tensor::from_data(TensorData::new(values, [X.nrows(), X.ncols()]), device)
}

fn to_labels<B: Backend>(labels: impl Iterator<Item = usize>, device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<i64> = labels.map(|l| l as i64).collect();
    let n = values.len();
    Tensor::from_data(TensorData::new(values, [n]), device)
}

fn probabilities<B: Backend>(model: &PriceNet<B>, X: &Array2<f64>) -> PResult<Array2<f64>> {
    let device = Default::default();
    let proba = softmax(model.forward(to_features::<B>(X, &device)), 1);
    let [rows, cols] = proba.dims();
    let values = proba
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| PipelineError::Training(format!("Failed to read probabilities: {:?}", e)))?;

    Array2::from_shape_vec((rows, cols), values.into_iter().map(f64::from).collect())
        .map_err(|e| PipelineError::Training(format!("Failed to read probabilities: {}", e)))
}

fn record_bytes<B: Backend>(model: PriceNet<B>) -> PResult<Vec<u8>> {
    let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::new();
    Recorder::<B>::record(&recorder, model.into_record(), ())
        .map_err(|e| PipelineError::Training(format!("Failed to record weights: {:?}", e)))
}

fn load_model<B: Backend>(
    config: &PriceNetConfig,
    weights: Vec<u8>,
    device: &B::Device,
) -> std::result::Result<PriceNet<B>, String> {
    let recorder = NamedMpkBytesRecorder::<FullPrecisionSettings>::new();
    let record: <PriceNet<B> as Module<B>>::Record = Recorder::<B>::load(&recorder, weights, device)
        .map_err(|e| format!("invalid network weights: {:?}", e))?;
    Ok(config.init::<B>(device).load_record(record))
}
