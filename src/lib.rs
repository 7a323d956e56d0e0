//! Device price ML - подготовка данных, обучение и предсказание ценового диапазона

pub mod config;
pub mod dataset;
pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod preprocessing;
pub mod server;
pub mod types;

pub use dataset::Table;
pub use error::{PipelineError, Result};
pub use models::{Classifier, MlpClassifier, ModelArtifact, PricePredictor, TrainConfig};
pub use preprocessing::{prepare, prepare_files, PreparedData, Preprocessor};
