//! Ошибки конвейера

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Некорректные или отсутствующие данные (колонки, метки, статистики)
    #[error("Data error: {0}")]
    Data(String),

    #[error("{what} file {} not found", path.display())]
    FileNotFound { what: &'static str, path: PathBuf },

    #[error("Model load error: {0}")]
    ModelLoad(String),

    /// Некорректный HTTP-запрос (пустое или битое тело)
    #[error("{0}")]
    Request(String),

    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("Training error: {0}")]
    Training(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
