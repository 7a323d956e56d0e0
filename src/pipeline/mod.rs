/// Сценарии запуска: обучение и пакетное предсказание

pub mod batch;
pub mod training;

pub use training::{TrainingPlan, TrainingReport};
