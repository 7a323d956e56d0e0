//! Пакетное предсказание по CSV-файлу

use std::path::{Path, PathBuf};

use crate::dataset::Table;
use crate::error::{PipelineError, Result};
use crate::models::PricePredictor;
use crate::types::PREDICTION_COLUMN;

/// Проверка путей, загрузка модели и запись `<имя>_predictions.csv`
pub fn run(input: &Path, model: &Path) -> Result<PathBuf> {
    if !input.exists() {
        return Err(PipelineError::FileNotFound {
            what: "Input",
            path: input.to_path_buf(),
        });
    }
    if !model.exists() {
        return Err(PipelineError::FileNotFound {
            what: "Model",
            path: model.to_path_buf(),
        });
    }

    let predictor = PricePredictor::load(model)?;
    predict_file(input, &predictor)
}

/// Исходные ячейки переписываются как есть, в конец добавляется предсказанный класс
pub fn predict_file(input: &Path, predictor: &PricePredictor) -> Result<PathBuf> {
    let mut reader = csv::Reader::from_path(input)?;
    let headers = reader.headers()?.clone();
    let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;

    let table = Table::from_records(&headers, &records)?;
    let predictions = predictor.predict_group(&table)?;
    tracing::info!("Predicted {} rows from {}", predictions.len(), input.display());

    let output = output_path_for(input);
    let mut writer = csv::Writer::from_path(&output)?;
    writer.write_record(headers.iter().chain(std::iter::once(PREDICTION_COLUMN)))?;
    for (record, class) in records.iter().zip(&predictions) {
        let class = class.to_string();
        writer.write_record(record.iter().chain(std::iter::once(class.as_str())))?;
    }
    writer.flush()?;

    tracing::info!("Predictions saved to {}", output.display());
    Ok(output)
}

/// `data/new.csv` -> `data/new_predictions.csv`
pub fn output_path_for(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}_predictions.csv", stem))
}
