//! Именованная схема входных признаков
//!
//! Колонки сопоставляются по имени, а не по позиции: порядок во входе может
//! быть любым, но лишние или отсутствующие колонки считаются ошибкой.

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::dataset::Table;
use crate::error::{PipelineError, Result};
use crate::types::LABEL_COLUMN;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    /// Схема обучающей таблицы: все колонки, кроме метки
    pub fn from_table(table: &Table) -> Self {
        Self {
            columns: table
                .columns()
                .iter()
                .filter(|c| c.as_str() != LABEL_COLUMN)
                .cloned()
                .collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Матрица признаков в порядке схемы. Метка, если есть, отбрасывается.
    pub fn align(&self, table: &Table) -> Result<Array2<f64>> {
        let missing: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| table.column_index(c).is_none())
            .map(String::as_str)
            .collect();
        let unexpected: Vec<&str> = table
            .columns()
            .iter()
            .filter(|c| c.as_str() != LABEL_COLUMN && !self.columns.contains(c))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(PipelineError::Data(format!(
                "Input columns do not match the model schema (missing: [{}], unexpected: [{}])",
                missing.join(", "),
                unexpected.join(", ")
            )));
        }

        let indices: Vec<usize> = self
            .columns
            .iter()
            .filter_map(|c| table.column_index(c))
            .collect();

        Ok(table.values().select(Axis(1), &indices))
    }
}
