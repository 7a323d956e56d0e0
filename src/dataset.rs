//! Табличные данные: чтение CSV и JSON-строк в числовую матрицу
//!
//! Пропуски (пустая ячейка, `NA`, `NaN`, JSON `null`) хранятся как `f64::NAN`
//! и заполняются позже импьютером.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use ndarray::{Array2, ArrayView1, Axis};
use serde_json::Value;

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl Table {
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if columns.len() != values.ncols() {
            return Err(PipelineError::Data(format!(
                "{} column names for {} value columns",
                columns.len(),
                values.ncols()
            )));
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::Data(format!("Duplicate column '{}'", name)));
            }
        }

        Ok(Self { columns, values })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();
        let records = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
        Self::from_records(&headers, &records)
    }

    /// Разбор уже прочитанных строк CSV (исходные строки остаются у вызывающего)
    pub fn from_records(headers: &StringRecord, records: &[StringRecord]) -> Result<Self> {
        let columns: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
        let mut values = Array2::from_elem((records.len(), columns.len()), f64::NAN);

        for (row, record) in records.iter().enumerate() {
            if record.len() != columns.len() {
                return Err(PipelineError::Data(format!(
                    "Row {}: expected {} fields, got {}",
                    row + 1,
                    columns.len(),
                    record.len()
                )));
            }
            for (col, raw) in record.iter().enumerate() {
                values[[row, col]] = parse_cell(raw).ok_or_else(|| {
                    PipelineError::Data(format!(
                        "Row {}, column '{}': '{}' is not a number",
                        row + 1,
                        columns[col],
                        raw
                    ))
                })?;
            }
        }

        Self::new(columns, values)
    }

    /// Строки из JSON-объектов; набор ключей первой строки задает колонки
    pub fn from_json_rows(rows: &[Value]) -> Result<Self> {
        let Some(first) = rows.first() else {
            return Self::new(Vec::new(), Array2::zeros((0, 0)));
        };
        let first = as_object(first, 0)?;
        let columns: Vec<String> = first.keys().cloned().collect();
        let mut values = Array2::from_elem((rows.len(), columns.len()), f64::NAN);

        for (row, value) in rows.iter().enumerate() {
            let object = as_object(value, row)?;
            if object.len() != columns.len() {
                return Err(PipelineError::Request(format!(
                    "Row {} has {} fields, expected {}",
                    row,
                    object.len(),
                    columns.len()
                )));
            }
            for (col, name) in columns.iter().enumerate() {
                let cell = object.get(name).ok_or_else(|| {
                    PipelineError::Request(format!("Row {} is missing field '{}'", row, name))
                })?;
                values[[row, col]] = json_to_f64(cell).ok_or_else(|| {
                    PipelineError::Request(format!(
                        "Row {}, field '{}': {} is not a number",
                        row, name, cell
                    ))
                })?;
            }
        }

        Self::new(columns, values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        self.column_index(name)
            .map(|idx| self.values.index_axis(Axis(1), idx))
    }
}

fn as_object(value: &Value, row: usize) -> Result<&serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| PipelineError::Request(format!("Row {} is not a JSON object", row)))
}

fn json_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Null => Some(f64::NAN),
        _ => None,
    }
}

/// Значение ячейки CSV; `None` если ячейка не конечное число
fn parse_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    match raw {
        "" | "NA" | "NaN" | "nan" | "null" => Some(f64::NAN),
        "true" | "True" => Some(1.0),
        "false" | "False" => Some(0.0),
        _ => raw.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_csv_missing_cells_become_nan() {
        let csv = "px_width,px_height,wifi\n10,20,1\n,5,NA\n3,NaN,true\n";
        let table = Table::from_csv_reader(csv.as_bytes()).unwrap();

        assert_eq!(table.columns(), &["px_width", "px_height", "wifi"]);
        assert_eq!(table.nrows(), 3);
        assert!(table.values()[[1, 0]].is_nan());
        assert!(table.values()[[1, 2]].is_nan());
        assert!(table.values()[[2, 1]].is_nan());
        assert_eq!(table.values()[[2, 2]], 1.0);
    }

    #[test]
    fn test_csv_rejects_text_cells() {
        let csv = "ram,blue\n512,maybe\n";
        let err = Table::from_csv_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, PipelineError::Data(msg) if msg.contains("'blue'")));
    }

    #[test]
    fn test_csv_rejects_infinite_cells() {
        for cell in ["inf", "-inf", "infinity", "1e400"] {
            let csv = format!("ram,px_width\n512,{}\n", cell);
            let err = Table::from_csv_reader(csv.as_bytes()).unwrap_err();
            assert!(matches!(err, PipelineError::Data(msg) if msg.contains("'px_width'")));
        }
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = Table::new(vec!["a".into(), "a".into()], Array2::zeros((1, 2))).unwrap_err();
        assert!(matches!(err, PipelineError::Data(_)));
    }

    #[test]
    fn test_json_rows() {
        let rows = vec![
            json!({"ram": 2048, "blue": true, "m_dep": null}),
            json!({"ram": 1024.5, "blue": false, "m_dep": 0.3}),
        ];
        let table = Table::from_json_rows(&rows).unwrap();

        assert_eq!(table.nrows(), 2);
        assert_eq!(table.column("ram").unwrap().to_vec(), vec![2048.0, 1024.5]);
        assert_eq!(table.column("blue").unwrap().to_vec(), vec![1.0, 0.0]);
        assert!(table.column("m_dep").unwrap()[0].is_nan());
    }

    #[test]
    fn test_json_rows_with_mismatched_keys() {
        let rows = vec![json!({"ram": 1, "sc_h": 2}), json!({"ram": 1, "sc_w": 2})];
        let err = Table::from_json_rows(&rows).unwrap_err();
        assert!(matches!(err, PipelineError::Request(msg) if msg.contains("sc_h")));
    }

    #[test]
    fn test_json_rows_reject_strings() {
        let rows = vec![json!({"ram": "lots"})];
        assert!(matches!(
            Table::from_json_rows(&rows),
            Err(PipelineError::Request(_))
        ));
    }
}
