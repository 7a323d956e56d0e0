//! HTTP API поверх загруженной модели
//!
//! Модель передается через `State` и только читается; запросы ее не меняют.
//! Любая ошибка запроса превращается в JSON `{"error": ...}`, процесс
//! продолжает работу.

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use crate::dataset::Table;
use crate::error::PipelineError;
use crate::models::PricePredictor;
use crate::types::{ErrorOutput, GroupPredictionOutput, SinglePredictionOutput};

pub const NO_INPUT_MESSAGE: &str = "No input data provided";

#[derive(Clone)]
pub struct AppState {
    predictor: PricePredictor,
}

impl AppState {
    pub fn new(predictor: PricePredictor) -> Self {
        Self { predictor }
    }
}

pub fn router(state: AppState) -> Router {
    // CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict_single", post(predict_single))
        .route("/predict_group", post(predict_group))
        .layer(cors)
        .with_state(state)
}

/// Ошибка обработчика: `Request` -> 400, остальное -> 500
pub struct ApiError(PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            PipelineError::Request(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Prediction failed: {}", self.0);
        } else {
            tracing::warn!("Rejected request: {}", self.0);
        }

        (status, Json(ErrorOutput { error: self.0.to_string() })).into_response()
    }
}

async fn root() -> &'static str {
    "Price Prediction Model API"
}

async fn health() -> Json<Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn predict_single(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SinglePredictionOutput>, ApiError> {
    let data = parse_body(&body)?;
    if data.as_array().is_some_and(|rows| rows.is_empty()) {
        return Err(PipelineError::Request(NO_INPUT_MESSAGE.to_string()).into());
    }
    let table = Table::from_json_rows(std::slice::from_ref(&data))?;
    tracing::debug!("Predict single request: {} fields", table.ncols());

    let (prediction, probability) = state.predictor.predict_single(&table)?;
    Ok(Json(SinglePredictionOutput {
        prediction,
        probability,
    }))
}

async fn predict_group(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<GroupPredictionOutput>, ApiError> {
    let data = parse_body(&body)?;
    let rows = data.as_array().ok_or_else(|| {
        PipelineError::Request("Expected a JSON array of objects".to_string())
    })?;
    tracing::debug!("Predict group request: {} rows", rows.len());

    if rows.is_empty() {
        return Ok(Json(GroupPredictionOutput {
            predictions: Vec::new(),
        }));
    }

    let table = Table::from_json_rows(rows)?;
    let predictions = state.predictor.predict_group(&table)?;
    Ok(Json(GroupPredictionOutput { predictions }))
}

/// Пустое тело, `null` и `{}` считаются отсутствием данных
fn parse_body(body: &[u8]) -> Result<Value, PipelineError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(PipelineError::Request(NO_INPUT_MESSAGE.to_string()));
    }

    let value: Value = serde_json::from_slice(body)
        .map_err(|e| PipelineError::Request(format!("Invalid JSON: {}", e)))?;

    match &value {
        Value::Null => Err(PipelineError::Request(NO_INPUT_MESSAGE.to_string())),
        Value::Object(map) if map.is_empty() => {
            Err(PipelineError::Request(NO_INPUT_MESSAGE.to_string()))
        }
        _ => Ok(value),
    }
}
