//! API route handlers

use crate::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use fleetcast_core::ForecastError;
use fleetcast_service::insights::{DemandForecast, UtilizationAnomaly};
use fleetcast_service::service::{DEFAULT_HORIZON, MAX_HORIZON};
use fleetcast_service::types::ForecastResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map service errors onto HTTP statuses: parameter problems are client
/// errors, everything else is internal.
fn map_error(err: ForecastError) -> ApiError {
    let status = match err {
        ForecastError::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub site_id: Option<i64>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    pub horizon: Option<usize>,
}

/// GET /api/v1/forecast?site_id&type&horizon
pub async fn forecast(
    State(state): State<AppState>,
    Query(params): Query<ForecastParams>,
) -> Result<Json<ForecastResult>, ApiError> {
    let site_id = params
        .site_id
        .ok_or_else(|| bad_request("site_id is a required parameter"))?;
    let equipment_type = params
        .equipment_type
        .ok_or_else(|| bad_request("type is a required parameter"))?;
    let horizon = params.horizon.unwrap_or(DEFAULT_HORIZON);

    state
        .service
        .forecast(site_id, &equipment_type, horizon)
        .map(Json)
        .map_err(map_error)
}

#[derive(Debug, Deserialize)]
pub struct TrainRequest {
    pub site_id: Option<i64>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrainResponse {
    pub message: String,
}

/// POST /api/v1/train {site_id, type}
pub async fn train(
    State(state): State<AppState>,
    Json(req): Json<TrainRequest>,
) -> Result<Json<TrainResponse>, ApiError> {
    let site_id = req
        .site_id
        .ok_or_else(|| bad_request("site_id is required in the request body"))?;
    let equipment_type = req
        .equipment_type
        .ok_or_else(|| bad_request("type is required in the request body"))?;

    state
        .service
        .train_model(site_id, &equipment_type)
        .map_err(map_error)?;

    Ok(Json(TrainResponse {
        message: "Model trained successfully".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct InsightsForecastParams {
    pub site_id: Option<i64>,
    #[serde(rename = "type")]
    pub equipment_type: Option<String>,
    pub horizon: Option<usize>,
}

/// GET /api/v1/insights/forecast?site_id&type&horizon
///
/// Smoothing-only demand forecast over rental counts; independent of the
/// per-key adaptive models.
pub async fn insights_forecast(
    State(state): State<AppState>,
    Query(params): Query<InsightsForecastParams>,
) -> Result<Json<DemandForecast>, ApiError> {
    let horizon = params.horizon.unwrap_or(DEFAULT_HORIZON);
    if horizon == 0 || horizon > MAX_HORIZON {
        return Err(bad_request(format!(
            "horizon must be between 1 and {MAX_HORIZON}"
        )));
    }

    state
        .insights
        .demand_forecast(params.site_id, params.equipment_type.as_deref(), horizon)
        .map(Json)
        .map_err(map_error)
}

#[derive(Debug, Deserialize)]
pub struct AnomalyParams {
    /// Trailing window in days (default 7)
    pub window: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct AnomalyResponse {
    pub period_days: i64,
    pub utilization_anomalies: Vec<UtilizationAnomaly>,
}

/// GET /api/v1/insights/anomalies?window
pub async fn insights_anomalies(
    State(state): State<AppState>,
    Query(params): Query<AnomalyParams>,
) -> Result<Json<AnomalyResponse>, ApiError> {
    let window = params.window.unwrap_or(7);
    if window <= 0 {
        return Err(bad_request("window must be a positive number of days"));
    }

    let utilization_anomalies = state.insights.anomalies(window).map_err(map_error)?;
    Ok(Json(AnomalyResponse {
        period_days: window,
        utilization_anomalies,
    }))
}
