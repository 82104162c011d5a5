//! Data model shared by the forecasting service and its collaborators.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Identifies one adaptive model instance: a site plus an equipment type.
///
/// A composite struct key with structural equality, so delimiter characters
/// appearing in equipment type names can never collide with another key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelKey {
    pub site_id: i64,
    pub equipment_type: String,
}

impl ModelKey {
    pub fn new(site_id: i64, equipment_type: impl Into<String>) -> Self {
        Self {
            site_id,
            equipment_type: equipment_type.into(),
        }
    }
}

impl std::fmt::Display for ModelKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "site {} / {}", self.site_id, self.equipment_type)
    }
}

/// One day of aggregated equipment usage for a (site, equipment type) key.
///
/// Samples are ordered ascending by date; the series is a time series and
/// insertion order is meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageSample {
    pub date: NaiveDate,
    /// Rental check-outs on this day (non-negative count)
    pub usage: u32,
}

impl UsageSample {
    pub fn new(date: NaiveDate, usage: u32) -> Self {
        Self { date, usage }
    }
}

/// One point of the historical part of a forecast response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub date: NaiveDate,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
}

/// One future point of a forecast, with confidence bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Full forecast response: aligned historical series plus future
/// predictions, so a caller can render one continuous timeline.
///
/// Produced fresh on every forecast call; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub history: Vec<HistoryPoint>,
    pub predictions: Vec<PredictionPoint>,
}

/// Lifecycle status of a rental, reduced to what the insights layer reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Active,
    Returned,
}

/// A rental record as consumed by the insights layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRecord {
    pub rental_id: i64,
    pub equipment_id: i64,
    pub site_id: Option<i64>,
    pub equipment_type: String,
    pub status: RentalStatus,
    pub check_out_date: NaiveDate,
    pub check_in_date: Option<NaiveDate>,
    /// Hours per day the machine idled while checked out, if telemetry
    /// reported it
    pub idle_hours_per_day: Option<f64>,
    /// Hours per day the engine ran, if telemetry reported it
    pub engine_hours_per_day: Option<f64>,
}
