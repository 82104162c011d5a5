//! Time series smoothing and forecasting
//!
//! Classical smoothing methods used as fallbacks when the adaptive model
//! has too little training data, and as the primary method for the rental
//! demand insights path.
//!
//! - **Simple exponential smoothing (SES)**: level only, for data without
//!   trend or seasonality
//! - **Double exponential smoothing (Holt's method)**: level and trend,
//!   linearly extrapolated forecasts
//! - **Moving average**: constant forecast from the trailing window
//!
//! All functions are pure and stateless: they can be called concurrently
//! from any number of callers. Empty input is not an error; every function
//! returns a well-defined default (zeros) instead. Standard deviations use
//! population variance (divide by N).

use serde::{Deserialize, Serialize};

/// Default level smoothing parameter
pub const DEFAULT_ALPHA: f64 = 0.3;
/// Default trend smoothing parameter
pub const DEFAULT_BETA: f64 = 0.1;
/// Default moving-average window
pub const DEFAULT_WINDOW: usize = 7;

/// Width of the confidence band in residual standard deviations
const BAND_STD_MULTIPLIER: f64 = 1.5;

/// A multi-period forecast with confidence bounds.
///
/// All three vectors have the same length (the requested number of
/// periods). Lower bounds are clamped at zero since demand counts cannot
/// be negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingForecast {
    /// Point forecasts, one per period
    pub forecast: Vec<f64>,
    /// Upper confidence bound per period
    pub upper: Vec<f64>,
    /// Lower confidence bound per period (never negative)
    pub lower: Vec<f64>,
}

impl SmoothingForecast {
    /// All-zero forecast of the given length, used for empty input series.
    pub fn zeros(periods: usize) -> Self {
        Self {
            forecast: vec![0.0; periods],
            upper: vec![0.0; periods],
            lower: vec![0.0; periods],
        }
    }

    /// Constant forecast with symmetric bounds, lower clamped at zero.
    fn constant(value: f64, half_width: f64, periods: usize) -> Self {
        Self {
            forecast: vec![value; periods],
            upper: vec![value + half_width; periods],
            lower: vec![(value - half_width).max(0.0); periods],
        }
    }
}

// ============================================================================
// Simple Exponential Smoothing (SES)
// ============================================================================

/// Simple exponential smoothing: returns the final smoothed level.
///
/// `S_1 = series[0]`, `S_t = alpha * series[t] + (1 - alpha) * S_{t-1}`.
///
/// Returns 0 for an empty series and the sole value for a singleton.
///
/// # Example
///
/// ```rust
/// use fleetcast_core::smoothing::simple_exponential_smoothing;
///
/// let data = [10.0, 12.0, 13.0, 12.0, 15.0, 16.0, 14.0];
/// let level = simple_exponential_smoothing(&data, 0.3);
/// assert!((level - 13.72).abs() < 0.01);
/// ```
pub fn simple_exponential_smoothing(series: &[f64], alpha: f64) -> f64 {
    match series {
        [] => 0.0,
        [only] => *only,
        [first, rest @ ..] => rest
            .iter()
            .fold(*first, |level, &value| alpha * value + (1.0 - alpha) * level),
    }
}

// ============================================================================
// Double Exponential Smoothing (Holt's Method)
// ============================================================================

/// Double exponential smoothing (Holt's linear trend method).
///
/// Tracks a level and a trend component and extrapolates linearly:
/// the forecast for horizon `h` is `level + h * trend`. Confidence bounds
/// are set at ±1.5 population standard deviations of the in-sample
/// residuals, with the lower bound clamped at zero.
///
/// Edge cases: an empty series yields all-zero arrays; a singleton yields
/// a constant forecast equal to the input with bounds at ±10%.
pub fn double_exponential_smoothing(
    series: &[f64],
    alpha: f64,
    beta: f64,
    periods: usize,
) -> SmoothingForecast {
    if series.is_empty() {
        return SmoothingForecast::zeros(periods);
    }
    if series.len() == 1 {
        let value = series[0];
        return SmoothingForecast {
            forecast: vec![value; periods],
            upper: vec![value * 1.1; periods],
            lower: vec![value * 0.9; periods],
        };
    }

    let mut level = series[0];
    let mut trend = series[1] - series[0];

    // Fitted values for residual calculation; the first observation has no
    // prior state, so it is taken as its own fit.
    let mut fitted = Vec::with_capacity(series.len());
    fitted.push(series[0]);

    for &value in &series[1..] {
        let prev_level = level;
        level = alpha * value + (1.0 - alpha) * (level + trend);
        trend = beta * (level - prev_level) + (1.0 - beta) * trend;
        fitted.push(level + trend);
    }

    let forecast: Vec<f64> = (1..=periods).map(|h| level + h as f64 * trend).collect();

    let residuals: Vec<f64> = series
        .iter()
        .zip(fitted.iter())
        .map(|(actual, fit)| actual - fit)
        .collect();
    let residual_std = population_std(&residuals);

    let half_width = BAND_STD_MULTIPLIER * residual_std;
    SmoothingForecast {
        upper: forecast.iter().map(|&f| f + half_width).collect(),
        lower: forecast.iter().map(|&f| (f - half_width).max(0.0)).collect(),
        forecast,
    }
}

// ============================================================================
// Moving Average
// ============================================================================

/// Moving-average forecast: the mean of the last `min(window, len)` points
/// repeated for every period.
///
/// Confidence bounds are ±1.5 population standard deviations of the
/// *entire* series (not just the window), lower clamped at zero. An empty
/// series yields all-zero arrays.
pub fn moving_average_forecast(series: &[f64], window: usize, periods: usize) -> SmoothingForecast {
    if series.is_empty() {
        return SmoothingForecast::zeros(periods);
    }

    let tail = &series[series.len().saturating_sub(window)..];
    let avg = tail.iter().sum::<f64>() / tail.len() as f64;

    let std = population_std(series);
    SmoothingForecast::constant(avg, BAND_STD_MULTIPLIER * std, periods)
}

/// Population standard deviation (divide by N, not N-1).
fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
