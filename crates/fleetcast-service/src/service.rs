//! Per-key adaptive model lifecycle and forecasting.
//!
//! The service owns a registry mapping each [`ModelKey`] to one live RLS
//! estimator, populated lazily from persisted state. Training holds the
//! per-key lock for the whole pass, so there is at most one concurrent
//! training run per key; forecasting takes the same lock only for the
//! duration of each prediction and never mutates model state.

use crate::sources::{ModelStore, UsageSource, WeatherSource};
use crate::types::{ForecastResult, HistoryPoint, ModelKey, PredictionPoint, UsageSample};
use chrono::{Datelike, Duration, Utc};
use fleetcast_core::features::{build_features, FEATURE_DIM};
use fleetcast_core::rls::{Rls, RlsState, DEFAULT_LAMBDA};
use fleetcast_core::{ForecastError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, error, info, warn};

/// Minimum history length before the adaptive model is trusted; shorter
/// series fall back to a moving average.
pub const MIN_MODEL_HISTORY: usize = 14;

/// Training needs a 7-day lookback for the weekly lag feature.
const LAG_WINDOW: usize = 7;

/// Upper bound on the forecast horizon, to keep request work bounded.
pub const MAX_HORIZON: usize = 90;

/// Default forecast horizon in days.
pub const DEFAULT_HORIZON: usize = 14;

/// Half-width of the flat confidence band around adaptive-model
/// predictions. A documented simplification, not a statistically derived
/// interval.
const FLAT_BAND: f64 = 2.0;

/// A persisted model state that could not be restored at load time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedState {
    pub key: ModelKey,
    pub reason: String,
}

/// Outcome of [`ForecastingService::initialize`]: how many models were
/// restored and which persisted records were skipped as corrupt.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedState>,
}

/// Demand forecasting service over per-key adaptive models.
pub struct ForecastingService<U, W, S> {
    usage: U,
    weather: W,
    store: S,
    models: RwLock<HashMap<ModelKey, Arc<Mutex<Rls>>>>,
}

impl<U, W, S> ForecastingService<U, W, S>
where
    U: UsageSource,
    W: WeatherSource,
    S: ModelStore,
{
    pub fn new(usage: U, weather: W, store: S) -> Self {
        Self {
            usage,
            weather,
            store,
            models: RwLock::new(HashMap::new()),
        }
    }

    /// Restore every persisted model state into the in-memory registry.
    ///
    /// Corrupt records are skipped and reported, never fatal: a single bad
    /// row must not abort startup.
    pub fn initialize(&self) -> Result<LoadReport> {
        let mut report = LoadReport::default();
        let mut models = self.models.write().expect("model registry poisoned");

        for (key, serialized) in self.store.load_all()? {
            match restore_model(&serialized) {
                Ok(model) => {
                    models.insert(key, Arc::new(Mutex::new(model)));
                    report.loaded += 1;
                }
                Err(err) => {
                    warn!(%key, %err, "skipping corrupt persisted model state");
                    report.skipped.push(SkippedState {
                        key,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "forecasting service initialized"
        );
        Ok(report)
    }

    /// Train (or further train) the model for a key from its usage series.
    ///
    /// Fewer than 2 points is a no-op, not an error. The pass feeds one
    /// update per day in chronological order, which matters: the
    /// forgetting factor is time-directional. After the pass the new state
    /// is persisted; a write failure is logged and swallowed, leaving the
    /// in-memory model ahead of the durable copy until a later retry.
    pub fn train_model(&self, site_id: i64, equipment_type: &str) -> Result<()> {
        let key = ModelKey::new(site_id, equipment_type);
        let series = self.usage.daily_usage(site_id, equipment_type)?;

        if series.len() < 2 {
            debug!(%key, points = series.len(), "not enough data to train");
            return Ok(());
        }

        let entry = {
            let mut models = self.models.write().expect("model registry poisoned");
            Arc::clone(models.entry(key.clone()).or_insert_with(new_model_entry))
        };

        // Held for the whole pass: at most one concurrent train per key.
        let mut model = entry.lock().expect("model lock poisoned");

        let mut skipped_updates = 0usize;
        for i in LAG_WINDOW..series.len() {
            let day = &series[i];
            let weather = self.weather.weather(site_id, day.date);
            let features = build_features(
                series[i - 1].usage as f64,
                series[i - LAG_WINDOW].usage as f64,
                day.date.weekday(),
                &weather,
            );
            if !model.update(&features, day.usage as f64) {
                skipped_updates += 1;
            }
        }
        if skipped_updates > 0 {
            debug!(%key, skipped_updates, "skipped numerically degenerate updates");
        }

        let serialized = serde_json::to_string(&model.state())
            .map_err(|e| ForecastError::CorruptState { reason: e.to_string() })?;
        if let Err(err) = self.store.upsert(&key, &serialized) {
            error!(%key, %err, "failed to persist model state; in-memory model keeps the new state");
        }

        Ok(())
    }

    /// Produce a `horizon`-day forecast for a key.
    ///
    /// With fewer than [`MIN_MODEL_HISTORY`] historical points any trained
    /// model is ignored and a moving average over the full series is used.
    /// Otherwise, a model (live or rehydrated from the store) produces
    /// `horizon` recursive one-step predictions, feeding prior forecasts
    /// back in as pseudo-actuals for lags inside the horizon. With enough
    /// history but no model at all, the moving average is the fallback.
    pub fn forecast(
        &self,
        site_id: i64,
        equipment_type: &str,
        horizon: usize,
    ) -> Result<ForecastResult> {
        if horizon == 0 || horizon > MAX_HORIZON {
            return Err(ForecastError::InvalidParameter {
                name: "horizon".to_string(),
                reason: format!("must be between 1 and {MAX_HORIZON}"),
            });
        }

        let key = ModelKey::new(site_id, equipment_type);
        let model = self.resolve_model(&key)?;
        let series = self.usage.daily_usage(site_id, equipment_type)?;

        if series.len() < MIN_MODEL_HISTORY {
            return Ok(flat_average_forecast(&series, horizon));
        }

        let Some(model) = model else {
            return Ok(flat_average_forecast(&series, horizon));
        };

        let history = history_points(&series);
        let last_date = series.last().expect("series is non-empty").date;

        // Rolling 7-slot window of the most recent values, seeded from the
        // tail of history and extended with each new prediction.
        let mut window: Vec<f64> = series
            .iter()
            .rev()
            .take(LAG_WINDOW)
            .rev()
            .map(|s| s.usage as f64)
            .collect();

        let mut predictions = Vec::with_capacity(horizon);
        for step in 1..=horizon {
            let date = last_date + Duration::days(step as i64);
            let lag1 = *window.last().expect("window is non-empty");
            let lag7 = window[0];
            let weather = self.weather.weather(site_id, date);
            let features = build_features(lag1, lag7, date.weekday(), &weather);

            let estimate = {
                let model = model.lock().expect("model lock poisoned");
                model.predict(&features)
            };

            predictions.push(PredictionPoint {
                date,
                point_estimate: estimate,
                lower: (estimate - FLAT_BAND).max(0.0),
                upper: estimate + FLAT_BAND,
            });

            window.push(estimate);
            if window.len() > LAG_WINDOW {
                window.remove(0);
            }
        }

        Ok(ForecastResult {
            history,
            predictions,
        })
    }

    /// Look up the live model for a key, rehydrating from the store if
    /// absent. A corrupt persisted record is logged and treated as no
    /// model.
    fn resolve_model(&self, key: &ModelKey) -> Result<Option<Arc<Mutex<Rls>>>> {
        {
            let models = self.models.read().expect("model registry poisoned");
            if let Some(entry) = models.get(key) {
                return Ok(Some(Arc::clone(entry)));
            }
        }

        let Some(serialized) = self.store.load(key)? else {
            return Ok(None);
        };

        match restore_model(&serialized) {
            Ok(model) => {
                let entry = Arc::new(Mutex::new(model));
                let mut models = self.models.write().expect("model registry poisoned");
                // Another request may have rehydrated concurrently; keep
                // the first entry so the key stays unique.
                let entry = models
                    .entry(key.clone())
                    .or_insert_with(|| entry)
                    .clone();
                Ok(Some(entry))
            }
            Err(err) => {
                warn!(%key, %err, "persisted model state is corrupt; forecasting without a model");
                Ok(None)
            }
        }
    }

    /// Whether a live model exists for a key.
    pub fn has_model(&self, site_id: i64, equipment_type: &str) -> bool {
        self.models
            .read()
            .expect("model registry poisoned")
            .contains_key(&ModelKey::new(site_id, equipment_type))
    }
}

fn new_model_entry() -> Arc<Mutex<Rls>> {
    Arc::new(Mutex::new(
        Rls::new(FEATURE_DIM, DEFAULT_LAMBDA).expect("constants are valid"),
    ))
}

fn restore_model(serialized: &str) -> Result<Rls> {
    let state: RlsState =
        serde_json::from_str(serialized).map_err(|e| ForecastError::CorruptState {
            reason: e.to_string(),
        })?;
    let mut model = Rls::new(FEATURE_DIM, DEFAULT_LAMBDA).expect("constants are valid");
    model.set_state(state)?;
    Ok(model)
}

fn history_points(series: &[UsageSample]) -> Vec<HistoryPoint> {
    series
        .iter()
        .map(|s| HistoryPoint {
            date: s.date,
            actual: Some(s.usage as f64),
            forecast: None,
        })
        .collect()
}

/// Constant forecast at the series mean with a flat ±2 band, used whenever
/// the adaptive model is unavailable or untrustworthy.
fn flat_average_forecast(series: &[UsageSample], horizon: usize) -> ForecastResult {
    let avg = if series.is_empty() {
        0.0
    } else {
        series.iter().map(|s| s.usage as f64).sum::<f64>() / series.len() as f64
    };

    let base_date = series
        .last()
        .map(|s| s.date)
        .unwrap_or_else(|| Utc::now().date_naive());

    let predictions = (1..=horizon)
        .map(|step| PredictionPoint {
            date: base_date + Duration::days(step as i64),
            point_estimate: avg,
            lower: (avg - FLAT_BAND).max(0.0),
            upper: avg + FLAT_BAND,
        })
        .collect();

    ForecastResult {
        history: history_points(series),
        predictions,
    }
}
