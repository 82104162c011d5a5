//! In-memory reference implementations of the collaborator contracts.
//!
//! These back the demo server wiring and the test suites. A production
//! deployment would replace them with database-backed implementations;
//! the service layer only ever sees the traits.

use crate::sources::{ModelStore, RentalSource, UsageSource, WeatherSource};
use crate::types::{ModelKey, RentalRecord, RentalStatus, UsageSample};
use chrono::{Duration, NaiveDate};
use fleetcast_core::features::WeatherFeature;
use fleetcast_core::{ForecastError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Trailing aggregation window for the usage series, in days.
///
/// The window is anchored at the last observed date so the series is
/// deterministic regardless of when it is queried.
pub const USAGE_WINDOW_DAYS: i64 = 90;

/// Zero-fill days with no observations between the first and last date of
/// an ascending usage series, so lag indexing over it is uniform.
pub fn zero_fill(samples: &[UsageSample]) -> Vec<UsageSample> {
    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Vec::new();
    };

    let by_date: HashMap<NaiveDate, u32> = samples.iter().map(|s| (s.date, s.usage)).collect();

    let mut filled = Vec::with_capacity((last.date - first.date).num_days() as usize + 1);
    let mut date = first.date;
    while date <= last.date {
        filled.push(UsageSample::new(
            date,
            by_date.get(&date).copied().unwrap_or(0),
        ));
        date += Duration::days(1);
    }
    filled
}

// ============================================================================
// Usage
// ============================================================================

/// In-memory usage source keyed by (site, equipment type).
#[derive(Default)]
pub struct MemoryUsageSource {
    series: RwLock<HashMap<ModelKey, Vec<UsageSample>>>,
}

impl MemoryUsageSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored series for a key. Samples are sorted by date.
    pub fn set_series(&self, site_id: i64, equipment_type: &str, mut samples: Vec<UsageSample>) {
        samples.sort_by_key(|s| s.date);
        self.series
            .write()
            .expect("usage lock poisoned")
            .insert(ModelKey::new(site_id, equipment_type), samples);
    }

    /// Count one check-out for a key on a given day.
    pub fn record_checkout(&self, site_id: i64, equipment_type: &str, date: NaiveDate) {
        let mut series = self.series.write().expect("usage lock poisoned");
        let samples = series
            .entry(ModelKey::new(site_id, equipment_type))
            .or_default();
        match samples.iter_mut().find(|s| s.date == date) {
            Some(sample) => sample.usage += 1,
            None => {
                samples.push(UsageSample::new(date, 1));
                samples.sort_by_key(|s| s.date);
            }
        }
    }
}

impl UsageSource for MemoryUsageSource {
    fn daily_usage(&self, site_id: i64, equipment_type: &str) -> Result<Vec<UsageSample>> {
        let series = self.series.read().expect("usage lock poisoned");
        let Some(samples) = series.get(&ModelKey::new(site_id, equipment_type)) else {
            return Ok(Vec::new());
        };

        let filled = zero_fill(samples);
        let Some(last) = filled.last() else {
            return Ok(Vec::new());
        };

        let cutoff = last.date - Duration::days(USAGE_WINDOW_DAYS - 1);
        Ok(filled.into_iter().filter(|s| s.date >= cutoff).collect())
    }
}

// ============================================================================
// Weather
// ============================================================================

/// In-memory weather cache keyed by (site, date).
#[derive(Default)]
pub struct MemoryWeatherSource {
    cache: RwLock<HashMap<(i64, NaiveDate), WeatherFeature>>,
}

impl MemoryWeatherSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_weather(&self, site_id: i64, date: NaiveDate, weather: WeatherFeature) {
        self.cache
            .write()
            .expect("weather lock poisoned")
            .insert((site_id, date), weather);
    }
}

impl WeatherSource for MemoryWeatherSource {
    fn weather(&self, site_id: i64, date: NaiveDate) -> WeatherFeature {
        self.cache
            .read()
            .expect("weather lock poisoned")
            .get(&(site_id, date))
            .copied()
            .unwrap_or_default()
    }
}

// ============================================================================
// Rentals
// ============================================================================

/// In-memory rental history.
#[derive(Default)]
pub struct MemoryRentalSource {
    rentals: RwLock<Vec<RentalRecord>>,
}

impl MemoryRentalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, rental: RentalRecord) {
        self.rentals
            .write()
            .expect("rentals lock poisoned")
            .push(rental);
    }
}

impl RentalSource for MemoryRentalSource {
    fn returned_rentals(
        &self,
        site_id: Option<i64>,
        equipment_type: Option<&str>,
        checked_out_since: NaiveDate,
    ) -> Result<Vec<RentalRecord>> {
        let rentals = self.rentals.read().expect("rentals lock poisoned");
        let mut matched: Vec<RentalRecord> = rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Returned)
            .filter(|r| r.check_out_date >= checked_out_since)
            .filter(|r| site_id.is_none() || r.site_id == site_id)
            .filter(|r| equipment_type.map_or(true, |t| r.equipment_type == t))
            .cloned()
            .collect();
        matched.sort_by_key(|r| r.check_out_date);
        Ok(matched)
    }

    fn recently_returned(&self, checked_in_since: NaiveDate) -> Result<Vec<RentalRecord>> {
        let rentals = self.rentals.read().expect("rentals lock poisoned");
        Ok(rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Returned)
            .filter(|r| r.check_in_date.is_some_and(|d| d >= checked_in_since))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Model persistence
// ============================================================================

/// In-memory model state store.
///
/// Writes can be made to fail on demand so tests can exercise the
/// persistence-failure path without a real backend.
#[derive(Default)]
pub struct MemoryModelStore {
    states: RwLock<HashMap<ModelKey, String>>,
    fail_writes: AtomicBool,
}

impl MemoryModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a persisted state (used to simulate prior process lifetimes).
    pub fn seed(&self, key: ModelKey, state: impl Into<String>) {
        self.states
            .write()
            .expect("store lock poisoned")
            .insert(key, state.into());
    }

    /// Make subsequent `upsert` calls fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of persisted states.
    pub fn len(&self) -> usize {
        self.states.read().expect("store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ModelStore for MemoryModelStore {
    fn load_all(&self) -> Result<Vec<(ModelKey, String)>> {
        let states = self.states.read().expect("store lock poisoned");
        Ok(states
            .iter()
            .map(|(key, state)| (key.clone(), state.clone()))
            .collect())
    }

    fn load(&self, key: &ModelKey) -> Result<Option<String>> {
        let states = self.states.read().expect("store lock poisoned");
        Ok(states.get(key).cloned())
    }

    fn upsert(&self, key: &ModelKey, state: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ForecastError::Storage(
                "model store writes are disabled".to_string(),
            ));
        }
        self.states
            .write()
            .expect("store lock poisoned")
            .insert(key.clone(), state.to_string());
        Ok(())
    }
}
