//! Collaborator contracts for the forecasting service.
//!
//! The service never talks to a database or a weather provider directly;
//! it consumes these traits. [`crate::memory`] provides in-memory
//! reference implementations used by the server wiring and the tests.

use crate::types::{ModelKey, RentalRecord, UsageSample};
use chrono::NaiveDate;
use fleetcast_core::features::WeatherFeature;
use fleetcast_core::Result;

/// Source of aggregated daily usage per (site, equipment type) key.
pub trait UsageSource: Send + Sync {
    /// The daily usage series for a key, ascending by date.
    ///
    /// Implementations define the aggregation window; the reference
    /// implementation covers a trailing 90-day window and zero-fills days
    /// with no check-outs between the first and last observed date, so
    /// lag indexing over the series is uniform.
    fn daily_usage(&self, site_id: i64, equipment_type: &str) -> Result<Vec<UsageSample>>;
}

/// Source of per-site, per-day weather conditions.
pub trait WeatherSource: Send + Sync {
    /// Weather for a site and date. Infallible: a cache miss yields
    /// `WeatherFeature::default()` (all zeros).
    fn weather(&self, site_id: i64, date: NaiveDate) -> WeatherFeature;
}

/// Source of rental records for the insights layer.
pub trait RentalSource: Send + Sync {
    /// Returned rentals checked out on or after `since`, optionally
    /// filtered by site and equipment type, ascending by check-out date.
    fn returned_rentals(
        &self,
        site_id: Option<i64>,
        equipment_type: Option<&str>,
        checked_out_since: NaiveDate,
    ) -> Result<Vec<RentalRecord>>;

    /// Returned rentals checked back in on or after `since`, across all
    /// sites and types. Used by the anomaly report.
    fn recently_returned(&self, checked_in_since: NaiveDate) -> Result<Vec<RentalRecord>>;
}

/// Persistence collaborator for serialized model state.
///
/// The serialized form is the JSON encoding of
/// [`fleetcast_core::rls::RlsState`]; it must round-trip with numeric
/// equality within floating-point tolerance.
pub trait ModelStore: Send + Sync {
    /// Every persisted (key, serialized state) pair.
    fn load_all(&self) -> Result<Vec<(ModelKey, String)>>;

    /// The persisted state for one key, if any.
    fn load(&self, key: &ModelKey) -> Result<Option<String>>;

    /// Insert or replace the state for a key.
    fn upsert(&self, key: &ModelKey, state: &str) -> Result<()>;
}
