//! Fleet insights: rental demand forecasting and utilization anomalies.
//!
//! This is a separate, simpler forecast path from
//! [`crate::service::ForecastingService`]: it runs classical smoothing
//! directly on daily rental check-out counts and never touches the
//! per-key adaptive models. Both paths exist side by side on purpose.

use crate::sources::RentalSource;
use crate::types::{PredictionPoint, RentalRecord, RentalStatus};
use chrono::{Duration, Months, NaiveDate, Utc};
use fleetcast_core::smoothing::{
    double_exponential_smoothing, moving_average_forecast, SmoothingForecast, DEFAULT_ALPHA,
    DEFAULT_BETA, DEFAULT_WINDOW,
};
use fleetcast_core::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Demand series length at which double exponential smoothing is trusted
/// over a plain moving average.
pub const SMOOTHING_MIN_POINTS: usize = 14;

/// Trailing window of rental history feeding the demand series, in months.
const DEMAND_WINDOW_MONTHS: u32 = 6;

/// A returned rental is anomalous when idle hours exceed this fraction of
/// engine hours.
pub const IDLE_RATIO_THRESHOLD: f64 = 0.6;

/// Which smoothing method produced a demand forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandMethod {
    DoubleExponential,
    MovingAverage,
    /// No historical demand at all; the forecast is all zeros.
    None,
}

/// One day of observed rental demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandPoint {
    pub date: NaiveDate,
    pub demand: f64,
}

/// Demand forecast over rental check-out counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandForecast {
    pub method: DemandMethod,
    pub history: Vec<DemandPoint>,
    pub predictions: Vec<PredictionPoint>,
}

/// A returned rental flagged for excessive idle time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtilizationAnomaly {
    pub rental_id: i64,
    pub equipment_id: i64,
    pub idle_hours: f64,
    pub engine_hours: f64,
    /// `idle / engine * 100`
    pub idle_percentage: f64,
}

/// Build the daily demand series from returned rentals: check-outs grouped
/// by calendar day, ascending. Days with no check-outs are omitted (the
/// smoothing methods operate on the observed series as-is).
pub fn demand_series(rentals: &[RentalRecord]) -> Vec<DemandPoint> {
    let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for rental in rentals {
        if rental.status == RentalStatus::Returned {
            *by_date.entry(rental.check_out_date).or_insert(0.0) += 1.0;
        }
    }
    by_date
        .into_iter()
        .map(|(date, demand)| DemandPoint { date, demand })
        .collect()
}

/// Select a smoothing method by data volume and run it.
///
/// 14 or more points → double exponential smoothing; at least one point →
/// moving average; none → all-zero forecast.
pub fn demand_forecast_values(
    values: &[f64],
    horizon: usize,
) -> (SmoothingForecast, DemandMethod) {
    if values.len() >= SMOOTHING_MIN_POINTS {
        (
            double_exponential_smoothing(values, DEFAULT_ALPHA, DEFAULT_BETA, horizon),
            DemandMethod::DoubleExponential,
        )
    } else if !values.is_empty() {
        (
            moving_average_forecast(values, DEFAULT_WINDOW, horizon),
            DemandMethod::MovingAverage,
        )
    } else {
        (SmoothingForecast::zeros(horizon), DemandMethod::None)
    }
}

/// Flag returned rentals whose idle time exceeds the threshold fraction of
/// engine time. Rentals missing either telemetry value, or with no engine
/// hours at all, are never flagged (the idle ratio is undefined without
/// engine time).
pub fn utilization_anomalies(rentals: &[RentalRecord]) -> Vec<UtilizationAnomaly> {
    rentals
        .iter()
        .filter_map(|rental| {
            let idle = rental.idle_hours_per_day?;
            let engine = rental.engine_hours_per_day?;
            if engine > 0.0 && idle > IDLE_RATIO_THRESHOLD * engine {
                Some(UtilizationAnomaly {
                    rental_id: rental.rental_id,
                    equipment_id: rental.equipment_id,
                    idle_hours: idle,
                    engine_hours: engine,
                    idle_percentage: idle / engine * 100.0,
                })
            } else {
                None
            }
        })
        .collect()
}

/// Insights facade over a rental data source.
pub struct DemandInsights {
    rentals: Arc<dyn RentalSource>,
}

impl DemandInsights {
    pub fn new(rentals: Arc<dyn RentalSource>) -> Self {
        Self { rentals }
    }

    /// Forecast rental demand for an optional (site, equipment type)
    /// filter over the trailing six months of returned rentals.
    pub fn demand_forecast(
        &self,
        site_id: Option<i64>,
        equipment_type: Option<&str>,
        horizon: usize,
    ) -> Result<DemandForecast> {
        let today = Utc::now().date_naive();
        let since = today
            .checked_sub_months(Months::new(DEMAND_WINDOW_MONTHS))
            .unwrap_or(today);

        let rentals = self.rentals.returned_rentals(site_id, equipment_type, since)?;
        let history = demand_series(&rentals);
        let values: Vec<f64> = history.iter().map(|p| p.demand).collect();

        let (smoothed, method) = demand_forecast_values(&values, horizon);

        // Forecast dates continue from the last observed day, or from
        // today when there is no history at all.
        let base_date = history.last().map(|p| p.date).unwrap_or(today);
        let predictions = smoothed
            .forecast
            .iter()
            .zip(smoothed.lower.iter())
            .zip(smoothed.upper.iter())
            .enumerate()
            .map(|(i, ((&estimate, &lower), &upper))| PredictionPoint {
                date: base_date + Duration::days(i as i64 + 1),
                point_estimate: estimate,
                lower,
                upper,
            })
            .collect();

        Ok(DemandForecast {
            method,
            history,
            predictions,
        })
    }

    /// Utilization anomalies among rentals returned in the trailing
    /// `window_days` days.
    pub fn anomalies(&self, window_days: i64) -> Result<Vec<UtilizationAnomaly>> {
        let since = Utc::now().date_naive() - Duration::days(window_days);
        let rentals = self.rentals.recently_returned(since)?;
        Ok(utilization_anomalies(&rentals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rental(
        rental_id: i64,
        check_out: NaiveDate,
        idle: Option<f64>,
        engine: Option<f64>,
    ) -> RentalRecord {
        RentalRecord {
            rental_id,
            equipment_id: 100 + rental_id,
            site_id: Some(1),
            equipment_type: "Excavator".to_string(),
            status: RentalStatus::Returned,
            check_out_date: check_out,
            check_in_date: Some(check_out + Duration::days(3)),
            idle_hours_per_day: idle,
            engine_hours_per_day: engine,
        }
    }

    // ==========================================================================
    // Demand Series Tests
    // ==========================================================================

    #[test]
    fn test_demand_series_groups_by_checkout_day() {
        let rentals = vec![
            rental(1, date(2026, 8, 2), None, None),
            rental(2, date(2026, 8, 1), None, None),
            rental(3, date(2026, 8, 2), None, None),
        ];

        let series = demand_series(&rentals);

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, date(2026, 8, 1));
        assert_eq!(series[0].demand, 1.0);
        assert_eq!(series[1].date, date(2026, 8, 2));
        assert_eq!(series[1].demand, 2.0);
    }

    #[test]
    fn test_demand_series_ignores_active_rentals() {
        let mut active = rental(1, date(2026, 8, 1), None, None);
        active.status = RentalStatus::Active;

        assert!(demand_series(&[active]).is_empty());
    }

    // ==========================================================================
    // Method Selection Tests
    // ==========================================================================

    #[test]
    fn test_fourteen_points_selects_double_exponential() {
        let values: Vec<f64> = (1..=14).map(|i| i as f64).collect();
        let (forecast, method) = demand_forecast_values(&values, 7);

        assert_eq!(method, DemandMethod::DoubleExponential);
        assert_eq!(forecast.forecast.len(), 7);
    }

    #[test]
    fn test_few_points_selects_moving_average() {
        let values = vec![3.0, 4.0, 5.0];
        let (forecast, method) = demand_forecast_values(&values, 7);

        assert_eq!(method, DemandMethod::MovingAverage);
        assert!((forecast.forecast[0] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_points_yields_zero_forecast() {
        let (forecast, method) = demand_forecast_values(&[], 5);

        assert_eq!(method, DemandMethod::None);
        assert_eq!(forecast.forecast, vec![0.0; 5]);
        assert_eq!(forecast.upper, vec![0.0; 5]);
        assert_eq!(forecast.lower, vec![0.0; 5]);
    }

    // ==========================================================================
    // Anomaly Tests
    // ==========================================================================

    #[test]
    fn test_high_idle_ratio_is_flagged() {
        // 5 > 0.6 * 8 = 4.8
        let rentals = vec![rental(1, date(2026, 8, 1), Some(5.0), Some(8.0))];
        let anomalies = utilization_anomalies(&rentals);

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].rental_id, 1);
        assert!((anomalies[0].idle_percentage - 62.5).abs() < 1e-9);
    }

    #[test]
    fn test_idle_at_threshold_is_not_flagged() {
        // 4 <= 0.6 * 8 = 4.8
        let rentals = vec![rental(1, date(2026, 8, 1), Some(4.0), Some(8.0))];
        assert!(utilization_anomalies(&rentals).is_empty());
    }

    #[test]
    fn test_zero_engine_hours_is_never_flagged() {
        // Any positive idle would exceed 0.6 * 0, but the ratio is
        // undefined without engine time.
        let rentals = vec![rental(1, date(2026, 8, 1), Some(3.0), Some(0.0))];
        assert!(utilization_anomalies(&rentals).is_empty());
    }

    #[test]
    fn test_missing_telemetry_is_never_flagged() {
        let rentals = vec![
            rental(1, date(2026, 8, 1), Some(9.0), None),
            rental(2, date(2026, 8, 1), None, Some(8.0)),
            rental(3, date(2026, 8, 1), None, None),
        ];
        assert!(utilization_anomalies(&rentals).is_empty());
    }

    #[test]
    fn test_mixed_rentals_flags_only_offenders() {
        let rentals = vec![
            rental(1, date(2026, 8, 1), Some(5.0), Some(8.0)),
            rental(2, date(2026, 8, 1), Some(1.0), Some(8.0)),
            rental(3, date(2026, 8, 1), Some(7.0), Some(8.0)),
        ];
        let anomalies = utilization_anomalies(&rentals);

        let flagged: Vec<i64> = anomalies.iter().map(|a| a.rental_id).collect();
        assert_eq!(flagged, vec![1, 3]);
    }
}
