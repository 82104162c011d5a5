//! # fleetcast-service
//!
//! Orchestration layer for equipment demand forecasting.
//!
//! ## Components
//!
//! - [`service`] — [`ForecastingService`](service::ForecastingService):
//!   owns one adaptive model per (site, equipment type) key, trains them
//!   incrementally from daily usage, persists model state through a
//!   storage collaborator, and produces multi-day forecasts with
//!   confidence bounds
//! - [`insights`] — a separate, simpler forecast path over raw rental
//!   counts plus utilization anomaly detection
//! - [`sources`] — collaborator contracts (usage, weather, rentals, model
//!   persistence)
//! - [`memory`] — in-memory reference implementations of the contracts
//!
//! The two forecast paths are deliberately independent: the service path
//! runs the per-key RLS models, the insights path runs classical smoothing
//! directly on rental check-out counts.

pub mod insights;
pub mod memory;
pub mod service;
pub mod sources;
pub mod types;

pub use fleetcast_core::error::{ForecastError, Result};
pub use insights::{DemandForecast, DemandInsights, DemandMethod, UtilizationAnomaly};
pub use service::{ForecastingService, LoadReport, SkippedState};
pub use types::{ForecastResult, HistoryPoint, ModelKey, PredictionPoint, UsageSample};
