//! # fleetcast-core
//!
//! Numeric primitives for equipment demand forecasting.
//!
//! ## Components
//!
//! - [`smoothing`] — Classical time series smoothing: simple and double
//!   (Holt's linear trend) exponential smoothing, moving-average forecasts
//!   with confidence bounds
//! - [`rls`] — Recursive Least Squares: an online adaptive linear model
//!   with exponential forgetting
//! - [`features`] — Feature engineering for daily demand models (lag
//!   values, day-of-week one-hot, weather)
//!
//! The crate is deliberately free of any storage or transport concern; it
//! operates on plain `f64` slices and owned state buffers so it can be
//! driven from any service layer.
//!
//! ## Example
//!
//! ```rust
//! use fleetcast_core::prelude::*;
//!
//! let demand = vec![4.0, 5.0, 3.0, 6.0, 4.0, 7.0, 5.0];
//! let result = moving_average_forecast(&demand, DEFAULT_WINDOW, 3);
//! assert_eq!(result.forecast.len(), 3);
//! ```

pub mod error;
pub mod features;
pub mod rls;
pub mod smoothing;

pub use error::{ForecastError, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{ForecastError, Result};
    pub use crate::features::{build_features, WeatherFeature, FEATURE_DIM};
    pub use crate::rls::{Rls, RlsState, DEFAULT_LAMBDA};
    pub use crate::smoothing::{
        double_exponential_smoothing, moving_average_forecast, simple_exponential_smoothing,
        SmoothingForecast, DEFAULT_ALPHA, DEFAULT_BETA, DEFAULT_WINDOW,
    };
}
