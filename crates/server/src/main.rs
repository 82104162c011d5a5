//! # fleetcast-server
//!
//! REST API server for the fleetcast demand forecasting engine. Wires the
//! forecasting service and the insights layer to in-memory collaborators
//! seeded with a small deterministic demo fleet.

use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use fleetcast_core::features::WeatherFeature;
use fleetcast_service::insights::DemandInsights;
use fleetcast_service::memory::{
    MemoryModelStore, MemoryRentalSource, MemoryUsageSource, MemoryWeatherSource,
};
use fleetcast_service::service::ForecastingService;
use fleetcast_service::types::{RentalRecord, RentalStatus};
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod routes;

/// Concrete service type behind the handlers.
pub type AppService =
    ForecastingService<MemoryUsageSource, MemoryWeatherSource, MemoryModelStore>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AppService>,
    pub insights: Arc<DemandInsights>,
}

/// Liveness probe - is the server running?
async fn liveness() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Readiness probe - verifies the forecasting primitives are functional.
async fn readiness() -> Json<serde_json::Value> {
    let level = fleetcast_core::smoothing::simple_exponential_smoothing(&[1.0, 2.0, 3.0], 0.3);
    let healthy = level.is_finite();
    Json(serde_json::json!({
        "status": if healthy { "ready" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "checks": [{ "name": "smoothing", "healthy": healthy }]
    }))
}

/// Seed the in-memory collaborators with a deterministic demo fleet so the
/// API has data to serve out of the box.
fn seed_demo(
    usage: &MemoryUsageSource,
    weather: &MemoryWeatherSource,
    rentals: &MemoryRentalSource,
) {
    let today = Utc::now().date_naive();
    // Four weeks of a weekly demand pattern for two keys.
    let pattern = [4u32, 5, 3, 6, 4, 7, 5];

    for day in 0..28i64 {
        let date = today - Duration::days(28 - day);
        let demand = pattern[(day % 7) as usize];

        for _ in 0..demand {
            usage.record_checkout(1, "Excavator", date);
        }
        for _ in 0..demand.saturating_sub(2) {
            usage.record_checkout(1, "Crane", date);
        }

        weather.set_weather(
            1,
            date,
            WeatherFeature {
                temperature_c: 15.0 + (day % 7) as f64,
                precipitation_mm: if day % 5 == 0 { 4.0 } else { 0.0 },
                wind_kph: 12.0,
            },
        );

        rentals.push(RentalRecord {
            rental_id: day,
            equipment_id: 1000 + day,
            site_id: Some(1),
            equipment_type: "Excavator".to_string(),
            status: RentalStatus::Returned,
            check_out_date: date,
            check_in_date: Some(date + Duration::days(2)),
            idle_hours_per_day: Some(if day % 9 == 0 { 6.0 } else { 2.0 }),
            engine_hours_per_day: Some(8.0),
        });
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (optional - won't fail if missing)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,fleetcast_service=info,tower_http=info".into()),
        )
        .init();

    // Collaborators (in-memory reference implementations)
    let usage = MemoryUsageSource::new();
    let weather = MemoryWeatherSource::new();
    let store = MemoryModelStore::new();
    let rentals = Arc::new(MemoryRentalSource::new());
    seed_demo(&usage, &weather, &rentals);

    let service = Arc::new(ForecastingService::new(usage, weather, store));
    match service.initialize() {
        Ok(report) => tracing::info!(
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "model registry ready"
        ),
        Err(err) => tracing::error!(%err, "model registry initialization failed"),
    }

    let state = AppState {
        service,
        insights: Arc::new(DemandInsights::new(rentals)),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router with middleware
    let app = Router::new()
        // Health endpoints (Kubernetes-compatible)
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        // API endpoints
        .route("/api/v1/forecast", get(routes::forecast))
        .route("/api/v1/train", post(routes::train))
        .route("/api/v1/insights/forecast", get(routes::insights_forecast))
        .route("/api/v1/insights/anomalies", get(routes::insights_anomalies))
        // Middleware layers
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    // Server configuration from environment
    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8080".to_string())
        .parse()
        .expect("PORT must be a valid number");
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("Invalid HOST:PORT configuration");

    tracing::info!(
        "fleetcast-server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
