// Incident Insights API v0.1
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod data;
mod errors;
mod helpers;
mod routes;
mod services;

use config::AppConfig;
use data::loader::NormalizeOptions;
use data::store::DatasetCache;
use routes::incidents::AppState;
use services::landmask::CoarseLandMask;
use services::weather::{WeatherCache, WeatherClient};

/// Incident Insights API — OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Incident Insights API",
        version = "0.1.0",
        description = "Analytics over a NERIS-style incident-report extract. \
            Normalizes the raw CSV once at startup, serves filtered record \
            pages with cascading filter options and aggregate tables, and \
            correlates the busiest days with daily weather observations.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Dataset", description = "Loaded dataset provenance"),
        (name = "Incidents", description = "Filtered queries and day deep dives"),
        (name = "Correlation", description = "Busiest-day weather correlation"),
    ),
    paths(
        routes::health::health_check,
        routes::dataset::get_dataset_summary,
        routes::dataset::reload_dataset,
        routes::incidents::query_incidents,
        routes::incidents::get_day_detail,
        routes::correlation::run_correlation,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::dataset::DatasetResponse,
            routes::incidents::QueryRequest,
            routes::incidents::QueryResponse,
            routes::incidents::Aggregates,
            routes::incidents::MapCenter,
            routes::incidents::DayDetailResponse,
            routes::correlation::CorrelationRequest,
            routes::correlation::CorrelationResponse,
            data::models::IncidentRecord,
            data::models::FilterCriteria,
            data::models::LocationFilter,
            data::models::DailyAggregate,
            data::models::WeatherSample,
            services::filter::CascadeOptions,
            services::aggregate::HourCount,
            services::aggregate::CategoryShare,
            services::aggregate::ValueCount,
            services::aggregate::AlarmPresenceRates,
            services::correlate::DayCorrelation,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "incident_insights_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    // Load and normalize the dataset. A missing file or missing required
    // column means nothing sensible can be served; bail out.
    let data_file = std::path::PathBuf::from(&config.data_file);
    let classifier = CoarseLandMask;
    let normalize = NormalizeOptions {
        require_positive_durations: config.strict_durations,
    };
    let dataset_cache = DatasetCache::new();
    let dataset = match dataset_cache.load(&data_file, &classifier, normalize) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::error!("Failed to load dataset from {}: {}", config.data_file, e);
            std::process::exit(1);
        }
    };
    if dataset.records.is_empty() {
        tracing::warn!(
            "Dataset {} has no usable rows ({} dropped)",
            config.data_file,
            dataset.dropped_rows
        );
    }

    let weather_client = config
        .openweather_api_key
        .as_deref()
        .map(|key| WeatherClient::new(&config.openweather_base_url, key));
    if weather_client.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set, weather correlation disabled");
    }

    let app_state = AppState {
        dataset: Arc::new(std::sync::RwLock::new(dataset)),
        dataset_cache: Arc::new(dataset_cache),
        data_file: Arc::new(data_file),
        classifier: Arc::new(classifier),
        normalize,
        weather_client,
        weather_cache: Arc::new(WeatherCache::new()),
    };

    // CORS — query endpoints are POST with a JSON body
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/dataset", get(routes::dataset::get_dataset_summary))
        .route(
            "/api/v1/dataset/reload",
            post(routes::dataset::reload_dataset),
        )
        .route(
            "/api/v1/incidents/query",
            post(routes::incidents::query_incidents),
        )
        .route(
            "/api/v1/incidents/day/:date",
            get(routes::incidents::get_day_detail),
        )
        .route(
            "/api/v1/correlation",
            post(routes::correlation::run_correlation),
        )
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .await
        .expect("Server terminated unexpectedly");
}
