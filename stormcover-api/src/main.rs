use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use stormcover_shared::clients::db;
use stormcover_shared::clients::email::{EmailClient, EmailSender, SimulatedSender};

mod config;
mod hazards;
mod models;
mod routes;
mod schema;
mod services;
mod stores;

use config::AppConfig;
use services::hazard_service::HazardPredictor;
use services::weather_service::{self, CityInfo, ForecastClient};
use stores::{
    MemoryNotificationLogStore, MemoryWeatherStore, NotificationLogStore, PgNotificationLogStore,
    PgWeatherStore, StaticUserDirectory, UserDirectory, WeatherRecordStore,
};

pub struct AppState {
    pub config: AppConfig,
    pub cities: Vec<CityInfo>,
    pub users: Arc<dyn UserDirectory>,
    pub weather_records: Arc<dyn WeatherRecordStore>,
    pub notification_logs: Arc<dyn NotificationLogStore>,
    pub email: Arc<dyn EmailSender>,
    pub forecast: ForecastClient,
    pub predictor: HazardPredictor,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stormcover_shared::middleware::init_tracing("stormcover-api");

    let config = AppConfig::load()?;
    let port = config.port;

    let (weather_records, notification_logs): (
        Arc<dyn WeatherRecordStore>,
        Arc<dyn NotificationLogStore>,
    ) = if config.database_url.is_empty() {
        tracing::warn!("no database configured, using in-memory stores");
        (
            Arc::new(MemoryWeatherStore::new()),
            Arc::new(MemoryNotificationLogStore::new()),
        )
    } else {
        let pool = db::create_pool(&config.database_url)?;
        (
            Arc::new(PgWeatherStore::new(pool.clone())),
            Arc::new(PgNotificationLogStore::new(pool)),
        )
    };

    let email: Arc<dyn EmailSender> = if config.email_api_key.is_empty() {
        Arc::new(SimulatedSender)
    } else {
        Arc::new(EmailClient::new(
            &config.email_api_key,
            &config.email_from_address,
            &config.email_from_name,
        ))
    };

    let cities = weather_service::load_cities(&config.cities_csv_path);
    let forecast = ForecastClient::new(&config.open_meteo_base_url);
    let predictor = HazardPredictor::new(&config.llm_endpoint, &config.llm_api_key, &config.llm_model);

    let state = Arc::new(AppState {
        config,
        cities,
        users: Arc::new(StaticUserDirectory::new()),
        weather_records,
        notification_logs,
        email,
        forecast,
        predictor,
    });

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/weather/fetch", get(routes::weather::fetch_weather))
        .route("/alerts", get(routes::alerts::list_active_groups))
        .route("/alerts/group", get(routes::alerts::city_group))
        .route("/alerts/send", post(routes::alerts::send_notifications))
        .route("/alerts/resend/:id", get(routes::alerts::resend_view))
        .route("/alerts/history", get(routes::alerts::sent_history))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "stormcover-api starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
