use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use stormcover_shared::errors::AppResult;
use stormcover_shared::types::ApiResponse;

use crate::models::WeatherRecord;
use crate::services::weather_service;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub days: Option<u8>,
}

/// GET /weather/fetch
/// Run one ingestion sweep: fetch the forecast for every city in the
/// roster, attach a hazard prediction, and upsert the record. Per-city
/// failures skip that city only.
pub async fn fetch_weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FetchParams>,
) -> AppResult<Json<ApiResponse<Vec<WeatherRecord>>>> {
    let days = params.days.unwrap_or(state.config.forecast_days);
    tracing::info!(days = days, cities = state.cities.len(), "fetching weather");

    let mut results = Vec::new();

    for city in &state.cities {
        let data = match state.forecast.fetch_city(city, days).await {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(city = %city.name, error = %e, "failed to fetch weather");
                continue;
            }
        };

        let mut record =
            weather_service::map_to_record(city, data, Uuid::new_v4().to_string(), Utc::now());

        let prediction = state.predictor.predict(&record).await;
        record.hazard_prediction = Some(prediction);

        if let Err(e) = state.weather_records.upsert(&record) {
            tracing::error!(city = %city.name, error = %e, "failed to persist weather record");
        }

        results.push(record);
    }

    Ok(Json(ApiResponse::ok(results)))
}
