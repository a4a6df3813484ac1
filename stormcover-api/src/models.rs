use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Partition label for a NotificationLog whose batch spans more than one
/// city. Not a real city; the resend path skips it.
pub const MULTI_CITY_PARTITION: &str = "Multiple";

/// Discriminator letting NotificationLog coexist with weather records in
/// a shared document store.
pub const NOTIFICATION_RECORD_TYPE: &str = "Notification";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coverage {
    pub id: i32,
    pub name: String,
    pub details: String,
}

/// Read-only input owned by the external user directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    pub coverages: Vec<Coverage>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeatherDetails {
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub humidity_percent: i32,
    pub pressure_hpa: i32,
    pub wind_speed_kph: f64,
    pub wind_direction_deg: i32,
    pub uv_index: i32,
    pub cloud_cover_percent: i32,
    pub precipitation_mm: f64,
    pub snowfall_cm: f64,
    pub condition: String,
    pub sunrise: String,
    pub sunset: String,
}

/// Five independent risk percentages, each in [0, 100]. Immutable once
/// produced; embedded 1:1 in a WeatherRecord.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardPrediction {
    pub city: String,
    pub fire_risk_percent: i32,
    pub flood_risk_percent: i32,
    pub storm_risk_percent: i32,
    pub heat_wave_risk_percent: i32,
    pub snow_risk_percent: i32,
    #[serde(default)]
    pub explanation: String,
}

/// One ingested weather snapshot, partitioned by city. Created by the
/// ingestion pipeline; only the notified flag and timestamp are ever
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: String,
    pub city: String,
    pub coordinates: Coordinates,
    pub weather: WeatherDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hazard_prediction: Option<HazardPrediction>,
    pub is_notification_sent: bool,
    pub notification_sent_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// View entity: one user missing coverage for at least one active hazard
/// in their city. `is_selected` is a reviewer choice, default true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtRiskUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub city: String,
    pub prediction_id: String,
    pub missing_coverage: String,
    #[serde(default = "default_selected")]
    pub is_selected: bool,
}

fn default_selected() -> bool {
    true
}

/// Derived per query, never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityHazardGroup {
    pub city: String,
    pub prediction_id: String,
    pub hazard_prediction: HazardPrediction,
    pub users: Vec<AtRiskUser>,
}

/// One outbound batch. Written once, then read-only; the resend path
/// rebuilds the original recipient view from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationLog {
    pub id: String,
    pub user_ids: Vec<i32>,
    pub coverage_ids: Vec<String>,
    pub email_subject: String,
    pub email_body_html: String,
    pub sent_date: DateTime<Utc>,
    /// Single city name, or MULTI_CITY_PARTITION for a spanning batch.
    pub city: String,
    pub cities: Vec<String>,
    pub prediction_id: String,
    #[serde(rename = "Type")]
    pub record_type: String,
}
