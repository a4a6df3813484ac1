use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::{Coordinates, WeatherDetails, WeatherRecord};
use crate::stores::WeatherRecordStore;

#[derive(Debug, Clone)]
pub struct CityInfo {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

// -- Open-Meteo response shapes (only the variables we request) --

#[derive(Debug, Deserialize)]
pub struct OpenMeteoResponse {
    pub current: Option<CurrentWeather>,
    pub daily: Option<DailyWeather>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CurrentWeather {
    #[serde(default)]
    pub temperature_2m: f64,
    #[serde(default)]
    pub relative_humidity_2m: i32,
    #[serde(default)]
    pub apparent_temperature: f64,
    #[serde(default)]
    pub precipitation: f64,
    #[serde(default)]
    pub snowfall: f64,
    #[serde(default = "default_weather_code")]
    pub weather_code: i32,
    #[serde(default)]
    pub cloud_cover: f64,
    #[serde(default)]
    pub surface_pressure: f64,
    #[serde(default)]
    pub wind_speed_10m: f64,
    #[serde(default)]
    pub wind_direction_10m: i32,
}

fn default_weather_code() -> i32 {
    -1
}

#[derive(Debug, Default, Deserialize)]
pub struct DailyWeather {
    #[serde(default)]
    pub sunrise: Vec<String>,
    #[serde(default)]
    pub sunset: Vec<String>,
    #[serde(default)]
    pub uv_index_max: Vec<f64>,
}

/// Thin client over the Open-Meteo forecast endpoint.
#[derive(Clone)]
pub struct ForecastClient {
    client: reqwest::Client,
    base_url: String,
}

impl ForecastClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn fetch_city(&self, city: &CityInfo, days: u8) -> Result<OpenMeteoResponse, String> {
        let url = format!(
            "{}?latitude={}&longitude={}\
             &current=temperature_2m,relative_humidity_2m,apparent_temperature,surface_pressure,\
             wind_speed_10m,wind_direction_10m,cloud_cover,precipitation,snowfall,weather_code\
             &daily=sunrise,sunset,uv_index_max\
             &forecast_days={}&timezone=auto",
            self.base_url, city.lat, city.lon, days
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("forecast request failed: {e}"))?;

        if !response.status().is_success() {
            return Err(format!("forecast API error: {}", response.status()));
        }

        response
            .json::<OpenMeteoResponse>()
            .await
            .map_err(|e| format!("forecast decode failed: {e}"))
    }
}

/// Map a raw forecast response into our unified record shape. Pure so
/// ingestion stays testable without the network.
pub fn map_to_record(
    city: &CityInfo,
    data: OpenMeteoResponse,
    id: String,
    created_at: DateTime<Utc>,
) -> WeatherRecord {
    let weather_code = data.current.as_ref().map(|c| c.weather_code).unwrap_or(-1);
    let current = data.current.unwrap_or_default();
    let daily = data.daily.unwrap_or_default();

    WeatherRecord {
        id,
        city: city.name.clone(),
        coordinates: Coordinates {
            lat: city.lat,
            lon: city.lon,
        },
        weather: WeatherDetails {
            temperature_c: current.temperature_2m,
            feels_like_c: current.apparent_temperature,
            humidity_percent: current.relative_humidity_2m,
            pressure_hpa: current.surface_pressure as i32,
            wind_speed_kph: current.wind_speed_10m,
            wind_direction_deg: current.wind_direction_10m,
            uv_index: daily.uv_index_max.first().copied().unwrap_or(0.0) as i32,
            cloud_cover_percent: current.cloud_cover as i32,
            precipitation_mm: current.precipitation,
            snowfall_cm: current.snowfall,
            condition: condition_from_wmo_code(weather_code).to_string(),
            sunrise: daily.sunrise.first().cloned().unwrap_or_default(),
            sunset: daily.sunset.first().cloned().unwrap_or_default(),
        },
        hazard_prediction: None,
        is_notification_sent: false,
        notification_sent_date: None,
        created_at,
    }
}

pub fn condition_from_wmo_code(code: i32) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        61 | 63 | 65 => "Rain",
        71 | 73 | 75 => "Snow",
        95 | 96 | 99 => "Thunderstorm",
        _ => "Unknown",
    }
}

/// Load the city roster from CSV (`name,state,lat,lon` with a header
/// row). Falls back to a builtin list of large US cities when the file
/// is missing or unreadable.
pub fn load_cities(csv_path: &str) -> Vec<CityInfo> {
    match std::fs::read_to_string(Path::new(csv_path)) {
        Ok(contents) => {
            let cities: Vec<CityInfo> = contents
                .lines()
                .skip(1)
                .filter_map(parse_city_line)
                .collect();
            if cities.is_empty() {
                tracing::warn!(path = %csv_path, "cities CSV empty, using builtin roster");
                builtin_cities()
            } else {
                tracing::info!(count = cities.len(), path = %csv_path, "loaded city roster");
                cities
            }
        }
        Err(e) => {
            tracing::warn!(path = %csv_path, error = %e, "cities CSV unavailable, using builtin roster");
            builtin_cities()
        }
    }
}

fn parse_city_line(line: &str) -> Option<CityInfo> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < 4 {
        return None;
    }
    let lat = parts[2].trim().parse::<f64>().ok()?;
    let lon = parts[3].trim().parse::<f64>().ok()?;
    Some(CityInfo {
        name: parts[0].trim().to_string(),
        lat,
        lon,
    })
}

fn builtin_cities() -> Vec<CityInfo> {
    [
        ("New York", 40.7128, -74.0060),
        ("Los Angeles", 34.0522, -118.2437),
        ("Chicago", 41.8781, -87.6298),
        ("Houston", 29.7604, -95.3698),
        ("Phoenix", 33.4484, -112.0740),
        ("Philadelphia", 39.9526, -75.1652),
        ("San Antonio", 29.4241, -98.4936),
        ("San Diego", 32.7157, -117.1611),
        ("Dallas", 32.7767, -96.7970),
        ("San Jose", 37.3382, -121.8863),
    ]
    .into_iter()
    .map(|(name, lat, lon)| CityInfo {
        name: name.to_string(),
        lat,
        lon,
    })
    .collect()
}

/// The active-set reduction: drop notified records, then keep the
/// most-recently-generated record per city, ties broken by the larger
/// id. Works on the full unsorted set; no store-side grouping assumed.
/// Output is sorted by city name.
pub fn latest_per_city(records: Vec<WeatherRecord>) -> Vec<WeatherRecord> {
    let mut by_city: HashMap<String, WeatherRecord> = HashMap::new();

    for record in records {
        if record.is_notification_sent {
            continue;
        }
        let newer = match by_city.get(&record.city) {
            Some(current) => {
                (record.created_at, record.id.as_str())
                    > (current.created_at, current.id.as_str())
            }
            None => true,
        };
        if newer {
            by_city.insert(record.city.clone(), record);
        }
    }

    let mut selected: Vec<WeatherRecord> = by_city.into_values().collect();
    selected.sort_by(|a, b| a.city.cmp(&b.city));
    selected
}

/// Currently live hazard records, one per city. A store failure is
/// logged and degrades to an empty list; this path never raises.
pub fn get_active_hazards(store: &dyn WeatherRecordStore) -> Vec<WeatherRecord> {
    match store.list_unnotified() {
        Ok(records) => latest_per_city(records),
        Err(e) => {
            tracing::error!(error = %e, "failed to query weather records, returning no active hazards");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use crate::stores::{MemoryWeatherStore, StoreError, StoreResult};

    use super::*;

    fn record(id: &str, city: &str, hour: u32, notified: bool) -> WeatherRecord {
        WeatherRecord {
            id: id.into(),
            city: city.into(),
            coordinates: Coordinates::default(),
            weather: WeatherDetails::default(),
            hazard_prediction: None,
            is_notification_sent: notified,
            notification_sent_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap(),
        }
    }

    #[test]
    fn keeps_newest_record_per_city() {
        let records = vec![
            record("a", "Chicago", 6, false),
            record("b", "Chicago", 9, false),
            record("c", "Dallas", 7, false),
        ];

        let selected = latest_per_city(records);
        let ids: Vec<&str> = selected.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn notified_records_never_selected() {
        let records = vec![
            record("a", "Chicago", 9, true),
            record("b", "Chicago", 6, false),
        ];

        let selected = latest_per_city(records);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "b");
    }

    #[test]
    fn city_with_only_notified_records_drops_out() {
        let records = vec![record("a", "Chicago", 9, true)];
        assert!(latest_per_city(records).is_empty());
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let records = vec![
            record("a", "Chicago", 9, false),
            record("z", "Chicago", 9, false),
            record("m", "Chicago", 9, false),
        ];

        let selected = latest_per_city(records);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "z");
    }

    struct UnreachableStore;

    impl crate::stores::WeatherRecordStore for UnreachableStore {
        fn list_unnotified(&self) -> StoreResult<Vec<WeatherRecord>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn get(&self, _id: &str, _city: &str) -> StoreResult<Option<WeatherRecord>> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn upsert(&self, _record: &WeatherRecord) -> StoreResult<()> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        fn mark_notified(
            &self,
            _id: &str,
            _city: &str,
            _sent_at: DateTime<Utc>,
        ) -> StoreResult<bool> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn unreachable_store_degrades_to_empty() {
        assert!(get_active_hazards(&UnreachableStore).is_empty());
    }

    #[test]
    fn active_hazards_read_through_store() {
        let store = MemoryWeatherStore::new();
        store.upsert(&record("a", "Chicago", 6, false)).unwrap();
        store.upsert(&record("b", "Chicago", 9, false)).unwrap();

        let active = get_active_hazards(&store);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, "b");
    }

    #[test]
    fn wmo_code_mapping_covers_known_groups() {
        assert_eq!(condition_from_wmo_code(0), "Clear sky");
        assert_eq!(condition_from_wmo_code(48), "Fog");
        assert_eq!(condition_from_wmo_code(65), "Rain");
        assert_eq!(condition_from_wmo_code(99), "Thunderstorm");
        assert_eq!(condition_from_wmo_code(-1), "Unknown");
    }

    #[test]
    fn city_line_parsing_skips_malformed_rows() {
        assert!(parse_city_line("Chicago,IL,41.8781,-87.6298").is_some());
        assert!(parse_city_line("Chicago,IL").is_none());
        assert!(parse_city_line("Chicago,IL,not-a-number,-87.6").is_none());
    }
}
