use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Empty string means "no database": the service falls back to
    /// in-memory stores and logs a warning.
    #[serde(default)]
    pub database_url: String,
    /// A hazard is actionable once its risk percentage is strictly above
    /// this value.
    #[serde(default = "default_risk_threshold")]
    pub risk_threshold_percent: i32,
    #[serde(default = "default_open_meteo_base_url")]
    pub open_meteo_base_url: String,
    #[serde(default = "default_cities_csv_path")]
    pub cities_csv_path: String,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u8,
    #[serde(default)]
    pub llm_endpoint: String,
    #[serde(default)]
    pub llm_api_key: String,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default)]
    pub email_api_key: String,
    #[serde(default = "default_email_from_address")]
    pub email_from_address: String,
    #[serde(default = "default_email_from_name")]
    pub email_from_name: String,
}

fn default_port() -> u16 { 3001 }
fn default_risk_threshold() -> i32 { 20 }
fn default_open_meteo_base_url() -> String { "https://api.open-meteo.com/v1/forecast".into() }
fn default_cities_csv_path() -> String { "data/us_cities.csv".into() }
fn default_forecast_days() -> u8 { 15 }
fn default_llm_model() -> String { "gpt-4o-mini".into() }
fn default_email_from_address() -> String { "alerts@stormcover.example".into() }
fn default_email_from_name() -> String { "Stormcover Alerts".into() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            database_url: String::new(),
            risk_threshold_percent: default_risk_threshold(),
            open_meteo_base_url: default_open_meteo_base_url(),
            cities_csv_path: default_cities_csv_path(),
            forecast_days: default_forecast_days(),
            llm_endpoint: String::new(),
            llm_api_key: String::new(),
            llm_model: default_llm_model(),
            email_api_key: String::new(),
            email_from_address: default_email_from_address(),
            email_from_name: default_email_from_name(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("STORMCOVER").separator("__"))
            .build()?;
        Ok(config.try_deserialize().unwrap_or_default())
    }
}
