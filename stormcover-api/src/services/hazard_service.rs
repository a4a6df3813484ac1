use stormcover_shared::clients::llm::LlmClient;

use crate::models::{HazardPrediction, WeatherRecord};

/// Derives a hazard prediction for an ingested weather record. Backed by
/// an OpenAI-compatible endpoint when configured; otherwise, and on any
/// call or parse failure, falls back to a mock prediction so ingestion
/// never stalls on the LLM.
pub struct HazardPredictor {
    llm: Option<LlmClient>,
}

impl HazardPredictor {
    pub fn new(endpoint: &str, api_key: &str, model: &str) -> Self {
        if endpoint.is_empty() || api_key.is_empty() {
            tracing::warn!("LLM credentials not configured, hazard prediction will return mock data");
            return Self { llm: None };
        }

        Self {
            llm: Some(LlmClient::new(endpoint, api_key, model)),
        }
    }

    pub async fn predict(&self, record: &WeatherRecord) -> HazardPrediction {
        let Some(llm) = &self.llm else {
            return mock_prediction(&record.city);
        };

        let prompt = build_prompt(record);

        match llm.complete(&prompt).await {
            Ok(reply) => match parse_reply(&reply) {
                Some(prediction) => prediction,
                None => {
                    tracing::error!(city = %record.city, "LLM reply was not a valid hazard prediction");
                    mock_prediction(&record.city)
                }
            },
            Err(e) => {
                tracing::error!(city = %record.city, error = %e, "hazard prediction call failed");
                mock_prediction(&record.city)
            }
        }
    }
}

fn build_prompt(record: &WeatherRecord) -> String {
    let weather_json =
        serde_json::to_string(&record.weather).unwrap_or_else(|_| "{}".to_string());

    format!(
        "You are a weather hazard expert. Analyze the following weather data for {city} \
         and predict the risk percentage (0-100) for various hazards.\n\
         Return ONLY a valid JSON object with the following structure, no markdown formatting:\n\
         {{\n\
           \"city\": \"{city}\",\n\
           \"fire_risk_percent\": 0,\n\
           \"flood_risk_percent\": 0,\n\
           \"storm_risk_percent\": 0,\n\
           \"heat_wave_risk_percent\": 0,\n\
           \"snow_risk_percent\": 0,\n\
           \"explanation\": \"\"\n\
         }}\n\n\
         Weather Data:\n{weather}",
        city = record.city,
        weather = weather_json,
    )
}

/// Models sometimes wrap the JSON in markdown fences despite the prompt.
fn parse_reply(reply: &str) -> Option<HazardPrediction> {
    let cleaned = reply
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    serde_json::from_str(&cleaned).ok()
}

fn mock_prediction(city: &str) -> HazardPrediction {
    HazardPrediction {
        city: city.to_string(),
        fire_risk_percent: 5,
        flood_risk_percent: 5,
        storm_risk_percent: 5,
        heat_wave_risk_percent: 5,
        snow_risk_percent: 0,
        explanation: "LLM not configured or failed. Returning mock data.".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_reply() {
        let reply = "```json\n{\"city\":\"Chicago\",\"fire_risk_percent\":60,\
                     \"flood_risk_percent\":0,\"storm_risk_percent\":10,\
                     \"heat_wave_risk_percent\":0,\"snow_risk_percent\":0,\
                     \"explanation\":\"dry and windy\"}\n```";

        let prediction = parse_reply(reply).unwrap();
        assert_eq!(prediction.city, "Chicago");
        assert_eq!(prediction.fire_risk_percent, 60);
        assert_eq!(prediction.explanation, "dry and windy");
    }

    #[test]
    fn rejects_non_json_reply() {
        assert!(parse_reply("I cannot help with that.").is_none());
    }

    #[test]
    fn missing_explanation_defaults_to_empty() {
        let reply = "{\"city\":\"Dallas\",\"fire_risk_percent\":0,\
                     \"flood_risk_percent\":30,\"storm_risk_percent\":0,\
                     \"heat_wave_risk_percent\":0,\"snow_risk_percent\":0}";

        let prediction = parse_reply(reply).unwrap();
        assert_eq!(prediction.flood_risk_percent, 30);
        assert!(prediction.explanation.is_empty());
    }

    #[test]
    fn mock_prediction_stays_below_alert_threshold() {
        let mock = mock_prediction("Phoenix");
        let labels = crate::hazards::extract_hazards(&mock, 20);
        assert!(labels.is_empty());
    }
}
