use std::fmt;

use crate::models::HazardPrediction;

/// The closed set of hazards the system alerts on, in canonical order.
/// Coverage names are matched against the display strings
/// case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HazardLabel {
    Fire,
    Flood,
    Storm,
    HeatWave,
    Snow,
}

impl HazardLabel {
    pub const ALL: [HazardLabel; 5] = [
        HazardLabel::Fire,
        HazardLabel::Flood,
        HazardLabel::Storm,
        HazardLabel::HeatWave,
        HazardLabel::Snow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HazardLabel::Fire => "Fire",
            HazardLabel::Flood => "Flood",
            HazardLabel::Storm => "Storm",
            HazardLabel::HeatWave => "Heat Wave",
            HazardLabel::Snow => "Snow",
        }
    }

    fn risk_percent(self, prediction: &HazardPrediction) -> i32 {
        match self {
            HazardLabel::Fire => prediction.fire_risk_percent,
            HazardLabel::Flood => prediction.flood_risk_percent,
            HazardLabel::Storm => prediction.storm_risk_percent,
            HazardLabel::HeatWave => prediction.heat_wave_risk_percent,
            HazardLabel::Snow => prediction.snow_risk_percent,
        }
    }
}

impl fmt::Display for HazardLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Labels whose risk percentage is strictly above `threshold_percent`,
/// in canonical order. Pure; an absent prediction is the caller's empty
/// set.
pub fn extract_hazards(prediction: &HazardPrediction, threshold_percent: i32) -> Vec<HazardLabel> {
    HazardLabel::ALL
        .into_iter()
        .filter(|label| label.risk_percent(prediction) > threshold_percent)
        .collect()
}

pub fn join_labels(labels: &[HazardLabel]) -> String {
    labels
        .iter()
        .map(|l| l.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(fire: i32, flood: i32, storm: i32, heat: i32, snow: i32) -> HazardPrediction {
        HazardPrediction {
            city: "Chicago".into(),
            fire_risk_percent: fire,
            flood_risk_percent: flood,
            storm_risk_percent: storm,
            heat_wave_risk_percent: heat,
            snow_risk_percent: snow,
            explanation: String::new(),
        }
    }

    #[test]
    fn threshold_is_strict() {
        let p = prediction(20, 21, 0, 0, 0);
        assert_eq!(extract_hazards(&p, 20), vec![HazardLabel::Flood]);
    }

    #[test]
    fn canonical_order_regardless_of_magnitude() {
        let p = prediction(30, 0, 99, 0, 45);
        let labels = extract_hazards(&p, 20);
        assert_eq!(
            labels,
            vec![HazardLabel::Fire, HazardLabel::Storm, HazardLabel::Snow]
        );
    }

    #[test]
    fn all_below_threshold_yields_empty() {
        let p = prediction(5, 5, 5, 5, 0);
        assert!(extract_hazards(&p, 20).is_empty());
    }

    #[test]
    fn join_uses_display_strings() {
        let p = prediction(0, 0, 0, 80, 60);
        let labels = extract_hazards(&p, 20);
        assert_eq!(join_labels(&labels), "Heat Wave, Snow");
    }
}
