use serde::Serialize;

use crate::hazards::{self, HazardLabel};
use crate::models::{AtRiskUser, CityHazardGroup, User, MULTI_CITY_PARTITION};
use crate::services::weather_service;
use crate::stores::{NotificationLogStore, UserDirectory, WeatherRecordStore};

/// The coverage-gap matcher. Pure and deterministic: the resend path
/// replays it against historical data and must reproduce the original
/// grouping exactly.
///
/// City comparison and coverage-name comparison are both
/// case-insensitive; the missing-coverage label keeps canonical hazard
/// order.
pub fn at_risk_users_for_city(
    city: &str,
    prediction_id: &str,
    hazard_labels: &[HazardLabel],
    users: &[User],
) -> Vec<AtRiskUser> {
    let mut at_risk = Vec::new();

    for user in users {
        if !user.city.eq_ignore_ascii_case(city) {
            continue;
        }

        let missing: Vec<HazardLabel> = hazard_labels
            .iter()
            .copied()
            .filter(|label| {
                !user
                    .coverages
                    .iter()
                    .any(|c| c.name.eq_ignore_ascii_case(label.as_str()))
            })
            .collect();

        if missing.is_empty() {
            continue;
        }

        at_risk.push(AtRiskUser {
            id: user.id,
            name: user.display_name(),
            email: user.email.clone(),
            city: user.city.clone(),
            prediction_id: prediction_id.to_string(),
            missing_coverage: hazards::join_labels(&missing),
            is_selected: true,
        });
    }

    at_risk
}

/// Active city hazard groups: one group per city whose freshest
/// un-notified record carries at least one hazard above the threshold
/// and at least one user with a coverage gap.
pub fn active_city_hazard_groups(
    weather: &dyn WeatherRecordStore,
    directory: &dyn UserDirectory,
    threshold_percent: i32,
) -> Vec<CityHazardGroup> {
    let users = match directory.get_users() {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "failed to load users, returning no hazard groups");
            return Vec::new();
        }
    };

    let mut groups = Vec::new();

    for record in weather_service::get_active_hazards(weather) {
        let Some(prediction) = &record.hazard_prediction else {
            continue;
        };

        let labels = hazards::extract_hazards(prediction, threshold_percent);
        if labels.is_empty() {
            continue;
        }

        let at_risk = at_risk_users_for_city(&record.city, &record.id, &labels, &users);
        if at_risk.is_empty() {
            continue;
        }

        groups.push(CityHazardGroup {
            city: record.city.clone(),
            prediction_id: record.id.clone(),
            hazard_prediction: prediction.clone(),
            users: at_risk,
        });
    }

    groups
}

/// Rebuild one city's group from a historical record. Reads by
/// (prediction id, city) directly, so records already marked sent are
/// found — resend targets exactly those.
pub fn city_hazard_group_for_resend(
    weather: &dyn WeatherRecordStore,
    directory: &dyn UserDirectory,
    prediction_id: &str,
    city: &str,
    threshold_percent: i32,
) -> Option<CityHazardGroup> {
    let record = match weather.get(prediction_id, city) {
        Ok(Some(record)) => record,
        Ok(None) => {
            tracing::debug!(prediction_id = %prediction_id, city = %city, "weather record not found for resend");
            return None;
        }
        Err(e) => {
            tracing::error!(error = %e, prediction_id = %prediction_id, "failed to fetch weather record for resend");
            return None;
        }
    };

    let prediction = record.hazard_prediction.as_ref()?;

    let labels = hazards::extract_hazards(prediction, threshold_percent);
    if labels.is_empty() {
        return None;
    }

    let users = match directory.get_users() {
        Ok(users) => users,
        Err(e) => {
            tracing::error!(error = %e, "failed to load users for resend");
            return None;
        }
    };

    let at_risk = at_risk_users_for_city(city, &record.id, &labels, &users);
    if at_risk.is_empty() {
        return None;
    }

    Some(CityHazardGroup {
        city: city.to_string(),
        prediction_id: record.id.clone(),
        hazard_prediction: prediction.clone(),
        users: at_risk,
    })
}

/// A past batch rebuilt for re-review: the original subject and body
/// plus the groups narrowed to the users the batch actually went to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendView {
    pub log_id: String,
    pub email_subject: String,
    pub email_body_html: String,
    pub groups: Vec<CityHazardGroup>,
}

/// The resend reconstructor. Returns None when the log itself is gone;
/// missing source records shrink the reconstruction instead of failing
/// it. Callers fall back to the current active view on None.
pub fn reconstruct_batch(
    weather: &dyn WeatherRecordStore,
    logs: &dyn NotificationLogStore,
    directory: &dyn UserDirectory,
    log_id: &str,
    partition_city: &str,
    threshold_percent: i32,
) -> Option<ResendView> {
    let log = match logs.get(log_id, partition_city) {
        Ok(Some(log)) => log,
        Ok(None) => {
            tracing::warn!(log_id = %log_id, city = %partition_city, "notification log not found");
            return None;
        }
        Err(e) => {
            tracing::error!(error = %e, log_id = %log_id, "failed to read notification log");
            return None;
        }
    };

    let mut groups = Vec::new();

    for city in &log.cities {
        // The partition sentinel is a label, not a city.
        if city == MULTI_CITY_PARTITION {
            continue;
        }

        let Some(mut group) = city_hazard_group_for_resend(
            weather,
            directory,
            &log.prediction_id,
            city,
            threshold_percent,
        ) else {
            continue;
        };

        group.users.retain(|u| log.user_ids.contains(&u.id));
        if group.users.is_empty() {
            continue;
        }

        groups.push(group);
    }

    Some(ResendView {
        log_id: log.id,
        email_subject: log.email_subject,
        email_body_html: log.email_body_html,
        groups,
    })
}
