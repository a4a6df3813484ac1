use chrono::{DateTime, Utc};
use uuid::Uuid;

use stormcover_shared::clients::email::EmailSender;

use crate::models::{
    AtRiskUser, NotificationLog, MULTI_CITY_PARTITION, NOTIFICATION_RECORD_TYPE,
};
use crate::stores::{NotificationLogStore, WeatherRecordStore};

/// Build the persisted record of one outbound batch. Pure: the caller
/// supplies the send timestamp.
///
/// Partition city is the single city name when the batch stays within
/// one city, otherwise the "Multiple" sentinel. The prediction id is the
/// first selected user's — batches originate from one selector pass, so
/// it is consistent across users in well-formed calls.
pub fn build_notification_log(
    selected: &[AtRiskUser],
    subject: &str,
    body_html: &str,
    sent_at: DateTime<Utc>,
) -> NotificationLog {
    let user_ids: Vec<i32> = selected.iter().map(|u| u.id).collect();

    let mut coverage_ids: Vec<String> = Vec::new();
    for user in selected {
        for token in user.missing_coverage.split(", ") {
            if !token.is_empty() && !coverage_ids.iter().any(|c| c == token) {
                coverage_ids.push(token.to_string());
            }
        }
    }

    let mut cities: Vec<String> = Vec::new();
    for user in selected {
        if !cities.contains(&user.city) {
            cities.push(user.city.clone());
        }
    }

    let city = match cities.as_slice() {
        [only] => only.clone(),
        _ => MULTI_CITY_PARTITION.to_string(),
    };

    let prediction_id = selected
        .first()
        .map(|u| u.prediction_id.clone())
        .unwrap_or_default();

    NotificationLog {
        id: Uuid::new_v4().to_string(),
        user_ids,
        coverage_ids,
        email_subject: subject.to_string(),
        email_body_html: body_html.to_string(),
        sent_date: sent_at,
        city,
        cities,
        prediction_id,
        record_type: NOTIFICATION_RECORD_TYPE.to_string(),
    }
}

/// Persist the batch log. Best-effort: a store failure is logged and the
/// caller's remaining side effects still run.
pub fn record_log(store: &dyn NotificationLogStore, log: &NotificationLog) -> bool {
    match store.create(log) {
        Ok(()) => {
            tracing::info!(log_id = %log.id, city = %log.city, recipients = log.user_ids.len(), "notification log recorded");
            true
        }
        Err(e) => {
            tracing::error!(error = %e, log_id = %log.id, "failed to record notification log");
            false
        }
    }
}

/// Send the alert to every selected user. Failures are isolated per
/// recipient. Returns (sent, failed).
pub async fn send_alert_emails(
    sender: &dyn EmailSender,
    selected: &[AtRiskUser],
    subject: &str,
    body_html: &str,
) -> (usize, usize) {
    let mut sent = 0;
    let mut failed = 0;

    for user in selected {
        match sender.send_email(&user.email, subject, body_html).await {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                tracing::error!(to = %user.email, error = %e, "failed to send alert email");
            }
        }
    }

    (sent, failed)
}

/// The sent-state reconciler: flip the notified flag on every distinct
/// (prediction id, city) pair in the batch. Pairs are updated
/// independently; a missing record or store failure on one never blocks
/// the others, and re-flipping an already-flagged record is harmless.
/// Returns the number of records flipped.
pub fn mark_records_notified(
    store: &dyn WeatherRecordStore,
    selected: &[AtRiskUser],
    sent_at: DateTime<Utc>,
) -> usize {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for user in selected {
        if user.prediction_id.is_empty() || user.city.is_empty() {
            continue;
        }
        let pair = (user.prediction_id.as_str(), user.city.as_str());
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }

    let mut flipped = 0;

    for (prediction_id, city) in pairs {
        match store.mark_notified(prediction_id, city, sent_at) {
            Ok(true) => {
                flipped += 1;
                tracing::debug!(prediction_id = %prediction_id, city = %city, "weather record marked notified");
            }
            Ok(false) => {
                tracing::warn!(prediction_id = %prediction_id, city = %city, "weather record missing, skipping notified flip");
            }
            Err(e) => {
                tracing::error!(error = %e, prediction_id = %prediction_id, city = %city, "failed to mark weather record notified");
            }
        }
    }

    flipped
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;

    use crate::models::{Coordinates, HazardPrediction, WeatherDetails, WeatherRecord};
    use crate::services::notification_service;
    use crate::stores::{MemoryNotificationLogStore, MemoryWeatherStore, StaticUserDirectory};

    use super::*;

    fn at_risk(id: i32, city: &str, prediction_id: &str, missing: &str) -> AtRiskUser {
        AtRiskUser {
            id,
            name: format!("User{id} Test"),
            email: format!("user{id}@example.com"),
            city: city.into(),
            prediction_id: prediction_id.into(),
            missing_coverage: missing.into(),
            is_selected: true,
        }
    }

    fn sent_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 15, 30, 0).unwrap()
    }

    fn chicago_record(id: &str, fire: i32) -> WeatherRecord {
        WeatherRecord {
            id: id.into(),
            city: "Chicago".into(),
            coordinates: Coordinates::default(),
            weather: WeatherDetails::default(),
            hazard_prediction: Some(HazardPrediction {
                city: "Chicago".into(),
                fire_risk_percent: fire,
                flood_risk_percent: 0,
                storm_risk_percent: 0,
                heat_wave_risk_percent: 0,
                snow_risk_percent: 0,
                explanation: String::new(),
            }),
            is_notification_sent: false,
            notification_sent_date: None,
            created_at: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn single_city_batch_partitions_by_that_city() {
        let selected = vec![
            at_risk(1, "Chicago", "p1", "Fire"),
            at_risk(2, "Chicago", "p1", "Fire, Flood"),
        ];

        let log = build_notification_log(&selected, "Alert", "<p>hi</p>", sent_at());

        assert_eq!(log.city, "Chicago");
        assert_eq!(log.cities, vec!["Chicago"]);
        assert_eq!(log.user_ids, vec![1, 2]);
        assert_eq!(log.coverage_ids, vec!["Fire", "Flood"]);
        assert_eq!(log.prediction_id, "p1");
        assert_eq!(log.record_type, "Notification");
    }

    #[test]
    fn multi_city_batch_uses_sentinel_partition() {
        let selected = vec![
            at_risk(1, "Dallas", "p1", "Storm"),
            at_risk(2, "Austin", "p2", "Flood"),
        ];

        let log = build_notification_log(&selected, "Alert", "<p>hi</p>", sent_at());

        assert_eq!(log.city, "Multiple");
        assert_eq!(log.cities, vec!["Dallas", "Austin"]);
        assert_eq!(log.prediction_id, "p1");
    }

    #[test]
    fn reconciler_flips_each_distinct_pair_once() {
        let store = MemoryWeatherStore::new();
        store.upsert(&chicago_record("p1", 60)).unwrap();

        let selected = vec![
            at_risk(1, "Chicago", "p1", "Fire"),
            at_risk(2, "Chicago", "p1", "Fire"),
        ];

        let flipped = mark_records_notified(&store, &selected, sent_at());
        assert_eq!(flipped, 1);

        let record = store.get("p1", "Chicago").unwrap().unwrap();
        assert!(record.is_notification_sent);
        assert_eq!(record.notification_sent_date, Some(sent_at()));
    }

    #[test]
    fn reconciler_is_idempotent() {
        let store = MemoryWeatherStore::new();
        store.upsert(&chicago_record("p1", 60)).unwrap();

        let selected = vec![at_risk(1, "Chicago", "p1", "Fire")];

        mark_records_notified(&store, &selected, sent_at());
        let after_first = store.get("p1", "Chicago").unwrap().unwrap();

        mark_records_notified(&store, &selected, sent_at());
        let after_second = store.get("p1", "Chicago").unwrap().unwrap();

        assert!(after_second.is_notification_sent);
        assert_eq!(
            after_first.notification_sent_date,
            after_second.notification_sent_date
        );
    }

    #[test]
    fn missing_record_does_not_block_sibling_pairs() {
        let store = MemoryWeatherStore::new();
        store.upsert(&chicago_record("p1", 60)).unwrap();

        let selected = vec![
            at_risk(1, "Springfield", "gone", "Flood"),
            at_risk(2, "Chicago", "p1", "Fire"),
        ];

        let flipped = mark_records_notified(&store, &selected, sent_at());
        assert_eq!(flipped, 1);
        assert!(store.get("p1", "Chicago").unwrap().unwrap().is_notification_sent);
    }

    #[test]
    fn send_flow_hides_city_from_subsequent_active_queries() {
        let store = MemoryWeatherStore::new();
        let logs = MemoryNotificationLogStore::new();
        store.upsert(&chicago_record("p1", 60)).unwrap();

        let directory = StaticUserDirectory::with_users(vec![crate::models::User {
            id: 1,
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            city: "Chicago".into(),
            state: "IL".into(),
            coverages: Vec::new(),
        }]);

        let groups = notification_service::active_city_hazard_groups(&store, &directory, 20);
        assert_eq!(groups.len(), 1);

        let selected = groups[0].users.clone();
        let log = build_notification_log(&selected, "Alert", "<p>hi</p>", sent_at());
        assert_eq!(log.user_ids, vec![1]);
        assert_eq!(log.city, "Chicago");

        assert!(record_log(&logs, &log));
        mark_records_notified(&store, &selected, sent_at());

        assert!(notification_service::active_city_hazard_groups(&store, &directory, 20).is_empty());
        assert_eq!(logs.list_recent().unwrap().len(), 1);
    }

    #[test]
    fn resend_round_trip_restores_original_recipients() {
        let store = MemoryWeatherStore::new();
        let logs = MemoryNotificationLogStore::new();
        store.upsert(&chicago_record("p1", 60)).unwrap();

        let directory = StaticUserDirectory::with_users(vec![
            crate::models::User {
                id: 1,
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                email: "ada@example.com".into(),
                city: "Chicago".into(),
                state: "IL".into(),
                coverages: Vec::new(),
            },
            crate::models::User {
                id: 2,
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
                city: "Chicago".into(),
                state: "IL".into(),
                coverages: Vec::new(),
            },
        ]);

        let groups = notification_service::active_city_hazard_groups(&store, &directory, 20);

        // Reviewer keeps only Ada in the batch.
        let selected: Vec<AtRiskUser> = groups[0]
            .users
            .iter()
            .filter(|u| u.id == 1)
            .cloned()
            .collect();

        let log = build_notification_log(&selected, "Fire warning", "<p>cover up</p>", sent_at());
        record_log(&logs, &log);
        mark_records_notified(&store, &selected, sent_at());

        let view = notification_service::reconstruct_batch(
            &store,
            &logs,
            &directory,
            &log.id,
            &log.city,
            20,
        )
        .unwrap();

        assert_eq!(view.email_subject, "Fire warning");
        assert_eq!(view.email_body_html, "<p>cover up</p>");
        assert_eq!(view.groups.len(), 1);
        let ids: Vec<i32> = view.groups[0].users.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1]);
    }

    struct FlakySender;

    #[async_trait]
    impl EmailSender for FlakySender {
        async fn send_email(&self, to: &str, _subject: &str, _html: &str) -> Result<(), String> {
            if to.starts_with("bounce") {
                Err("mailbox unavailable".into())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn one_failing_recipient_does_not_block_the_rest() {
        let selected = vec![
            at_risk(1, "Chicago", "p1", "Fire"),
            AtRiskUser {
                email: "bounce@example.com".into(),
                ..at_risk(2, "Chicago", "p1", "Fire")
            },
            at_risk(3, "Chicago", "p1", "Fire"),
        ];

        let (sent, failed) = send_alert_emails(&FlakySender, &selected, "Alert", "<p>hi</p>").await;
        assert_eq!(sent, 2);
        assert_eq!(failed, 1);
    }

    #[test]
    fn empty_missing_coverage_contributes_no_tokens() {
        let selected = vec![at_risk(1, "Chicago", "p1", "")];
        let log = build_notification_log(&selected, "Alert", "", sent_at());
        assert!(log.coverage_ids.is_empty());
    }
}
