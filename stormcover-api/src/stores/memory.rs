use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::models::{NotificationLog, WeatherRecord, NOTIFICATION_RECORD_TYPE};

use super::{NotificationLogStore, StoreResult, WeatherRecordStore};

/// In-memory weather record store, used when no database is configured
/// and by the test suite. Same partition semantics as the Postgres
/// store: point reads key on (id, city).
#[derive(Default)]
pub struct MemoryWeatherStore {
    records: Mutex<Vec<WeatherRecord>>,
}

impl MemoryWeatherStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WeatherRecord>> {
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl WeatherRecordStore for MemoryWeatherStore {
    fn list_unnotified(&self) -> StoreResult<Vec<WeatherRecord>> {
        let records = self.lock();
        Ok(records
            .iter()
            .filter(|r| !r.is_notification_sent)
            .cloned()
            .collect())
    }

    fn get(&self, id: &str, city: &str) -> StoreResult<Option<WeatherRecord>> {
        let records = self.lock();
        Ok(records
            .iter()
            .find(|r| r.id == id && r.city == city)
            .cloned())
    }

    fn upsert(&self, record: &WeatherRecord) -> StoreResult<()> {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    fn mark_notified(&self, id: &str, city: &str, sent_at: DateTime<Utc>) -> StoreResult<bool> {
        let mut records = self.lock();
        match records.iter_mut().find(|r| r.id == id && r.city == city) {
            Some(record) => {
                record.is_notification_sent = true;
                record.notification_sent_date = Some(sent_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[derive(Default)]
pub struct MemoryNotificationLogStore {
    logs: Mutex<Vec<NotificationLog>>,
}

impl MemoryNotificationLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<NotificationLog>> {
        self.logs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl NotificationLogStore for MemoryNotificationLogStore {
    fn create(&self, log: &NotificationLog) -> StoreResult<()> {
        self.lock().push(log.clone());
        Ok(())
    }

    fn get(&self, id: &str, city: &str) -> StoreResult<Option<NotificationLog>> {
        let logs = self.lock();
        Ok(logs.iter().find(|l| l.id == id && l.city == city).cloned())
    }

    fn list_recent(&self) -> StoreResult<Vec<NotificationLog>> {
        let logs = self.lock();
        let mut recent: Vec<NotificationLog> = logs
            .iter()
            .filter(|l| l.record_type == NOTIFICATION_RECORD_TYPE)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.sent_date.cmp(&a.sent_date));
        Ok(recent)
    }
}
