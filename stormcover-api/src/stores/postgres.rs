use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, PooledConnection};

use stormcover_shared::clients::db::DbPool;

use crate::models::{
    Coordinates, NotificationLog, WeatherRecord, NOTIFICATION_RECORD_TYPE,
};
use crate::schema::{notification_logs, weather_records};

use super::{NotificationLogStore, StoreError, StoreResult, WeatherRecordStore};

/// Weather records live in one table with the nested weather detail and
/// prediction stored as jsonb, mirroring the document shape the rest of
/// the engine works with.
pub struct PgWeatherStore {
    pool: DbPool,
}

#[derive(Debug, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = weather_records)]
#[diesel(treat_none_as_null = true)]
struct WeatherRecordRow {
    id: String,
    city: String,
    lat: f64,
    lon: f64,
    weather: serde_json::Value,
    hazard_prediction: Option<serde_json::Value>,
    is_notification_sent: bool,
    notification_sent_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl WeatherRecordRow {
    fn from_record(record: &WeatherRecord) -> StoreResult<Self> {
        let weather = serde_json::to_value(&record.weather).map_err(|e| StoreError::Corrupt {
            id: record.id.clone(),
            reason: e.to_string(),
        })?;
        let hazard_prediction = record
            .hazard_prediction
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                id: record.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: record.id.clone(),
            city: record.city.clone(),
            lat: record.coordinates.lat,
            lon: record.coordinates.lon,
            weather,
            hazard_prediction,
            is_notification_sent: record.is_notification_sent,
            notification_sent_date: record.notification_sent_date,
            created_at: record.created_at,
        })
    }

    fn into_record(self) -> StoreResult<WeatherRecord> {
        let weather = serde_json::from_value(self.weather).map_err(|e| StoreError::Corrupt {
            id: self.id.clone(),
            reason: e.to_string(),
        })?;
        let hazard_prediction = self
            .hazard_prediction
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| StoreError::Corrupt {
                id: self.id.clone(),
                reason: e.to_string(),
            })?;

        Ok(WeatherRecord {
            id: self.id,
            city: self.city,
            coordinates: Coordinates {
                lat: self.lat,
                lon: self.lon,
            },
            weather,
            hazard_prediction,
            is_notification_sent: self.is_notification_sent,
            notification_sent_date: self.notification_sent_date,
            created_at: self.created_at,
        })
    }
}

impl PgWeatherStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<PooledConnection<ConnectionManager<PgConnection>>> {
        self.pool
            .get()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl WeatherRecordStore for PgWeatherStore {
    fn list_unnotified(&self) -> StoreResult<Vec<WeatherRecord>> {
        let mut conn = self.conn()?;

        let rows = weather_records::table
            .filter(weather_records::is_notification_sent.eq(false))
            .load::<WeatherRecordRow>(&mut conn)?;

        rows.into_iter().map(WeatherRecordRow::into_record).collect()
    }

    fn get(&self, id: &str, city: &str) -> StoreResult<Option<WeatherRecord>> {
        let mut conn = self.conn()?;

        let row = weather_records::table
            .filter(weather_records::id.eq(id))
            .filter(weather_records::city.eq(city))
            .first::<WeatherRecordRow>(&mut conn)
            .optional()?;

        row.map(WeatherRecordRow::into_record).transpose()
    }

    fn upsert(&self, record: &WeatherRecord) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let row = WeatherRecordRow::from_record(record)?;

        diesel::insert_into(weather_records::table)
            .values(&row)
            .on_conflict(weather_records::id)
            .do_update()
            .set(&row)
            .execute(&mut conn)?;

        Ok(())
    }

    fn mark_notified(&self, id: &str, city: &str, sent_at: DateTime<Utc>) -> StoreResult<bool> {
        let mut conn = self.conn()?;

        let updated = diesel::update(
            weather_records::table
                .filter(weather_records::id.eq(id))
                .filter(weather_records::city.eq(city)),
        )
        .set((
            weather_records::is_notification_sent.eq(true),
            weather_records::notification_sent_date.eq(Some(sent_at)),
        ))
        .execute(&mut conn)?;

        Ok(updated > 0)
    }
}

pub struct PgNotificationLogStore {
    pool: DbPool,
}

#[derive(Debug, Queryable, Insertable)]
#[diesel(table_name = notification_logs)]
struct NotificationLogRow {
    id: String,
    user_ids: Vec<i32>,
    coverage_ids: Vec<String>,
    email_subject: String,
    email_body_html: String,
    sent_date: DateTime<Utc>,
    city: String,
    cities: Vec<String>,
    prediction_id: String,
    record_type: String,
}

impl From<&NotificationLog> for NotificationLogRow {
    fn from(log: &NotificationLog) -> Self {
        Self {
            id: log.id.clone(),
            user_ids: log.user_ids.clone(),
            coverage_ids: log.coverage_ids.clone(),
            email_subject: log.email_subject.clone(),
            email_body_html: log.email_body_html.clone(),
            sent_date: log.sent_date,
            city: log.city.clone(),
            cities: log.cities.clone(),
            prediction_id: log.prediction_id.clone(),
            record_type: log.record_type.clone(),
        }
    }
}

impl From<NotificationLogRow> for NotificationLog {
    fn from(row: NotificationLogRow) -> Self {
        Self {
            id: row.id,
            user_ids: row.user_ids,
            coverage_ids: row.coverage_ids,
            email_subject: row.email_subject,
            email_body_html: row.email_body_html,
            sent_date: row.sent_date,
            city: row.city,
            cities: row.cities,
            prediction_id: row.prediction_id,
            record_type: row.record_type,
        }
    }
}

impl PgNotificationLogStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<PooledConnection<ConnectionManager<PgConnection>>> {
        self.pool
            .get()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl NotificationLogStore for PgNotificationLogStore {
    fn create(&self, log: &NotificationLog) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let row = NotificationLogRow::from(log);

        diesel::insert_into(notification_logs::table)
            .values(&row)
            .execute(&mut conn)?;

        Ok(())
    }

    fn get(&self, id: &str, city: &str) -> StoreResult<Option<NotificationLog>> {
        let mut conn = self.conn()?;

        let row = notification_logs::table
            .filter(notification_logs::id.eq(id))
            .filter(notification_logs::city.eq(city))
            .first::<NotificationLogRow>(&mut conn)
            .optional()?;

        Ok(row.map(NotificationLog::from))
    }

    fn list_recent(&self) -> StoreResult<Vec<NotificationLog>> {
        let mut conn = self.conn()?;

        let rows = notification_logs::table
            .filter(notification_logs::record_type.eq(NOTIFICATION_RECORD_TYPE))
            .order(notification_logs::sent_date.desc())
            .load::<NotificationLogRow>(&mut conn)?;

        Ok(rows.into_iter().map(NotificationLog::from).collect())
    }
}
