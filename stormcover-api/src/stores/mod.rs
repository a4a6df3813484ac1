mod memory;
mod postgres;
mod users;

pub use memory::{MemoryNotificationLogStore, MemoryWeatherStore};
pub use postgres::{PgNotificationLogStore, PgWeatherStore};
pub use users::StaticUserDirectory;

use chrono::{DateTime, Utc};

use crate::models::{NotificationLog, User, WeatherRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("malformed record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Generic document operations over weather records, partitioned by
/// city. Callers only rely on filter-by-field and timestamp semantics;
/// grouping and latest-per-city selection happen client-side.
pub trait WeatherRecordStore: Send + Sync {
    /// Every record whose notified flag is still false, in no particular
    /// order.
    fn list_unnotified(&self) -> StoreResult<Vec<WeatherRecord>>;

    /// Point read by id within a city partition. Does NOT filter on the
    /// notified flag; the resend path reads records already marked sent.
    fn get(&self, id: &str, city: &str) -> StoreResult<Option<WeatherRecord>>;

    fn upsert(&self, record: &WeatherRecord) -> StoreResult<()>;

    /// Field-level patch of the notified flag and timestamp. Returns
    /// false when the record does not exist. Safe to repeat: flipping an
    /// already-flagged record is a no-op in effect.
    fn mark_notified(&self, id: &str, city: &str, sent_at: DateTime<Utc>) -> StoreResult<bool>;
}

pub trait NotificationLogStore: Send + Sync {
    fn create(&self, log: &NotificationLog) -> StoreResult<()>;

    fn get(&self, id: &str, city: &str) -> StoreResult<Option<NotificationLog>>;

    /// All notification-typed logs, newest first.
    fn list_recent(&self) -> StoreResult<Vec<NotificationLog>>;
}

/// Read-only view of the external user system. No filtering contract:
/// the matcher filters client-side.
pub trait UserDirectory: Send + Sync {
    fn get_users(&self) -> StoreResult<Vec<User>>;
}
