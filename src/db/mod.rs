//! Persistent records: accounts, plants and their care events.
//!
//! [`RecordStore`] is the one storage interface the rest of the crate talks
//! to. [`Repository`] keeps records in SQLite; [`MemoryStore`] keeps them in
//! process. Both publish a [`StoreChange`] after every successful write.

mod changes;
mod memory;
mod repository;
mod schema;

pub use changes::{ChangeFeed, StoreChange};
pub use memory::MemoryStore;
pub use repository::Repository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Account, CareEvent, NewCareEvent, NewPlant, Plant, PlantUpdate};

#[async_trait]
pub trait RecordStore: Send + Sync {
    // Account operations

    /// Fails with `EmailTaken` if the email is already registered.
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account>;

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>>;

    // Plant operations

    /// Fails with `NotFound` if the owner account does not exist.
    async fn create_plant(&self, plant: NewPlant) -> Result<Plant>;

    async fn get_plant(&self, id: Uuid) -> Result<Option<Plant>>;

    /// No particular order.
    async fn list_plants_by_owner(&self, owner_id: Uuid) -> Result<Vec<Plant>>;

    async fn update_plant(&self, id: Uuid, update: PlantUpdate) -> Result<Plant>;

    /// Removes the plant and its care events. Deleting a missing plant is a no-op.
    async fn delete_plant(&self, id: Uuid) -> Result<()>;

    // Care event operations

    /// Fails with `NotFound` if the plant does not exist.
    async fn create_care_event(&self, event: NewCareEvent) -> Result<CareEvent>;

    /// No particular order.
    async fn list_care_events_by_plant(&self, plant_id: Uuid) -> Result<Vec<CareEvent>>;

    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;

    async fn close(&self) -> Result<()>;
}

pub(crate) fn format_datetime(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56.000000Z")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 11, 12, 34, 56).unwrap();
        assert_eq!(parse_datetime("2026-01-11T12:34:56+00:00"), Some(expected));
        assert_eq!(parse_datetime("2026-01-11 12:34:56"), Some(expected));
        assert_eq!(parse_datetime("yesterday"), None);
    }

    #[test]
    fn test_format_keeps_microseconds() {
        let dt = crate::models::now();
        assert_eq!(parse_datetime(&format_datetime(dt)), Some(dt));
    }
}
