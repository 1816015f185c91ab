use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use tokio::sync::broadcast;
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{
    bump, now, Account, CareEvent, Category, NewCareEvent, NewPlant, Plant, PlantUpdate,
};

use super::schema::SCHEMA;
use super::{format_datetime, parse_datetime, ChangeFeed, RecordStore, StoreChange};

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, created_at";
const PLANT_COLUMNS: &str =
    "id, owner_id, name, category, care_frequency_days, image_ref, notes, created_at, updated_at";
const CARE_EVENT_COLUMNS: &str = "id, plant_id, care_type, care_date, notes, created_at";

/// SQLite-backed record store. Survives restarts.
pub struct Repository {
    conn: Connection,
    changes: ChangeFeed,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self {
            conn,
            changes: ChangeFeed::new(),
        })
    }
}

#[async_trait]
impl RecordStore for Repository {
    // Account operations

    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account> {
        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now(),
        };

        let row = account.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
                    params![row.email],
                    |r| r.get(0),
                )?;
                if exists {
                    return Ok(false);
                }

                // The UNIQUE constraint still catches a racing insert.
                match conn.execute(
                    "INSERT INTO accounts (id, email, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![
                        row.id.to_string(),
                        row.email,
                        row.password_hash,
                        format_datetime(row.created_at),
                    ],
                ) {
                    Ok(_) => Ok(true),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == ErrorCode::ConstraintViolation =>
                    {
                        Ok(false)
                    }
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        if !inserted {
            tracing::debug!(email, "account rejected: email already registered");
            return Err(AppError::EmailTaken);
        }

        tracing::debug!(id = %account.id, "account created");
        self.changes.publish(StoreChange::AccountCreated(account.id));
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let email = email.to_string();
        let account = self
            .conn
            .call(move |conn| {
                let account = conn
                    .query_row(
                        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = ?1"),
                        params![email],
                        account_from_row,
                    )
                    .optional();
                Ok(absent_if_corrupt(account, "account")?)
            })
            .await?;
        Ok(account)
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        let account = self
            .conn
            .call(move |conn| {
                let account = conn
                    .query_row(
                        &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?1"),
                        params![id.to_string()],
                        account_from_row,
                    )
                    .optional();
                Ok(absent_if_corrupt(account, "account")?)
            })
            .await?;
        Ok(account)
    }

    // Plant operations

    async fn create_plant(&self, plant: NewPlant) -> Result<Plant> {
        plant.validate()?;
        let owner_id = plant.owner_id;
        let plant = plant.into_plant(Uuid::new_v4(), now());

        let row = plant.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let owner_exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?1)",
                    params![row.owner_id.to_string()],
                    |r| r.get(0),
                )?;
                if !owner_exists {
                    return Ok(false);
                }

                conn.execute(
                    &format!(
                        "INSERT INTO plants ({PLANT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"
                    ),
                    params![
                        row.id.to_string(),
                        row.owner_id.to_string(),
                        row.name,
                        row.category.as_str(),
                        row.care_frequency_days,
                        row.image_ref,
                        row.notes,
                        format_datetime(row.created_at),
                        format_datetime(row.updated_at),
                    ],
                )?;
                Ok(true)
            })
            .await?;

        if !inserted {
            return Err(AppError::not_found("Account", owner_id));
        }

        tracing::debug!(id = %plant.id, owner = %owner_id, "plant created");
        self.changes.publish(StoreChange::PlantCreated(plant.id));
        Ok(plant)
    }

    async fn get_plant(&self, id: Uuid) -> Result<Option<Plant>> {
        let plant = self
            .conn
            .call(move |conn| {
                let plant = conn
                    .query_row(
                        &format!("SELECT {PLANT_COLUMNS} FROM plants WHERE id = ?1"),
                        params![id.to_string()],
                        plant_from_row,
                    )
                    .optional();
                Ok(absent_if_corrupt(plant, "plant")?)
            })
            .await?;
        Ok(plant)
    }

    async fn list_plants_by_owner(&self, owner_id: Uuid) -> Result<Vec<Plant>> {
        let plants = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {PLANT_COLUMNS} FROM plants WHERE owner_id = ?1"
                ))?;
                let rows = stmt.query_map(params![owner_id.to_string()], plant_from_row)?;
                Ok(skip_corrupt(rows, "plant"))
            })
            .await?;
        Ok(plants)
    }

    async fn update_plant(&self, id: Uuid, update: PlantUpdate) -> Result<Plant> {
        update.validate()?;

        let updated = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let existing = tx
                    .query_row(
                        &format!("SELECT {PLANT_COLUMNS} FROM plants WHERE id = ?1"),
                        params![id.to_string()],
                        plant_from_row,
                    )
                    .optional();
                let Some(mut plant) = absent_if_corrupt(existing, "plant")? else {
                    return Ok(None);
                };

                let stamp = bump(plant.updated_at);
                update.apply(&mut plant, stamp);

                tx.execute(
                    r#"UPDATE plants SET
                           name = ?2,
                           category = ?3,
                           care_frequency_days = ?4,
                           image_ref = ?5,
                           notes = ?6,
                           updated_at = ?7
                       WHERE id = ?1"#,
                    params![
                        id.to_string(),
                        plant.name,
                        plant.category.as_str(),
                        plant.care_frequency_days,
                        plant.image_ref,
                        plant.notes,
                        format_datetime(plant.updated_at),
                    ],
                )?;
                tx.commit()?;
                Ok(Some(plant))
            })
            .await?;

        let plant = updated.ok_or_else(|| AppError::not_found("Plant", id))?;
        tracing::debug!(id = %id, "plant updated");
        self.changes.publish(StoreChange::PlantUpdated(id));
        Ok(plant)
    }

    async fn delete_plant(&self, id: Uuid) -> Result<()> {
        let (plants, events) = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                // Delete related data first
                let events = tx.execute(
                    "DELETE FROM care_events WHERE plant_id = ?1",
                    params![id.to_string()],
                )?;
                let plants = tx.execute("DELETE FROM plants WHERE id = ?1", params![id.to_string()])?;
                tx.commit()?;
                Ok((plants, events))
            })
            .await?;

        if plants > 0 {
            tracing::debug!(id = %id, events, "plant deleted");
            self.changes.publish(StoreChange::PlantDeleted(id));
        }
        Ok(())
    }

    // Care event operations

    async fn create_care_event(&self, event: NewCareEvent) -> Result<CareEvent> {
        let plant_id = event.plant_id;
        let event = event.into_event(Uuid::new_v4(), now());

        let row = event.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                let plant_exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM plants WHERE id = ?1)",
                    params![row.plant_id.to_string()],
                    |r| r.get(0),
                )?;
                if !plant_exists {
                    return Ok(false);
                }

                conn.execute(
                    &format!(
                        "INSERT INTO care_events ({CARE_EVENT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
                    ),
                    params![
                        row.id.to_string(),
                        row.plant_id.to_string(),
                        row.care_type,
                        format_datetime(row.care_date),
                        row.notes,
                        format_datetime(row.created_at),
                    ],
                )?;
                Ok(true)
            })
            .await?;

        if !inserted {
            return Err(AppError::not_found("Plant", plant_id));
        }

        tracing::debug!(id = %event.id, plant = %plant_id, care_type = %event.care_type, "care logged");
        self.changes.publish(StoreChange::CareEventCreated {
            plant_id,
            id: event.id,
        });
        Ok(event)
    }

    async fn list_care_events_by_plant(&self, plant_id: Uuid) -> Result<Vec<CareEvent>> {
        let events = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {CARE_EVENT_COLUMNS} FROM care_events WHERE plant_id = ?1"
                ))?;
                let rows = stmt.query_map(params![plant_id.to_string()], care_event_from_row)?;
                Ok(skip_corrupt(rows, "care event"))
            })
            .await?;
        Ok(events)
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    async fn close(&self) -> Result<()> {
        self.conn.clone().close().await?;
        tracing::debug!("record store closed");
        Ok(())
    }
}

fn is_corrupt(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..)
    )
}

/// A row that no longer decodes reads as missing.
fn absent_if_corrupt<T>(
    result: rusqlite::Result<Option<T>>,
    kind: &str,
) -> rusqlite::Result<Option<T>> {
    match result {
        Err(e) if is_corrupt(&e) => {
            tracing::warn!("Ignoring unreadable {} row: {}", kind, e);
            Ok(None)
        }
        other => other,
    }
}

fn skip_corrupt<T>(rows: impl Iterator<Item = rusqlite::Result<T>>, kind: &str) -> Vec<T> {
    rows.filter_map(|row| match row {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Skipping unreadable {} row: {}", kind, e);
            None
        }
    })
    .collect()
}

fn get_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let s: String = row.get(idx)?;
    Uuid::parse_str(&s)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn get_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let s: String = row.get(idx)?;
    parse_datetime(&s).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp: {}", s).into(),
        )
    })
}

fn get_category(row: &Row, idx: usize) -> rusqlite::Result<Category> {
    let s: String = row.get(idx)?;
    s.parse::<Category>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into())
    })
}

fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        id: get_uuid(row, 0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: get_datetime(row, 3)?,
    })
}

fn plant_from_row(row: &Row) -> rusqlite::Result<Plant> {
    Ok(Plant {
        id: get_uuid(row, 0)?,
        owner_id: get_uuid(row, 1)?,
        name: row.get(2)?,
        category: get_category(row, 3)?,
        care_frequency_days: row.get(4)?,
        image_ref: row.get(5)?,
        notes: row.get(6)?,
        created_at: get_datetime(row, 7)?,
        updated_at: get_datetime(row, 8)?,
    })
}

fn care_event_from_row(row: &Row) -> rusqlite::Result<CareEvent> {
    Ok(CareEvent {
        id: get_uuid(row, 0)?,
        plant_id: get_uuid(row, 1)?,
        care_type: row.get(2)?,
        care_date: get_datetime(row, 3)?,
        notes: row.get(4)?,
        created_at: get_datetime(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn new_plant(owner_id: Uuid, name: &str) -> NewPlant {
        NewPlant {
            owner_id,
            name: name.to_string(),
            category: Category::Indoor,
            care_frequency_days: 3,
            image_ref: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("giardino.db");
        let db_path = db_path.to_string_lossy().to_string();

        let (account, plant, event) = {
            let repo = Repository::new(&db_path).await.unwrap();
            let account = repo.create_account("alice@example.com", "digest").await.unwrap();
            let plant = repo.create_plant(new_plant(account.id, "Ficus")).await.unwrap();
            let event = repo
                .create_care_event(NewCareEvent {
                    plant_id: plant.id,
                    care_type: "water".to_string(),
                    care_date: now(),
                    notes: Some("half a litre".to_string()),
                })
                .await
                .unwrap();
            repo.close().await.unwrap();
            (account, plant, event)
        };

        let repo = Repository::new(&db_path).await.unwrap();
        assert_eq!(
            repo.find_account_by_email("alice@example.com").await.unwrap(),
            Some(account.clone())
        );
        assert_eq!(repo.list_plants_by_owner(account.id).await.unwrap(), vec![plant.clone()]);
        assert_eq!(repo.list_care_events_by_plant(plant.id).await.unwrap(), vec![event]);
    }

    #[tokio::test]
    async fn test_reopen_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("giardino.db").to_string_lossy().to_string();

        let first = Repository::new(&db_path).await.unwrap();
        first.close().await.unwrap();
        assert_ok!(Repository::new(&db_path).await);
    }

    #[tokio::test]
    async fn test_email_unique_index() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.create_account("a@x.com", "d1").await.unwrap();

        let err = assert_err!(repo.create_account("a@x.com", "d2").await);
        assert!(matches!(err, AppError::EmailTaken));

        let stored = repo.find_account_by_email("a@x.com").await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "d1");
    }

    #[tokio::test]
    async fn test_email_is_case_sensitive() {
        let repo = Repository::open_in_memory().await.unwrap();
        repo.create_account("a@x.com", "d1").await.unwrap();
        assert_ok!(repo.create_account("A@x.com", "d2").await);
        assert!(repo.find_account_by_email("A@X.COM").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plant_requires_existing_owner() {
        let repo = Repository::open_in_memory().await.unwrap();
        let err = assert_err!(repo.create_plant(new_plant(Uuid::new_v4(), "Ficus")).await);
        assert!(matches!(err, AppError::NotFound { kind: "Account", .. }));
    }

    #[tokio::test]
    async fn test_corrupt_plant_row_is_skipped() {
        let repo = Repository::open_in_memory().await.unwrap();
        let account = repo.create_account("a@x.com", "d").await.unwrap();
        let good = repo.create_plant(new_plant(account.id, "Ficus")).await.unwrap();

        let owner = account.id.to_string();
        let bad_id = Uuid::new_v4();
        repo.conn
            .call(move |conn| {
                conn.execute(
                    &format!("INSERT INTO plants ({PLANT_COLUMNS}) VALUES (?1, ?2, 'Rosa', 'Cactus', 2, NULL, NULL, 'not a date', 'not a date')"),
                    params![bad_id.to_string(), owner],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(repo.list_plants_by_owner(account.id).await.unwrap(), vec![good]);
        assert_eq!(repo.get_plant(bad_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_cascades_in_one_transaction() {
        let repo = Repository::open_in_memory().await.unwrap();
        let account = repo.create_account("a@x.com", "d").await.unwrap();
        let plant = repo.create_plant(new_plant(account.id, "Ficus")).await.unwrap();
        for _ in 0..3 {
            repo.create_care_event(NewCareEvent {
                plant_id: plant.id,
                care_type: "water".to_string(),
                care_date: now(),
                notes: None,
            })
            .await
            .unwrap();
        }

        repo.delete_plant(plant.id).await.unwrap();

        let remaining: i64 = repo
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM care_events", [], |r| r.get(0))?))
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
