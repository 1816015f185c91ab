use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::{bump, now, Account, CareEvent, NewCareEvent, NewPlant, Plant, PlantUpdate};

use super::{ChangeFeed, RecordStore, StoreChange};

#[derive(Default)]
struct Tables {
    accounts: HashMap<Uuid, Account>,
    plants: HashMap<Uuid, Plant>,
    care_events: HashMap<Uuid, CareEvent>,

    // Secondary indexes
    account_by_email: HashMap<String, Uuid>,
    plants_by_owner: HashMap<Uuid, HashSet<Uuid>>,
    events_by_plant: HashMap<Uuid, HashSet<Uuid>>,
}

/// In-process record store. Contents are lost when it is dropped.
pub struct MemoryStore {
    tables: Mutex<Tables>,
    changes: ChangeFeed,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            changes: ChangeFeed::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_account(&self, email: &str, password_hash: &str) -> Result<Account> {
        let mut tables = self.tables.lock().await;
        if tables.account_by_email.contains_key(email) {
            return Err(AppError::EmailTaken);
        }

        let account = Account {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now(),
        };
        tables.account_by_email.insert(account.email.clone(), account.id);
        tables.accounts.insert(account.id, account.clone());
        drop(tables);

        tracing::debug!(id = %account.id, "account created");
        self.changes.publish(StoreChange::AccountCreated(account.id));
        Ok(account)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .account_by_email
            .get(email)
            .and_then(|id| tables.accounts.get(id))
            .cloned())
    }

    async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
        Ok(self.tables.lock().await.accounts.get(&id).cloned())
    }

    async fn create_plant(&self, plant: NewPlant) -> Result<Plant> {
        plant.validate()?;

        let mut tables = self.tables.lock().await;
        if !tables.accounts.contains_key(&plant.owner_id) {
            return Err(AppError::not_found("Account", plant.owner_id));
        }

        let plant = plant.into_plant(Uuid::new_v4(), now());
        tables
            .plants_by_owner
            .entry(plant.owner_id)
            .or_default()
            .insert(plant.id);
        tables.plants.insert(plant.id, plant.clone());
        drop(tables);

        tracing::debug!(id = %plant.id, owner = %plant.owner_id, "plant created");
        self.changes.publish(StoreChange::PlantCreated(plant.id));
        Ok(plant)
    }

    async fn get_plant(&self, id: Uuid) -> Result<Option<Plant>> {
        Ok(self.tables.lock().await.plants.get(&id).cloned())
    }

    async fn list_plants_by_owner(&self, owner_id: Uuid) -> Result<Vec<Plant>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .plants_by_owner
            .get(&owner_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.plants.get(id))
            .cloned()
            .collect())
    }

    async fn update_plant(&self, id: Uuid, update: PlantUpdate) -> Result<Plant> {
        update.validate()?;

        let mut tables = self.tables.lock().await;
        let plant = tables
            .plants
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Plant", id))?;
        let stamp = bump(plant.updated_at);
        update.apply(plant, stamp);
        let plant = plant.clone();
        drop(tables);

        tracing::debug!(id = %id, "plant updated");
        self.changes.publish(StoreChange::PlantUpdated(id));
        Ok(plant)
    }

    async fn delete_plant(&self, id: Uuid) -> Result<()> {
        let mut tables = self.tables.lock().await;
        let Some(plant) = tables.plants.remove(&id) else {
            return Ok(());
        };

        if let Some(owned) = tables.plants_by_owner.get_mut(&plant.owner_id) {
            owned.remove(&id);
        }
        let event_ids = tables.events_by_plant.remove(&id).unwrap_or_default();
        for event_id in &event_ids {
            tables.care_events.remove(event_id);
        }
        drop(tables);

        tracing::debug!(id = %id, events = event_ids.len(), "plant deleted");
        self.changes.publish(StoreChange::PlantDeleted(id));
        Ok(())
    }

    async fn create_care_event(&self, event: NewCareEvent) -> Result<CareEvent> {
        let mut tables = self.tables.lock().await;
        if !tables.plants.contains_key(&event.plant_id) {
            return Err(AppError::not_found("Plant", event.plant_id));
        }

        let event = event.into_event(Uuid::new_v4(), now());
        tables
            .events_by_plant
            .entry(event.plant_id)
            .or_default()
            .insert(event.id);
        tables.care_events.insert(event.id, event.clone());
        drop(tables);

        tracing::debug!(id = %event.id, plant = %event.plant_id, care_type = %event.care_type, "care logged");
        self.changes.publish(StoreChange::CareEventCreated {
            plant_id: event.plant_id,
            id: event.id,
        });
        Ok(event)
    }

    async fn list_care_events_by_plant(&self, plant_id: Uuid) -> Result<Vec<CareEvent>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .events_by_plant
            .get(&plant_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.care_events.get(id))
            .cloned()
            .collect())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
