use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::{AuthService, SessionHolder};
use crate::care::{self, CareStatus};
use crate::config::Config;
use crate::db::{RecordStore, Repository, StoreChange};
use crate::error::{AppError, Result};
use crate::models::{
    now, CareEvent, Category, NewCareEvent, NewPlant, Plant, PlantUpdate, PublicAccount, Session,
};

/// Fields a user fills in when adding a plant.
#[derive(Debug, Clone)]
pub struct PlantDraft {
    pub name: String,
    pub category: Category,
    /// Falls back to the configured default.
    pub care_frequency_days: Option<u32>,
    pub image_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlantSummary {
    pub plant: Plant,
    pub status: CareStatus,
}

#[derive(Debug, Clone)]
pub struct PlantDetail {
    pub plant: Plant,
    pub status: CareStatus,
    /// Newest first.
    pub care_log: Vec<CareEvent>,
}

/// Owns the record store and session slot for the lifetime of the program.
pub struct App {
    store: Arc<dyn RecordStore>,
    sessions: SessionHolder,
    default_care_type: String,
    default_care_frequency_days: u32,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;
        tracing::debug!(db_path = %config.db_path, "opened record store");
        Ok(Self::with_store(Arc::new(repository), config))
    }

    pub fn with_store(store: Arc<dyn RecordStore>, config: &Config) -> Self {
        Self {
            store,
            sessions: SessionHolder::new(&config.session_path),
            default_care_type: config.default_care_type.clone(),
            default_care_frequency_days: config.default_care_frequency_days,
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn auth(&self) -> AuthService<'_> {
        AuthService::new(self.store.as_ref(), &self.sessions)
    }

    pub fn current_account(&self) -> Option<PublicAccount> {
        self.sessions.current().as_ref().map(PublicAccount::from)
    }

    /// Notified after every successful write to the store.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.store.subscribe()
    }

    fn require_session(&self) -> Result<Session> {
        self.sessions.current().ok_or(AppError::NotSignedIn)
    }

    /// Another account's plant reads the same as a missing one.
    async fn owned_plant(&self, session: &Session, id: Uuid) -> Result<Plant> {
        match self.store.get_plant(id).await? {
            Some(plant) if plant.owner_id == session.account_id => Ok(plant),
            _ => Err(AppError::not_found("Plant", id)),
        }
    }

    // Plant operations

    pub async fn add_plant(&self, draft: PlantDraft) -> Result<Plant> {
        let session = self.require_session()?;
        let plant = self
            .store
            .create_plant(NewPlant {
                owner_id: session.account_id,
                name: draft.name.trim().to_string(),
                category: draft.category,
                care_frequency_days: draft
                    .care_frequency_days
                    .unwrap_or(self.default_care_frequency_days),
                image_ref: non_empty(draft.image_ref),
                notes: non_empty(draft.notes),
            })
            .await?;
        tracing::info!(plant = %plant.id, name = %plant.name, "plant added");
        Ok(plant)
    }

    pub async fn plants(&self) -> Result<Vec<PlantSummary>> {
        self.plants_at(Utc::now()).await
    }

    /// The signed-in account's plants sorted by name, with care status as of `now`.
    pub async fn plants_at(&self, now: DateTime<Utc>) -> Result<Vec<PlantSummary>> {
        let session = self.require_session()?;
        let plants = self.store.list_plants_by_owner(session.account_id).await?;

        let mut summaries = Vec::with_capacity(plants.len());
        for plant in plants {
            let events = self.store.list_care_events_by_plant(plant.id).await?;
            let status = care::care_status(&plant, &events, now);
            summaries.push(PlantSummary { plant, status });
        }
        summaries.sort_by(|a, b| {
            a.plant
                .name
                .to_lowercase()
                .cmp(&b.plant.name.to_lowercase())
                .then(a.plant.created_at.cmp(&b.plant.created_at))
        });
        Ok(summaries)
    }

    pub async fn plant_detail(&self, id: Uuid) -> Result<PlantDetail> {
        let session = self.require_session()?;
        let plant = self.owned_plant(&session, id).await?;
        let mut care_log = self.store.list_care_events_by_plant(id).await?;
        care_log.sort_by(|a, b| b.care_date.cmp(&a.care_date));

        let status = care::care_status(&plant, &care_log, Utc::now());
        Ok(PlantDetail {
            plant,
            status,
            care_log,
        })
    }

    pub async fn edit_plant(&self, id: Uuid, update: PlantUpdate) -> Result<Plant> {
        let session = self.require_session()?;
        self.owned_plant(&session, id).await?;
        self.store.update_plant(id, update).await
    }

    pub async fn remove_plant(&self, id: Uuid) -> Result<()> {
        let session = self.require_session()?;
        match self.store.get_plant(id).await? {
            Some(plant) if plant.owner_id != session.account_id => {
                Err(AppError::not_found("Plant", id))
            }
            Some(plant) => {
                self.store.delete_plant(id).await?;
                tracing::info!(plant = %id, name = %plant.name, "plant removed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    // Care operations

    /// Record care given right now; the care type defaults to the configured one.
    pub async fn log_care(
        &self,
        id: Uuid,
        care_type: Option<String>,
        notes: Option<String>,
    ) -> Result<CareEvent> {
        let session = self.require_session()?;
        let plant = self.owned_plant(&session, id).await?;

        let event = self
            .store
            .create_care_event(NewCareEvent {
                plant_id: plant.id,
                care_type: non_empty(care_type).unwrap_or_else(|| self.default_care_type.clone()),
                care_date: now(),
                notes: non_empty(notes),
            })
            .await?;
        tracing::info!(plant = %plant.id, care_type = %event.care_type, "care logged");
        Ok(event)
    }

    pub async fn close(self) -> Result<()> {
        self.store.close().await
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
