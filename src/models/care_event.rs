use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareEvent {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub care_type: String,
    pub care_date: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCareEvent {
    pub plant_id: Uuid,
    pub care_type: String,
    pub care_date: DateTime<Utc>,
    pub notes: Option<String>,
}

impl NewCareEvent {
    pub fn into_event(self, id: Uuid, created_at: DateTime<Utc>) -> CareEvent {
        CareEvent {
            id,
            plant_id: self.plant_id,
            care_type: self.care_type,
            care_date: self.care_date,
            notes: self.notes,
            created_at,
        }
    }
}
