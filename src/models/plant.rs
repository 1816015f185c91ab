use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Upper bound on a care cadence, roughly a century.
pub const MAX_CARE_FREQUENCY_DAYS: u32 = 36_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Indoor,
    Outdoor,
    Aromatiche,
    Grasse,
    Fiorite,
    Ortaggi,
    Alberi,
    Altra,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Indoor,
        Category::Outdoor,
        Category::Aromatiche,
        Category::Grasse,
        Category::Fiorite,
        Category::Ortaggi,
        Category::Alberi,
        Category::Altra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Indoor => "Indoor",
            Category::Outdoor => "Outdoor",
            Category::Aromatiche => "Aromatiche",
            Category::Grasse => "Grasse",
            Category::Fiorite => "Fiorite",
            Category::Ortaggi => "Ortaggi",
            Category::Alberi => "Alberi",
            Category::Altra => "Altra",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidInput(format!("unknown category: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub category: Category,
    pub care_frequency_days: u32,
    pub image_ref: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPlant {
    pub owner_id: Uuid,
    pub name: String,
    pub category: Category,
    pub care_frequency_days: u32,
    pub image_ref: Option<String>,
    pub notes: Option<String>,
}

impl NewPlant {
    pub fn validate(&self) -> Result<()> {
        validate_name(&self.name)?;
        validate_frequency(self.care_frequency_days)
    }

    pub fn into_plant(self, id: Uuid, now: DateTime<Utc>) -> Plant {
        Plant {
            id,
            owner_id: self.owner_id,
            name: self.name,
            category: self.category,
            care_frequency_days: self.care_frequency_days,
            image_ref: self.image_ref,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves a field untouched. For the optional fields
/// `Some(None)` clears the stored value.
#[derive(Debug, Clone, Default)]
pub struct PlantUpdate {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub care_frequency_days: Option<u32>,
    pub image_ref: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

impl PlantUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(days) = self.care_frequency_days {
            validate_frequency(days)?;
        }
        Ok(())
    }

    /// Merge over `plant` and stamp `updated_at`.
    pub fn apply(self, plant: &mut Plant, updated_at: DateTime<Utc>) {
        if let Some(name) = self.name {
            plant.name = name;
        }
        if let Some(category) = self.category {
            plant.category = category;
        }
        if let Some(days) = self.care_frequency_days {
            plant.care_frequency_days = days;
        }
        if let Some(image_ref) = self.image_ref {
            plant.image_ref = image_ref;
        }
        if let Some(notes) = self.notes {
            plant.notes = notes;
        }
        plant.updated_at = updated_at;
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("plant name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_frequency(days: u32) -> Result<()> {
    if !(1..=MAX_CARE_FREQUENCY_DAYS).contains(&days) {
        return Err(AppError::InvalidInput(format!(
            "care frequency must be between 1 and {} days",
            MAX_CARE_FREQUENCY_DAYS
        )));
    }
    Ok(())
}
