//! Giardino: track plants, log the care they get, and see which ones are due.
//!
//! [`App`] is the entry point. It owns a [`db::RecordStore`] (SQLite by
//! default, in-memory for tests) and the persisted session slot.

pub mod app;
pub mod auth;
pub mod care;
pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use app::{App, PlantDetail, PlantDraft, PlantSummary};
pub use config::Config;
pub use error::{AppError, Result};
