//! # Gluco Core
//!
//! Presentation-layer logic for the glucose clinic patient pages.
//!
//! This crate holds the domain records, the pure derivations shown on screen (latest reading
//! per slot, dosage tables, BMI, age) and the stateful list, detail and form views. The record
//! backend is reached only through the collaborator traits in [`services`]:
//! - `gluco-client` implements them over HTTP
//! - [`memory::InMemoryApi`] implements them in process for tests and demos
//!
//! **No transport concerns**: HTTP clients, the REST server and the CLI live in their own crates.

pub mod aggregate;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod error;
pub mod form;
pub mod guard;
pub mod memory;
pub mod metrics;
pub mod model;
pub mod notification;
pub mod services;
pub mod slot;
pub mod validation;
pub mod views;

mod wire;

pub use aggregate::{DosageRow, DosageTables, SlotValues, TableKind};
pub use catalog::DrugCatalog;
pub use config::{ClientConfig, ServerConfig};
pub use error::{GlucoError, GlucoResult};
pub use form::{record_reading, FormMode, PatientForm, PatientInput, ReadingInput};
pub use guard::{RouteGuard, Session, SessionGuard};
pub use model::{
    DrugType, NewReading, Patient, PatientId, PatientPayload, Reading, Recommendation, Sex,
};
pub use notification::{Notification, NotificationKind};
pub use services::{GlucoApi, PatientApi, ReadingApi, RecommendationApi};
pub use slot::TimeSlot;
pub use views::{DetailState, PatientDetailView, PatientListView, PatientOption};

pub use gluco_types::{NonEmptyText, OrPlaceholder, PLACEHOLDER};
