//! View state for the patient pages.
//!
//! Each view owns its state, loads it through the record API collaborators and exposes
//! serialisable view models. Rendering (text tables, JSON) is left to the caller.

pub mod detail;
pub mod list;

pub use detail::{DetailState, InfoItem, PatientDetailView, PatientSummary, VitalCard};
pub use list::{PatientListView, PatientOption};
