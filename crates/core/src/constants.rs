//! Constants used throughout the gluco core crate.
//!
//! Display labels, clinical thresholds and record API defaults live here so that the views,
//! the CLI and the REST layer all agree on them.

pub use gluco_types::PLACEHOLDER;

/// Default record API base URL (Ontimize REST services).
pub const DEFAULT_API_ENDPOINT: &str = "http://localhost:5656/ontimizeweb/services/rest";

/// Default request timeout for the record API, in seconds.
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

/// Default bind address for the REST view server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Drug names that route recommendations into the insulin table.
pub const INSULIN_DRUG_NAMES: &[&str] = &["Glargine", "Lispro"];

/// The standard formulary, in drug id order starting at 1.
pub const STANDARD_DRUG_NAMES: &[&str] = &[
    "Metformin",
    "Glimepiride",
    "Tradjenta",
    "Glargine",
    "Lispro",
    "Farxiga",
    "Ozempic",
];

/// Dosage units offered by the medication editor.
pub const DOSAGE_UNITS: &[&str] = &["mg", "mcg", "ml", "unit", "g", "kg", "l", "oz"];

/// Dosage unit assumed when a recommendation carries none.
pub const DEFAULT_DOSAGE_UNIT: &str = "unit";

/// Label for a medication row whose drug id cannot be resolved.
pub const UNKNOWN_DRUG: &str = "Unknown Drug";

/// Label for an insulin row whose drug id cannot be resolved.
pub const UNKNOWN_INSULIN: &str = "Unknown Insulin";

/// Fallback when a failed operation carries no usable message.
pub const UNKNOWN_ERROR_MESSAGE: &str = "An unknown error occurred";

/// Glucose unit shown next to readings.
pub const GLUCOSE_UNIT: &str = "mg/dL";

/// Upper bound of a normal pre-meal glucose reading, in mg/dL.
pub const READING_NORMAL_MAX_MG_DL: f64 = 130.0;

/// Clinically plausible HbA1c range, in percent.
pub const HBA1C_MIN_PERCENT: f64 = 4.0;
pub const HBA1C_MAX_PERCENT: f64 = 20.0;
