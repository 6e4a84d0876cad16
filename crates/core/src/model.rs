//! Record API entities.
//!
//! These mirror the rows served by the record API. Derived values (age, BMI) are never stored
//! here; see [`crate::metrics`].

use crate::{wire, GlucoError, GlucoResult, TimeSlot};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub type PatientId = i64;
pub type ReadingId = i64;
pub type DrugId = i64;
pub type RecommendationId = i64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
}

impl Sex {
    pub fn code(self) -> &'static str {
        match self {
            Sex::Male => "M",
            Sex::Female => "F",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        })
    }
}

impl FromStr for Sex {
    type Err = GlucoError;

    fn from_str(s: &str) -> GlucoResult<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "M" | "MALE" => Ok(Sex::Male),
            "F" | "FEMALE" => Ok(Sex::Female),
            other => Err(GlucoError::InvalidInput(format!(
                "unknown sex '{other}' (expected M or F)"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Patient {
    pub id: PatientId,
    #[serde(default)]
    pub name: String,
    #[serde(default, with = "wire::date_opt")]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub patient_sex: Option<Sex>,
    /// Kilograms.
    #[serde(default, deserialize_with = "wire::number_opt::deserialize")]
    pub weight: Option<f64>,
    /// Centimetres.
    #[serde(default, deserialize_with = "wire::number_opt::deserialize")]
    pub height: Option<f64>,
    /// Percent.
    #[serde(default, deserialize_with = "wire::number_opt::deserialize")]
    pub hba1c: Option<f64>,
    #[serde(default, deserialize_with = "wire::number_opt::deserialize")]
    pub creatine_mg_dl: Option<f64>,
    /// Years since diagnosis.
    #[serde(default, deserialize_with = "wire::number_opt::deserialize")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub medical_record_number: Option<String>,
    #[serde(default, with = "wire::timestamp_opt")]
    pub created_date: Option<NaiveDateTime>,
    #[serde(default, with = "wire::flag")]
    pub cad: bool,
    #[serde(default, with = "wire::flag")]
    pub ckd: bool,
    #[serde(default, with = "wire::flag")]
    pub hld: bool,
}

impl Patient {
    /// A patient with only an identity, used as the starting point for new records.
    pub fn named(id: PatientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            birth_date: None,
            patient_sex: None,
            weight: None,
            height: None,
            hba1c: None,
            creatine_mg_dl: None,
            duration: None,
            medical_record_number: None,
            created_date: None,
            cad: false,
            ckd: false,
            hld: false,
        }
    }
}

/// A timestamped glucose measurement.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Reading {
    pub id: ReadingId,
    pub patient_id: PatientId,
    pub time_of_reading: TimeSlot,
    /// mg/dL.
    #[serde(deserialize_with = "wire::number::deserialize")]
    pub reading_value: f64,
    #[serde(with = "wire::timestamp")]
    pub reading_date: NaiveDateTime,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Insert payload for a reading.
#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct NewReading {
    pub patient_id: PatientId,
    pub time_of_reading: TimeSlot,
    pub reading_value: f64,
    pub reading_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A dosage of a drug prescribed for one time-of-day slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub patient_id: PatientId,
    pub drug_id: DrugId,
    #[serde(deserialize_with = "wire::number::deserialize")]
    pub dosage: f64,
    #[serde(default)]
    pub dosage_unit: Option<String>,
    pub time_of_reading: TimeSlot,
    #[serde(default, with = "wire::timestamp_opt")]
    pub recommendation_date: Option<NaiveDateTime>,
    /// Denormalised name some record API views attach; never trusted as a label.
    #[serde(default)]
    pub drug_name: Option<String>,
}

/// One row of the drug lookup table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DrugType {
    pub id: DrugId,
    pub drug_name: String,
}

/// Insert/update body for a patient.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PatientPayload {
    pub name: String,
    #[serde(with = "wire::date_opt")]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient_sex: Option<Sex>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    /// Two-decimal text, e.g. `"7.50"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hba1c: Option<String>,
    pub creatine_mg_dl: Option<f64>,
    pub duration: f64,
    #[serde(with = "wire::flag")]
    pub cad: bool,
    #[serde(with = "wire::flag")]
    pub ckd: bool,
    #[serde(with = "wire::flag")]
    pub hld: bool,
}
