//! Reshaping flat records into fixed-shape display rows.
//!
//! Readings collapse to one value per time-of-day slot (the newest wins). Recommendations group
//! by drug name and then by slot, and split into a medication table and an insulin table.

use crate::catalog::{is_insulin, DrugCatalog};
use crate::constants::{DEFAULT_DOSAGE_UNIT, PLACEHOLDER, UNKNOWN_DRUG, UNKNOWN_INSULIN};
use crate::model::{PatientId, Reading, Recommendation};
use crate::TimeSlot;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One display string per slot. Missing data reads as the placeholder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SlotValues {
    pub breakfast: String,
    pub lunch: String,
    pub dinner: String,
    pub bedtime: String,
}

impl Default for SlotValues {
    fn default() -> Self {
        Self {
            breakfast: PLACEHOLDER.to_owned(),
            lunch: PLACEHOLDER.to_owned(),
            dinner: PLACEHOLDER.to_owned(),
            bedtime: PLACEHOLDER.to_owned(),
        }
    }
}

impl SlotValues {
    pub fn get(&self, slot: TimeSlot) -> &str {
        match slot {
            TimeSlot::Breakfast => &self.breakfast,
            TimeSlot::Lunch => &self.lunch,
            TimeSlot::Dinner => &self.dinner,
            TimeSlot::Bedtime => &self.bedtime,
        }
    }

    pub fn set(&mut self, slot: TimeSlot, value: impl Into<String>) {
        let cell = match slot {
            TimeSlot::Breakfast => &mut self.breakfast,
            TimeSlot::Lunch => &mut self.lunch,
            TimeSlot::Dinner => &mut self.dinner,
            TimeSlot::Bedtime => &mut self.bedtime,
        };
        *cell = value.into();
    }

    pub fn is_filled(&self, slot: TimeSlot) -> bool {
        self.get(slot) != PLACEHOLDER
    }
}

/// A drug and its dosage per slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DosageRow {
    pub drug: String,
    pub slots: SlotValues,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Medication,
    Insulin,
}

impl TableKind {
    /// Slots shown as columns of this table.
    pub fn columns(self) -> &'static [TimeSlot] {
        match self {
            TableKind::Medication => &TimeSlot::MEALS,
            TableKind::Insulin => &TimeSlot::ALL,
        }
    }

    pub fn unknown_label(self) -> &'static str {
        match self {
            TableKind::Medication => UNKNOWN_DRUG,
            TableKind::Insulin => UNKNOWN_INSULIN,
        }
    }

    pub fn empty_message(self) -> &'static str {
        match self {
            TableKind::Medication => "No medications found",
            TableKind::Insulin => "No insulin recommendations found",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            TableKind::Medication => "DOSE/mg",
            TableKind::Insulin => "Units",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DosageTables {
    pub medications: Vec<DosageRow>,
    pub insulin: Vec<DosageRow>,
}

/// Formats a measurement or dosage as a whole number, rounding half away from zero.
pub fn whole_number(value: f64) -> String {
    format!("{:.0}", value.round())
}

/// Newest reading value per slot for `patient`.
///
/// Readings are ordered newest first with a stable sort, so among readings sharing a timestamp
/// the one that came first in `readings` is kept.
pub fn latest_readings(readings: &[Reading], patient: Option<PatientId>) -> SlotValues {
    let mut latest = SlotValues::default();
    let Some(patient) = patient else {
        return latest;
    };

    let mut own: Vec<&Reading> = readings.iter().filter(|r| r.patient_id == patient).collect();
    own.sort_by(|a, b| b.reading_date.cmp(&a.reading_date));

    for reading in own {
        if !latest.is_filled(reading.time_of_reading) {
            latest.set(reading.time_of_reading, whole_number(reading.reading_value));
        }
    }
    latest
}

/// The newest reading per slot as records, in slot order.
pub fn latest_reading_records(readings: &[Reading], patient: PatientId) -> Vec<Reading> {
    let mut own: Vec<&Reading> = readings.iter().filter(|r| r.patient_id == patient).collect();
    own.sort_by(|a, b| b.reading_date.cmp(&a.reading_date));

    TimeSlot::ALL
        .iter()
        .filter_map(|slot| own.iter().find(|r| r.time_of_reading == *slot))
        .map(|r| (*r).clone())
        .collect()
}

fn classify<'a>(rec: &Recommendation, catalog: &'a DrugCatalog) -> (TableKind, &'a str) {
    match catalog.resolve(rec.drug_id) {
        Some(name) if is_insulin(name) => (TableKind::Insulin, name),
        Some(name) => (TableKind::Medication, name),
        None => {
            let kind = match rec.drug_name.as_deref() {
                Some(hint) if is_insulin(hint) => TableKind::Insulin,
                _ => TableKind::Medication,
            };
            (kind, kind.unknown_label())
        }
    }
}

#[derive(Default)]
struct RowBuilder {
    index: HashMap<String, usize>,
    rows: Vec<DosageRow>,
}

impl RowBuilder {
    fn put(&mut self, drug: &str, slot: TimeSlot, dosage: String) {
        let at = *self.index.entry(drug.to_owned()).or_insert_with(|| {
            self.rows.push(DosageRow {
                drug: drug.to_owned(),
                slots: SlotValues::default(),
            });
            self.rows.len() - 1
        });
        self.rows[at].slots.set(slot, dosage);
    }
}

/// Medication and insulin rows for `patient`.
///
/// Recommendations apply oldest first, so the most recent dosage for a drug and slot wins. Rows
/// keep the order in which their drug first appeared.
pub fn dosage_tables(
    recommendations: &[Recommendation],
    catalog: &DrugCatalog,
    patient: Option<PatientId>,
) -> DosageTables {
    let Some(patient) = patient else {
        return DosageTables::default();
    };

    let mut own: Vec<&Recommendation> = recommendations
        .iter()
        .filter(|r| r.patient_id == patient)
        .collect();
    own.sort_by(|a, b| a.recommendation_date.cmp(&b.recommendation_date));

    let mut medications = RowBuilder::default();
    let mut insulin = RowBuilder::default();
    for rec in own {
        let (kind, drug) = classify(rec, catalog);
        let unit = rec.dosage_unit.as_deref().unwrap_or(DEFAULT_DOSAGE_UNIT);
        let dosage = format!("{} {}", whole_number(rec.dosage), unit);
        match kind {
            TableKind::Medication => medications.put(drug, rec.time_of_reading, dosage),
            TableKind::Insulin => insulin.put(drug, rec.time_of_reading, dosage),
        }
    }

    DosageTables {
        medications: medications.rows,
        insulin: insulin.rows,
    }
}
