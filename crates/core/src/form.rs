//! Patient create/edit form.
//!
//! The form owns its state and re-derives everything dependent on it after each mutation: every
//! setter ends by re-running validation, and the BMI is computed on demand from the draft.
//! Submitting writes the patient and then every newly entered reading through the record API.

use crate::aggregate::{dosage_tables, latest_reading_records, DosageRow, SlotValues};
use crate::catalog::DrugCatalog;
use crate::constants::PLACEHOLDER;
use crate::metrics::{bmi, format_bmi};
use crate::model::{
    NewReading, Patient, PatientId, PatientPayload, Reading, ReadingId, Recommendation, Sex,
};
use crate::notification::Notification;
use crate::services::{GlucoApi, ReadingApi};
use crate::validation::{combined_message, reading_value_is_valid, validate_draft};
use crate::{GlucoError, GlucoResult, TimeSlot};
use chrono::{Local, NaiveDate};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

/// Demographic and clinical fields as the user has entered them so far.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PatientDraft {
    pub name: String,
    pub birth_date: Option<NaiveDate>,
    pub patient_sex: Option<Sex>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub hba1c: Option<f64>,
    pub creatine_mg_dl: Option<f64>,
    pub duration: Option<f64>,
    pub cad: bool,
    pub ckd: bool,
    pub hld: bool,
}

impl From<&Patient> for PatientDraft {
    fn from(p: &Patient) -> Self {
        Self {
            name: p.name.clone(),
            birth_date: p.birth_date,
            patient_sex: p.patient_sex,
            weight: p.weight,
            height: p.height,
            hba1c: p.hba1c,
            creatine_mg_dl: p.creatine_mg_dl,
            duration: p.duration,
            cad: p.cad,
            ckd: p.ckd,
            hld: p.hld,
        }
    }
}

/// A glucose value typed into one slot of the form.
#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct FormReading {
    pub id: Option<ReadingId>,
    pub slot: TimeSlot,
    pub value: String,
    pub date: NaiveDate,
    /// Entered or changed in this form session, so it will be submitted.
    pub dirty: bool,
}

impl FormReading {
    pub fn new(slot: TimeSlot, value: impl Into<String>) -> Self {
        Self {
            id: None,
            slot,
            value: value.into(),
            date: Local::now().date_naive(),
            dirty: true,
        }
    }

    fn from_record(reading: &Reading) -> Self {
        Self {
            id: Some(reading.id),
            slot: reading.time_of_reading,
            value: reading.reading_value.to_string(),
            date: reading.reading_date.date(),
            dirty: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ClinicalFlag {
    Cad,
    Ckd,
    Hld,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(PatientId),
}

/// A reading supplied from outside the form (REST body, CLI arguments).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ReadingInput {
    pub slot: TimeSlot,
    pub value: f64,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Field changes supplied from outside the form. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PatientInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub patient_sex: Option<Sex>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
    #[serde(default)]
    pub hba1c: Option<f64>,
    #[serde(default)]
    pub creatine_mg_dl: Option<f64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub cad: Option<bool>,
    #[serde(default)]
    pub ckd: Option<bool>,
    #[serde(default)]
    pub hld: Option<bool>,
    #[serde(default)]
    pub readings: Vec<ReadingInput>,
}

#[derive(Clone, Debug)]
pub struct PatientForm {
    mode: FormMode,
    draft: PatientDraft,
    readings: Vec<FormReading>,
    medications: Vec<DosageRow>,
    insulin: Vec<DosageRow>,
    recommendations: Vec<Recommendation>,
    drug_options: Vec<String>,
    error: String,
    is_submitting: bool,
    notification: Option<Notification>,
}

impl Default for PatientForm {
    fn default() -> Self {
        Self::new()
    }
}

fn editable(slots: &SlotValues) -> SlotValues {
    let mut out = slots.clone();
    for slot in TimeSlot::ALL {
        if !slots.is_filled(slot) {
            out.set(slot, "");
        }
    }
    out
}

impl PatientForm {
    /// An empty form for a new patient.
    pub fn new() -> Self {
        let mut form = Self {
            mode: FormMode::Create,
            draft: PatientDraft::default(),
            readings: Vec::new(),
            medications: Vec::new(),
            insulin: Vec::new(),
            recommendations: Vec::new(),
            drug_options: DrugCatalog::standard()
                .options()
                .into_iter()
                .map(str::to_owned)
                .collect(),
            error: String::new(),
            is_submitting: false,
            notification: None,
        };
        form.revalidate();
        form
    }

    /// A form pre-filled from an existing patient and its related records.
    pub fn edit(
        patient: &Patient,
        readings: &[Reading],
        recommendations: &[Recommendation],
        catalog: &DrugCatalog,
    ) -> Self {
        let tables = dosage_tables(recommendations, catalog, Some(patient.id));
        let mut form = Self::new();
        form.mode = FormMode::Edit(patient.id);
        form.draft = PatientDraft::from(patient);
        form.readings = latest_reading_records(readings, patient.id)
            .iter()
            .map(FormReading::from_record)
            .collect();
        form.medications = tables
            .medications
            .into_iter()
            .map(|row| DosageRow {
                slots: editable(&row.slots),
                drug: row.drug,
            })
            .collect();
        form.insulin = tables
            .insulin
            .into_iter()
            .map(|row| DosageRow {
                slots: editable(&row.slots),
                drug: row.drug,
            })
            .collect();
        form.recommendations = recommendations
            .iter()
            .filter(|r| r.patient_id == patient.id)
            .cloned()
            .collect();
        if !catalog.is_empty() {
            form.drug_options = catalog.options().into_iter().map(str::to_owned).collect();
        }
        form.revalidate();
        form
    }

    /// Fetches `id` with its readings, recommendations and the drug lookup and opens it for
    /// editing.
    pub async fn load_for_edit<A: GlucoApi + ?Sized>(api: &A, id: PatientId) -> GlucoResult<Self> {
        let (patient, readings, recommendations, drug_types) = futures::try_join!(
            api.get_patient(id),
            api.list_readings(Some(id)),
            api.list_recommendations(Some(id)),
            api.list_drug_types(),
        )?;
        let catalog = DrugCatalog::from_drug_types(drug_types)?;
        Ok(Self::edit(&patient, &readings, &recommendations, &catalog))
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &PatientDraft {
        &self.draft
    }

    pub fn readings(&self) -> &[FormReading] {
        &self.readings
    }

    pub fn reading(&self, slot: TimeSlot) -> Option<&FormReading> {
        self.readings.iter().find(|r| r.slot == slot)
    }

    pub fn medications(&self) -> &[DosageRow] {
        &self.medications
    }

    pub fn insulin(&self) -> &[DosageRow] {
        &self.insulin
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    pub fn drug_options(&self) -> &[String] {
        &self.drug_options
    }

    /// Medication, insulin and recommendation sections are read-only once a patient exists.
    pub fn dosage_sections_locked(&self) -> bool {
        matches!(self.mode, FormMode::Edit(_))
    }

    /// Combined validation or submission message; empty when there is nothing to report.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn is_valid(&self) -> bool {
        validate_draft(&self.draft, &self.readings).is_empty()
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn bmi(&self) -> Option<f64> {
        bmi(self.draft.height, self.draft.weight)
    }

    pub fn bmi_label(&self) -> String {
        format!("BMI: {}", format_bmi(self.bmi()))
    }

    fn revalidate(&mut self) {
        self.error = combined_message(&validate_draft(&self.draft, &self.readings));
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.name = name.into();
        self.revalidate();
    }

    pub fn set_birth_date(&mut self, date: Option<NaiveDate>) {
        self.draft.birth_date = date;
        self.revalidate();
    }

    pub fn set_sex(&mut self, sex: Option<Sex>) {
        self.draft.patient_sex = sex;
        self.revalidate();
    }

    pub fn set_weight(&mut self, kg: Option<f64>) {
        self.draft.weight = kg;
        self.revalidate();
    }

    pub fn set_height(&mut self, cm: Option<f64>) {
        self.draft.height = cm;
        self.revalidate();
    }

    pub fn set_hba1c(&mut self, percent: Option<f64>) {
        self.draft.hba1c = percent;
        self.revalidate();
    }

    pub fn set_creatinine(&mut self, mg_dl: Option<f64>) {
        self.draft.creatine_mg_dl = mg_dl;
        self.revalidate();
    }

    pub fn set_duration(&mut self, years: Option<f64>) {
        self.draft.duration = years;
        self.revalidate();
    }

    pub fn set_flag(&mut self, flag: ClinicalFlag, value: bool) {
        match flag {
            ClinicalFlag::Cad => self.draft.cad = value,
            ClinicalFlag::Ckd => self.draft.ckd = value,
            ClinicalFlag::Hld => self.draft.hld = value,
        }
        self.revalidate();
    }

    /// Replaces the value entered for `slot`. Without an explicit date the reading is dated today.
    pub fn set_reading(&mut self, slot: TimeSlot, value: impl Into<String>, date: Option<NaiveDate>) {
        let id = self
            .readings
            .iter()
            .position(|r| r.slot == slot)
            .and_then(|at| self.readings.remove(at).id);
        let mut reading = FormReading::new(slot, value);
        reading.id = id;
        if let Some(date) = date {
            reading.date = date;
        }
        self.readings.push(reading);
        self.revalidate();
    }

    /// Applies every field present in `input`, then its readings.
    pub fn apply(&mut self, input: PatientInput) {
        if let Some(name) = input.name {
            self.set_name(name);
        }
        if input.birth_date.is_some() {
            self.set_birth_date(input.birth_date);
        }
        if input.patient_sex.is_some() {
            self.set_sex(input.patient_sex);
        }
        if input.weight.is_some() {
            self.set_weight(input.weight);
        }
        if input.height.is_some() {
            self.set_height(input.height);
        }
        if input.hba1c.is_some() {
            self.set_hba1c(input.hba1c);
        }
        if input.creatine_mg_dl.is_some() {
            self.set_creatinine(input.creatine_mg_dl);
        }
        if input.duration.is_some() {
            self.set_duration(input.duration);
        }
        for (flag, value) in [
            (ClinicalFlag::Cad, input.cad),
            (ClinicalFlag::Ckd, input.ckd),
            (ClinicalFlag::Hld, input.hld),
        ] {
            if let Some(value) = value {
                self.set_flag(flag, value);
            }
        }
        for reading in input.readings {
            self.set_reading(reading.slot, reading.value.to_string(), reading.date);
        }
    }

    /// The insert/update body for the current draft.
    pub fn payload(&self) -> PatientPayload {
        let d = &self.draft;
        PatientPayload {
            name: d.name.trim().to_owned(),
            birth_date: d.birth_date,
            patient_sex: d.patient_sex,
            weight: d.weight,
            height: d.height,
            hba1c: d.hba1c.map(|v| format!("{v:.2}")),
            creatine_mg_dl: d.creatine_mg_dl,
            duration: d.duration.unwrap_or(0.0),
            cad: d.cad,
            ckd: d.ckd,
            hld: d.hld,
        }
    }

    /// Readings entered in this session that still need to be written for `patient`.
    pub fn pending_readings(&self, patient: PatientId) -> GlucoResult<Vec<NewReading>> {
        self.readings
            .iter()
            .filter(|r| r.dirty && !r.value.trim().is_empty())
            .map(|r| {
                let value = r.value.trim().parse::<f64>().map_err(|_| {
                    GlucoError::InvalidInput(format!("Invalid {} reading", r.slot.label()))
                })?;
                Ok(NewReading {
                    patient_id: patient,
                    time_of_reading: r.slot,
                    reading_value: value,
                    reading_date: r.date,
                    notes: None,
                })
            })
            .collect()
    }

    /// Saves the patient, then its dirty readings.
    ///
    /// The form moves to editing the patient as soon as it has been inserted, so a retry after a
    /// failed reading updates that patient instead of inserting another one.
    async fn save<A: GlucoApi + ?Sized>(&mut self, api: &A) -> GlucoResult<PatientId> {
        let payload = self.payload();
        let id = match self.mode {
            FormMode::Create => {
                let id = api.insert_patient(&payload).await?;
                self.mode = FormMode::Edit(id);
                id
            }
            FormMode::Edit(id) => {
                api.update_patient(id, &payload).await?;
                id
            }
        };

        let pending = self.pending_readings(id)?;
        if !pending.is_empty() {
            let created = try_join_all(pending.iter().map(|r| api.create_reading(r))).await?;
            tracing::debug!(patient = id, readings = created.len(), "readings created");
        }
        Ok(id)
    }

    /// Validates and saves the form.
    ///
    /// Nothing is sent while validation fails. On success the form switches to editing the saved
    /// patient; on failure the extracted message is kept in [`PatientForm::error`]. Either way a
    /// notification describing the outcome is recorded.
    ///
    /// # Errors
    ///
    /// Returns [`GlucoError::Validation`] for an invalid draft, or the first record API error
    /// raised while saving the patient or any of its readings.
    pub async fn submit<A: GlucoApi + ?Sized>(&mut self, api: &A) -> GlucoResult<PatientId> {
        self.revalidate();
        if !self.error.is_empty() {
            let err = GlucoError::Validation(self.error.clone());
            self.notification = Some(Notification::failure(&err));
            return Err(err);
        }

        let creating = self.mode == FormMode::Create;
        self.is_submitting = true;
        let result = self.save(api).await;
        self.is_submitting = false;

        match result {
            Ok(id) => {
                let message = if creating {
                    "Patient created successfully!"
                } else {
                    "Patient updated successfully!"
                };
                tracing::info!(patient = id, "{message}");
                for reading in &mut self.readings {
                    reading.dirty = false;
                }
                self.notification = Some(Notification::success(message));
                Ok(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "patient submission failed");
                self.error = err.user_message();
                self.notification = Some(Notification::failure(&err));
                Err(err)
            }
        }
    }
}

/// Records a single reading for an existing patient without going through the form.
///
/// The value is checked with the same rule the form applies; the date defaults to today.
pub async fn record_reading<A: ReadingApi + ?Sized>(
    api: &A,
    patient: PatientId,
    input: &ReadingInput,
) -> GlucoResult<ReadingId> {
    if !reading_value_is_valid(input.value) {
        return Err(GlucoError::Validation(format!(
            "Invalid {} reading",
            input.slot.label()
        )));
    }
    let reading = NewReading {
        patient_id: patient,
        time_of_reading: input.slot,
        reading_value: input.value,
        reading_date: input.date.unwrap_or_else(|| Local::now().date_naive()),
        notes: None,
    };
    let id = api.create_reading(&reading).await?;
    tracing::info!(patient, reading = id, slot = %input.slot, "reading recorded");
    Ok(id)
}

/// Placeholder-aware display of a form reading value.
pub fn reading_display(form: &PatientForm, slot: TimeSlot) -> String {
    form.reading(slot)
        .map(|r| r.value.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(PLACEHOLDER)
        .to_owned()
}
