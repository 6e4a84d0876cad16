//! In-memory record API.
//!
//! Holds patients, readings and recommendations behind a mutex and implements every collaborator
//! trait. Individual operations can be made to fail so callers can exercise their error paths.

use crate::constants::STANDARD_DRUG_NAMES;
use crate::model::{
    DrugType, NewReading, Patient, PatientId, PatientPayload, Reading, ReadingId, Recommendation,
};
use crate::services::{PatientApi, ReadingApi, RecommendationApi};
use crate::{GlucoError, GlucoResult, TimeSlot};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ListPatients,
    GetPatient,
    InsertPatient,
    UpdatePatient,
    ListReadings,
    CreateReading,
    ListRecommendations,
    ListDrugTypes,
}

#[derive(Default)]
struct MemoryState {
    patients: BTreeMap<PatientId, Patient>,
    readings: Vec<Reading>,
    recommendations: Vec<Recommendation>,
    drug_types: Vec<DrugType>,
    failures: HashMap<Operation, String>,
    next_patient_id: PatientId,
    next_reading_id: ReadingId,
}

#[derive(Default)]
pub struct InMemoryApi {
    state: Mutex<MemoryState>,
}

impl InMemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store whose drug lookup holds the standard formulary.
    pub fn with_standard_drugs() -> Self {
        let api = Self::new();
        {
            let mut state = api.lock();
            state.drug_types = STANDARD_DRUG_NAMES
                .iter()
                .zip(1..)
                .map(|(name, id)| DrugType {
                    id,
                    drug_name: (*name).to_owned(),
                })
                .collect();
        }
        api
    }

    /// A small populated store for demonstrations.
    pub fn demo() -> Self {
        let api = Self::with_standard_drugs();
        let mut ada = Patient::named(1, "Ada Lovelace");
        ada.birth_date = NaiveDate::from_ymd_opt(1962, 12, 10);
        ada.patient_sex = Some(crate::Sex::Female);
        ada.height = Some(168.0);
        ada.weight = Some(71.0);
        ada.hba1c = Some(7.8);
        ada.creatine_mg_dl = Some(0.9);
        ada.duration = Some(6.0);
        ada.hld = true;
        api.seed_patient(ada);

        let mut alan = Patient::named(2, "Alan Turing");
        alan.birth_date = NaiveDate::from_ymd_opt(1958, 6, 23);
        alan.patient_sex = Some(crate::Sex::Male);
        alan.height = Some(180.0);
        alan.weight = Some(72.0);
        api.seed_patient(alan);

        let today = Local::now().date_naive();
        for (slot, value) in [
            (TimeSlot::Breakfast, 126.0),
            (TimeSlot::Lunch, 171.0),
            (TimeSlot::Bedtime, 142.0),
        ] {
            api.seed_reading(1, slot, value, today);
        }

        for (id, (drug_id, slot, dosage, unit)) in [
            (1, TimeSlot::Breakfast, 500.0, "mg"),
            (1, TimeSlot::Dinner, 500.0, "mg"),
            (5, TimeSlot::Breakfast, 6.0, "unit"),
            (4, TimeSlot::Bedtime, 18.0, "unit"),
        ]
        .into_iter()
        .enumerate()
        {
            api.seed_recommendation(Recommendation {
                id: i64::try_from(id).unwrap_or_default() + 1,
                patient_id: 1,
                drug_id,
                dosage,
                dosage_unit: Some(unit.to_owned()),
                time_of_reading: slot,
                recommendation_date: None,
                drug_name: None,
            });
        }
        api
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn seed_patient(&self, patient: Patient) {
        let mut state = self.lock();
        state.next_patient_id = state.next_patient_id.max(patient.id);
        state.patients.insert(patient.id, patient);
    }

    pub fn seed_reading(&self, patient: PatientId, slot: TimeSlot, value: f64, date: NaiveDate) {
        let mut state = self.lock();
        state.next_reading_id += 1;
        let id = state.next_reading_id;
        state.readings.push(Reading {
            id,
            patient_id: patient,
            time_of_reading: slot,
            reading_value: value,
            reading_date: date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            notes: None,
        });
    }

    pub fn seed_recommendation(&self, recommendation: Recommendation) {
        self.lock().recommendations.push(recommendation);
    }

    pub fn set_drug_types(&self, drug_types: Vec<DrugType>) {
        self.lock().drug_types = drug_types;
    }

    /// Makes every later call of `op` fail with `message`.
    pub fn fail(&self, op: Operation, message: impl Into<String>) {
        self.lock().failures.insert(op, message.into());
    }

    /// Clears a failure injected with [`InMemoryApi::fail`].
    pub fn recover(&self, op: Operation) {
        self.lock().failures.remove(&op);
    }

    pub fn patient(&self, id: PatientId) -> Option<Patient> {
        self.lock().patients.get(&id).cloned()
    }

    pub fn readings(&self) -> Vec<Reading> {
        self.lock().readings.clone()
    }

    fn check(state: &MemoryState, op: Operation) -> GlucoResult<()> {
        match state.failures.get(&op) {
            Some(message) => Err(GlucoError::Api {
                status: Some(500),
                message: Some(message.clone()),
            }),
            None => Ok(()),
        }
    }
}

fn apply_payload(patient: &mut Patient, payload: &PatientPayload) {
    patient.name = payload.name.clone();
    patient.birth_date = payload.birth_date;
    patient.patient_sex = payload.patient_sex;
    patient.weight = payload.weight;
    patient.height = payload.height;
    patient.hba1c = payload.hba1c.as_deref().and_then(|v| v.parse().ok());
    patient.creatine_mg_dl = payload.creatine_mg_dl;
    patient.duration = Some(payload.duration);
    patient.cad = payload.cad;
    patient.ckd = payload.ckd;
    patient.hld = payload.hld;
}

#[async_trait]
impl PatientApi for InMemoryApi {
    async fn list_patients(&self) -> GlucoResult<Vec<Patient>> {
        let state = self.lock();
        Self::check(&state, Operation::ListPatients)?;
        Ok(state.patients.values().cloned().collect())
    }

    async fn get_patient(&self, id: PatientId) -> GlucoResult<Patient> {
        let state = self.lock();
        Self::check(&state, Operation::GetPatient)?;
        state
            .patients
            .get(&id)
            .cloned()
            .ok_or(GlucoError::NotFound(id))
    }

    async fn insert_patient(&self, payload: &PatientPayload) -> GlucoResult<PatientId> {
        let mut state = self.lock();
        Self::check(&state, Operation::InsertPatient)?;
        state.next_patient_id += 1;
        let id = state.next_patient_id;
        let mut patient = Patient::named(id, "");
        apply_payload(&mut patient, payload);
        patient.created_date = Some(Local::now().naive_local());
        state.patients.insert(id, patient);
        Ok(id)
    }

    async fn update_patient(&self, id: PatientId, payload: &PatientPayload) -> GlucoResult<()> {
        let mut state = self.lock();
        Self::check(&state, Operation::UpdatePatient)?;
        let patient = state.patients.get_mut(&id).ok_or(GlucoError::NotFound(id))?;
        apply_payload(patient, payload);
        Ok(())
    }
}

#[async_trait]
impl ReadingApi for InMemoryApi {
    async fn list_readings(&self, patient: Option<PatientId>) -> GlucoResult<Vec<Reading>> {
        let state = self.lock();
        Self::check(&state, Operation::ListReadings)?;
        Ok(state
            .readings
            .iter()
            .filter(|r| patient.map_or(true, |p| r.patient_id == p))
            .cloned()
            .collect())
    }

    async fn create_reading(&self, reading: &NewReading) -> GlucoResult<ReadingId> {
        let mut state = self.lock();
        Self::check(&state, Operation::CreateReading)?;
        if !state.patients.contains_key(&reading.patient_id) {
            return Err(GlucoError::NotFound(reading.patient_id));
        }
        state.next_reading_id += 1;
        let id = state.next_reading_id;
        state.readings.push(Reading {
            id,
            patient_id: reading.patient_id,
            time_of_reading: reading.time_of_reading,
            reading_value: reading.reading_value,
            reading_date: reading.reading_date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            notes: reading.notes.clone(),
        });
        Ok(id)
    }
}

#[async_trait]
impl RecommendationApi for InMemoryApi {
    async fn list_recommendations(
        &self,
        patient: Option<PatientId>,
    ) -> GlucoResult<Vec<Recommendation>> {
        let state = self.lock();
        Self::check(&state, Operation::ListRecommendations)?;
        Ok(state
            .recommendations
            .iter()
            .filter(|r| patient.map_or(true, |p| r.patient_id == p))
            .cloned()
            .collect())
    }

    async fn list_drug_types(&self) -> GlucoResult<Vec<DrugType>> {
        let state = self.lock();
        Self::check(&state, Operation::ListDrugTypes)?;
        Ok(state.drug_types.clone())
    }
}
