//! Record API collaborators.
//!
//! Views and the form never talk HTTP themselves; they go through these traits. The production
//! implementation lives in `gluco-client`; [`crate::memory::InMemoryApi`] backs tests and the
//! CLI demo mode.

use crate::model::{
    DrugType, NewReading, Patient, PatientId, PatientPayload, Reading, ReadingId, Recommendation,
};
use crate::GlucoResult;
use async_trait::async_trait;

#[async_trait]
pub trait PatientApi: Send + Sync {
    async fn list_patients(&self) -> GlucoResult<Vec<Patient>>;

    async fn get_patient(&self, id: PatientId) -> GlucoResult<Patient>;

    /// Inserts a patient and returns the id the record API assigned.
    async fn insert_patient(&self, payload: &PatientPayload) -> GlucoResult<PatientId>;

    async fn update_patient(&self, id: PatientId, payload: &PatientPayload) -> GlucoResult<()>;
}

#[async_trait]
pub trait ReadingApi: Send + Sync {
    /// Lists readings, restricted to one patient when `patient` is given.
    async fn list_readings(&self, patient: Option<PatientId>) -> GlucoResult<Vec<Reading>>;

    async fn create_reading(&self, reading: &NewReading) -> GlucoResult<ReadingId>;
}

#[async_trait]
pub trait RecommendationApi: Send + Sync {
    async fn list_recommendations(
        &self,
        patient: Option<PatientId>,
    ) -> GlucoResult<Vec<Recommendation>>;

    async fn list_drug_types(&self) -> GlucoResult<Vec<DrugType>>;
}

/// Everything a view needs from the record API.
pub trait GlucoApi: PatientApi + ReadingApi + RecommendationApi {}

impl<T: PatientApi + ReadingApi + RecommendationApi + ?Sized> GlucoApi for T {}
