//! Patient detail page.
//!
//! Selecting a patient fetches the patient and its related records concurrently, then derives
//! the demographics summary, the latest reading per slot and the dosage tables from them.

use crate::aggregate::{dosage_tables, latest_readings, DosageRow, SlotValues};
use crate::catalog::DrugCatalog;
use crate::constants::GLUCOSE_UNIT;
use crate::metrics::{
    age_on, bmi, format_bmi, format_birth_date, format_creatinine, format_flag, reading_status,
    ReadingStatus,
};
use crate::model::{Patient, PatientId};
use crate::notification::Notification;
use crate::services::GlucoApi;
use crate::{GlucoResult, TimeSlot};
use chrono::{Local, NaiveDate};
use gluco_types::OrPlaceholder;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct InfoItem {
    pub label: String,
    pub value: String,
}

impl InfoItem {
    fn new(label: &str, value: impl Into<String>) -> Self {
        Self {
            label: label.to_owned(),
            value: value.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct PatientSummary {
    pub height_in_meters: Option<f64>,
    pub bmi: String,
    pub formatted_birth_date: String,
    pub age: String,
    pub items: Vec<InfoItem>,
}

impl PatientSummary {
    pub fn for_patient(patient: &Patient, today: NaiveDate) -> Self {
        let bmi = format_bmi(bmi(patient.height, patient.weight));
        let formatted_birth_date = format_birth_date(patient.birth_date);
        let age = patient.birth_date.map(|b| age_on(b, today)).or_placeholder();

        let items = vec![
            InfoItem::new("Name", patient.name.clone()),
            InfoItem::new("Birth Date", formatted_birth_date.clone()),
            InfoItem::new("Age", age.clone()),
            InfoItem::new("Sex", patient.patient_sex.or_placeholder()),
            InfoItem::new("Weight", patient.weight.or_placeholder()),
            InfoItem::new("Height", patient.height.or_placeholder()),
            InfoItem::new("BMI", bmi.clone()),
            InfoItem::new("HbA1c", patient.hba1c.or_placeholder()),
            InfoItem::new("Creatinine", format_creatinine(patient.creatine_mg_dl)),
            InfoItem::new("Duration", patient.duration.or_placeholder()),
            InfoItem::new("CAD", format_flag(patient.cad)),
            InfoItem::new("CKD", format_flag(patient.ckd)),
            InfoItem::new("HLD", format_flag(patient.hld)),
        ];

        Self {
            height_in_meters: patient.height.map(|h| h / 100.0),
            bmi,
            formatted_birth_date,
            age,
            items,
        }
    }
}

/// One "Before <slot>" glucose tile.
#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct VitalCard {
    pub slot: TimeSlot,
    pub label: String,
    pub value: String,
    pub unit: String,
    pub status: ReadingStatus,
    pub caption: String,
}

pub fn vital_cards(latest: &SlotValues) -> Vec<VitalCard> {
    TimeSlot::ALL
        .iter()
        .map(|&slot| {
            let value = latest.get(slot);
            let status = reading_status(value.parse::<f64>().ok());
            VitalCard {
                slot,
                label: slot.label(),
                value: value.to_owned(),
                unit: GLUCOSE_UNIT.to_owned(),
                status,
                caption: status.caption().to_owned(),
            }
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize, utoipa::ToSchema)]
pub struct DetailState {
    pub patient: Option<Patient>,
    pub summary: Option<PatientSummary>,
    pub vitals: Vec<VitalCard>,
    pub medications: Vec<DosageRow>,
    pub insulin: Vec<DosageRow>,
    pub loading: bool,
    pub notification: Option<Notification>,
}

impl Default for DetailState {
    fn default() -> Self {
        Self {
            patient: None,
            summary: None,
            vitals: vital_cards(&SlotValues::default()),
            medications: Vec::new(),
            insulin: Vec::new(),
            loading: false,
            notification: None,
        }
    }
}

impl DetailState {
    /// Fetches a patient with its readings, recommendations and the drug lookup concurrently and
    /// derives every section of the page from them.
    pub async fn load<A: GlucoApi + ?Sized>(api: &A, id: PatientId) -> GlucoResult<Self> {
        let (patient, readings, recommendations, drug_types) = futures::try_join!(
            api.get_patient(id),
            api.list_readings(Some(id)),
            api.list_recommendations(Some(id)),
            api.list_drug_types(),
        )?;
        let catalog = DrugCatalog::from_drug_types(drug_types)?;

        let today = Local::now().date_naive();
        let tables = dosage_tables(&recommendations, &catalog, Some(patient.id));
        Ok(DetailState {
            summary: Some(PatientSummary::for_patient(&patient, today)),
            vitals: vital_cards(&latest_readings(&readings, Some(patient.id))),
            medications: tables.medications,
            insulin: tables.insulin,
            patient: Some(patient),
            loading: false,
            notification: None,
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct PatientDetailView {
    state: DetailState,
}

impl PatientDetailView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    /// The edit action is only offered once a patient is showing.
    pub fn can_edit(&self) -> bool {
        self.state.patient.is_some()
    }

    pub fn clear(&mut self) {
        self.state = DetailState::default();
    }

    /// Loads `id` and re-derives every dependent value.
    ///
    /// A failure records an error notification and clears the loading flag; whatever patient
    /// was showing before stays on screen.
    pub async fn select_patient<A: GlucoApi + ?Sized>(
        &mut self,
        api: &A,
        id: PatientId,
    ) -> GlucoResult<()> {
        self.state.loading = true;
        match DetailState::load(api, id).await {
            Ok(state) => {
                tracing::debug!(patient = id, "patient detail loaded");
                self.state = state;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(patient = id, error = %err, "failed to load patient detail");
                self.state.loading = false;
                self.state.notification = Some(Notification::failure(&err));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryApi, Operation};
    use crate::model::DrugType;

    #[test]
    fn summary_derives_bmi_age_and_flags() {
        let mut patient = Patient::named(2, "Alan Turing");
        patient.birth_date = NaiveDate::from_ymd_opt(1958, 6, 23);
        patient.height = Some(180.0);
        patient.weight = Some(72.0);
        patient.cad = true;

        let summary =
            PatientSummary::for_patient(&patient, NaiveDate::from_ymd_opt(2024, 6, 22).unwrap());
        assert_eq!(summary.bmi, "22.2");
        assert_eq!(summary.age, "65");
        assert_eq!(summary.formatted_birth_date, "23 Jun 1958");
        assert_eq!(summary.height_in_meters, Some(1.8));

        let value = |label: &str| {
            summary
                .items
                .iter()
                .find(|i| i.label == label)
                .map(|i| i.value.clone())
                .unwrap()
        };
        assert_eq!(value("CAD"), "Yes");
        assert_eq!(value("HbA1c"), "-");
        assert_eq!(value("Creatinine"), "-");
    }

    #[test]
    fn empty_view_shows_placeholders() {
        let view = PatientDetailView::new();
        assert!(!view.can_edit());
        assert_eq!(view.state().vitals.len(), 4);
        assert!(view.state().vitals.iter().all(|v| v.value == "-"));
        assert!(view
            .state()
            .vitals
            .iter()
            .all(|v| v.status == ReadingStatus::Normal));
    }

    #[tokio::test]
    async fn selecting_a_patient_builds_every_section() {
        let api = InMemoryApi::demo();
        let mut view = PatientDetailView::new();
        view.select_patient(&api, 1).await.unwrap();

        let state = view.state();
        assert!(view.can_edit());
        assert!(!state.loading);
        assert_eq!(state.patient.as_ref().unwrap().name, "Ada Lovelace");
        let lunch = &state.vitals[1];
        assert_eq!(lunch.label, "Before Lunch");
        assert_eq!(lunch.value, "171");
        assert_eq!(lunch.caption, "Above the norm");
        assert_eq!(state.vitals[2].value, "-");
        assert_eq!(state.medications.len(), 1);
        assert_eq!(state.insulin.len(), 2);
    }

    #[tokio::test]
    async fn failed_selection_resets_loading_and_keeps_previous_patient() {
        let api = InMemoryApi::demo();
        let mut view = PatientDetailView::new();
        view.select_patient(&api, 1).await.unwrap();

        api.fail(Operation::ListRecommendations, "service unavailable");
        assert!(view.select_patient(&api, 2).await.is_err());

        let state = view.state();
        assert!(!state.loading);
        assert_eq!(state.patient.as_ref().unwrap().id, 1);
        assert_eq!(
            state.notification.as_ref().unwrap().message,
            "Operation failed: service unavailable"
        );
    }

    #[tokio::test]
    async fn inconsistent_drug_lookup_is_reported() {
        let api = InMemoryApi::demo();
        api.set_drug_types(vec![
            DrugType {
                id: 1,
                drug_name: "Metformin".into(),
            },
            DrugType {
                id: 1,
                drug_name: "Lispro".into(),
            },
        ]);
        let mut view = PatientDetailView::new();
        let err = view.select_patient(&api, 1).await.unwrap_err();
        assert!(matches!(err, crate::GlucoError::Catalog(_)));
        let note = view.state().notification.clone().unwrap();
        assert!(note.message.contains("duplicate drug id 1"));
        assert!(view.state().patient.is_none());
    }

    #[tokio::test]
    async fn unknown_patient_is_an_error_notification() {
        let api = InMemoryApi::demo();
        let mut view = PatientDetailView::new();
        let err = view.select_patient(&api, 404).await.unwrap_err();
        assert!(matches!(err, crate::GlucoError::NotFound(404)));
        assert_eq!(
            view.state().notification.as_ref().unwrap().message,
            "Operation failed: patient 404 not found"
        );
    }
}
