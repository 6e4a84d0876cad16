use crate::model::{Patient, PatientId};
use crate::notification::Notification;
use crate::services::PatientApi;
use crate::GlucoResult;
use serde::{Deserialize, Serialize};

/// One entry of the patient picker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct PatientOption {
    pub value: PatientId,
    pub label: String,
}

#[derive(Clone, Debug, Default)]
pub struct PatientListView {
    patients: Vec<Patient>,
    loading: bool,
    notification: Option<Notification>,
}

impl PatientListView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the patient list.
    ///
    /// On failure the previous list is kept and an error notification is recorded; the error is
    /// also returned for callers that need to react to it.
    pub async fn load<A: PatientApi + ?Sized>(&mut self, api: &A) -> GlucoResult<()> {
        self.loading = true;
        let result = api.list_patients().await;
        self.loading = false;
        match result {
            Ok(patients) => {
                tracing::debug!(count = patients.len(), "patients loaded");
                self.patients = patients;
                self.notification = None;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load patients");
                self.notification = Some(Notification::failure(&err));
                Err(err)
            }
        }
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn options(&self) -> Vec<PatientOption> {
        self.patients
            .iter()
            .map(|p| PatientOption {
                value: p.id,
                label: p.name.clone(),
            })
            .collect()
    }

    /// Options whose label contains `query`, ignoring case. A blank query matches everything.
    pub fn search(&self, query: &str) -> Vec<PatientOption> {
        let needle = query.trim().to_lowercase();
        self.options()
            .into_iter()
            .filter(|o| needle.is_empty() || o.label.to_lowercase().contains(&needle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryApi, Operation};

    #[tokio::test]
    async fn lists_and_searches_patients() {
        let api = InMemoryApi::demo();
        let mut view = PatientListView::new();
        view.load(&api).await.unwrap();

        assert!(!view.is_loading());
        assert_eq!(view.options().len(), 2);
        assert_eq!(
            view.search("TURING"),
            vec![PatientOption {
                value: 2,
                label: "Alan Turing".into()
            }]
        );
        assert_eq!(view.search("  ").len(), 2);
        assert!(view.search("hopper").is_empty());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_list() {
        let api = InMemoryApi::demo();
        let mut view = PatientListView::new();
        view.load(&api).await.unwrap();

        api.fail(Operation::ListPatients, "timeout");
        assert!(view.load(&api).await.is_err());
        assert_eq!(view.patients().len(), 2);
        assert!(!view.is_loading());
        assert_eq!(
            view.notification().unwrap().message,
            "Operation failed: timeout"
        );
    }
}
