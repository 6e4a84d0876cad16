//! # Gluco Client
//!
//! [`OntimizeClient`] implements the record API collaborators from `gluco-core` over an
//! Ontimize-style REST backend.
//!
//! Every entity is reached under `{endpoint}/{service}/{entity}`:
//! - queries `POST .../search` with `{"filter": {...}, "columns": [...]}`
//! - inserts `POST` with `{"data": {...}}`
//! - updates `PUT` with `{"filter": {"id": N}, "data": {...}}`
//!
//! Responses carry the envelope `{"code": 0|1|3, "data": ..., "message": "..."}`; code 1 is a
//! failure whose message is surfaced to the user. Requests are not retried.

use async_trait::async_trait;
use gluco_core::model::ReadingId;
use gluco_core::{
    ClientConfig, DrugType, GlucoError, GlucoResult, NewReading, Patient, PatientApi, PatientId,
    PatientPayload, Reading, ReadingApi, Recommendation, RecommendationApi,
};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// A `{service}/{entity}` pair on the record API.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entity {
    pub service: &'static str,
    pub entity: &'static str,
    pub columns: &'static [&'static str],
}

pub const PATIENTS: Entity = Entity {
    service: "patients",
    entity: "patient",
    columns: &[
        "id",
        "name",
        "birth_date",
        "patient_sex",
        "weight",
        "height",
        "hba1c",
        "creatine_mg_dl",
        "duration",
        "medical_record_number",
        "created_date",
        "cad",
        "ckd",
        "hld",
    ],
};

pub const READINGS: Entity = Entity {
    service: "readings",
    entity: "reading",
    columns: &[
        "id",
        "patient_id",
        "time_of_reading",
        "reading_value",
        "reading_date",
        "notes",
    ],
};

pub const RECOMMENDATIONS: Entity = Entity {
    service: "recommendations",
    entity: "recommendation",
    columns: &[
        "id",
        "patient_id",
        "drug_id",
        "dosage",
        "dosage_unit",
        "time_of_reading",
        "recommendation_date",
        "drug_name",
    ],
};

pub const DRUG_TYPES: Entity = Entity {
    service: "drugTypes",
    entity: "drugType",
    columns: &["id", "drug_name"],
};

/// Ontimize response codes.
const CODE_ERROR: i64 = 1;

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Serialize)]
struct QueryBody<'a> {
    filter: Value,
    columns: &'a [&'a str],
}

#[derive(Serialize)]
struct InsertBody<'a, T> {
    data: &'a T,
}

#[derive(Serialize)]
struct UpdateBody<'a, T> {
    filter: Value,
    data: &'a T,
}

fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

#[derive(Clone, Debug)]
pub struct OntimizeClient {
    http: reqwest::Client,
    endpoint: String,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl OntimizeClient {
    pub fn new(config: &ClientConfig) -> GlucoResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GlucoError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.api_endpoint().to_owned(),
            credentials: config
                .username()
                .map(|u| (u.to_owned(), config.password().unwrap_or_default().to_owned())),
            timeout: config.timeout(),
        })
    }

    fn url(&self, entity: Entity, search: bool) -> String {
        let base = format!("{}/{}/{}", self.endpoint, entity.service, entity.entity);
        if search {
            format!("{base}/search")
        } else {
            base
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> GlucoError {
        if err.is_timeout() {
            GlucoError::Transport(format!(
                "request timed out after {}s",
                self.timeout.as_secs()
            ))
        } else if err.is_connect() {
            GlucoError::Transport(format!("cannot connect to {}", self.endpoint))
        } else {
            GlucoError::Transport(err.to_string())
        }
    }

    /// Sends a request and unwraps the response envelope, returning its `data`.
    async fn send(&self, builder: RequestBuilder) -> GlucoResult<Value> {
        let response = builder.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let envelope = serde_json::from_str::<Envelope>(&body).ok();

        if !status.is_success() {
            let message = non_blank(envelope.and_then(|e| e.message))
                .or_else(|| status.canonical_reason().map(str::to_owned));
            tracing::warn!(status = status.as_u16(), "record API returned an error status");
            return Err(GlucoError::Api {
                status: Some(status.as_u16()),
                message,
            });
        }

        let envelope = envelope.ok_or_else(|| {
            GlucoError::Decode(format!("response is not an Ontimize envelope: {body:.120}"))
        })?;
        if envelope.code == CODE_ERROR {
            return Err(GlucoError::Api {
                status: (status != StatusCode::OK).then_some(status.as_u16()),
                message: non_blank(envelope.message),
            });
        }
        Ok(envelope.data)
    }

    async fn query<T: DeserializeOwned>(&self, entity: Entity, filter: Value) -> GlucoResult<Vec<T>> {
        let url = self.url(entity, true);
        tracing::debug!(%url, %filter, "query");
        let body = QueryBody {
            filter,
            columns: entity.columns,
        };
        let data = self.send(self.request(Method::POST, &url).json(&body)).await?;
        if data.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(data).map_err(|e| {
            GlucoError::Decode(format!("{}/{}: {e}", entity.service, entity.entity))
        })
    }

    /// Inserts a record and returns the id the backend assigned.
    async fn insert<T: Serialize + Sync>(&self, entity: Entity, data: &T) -> GlucoResult<i64> {
        let url = self.url(entity, false);
        tracing::debug!(%url, "insert");
        let data = self
            .send(self.request(Method::POST, &url).json(&InsertBody { data }))
            .await?;
        data.get("id").and_then(Value::as_i64).ok_or_else(|| {
            GlucoError::Decode(format!(
                "insert into {}/{} returned no id",
                entity.service, entity.entity
            ))
        })
    }

    async fn update<T: Serialize + Sync>(&self, entity: Entity, id: i64, data: &T) -> GlucoResult<()> {
        let url = self.url(entity, false);
        tracing::debug!(%url, id, "update");
        let body = UpdateBody {
            filter: json!({ "id": id }),
            data,
        };
        self.send(self.request(Method::PUT, &url).json(&body)).await?;
        Ok(())
    }
}

fn patient_filter(patient: Option<PatientId>) -> Value {
    match patient {
        Some(id) => json!({ "patient_id": id }),
        None => json!({}),
    }
}

#[async_trait]
impl PatientApi for OntimizeClient {
    async fn list_patients(&self) -> GlucoResult<Vec<Patient>> {
        self.query(PATIENTS, json!({})).await
    }

    async fn get_patient(&self, id: PatientId) -> GlucoResult<Patient> {
        self.query::<Patient>(PATIENTS, json!({ "id": id }))
            .await?
            .into_iter()
            .next()
            .ok_or(GlucoError::NotFound(id))
    }

    async fn insert_patient(&self, payload: &PatientPayload) -> GlucoResult<PatientId> {
        self.insert(PATIENTS, payload).await
    }

    async fn update_patient(&self, id: PatientId, payload: &PatientPayload) -> GlucoResult<()> {
        self.update(PATIENTS, id, payload).await
    }
}

#[async_trait]
impl ReadingApi for OntimizeClient {
    async fn list_readings(&self, patient: Option<PatientId>) -> GlucoResult<Vec<Reading>> {
        self.query(READINGS, patient_filter(patient)).await
    }

    async fn create_reading(&self, reading: &NewReading) -> GlucoResult<ReadingId> {
        self.insert(READINGS, reading).await
    }
}

#[async_trait]
impl RecommendationApi for OntimizeClient {
    async fn list_recommendations(
        &self,
        patient: Option<PatientId>,
    ) -> GlucoResult<Vec<Recommendation>> {
        self.query(RECOMMENDATIONS, patient_filter(patient)).await
    }

    async fn list_drug_types(&self) -> GlucoResult<Vec<DrugType>> {
        self.query(DRUG_TYPES, json!({})).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gluco_core::TimeSlot;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> OntimizeClient {
        let config = ClientConfig::new(server.uri()).unwrap();
        OntimizeClient::new(&config).unwrap()
    }

    fn ok(data: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({ "code": 0, "data": data, "message": "" }))
    }

    #[tokio::test]
    async fn lists_patients_with_lenient_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/patients/patient/search"))
            .and(body_partial_json(json!({ "filter": {} })))
            .respond_with(ok(json!([
                {
                    "id": 1,
                    "name": "Ada Lovelace",
                    "birth_date": 642_902_400_000_i64,
                    "weight": "71.5",
                    "hba1c": 7.8,
                    "cad": 1,
                    "ckd": "0",
                    "hld": null
                },
                { "id": 2, "name": "Alan Turing" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let patients = client(&server).list_patients().await.unwrap();
        assert_eq!(patients.len(), 2);
        assert_eq!(patients[0].birth_date, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(patients[0].weight, Some(71.5));
        assert!(patients[0].cad);
        assert!(!patients[0].ckd);
        assert_eq!(patients[1].height, None);
    }

    #[tokio::test]
    async fn readings_are_filtered_by_patient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/readings/reading/search"))
            .and(body_partial_json(json!({ "filter": { "patient_id": 7 } })))
            .respond_with(ok(json!([{
                "id": 3,
                "patient_id": 7,
                "time_of_reading": "lunch",
                "reading_value": 142,
                "reading_date": "2024-05-01T12:30:00"
            }])))
            .mount(&server)
            .await;

        let readings = client(&server).list_readings(Some(7)).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].time_of_reading, TimeSlot::Lunch);
        assert_eq!(readings[0].reading_value, 142.0);
    }

    #[tokio::test]
    async fn missing_patient_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/patients/patient/search"))
            .respond_with(ok(json!([])))
            .mount(&server)
            .await;

        let err = client(&server).get_patient(9).await.unwrap_err();
        assert!(matches!(err, GlucoError::NotFound(9)));
    }

    #[tokio::test]
    async fn insert_returns_assigned_id_and_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/readings/reading"))
            .and(basic_auth("clinic", "secret"))
            .and(body_partial_json(json!({
                "data": { "patient_id": 4, "time_of_reading": "dinner", "reading_date": "2024-05-01" }
            })))
            .respond_with(ok(json!({ "id": 31 })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ClientConfig::new(server.uri())
            .unwrap()
            .with_credentials("clinic", "secret");
        let client = OntimizeClient::new(&config).unwrap();
        let reading = NewReading {
            patient_id: 4,
            time_of_reading: TimeSlot::Dinner,
            reading_value: 118.0,
            reading_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            notes: None,
        };
        assert_eq!(client.create_reading(&reading).await.unwrap(), 31);
    }

    #[tokio::test]
    async fn update_filters_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/patients/patient"))
            .and(body_partial_json(json!({
                "filter": { "id": 5 },
                "data": { "name": "Grace Hopper", "cad": 1 }
            })))
            .respond_with(ok(Value::Null))
            .expect(1)
            .mount(&server)
            .await;

        let payload = PatientPayload {
            name: "Grace Hopper".into(),
            birth_date: None,
            patient_sex: None,
            weight: None,
            height: None,
            hba1c: None,
            creatine_mg_dl: None,
            duration: 0.0,
            cad: true,
            ckd: false,
            hld: false,
        };
        client(&server).update_patient(5, &payload).await.unwrap();
    }

    #[tokio::test]
    async fn envelope_error_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/drugTypes/drugType/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 1,
                "data": null,
                "message": "Query failed: table missing"
            })))
            .mount(&server)
            .await;

        let err = client(&server).list_drug_types().await.unwrap_err();
        assert_eq!(err.user_message(), "Query failed: table missing");
    }

    #[tokio::test]
    async fn http_error_falls_back_to_status_reason() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/recommendations/recommendation/search"))
            .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_recommendations(None).await.unwrap_err();
        assert!(matches!(err, GlucoError::Api { status: Some(503), .. }));
        assert_eq!(err.user_message(), "Service Unavailable");

        Mock::given(method("POST"))
            .and(path("/patients/patient/search"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "code": 1,
                "message": "Patient already exists"
            })))
            .mount(&server)
            .await;
        let err = client(&server).list_patients().await.unwrap_err();
        assert_eq!(err.user_message(), "Patient already exists");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_transport_error() {
        let config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        let err = OntimizeClient::new(&config)
            .unwrap()
            .list_patients()
            .await
            .unwrap_err();
        assert!(matches!(err, GlucoError::Transport(_)));
    }
}
