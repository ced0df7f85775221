//! HTTP client for the portal protocol bridge.
//!
//! The bridge exposes the portal protocol as JSON endpoints:
//!
//! - `POST /cas` with `{url}` returns `{variants: [..]}`
//! - `POST /login` opens a session and returns its id and student profile
//! - `GET /sessions/{id}/homeworks?from=&to=` returns assignments
//! - `GET /sessions/{id}/marks?period=` returns grades or `null`
//! - `DELETE /sessions/{id}` closes the session
//!
//! Errors come back as `{code, message}` with a non-success status.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use pronotif_core::config::PortalConfig;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;
use pronotif_entity::account::AuthVariant;
use pronotif_entity::snapshot::{Assignment, Grade, GradeSet, Subject};

use crate::client::{
    CandidateVariants, PortalClient, PortalCredentials, PortalError, PortalSession, PortalUser,
};

/// [`PortalClient`] talking to the protocol bridge over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPortalClient {
    http: Client,
    base_url: String,
    account_type: String,
}

impl HttpPortalClient {
    /// Builds a client from the portal configuration.
    pub fn new(config: &PortalConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Configuration,
                    "Failed to build portal HTTP client",
                    e,
                )
            })?;
        Ok(Self {
            http,
            base_url: config.bridge_url.trim_end_matches('/').to_string(),
            account_type: config.account_type.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct CasRequest<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct CasResponse {
    #[serde(default)]
    variants: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    url: &'a str,
    username: &'a str,
    password: &'a str,
    cas: &'a str,
    account_type: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    session: String,
    #[serde(default)]
    user: BridgeUser,
    last_day: NaiveDate,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeUser {
    name: Option<String>,
    student_class: Option<String>,
    establishment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BridgeError {
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct BridgeAssignment {
    subject: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct BridgeMarks {
    #[serde(default)]
    subjects: Vec<BridgeSubject>,
}

#[derive(Debug, Deserialize)]
struct BridgeSubject {
    name: String,
    #[serde(default)]
    marks: Vec<BridgeMark>,
}

#[derive(Debug, Deserialize)]
struct BridgeMark {
    id: String,
    value: Option<f64>,
    scale: f64,
    average: Option<f64>,
}

impl From<BridgeMarks> for GradeSet {
    fn from(marks: BridgeMarks) -> Self {
        GradeSet {
            subjects: marks
                .subjects
                .into_iter()
                .map(|s| Subject {
                    name: s.name,
                    grades: s
                        .marks
                        .into_iter()
                        .map(|m| Grade {
                            id: m.id,
                            value: m.value,
                            scale: m.scale,
                            average: m.average,
                        })
                        .collect(),
                })
                .collect(),
            empty: false,
        }
    }
}

fn transport_error(err: reqwest::Error) -> PortalError {
    if err.is_timeout() {
        PortalError::Timeout(err.to_string())
    } else if err.is_decode() {
        PortalError::Decode(err.to_string())
    } else {
        PortalError::Connection(err.to_string())
    }
}

/// Sends a request and decodes a JSON body, mapping bridge errors.
async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, PortalError> {
    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(transport_error);
    }
    Err(rejection(status, response.text().await.unwrap_or_default()))
}

fn rejection(status: StatusCode, body: String) -> PortalError {
    match serde_json::from_str::<BridgeError>(&body) {
        Ok(err) => PortalError::Rejected {
            code: err.code,
            message: err.message,
        },
        Err(_) if status == StatusCode::GATEWAY_TIMEOUT => PortalError::Timeout(body),
        Err(_) if status.is_server_error() => {
            PortalError::Connection(format!("bridge returned {status}: {body}"))
        }
        Err(_) => PortalError::Rejected {
            code: None,
            message: format!("bridge returned {status}: {body}"),
        },
    }
}

#[async_trait]
impl PortalClient for HttpPortalClient {
    async fn auth_variants(&self, url: &str) -> Result<CandidateVariants, PortalError> {
        let response: CasResponse =
            send_json(self.http.post(self.endpoint("cas")).json(&CasRequest { url })).await?;
        Ok(CandidateVariants::from_names(
            response.variants.unwrap_or_default(),
        ))
    }

    async fn login(
        &self,
        credentials: &PortalCredentials,
        variant: &AuthVariant,
    ) -> Result<Box<dyn PortalSession>, PortalError> {
        let body = LoginRequest {
            url: &credentials.url,
            username: &credentials.username,
            password: &credentials.password,
            cas: variant.as_str(),
            account_type: &self.account_type,
        };
        let response: LoginResponse =
            send_json(self.http.post(self.endpoint("login")).json(&body)).await?;
        Ok(Box::new(HttpPortalSession {
            http: self.http.clone(),
            session_url: self.endpoint(&format!("sessions/{}", response.session)),
            user: PortalUser {
                name: response.user.name,
                student_class: response.user.student_class,
                establishment: response.user.establishment,
            },
            last_day: response.last_day,
        }))
    }
}

#[derive(Debug)]
struct HttpPortalSession {
    http: Client,
    session_url: String,
    user: PortalUser,
    last_day: NaiveDate,
}

impl HttpPortalSession {
    fn homeworks_request(&self, from: NaiveDate, to: NaiveDate) -> RequestBuilder {
        self.http
            .get(format!("{}/homeworks", self.session_url))
            .query(&[("from", from.to_string()), ("to", to.to_string())])
    }

    fn marks_request(&self, period: &str) -> RequestBuilder {
        self.http
            .get(format!("{}/marks", self.session_url))
            .query(&[("period", period)])
    }
}

#[async_trait]
impl PortalSession for HttpPortalSession {
    fn user(&self) -> &PortalUser {
        &self.user
    }

    fn last_day(&self) -> NaiveDate {
        self.last_day
    }

    async fn fetch_assignments(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Assignment>, PortalError> {
        let items: Vec<BridgeAssignment> = send_json(self.homeworks_request(from, to)).await?;
        Ok(items
            .into_iter()
            .map(|a| Assignment::new(a.subject, a.description))
            .collect())
    }

    async fn fetch_grades(&self, period: &str) -> Result<Option<GradeSet>, PortalError> {
        let marks: Option<BridgeMarks> = send_json(self.marks_request(period)).await?;
        Ok(marks.map(GradeSet::from))
    }

    async fn logout(&self) -> Result<(), PortalError> {
        let response = self
            .http
            .delete(&self.session_url)
            .send()
            .await
            .map_err(transport_error)?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(rejection(status, response.text().await.unwrap_or_default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_parses_bridge_error() {
        let err = rejection(
            StatusCode::UNAUTHORIZED,
            r#"{"code":3,"message":"Wrong user credentials"}"#.to_string(),
        );
        assert_eq!(
            err,
            PortalError::Rejected {
                code: Some(3),
                message: "Wrong user credentials".to_string()
            }
        );
    }

    #[test]
    fn test_rejection_without_body() {
        assert!(matches!(
            rejection(StatusCode::BAD_GATEWAY, "upstream down".to_string()),
            PortalError::Connection(_)
        ));
        assert!(matches!(
            rejection(StatusCode::GATEWAY_TIMEOUT, String::new()),
            PortalError::Timeout(_)
        ));
    }

    #[test]
    fn test_marks_conversion() {
        let raw = r#"{"subjects":[{"name":"Histoire","marks":[{"id":"g1","value":null,"scale":20,"average":11.5}]}]}"#;
        let marks: BridgeMarks = serde_json::from_str(raw).unwrap();
        let set = GradeSet::from(marks);
        assert!(!set.empty);
        assert!(set.subject("Histoire").unwrap().has_grade("g1"));
        assert_eq!(set.subjects[0].grades[0].value, None);
    }

    #[test]
    fn test_endpoint_joins_paths() {
        let client = HttpPortalClient::new(&PortalConfig {
            bridge_url: "http://bridge:3000/".to_string(),
            request_timeout_seconds: 5,
            grade_period: "trimester".to_string(),
            account_type: "student".to_string(),
        })
        .unwrap();
        assert_eq!(client.endpoint("/login"), "http://bridge:3000/login");
    }

    #[test]
    fn test_fetch_requests_carry_query() {
        let session = HttpPortalSession {
            http: Client::new(),
            session_url: "http://bridge:3000/sessions/abc".to_string(),
            user: PortalUser {
                name: None,
                student_class: None,
                establishment: None,
            },
            last_day: NaiveDate::from_ymd_opt(2024, 7, 5).unwrap(),
        };
        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let homeworks = session.homeworks_request(from, session.last_day).build().unwrap();
        assert_eq!(homeworks.url().path(), "/sessions/abc/homeworks");
        assert_eq!(homeworks.url().query(), Some("from=2024-03-01&to=2024-07-05"));

        let marks = session.marks_request("trimester").build().unwrap();
        assert_eq!(marks.url().query(), Some("period=trimester"));
    }
}
