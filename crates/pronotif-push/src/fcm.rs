//! Firebase Cloud Messaging transport (legacy HTTP API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use pronotif_core::config::PushConfig;
use pronotif_core::error::{AppError, ErrorKind};
use pronotif_core::result::AppResult;

use crate::transport::{DeliveryResult, PushError, PushMessage, PushTransport};

/// [`PushTransport`] backed by FCM.
#[derive(Debug, Clone)]
pub struct FcmTransport {
    http: Client,
    config: PushConfig,
}

#[derive(Debug, Serialize)]
struct FcmRequest<'a> {
    registration_ids: &'a [String],
    priority: &'static str,
    content_available: bool,
    time_to_live: u32,
    restricted_package_name: &'a str,
    dry_run: bool,
    notification: FcmNotification<'a>,
    data: FcmData<'a>,
}

#[derive(Debug, Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
    icon: &'static str,
}

#[derive(Debug, Serialize)]
struct FcmData<'a> {
    category: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    #[serde(default)]
    results: Vec<FcmResult>,
}

#[derive(Debug, Deserialize)]
struct FcmResult {
    message_id: Option<String>,
    error: Option<String>,
}

impl FcmTransport {
    /// Builds a transport from the push configuration.
    pub fn new(config: PushConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::with_source(ErrorKind::Configuration, "Failed to build FCM client", e)
            })?;
        Ok(Self { http, config })
    }

    async fn send_chunk(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<DeliveryResult>, PushError> {
        let request = FcmRequest {
            registration_ids: tokens,
            priority: "high",
            content_available: true,
            time_to_live: self.config.time_to_live_seconds,
            restricted_package_name: &self.config.restricted_package_name,
            dry_run: self.config.dry_run,
            notification: FcmNotification {
                title: &message.title,
                body: &message.body,
                icon: "ic_launcher",
            },
            data: FcmData {
                category: message.category.as_str(),
                notification_id: message.notification_id.as_deref(),
            },
        };

        let response = self
            .http
            .post(&self.config.endpoint)
            .header(AUTHORIZATION, format!("key={}", self.config.server_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        parse_results(&body, tokens)
    }
}

/// Pairs FCM per-token results with the tokens they answer.
fn parse_results(body: &str, tokens: &[String]) -> Result<Vec<DeliveryResult>, PushError> {
    let response: FcmResponse =
        serde_json::from_str(body).map_err(|e| PushError::Decode(e.to_string()))?;
    if response.results.len() != tokens.len() {
        return Err(PushError::Decode(format!(
            "expected {} results, got {}",
            tokens.len(),
            response.results.len()
        )));
    }
    Ok(tokens
        .iter()
        .zip(response.results)
        .map(|(token, result)| match (result.message_id, result.error) {
            (_, Some(error)) => DeliveryResult::failed(token.clone(), error),
            (Some(_), None) => DeliveryResult::delivered(token.clone()),
            (None, None) => DeliveryResult::failed(token.clone(), "MissingMessageId"),
        })
        .collect())
}

#[async_trait]
impl PushTransport for FcmTransport {
    async fn send_batch(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<DeliveryResult>, PushError> {
        let chunk_size = self.config.max_tokens_per_request.max(1);
        let mut results = Vec::with_capacity(tokens.len());
        for chunk in tokens.chunks(chunk_size) {
            results.extend(self.send_chunk(message, chunk).await?);
        }
        let failed = results.iter().filter(|r| !r.success).count();
        tracing::debug!(
            category = %message.category,
            tokens = tokens.len(),
            failed,
            "FCM batch sent"
        );
        Ok(results)
    }
}
