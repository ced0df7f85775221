//! Recording push transport for development and testing.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::transport::{DeliveryResult, PushError, PushMessage, PushTransport};

/// A batch captured by [`MockPushTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBatch {
    /// Message sent.
    pub message: PushMessage,
    /// Tokens targeted, in order.
    pub tokens: Vec<String>,
}

/// [`PushTransport`] that records every batch instead of sending it.
#[derive(Debug, Default)]
pub struct MockPushTransport {
    sent: Mutex<Vec<SentBatch>>,
    rejected_tokens: Mutex<HashSet<String>>,
    failure: Mutex<Option<PushError>>,
}

impl MockPushTransport {
    /// Creates a transport that delivers to every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports delivery failure for this token.
    pub fn reject_token(&self, token: &str) {
        self.rejected_tokens
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(token.to_string());
    }

    /// Fails every batch with this error.
    pub fn fail_with(&self, err: PushError) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(err);
    }

    /// Batches sent so far.
    pub fn sent(&self) -> Vec<SentBatch> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn send_batch(
        &self,
        message: &PushMessage,
        tokens: &[String],
    ) -> Result<Vec<DeliveryResult>, PushError> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(SentBatch {
                message: message.clone(),
                tokens: tokens.to_vec(),
            });

        if let Some(err) = self.failure.lock().unwrap_or_else(|e| e.into_inner()).clone() {
            return Err(err);
        }

        let rejected = self.rejected_tokens.lock().unwrap_or_else(|e| e.into_inner());
        Ok(tokens
            .iter()
            .map(|t| {
                if rejected.contains(t) {
                    DeliveryResult::failed(t.clone(), "NotRegistered")
                } else {
                    DeliveryResult::delivered(t.clone())
                }
            })
            .collect())
    }
}
