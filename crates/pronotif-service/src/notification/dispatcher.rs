//! Notification dispatcher.
//!
//! Persists the events produced by a diff pass, then delivers each record to
//! the account's active tokens subscribed to its category. Delivery runs on a
//! background task so snapshot persistence never waits for the push provider.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;

use pronotif_core::AccountKey;
use pronotif_core::result::AppResult;
use pronotif_database::SyncStore;
use pronotif_entity::device::DeviceToken;
use pronotif_entity::notification::{NotificationCategory, NotificationEvent, NotificationRecord};
use pronotif_push::{DeliveryResult, PushMessage, PushTransport};

/// Active tokens of an account split by category subscription.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    /// Tokens subscribed to assignments.
    pub assignments: Vec<String>,
    /// Tokens subscribed to grades.
    pub grades: Vec<String>,
}

impl Recipients {
    /// Partitions tokens by their category flags. Inactive tokens are ignored.
    pub fn partition(tokens: &[DeviceToken]) -> Self {
        let mut recipients = Self::default();
        for token in tokens.iter().filter(|t| t.is_active) {
            if token.accepts(NotificationCategory::Assignment) {
                recipients.assignments.push(token.token.clone());
            }
            if token.accepts(NotificationCategory::Grade) {
                recipients.grades.push(token.token.clone());
            }
        }
        recipients
    }

    /// Tokens targeted by a category.
    pub fn for_category(&self, category: NotificationCategory) -> &[String] {
        match category {
            NotificationCategory::Assignment => &self.assignments,
            NotificationCategory::Grade => &self.grades,
        }
    }
}

/// Outcome of delivering one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Tokens the record was sent to.
    pub targeted: usize,
    /// Tokens that accepted it.
    pub delivered: usize,
}

/// Records persisted by [`NotificationDispatcher::notify`] and their pending delivery.
#[derive(Debug)]
pub struct Dispatched {
    /// Persisted records, in event order.
    pub records: Vec<NotificationRecord>,
    /// Background delivery task, absent when there was nothing to send.
    pub delivery: Option<JoinHandle<()>>,
}

impl Dispatched {
    /// Waits for the background delivery to finish.
    pub async fn wait(self) {
        if let Some(handle) = self.delivery {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Notification delivery task failed");
            }
        }
    }
}

/// Routes notifications to devices and records delivery outcomes.
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn SyncStore>,
    transport: Arc<dyn PushTransport>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher.
    pub fn new(store: Arc<dyn SyncStore>, transport: Arc<dyn PushTransport>) -> Self {
        Self { store, transport }
    }

    /// Persists events for an account and starts their delivery.
    ///
    /// Records are created in event order before this returns. Delivery
    /// happens on a spawned task, one record after the other.
    pub async fn notify(
        &self,
        key: &AccountKey,
        events: &[NotificationEvent],
    ) -> AppResult<Dispatched> {
        if events.is_empty() {
            return Ok(Dispatched {
                records: Vec::new(),
                delivery: None,
            });
        }

        let mut records = Vec::with_capacity(events.len());
        for event in events {
            records.push(self.store.create_notification_record(key, event).await?);
        }

        let dispatcher = self.clone();
        let key = key.clone();
        let pending = records.clone();
        let delivery = tokio::spawn(async move {
            let tokens = match dispatcher.store.load_active_tokens(&key).await {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::error!(account = %key, error = %e, "Failed to load device tokens");
                    return;
                }
            };
            for record in &pending {
                if let Err(e) = dispatcher.dispatch(record, &tokens).await {
                    tracing::error!(
                        account = %key,
                        notification = %record.id,
                        error = %e,
                        "Notification bookkeeping failed"
                    );
                }
            }
        });

        Ok(Dispatched {
            records,
            delivery: Some(delivery),
        })
    }

    /// Delivers one record to the subscribed tokens and records the outcome.
    ///
    /// Nothing is sent, and the record stays unsent, when no token subscribes
    /// to its category. A batch that fails as a whole counts as a failed
    /// delivery for every targeted token.
    pub async fn dispatch(
        &self,
        record: &NotificationRecord,
        tokens: &[DeviceToken],
    ) -> AppResult<DispatchReport> {
        let recipients = Recipients::partition(tokens);
        let targets = recipients.for_category(record.category);
        if targets.is_empty() {
            tracing::debug!(
                notification = %record.id,
                category = %record.category,
                "No subscribed device, delivery skipped"
            );
            return Ok(DispatchReport {
                targeted: 0,
                delivered: 0,
            });
        }

        let message = PushMessage::from(record);
        let results = match self.transport.send_batch(&message, targets).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(
                    notification = %record.id,
                    tokens = targets.len(),
                    error = %e,
                    "Push batch failed"
                );
                targets
                    .iter()
                    .map(|t| DeliveryResult::failed(t.clone(), e.to_string()))
                    .collect()
            }
        };

        let now = Utc::now();
        let mut delivered = 0;
        for (token, result) in targets.iter().zip(&results) {
            if let Err(e) = self.store.mark_token_active(token, now).await {
                tracing::warn!(notification = %record.id, error = %e, "Failed to record token activity");
            }
            if result.success {
                delivered += 1;
                if let Err(e) = self.store.mark_token_success(token, now).await {
                    tracing::warn!(notification = %record.id, error = %e, "Failed to record token success");
                }
            } else if let Some(error) = &result.error {
                tracing::debug!(notification = %record.id, error = %error, "Delivery to token failed");
            }
        }
        self.store.mark_notification_sent(record.id, Utc::now()).await?;

        tracing::info!(
            notification = %record.id,
            category = %record.category,
            targeted = targets.len(),
            delivered,
            "Notification sent"
        );
        Ok(DispatchReport {
            targeted: targets.len(),
            delivered,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pronotif_database::mock::MockSyncStore;
    use pronotif_push::PushError;
    use pronotif_push::mock::MockPushTransport;

    const URL: &str = "https://a.example/pronote/";

    struct Fixture {
        store: Arc<MockSyncStore>,
        transport: Arc<MockPushTransport>,
        dispatcher: NotificationDispatcher,
        key: AccountKey,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MockSyncStore::new());
        let transport = Arc::new(MockPushTransport::new());
        let dispatcher = NotificationDispatcher::new(store.clone(), transport.clone());
        let key = AccountKey::new("eleve", URL);

        let mut homework_only = MockSyncStore::token(&key, "tok-hw");
        homework_only.notify_grades = false;
        let mut grades_only = MockSyncStore::token(&key, "tok-grades");
        grades_only.notify_assignments = false;
        let mut inactive = MockSyncStore::token(&key, "tok-off");
        inactive.is_active = false;
        store.insert_token(homework_only);
        store.insert_token(grades_only);
        store.insert_token(inactive);
        store.insert_token(MockSyncStore::token(&key, "tok-all"));

        Fixture {
            store,
            transport,
            dispatcher,
            key,
        }
    }

    #[test]
    fn test_partition_by_category() {
        let key = AccountKey::new("eleve", URL);
        let mut grades_only = MockSyncStore::token(&key, "g");
        grades_only.notify_assignments = false;
        let mut off = MockSyncStore::token(&key, "off");
        off.is_active = false;

        let recipients = Recipients::partition(&[grades_only, off, MockSyncStore::token(&key, "all")]);
        assert_eq!(recipients.assignments, vec!["all".to_string()]);
        assert_eq!(recipients.grades, vec!["g".to_string(), "all".to_string()]);
    }

    #[tokio::test]
    async fn test_notify_routes_by_category() {
        let f = fixture();
        let events = vec![
            NotificationEvent::new(NotificationCategory::Assignment, "Nouveau devoir en Math", "Ex 5"),
            NotificationEvent::new(NotificationCategory::Grade, "Nouvelle note en SVT", "Note: 12/20"),
        ];

        let dispatched = f.dispatcher.notify(&f.key, &events).await.unwrap();
        assert_eq!(dispatched.records.len(), 2);
        dispatched.wait().await;

        let sent = f.transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].message.category, NotificationCategory::Assignment);
        assert_eq!(sent[0].tokens, vec!["tok-hw".to_string(), "tok-all".to_string()]);
        assert_eq!(sent[1].tokens, vec!["tok-grades".to_string(), "tok-all".to_string()]);
        assert!(f.store.notifications().iter().all(|n| n.sent_at.is_some()));
        assert!(f.store.get_token("tok-off").unwrap().last_active_at.is_none());
    }

    #[tokio::test]
    async fn test_per_token_outcome_bookkeeping() {
        let f = fixture();
        f.transport.reject_token("tok-all");
        let event = NotificationEvent::new(NotificationCategory::Assignment, "t", "b");

        f.dispatcher.notify(&f.key, &[event]).await.unwrap().wait().await;

        let hw = f.store.get_token("tok-hw").unwrap();
        assert!(hw.last_active_at.is_some());
        assert!(hw.last_success_at.is_some());
        let all = f.store.get_token("tok-all").unwrap();
        assert!(all.last_active_at.is_some());
        assert!(all.last_success_at.is_none());
        assert!(f.store.notifications()[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn test_token_write_failure_still_marks_record_sent() {
        let f = fixture();
        f.store.break_token_writes("tok-hw");
        let event = NotificationEvent::new(NotificationCategory::Assignment, "t", "b");

        let record = f.store.create_notification_record(&f.key, &event).await.unwrap();
        let tokens = f.store.load_active_tokens(&f.key).await.unwrap();
        let report = f.dispatcher.dispatch(&record, &tokens).await.unwrap();

        assert_eq!(report, DispatchReport { targeted: 2, delivered: 2 });
        assert!(f.store.get_token("tok-hw").unwrap().last_active_at.is_none());
        let all = f.store.get_token("tok-all").unwrap();
        assert!(all.last_active_at.is_some());
        assert!(all.last_success_at.is_some());
        assert!(f.store.notifications()[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn test_no_subscriber_keeps_record_unsent() {
        let store = Arc::new(MockSyncStore::new());
        let transport = Arc::new(MockPushTransport::new());
        let dispatcher = NotificationDispatcher::new(store.clone(), transport.clone());
        let key = AccountKey::new("eleve", URL);
        let mut token = MockSyncStore::token(&key, "tok");
        token.notify_grades = false;
        store.insert_token(token);

        let event = NotificationEvent::new(NotificationCategory::Grade, "t", "b");
        dispatcher.notify(&key, &[event]).await.unwrap().wait().await;

        assert!(transport.sent().is_empty());
        let records = store.notifications();
        assert_eq!(records.len(), 1);
        assert!(records[0].sent_at.is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_marks_active_only() {
        let f = fixture();
        f.transport.fail_with(PushError::Transport("connection refused".into()));
        let event = NotificationEvent::new(NotificationCategory::Grade, "t", "b");

        let record = f.store.create_notification_record(&f.key, &event).await.unwrap();
        let tokens = f.store.load_active_tokens(&f.key).await.unwrap();
        let report = f.dispatcher.dispatch(&record, &tokens).await.unwrap();

        assert_eq!(report, DispatchReport { targeted: 2, delivered: 0 });
        let grades = f.store.get_token("tok-grades").unwrap();
        assert!(grades.last_active_at.is_some());
        assert!(grades.last_success_at.is_none());
        assert!(f.store.notifications()[0].sent_at.is_some());
    }

    #[tokio::test]
    async fn test_no_events_spawns_nothing() {
        let f = fixture();
        let dispatched = f.dispatcher.notify(&f.key, &[]).await.unwrap();
        assert!(dispatched.records.is_empty());
        assert!(dispatched.delivery.is_none());
    }
}
