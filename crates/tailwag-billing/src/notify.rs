//! # Notification Dispatcher
//!
//! Fire-and-forget customer/admin notifications. The dispatcher catches and
//! logs every delivery error: financial and inventory state is already
//! committed by the time a notification fires, and a mail outage must never
//! look like a billing failure.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use tailwag_core::Money;

/// Notification events the core emits.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotificationEvent {
    OrderConfirmation {
        order_id: String,
        customer_id: String,
        total: Money,
    },
    OrderShipped {
        order_id: String,
        customer_id: String,
    },
    OrderDelivered {
        order_id: String,
        customer_id: String,
    },
    SubscriptionCreated {
        subscription_id: String,
        customer_id: String,
    },
    SubscriptionBilled {
        subscription_id: String,
        customer_id: String,
        invoice_number: String,
        total: Money,
    },
    SubscriptionPaymentFailed {
        subscription_id: String,
        customer_id: String,
        invoice_number: String,
        attempt_count: i64,
    },
    SubscriptionPaused {
        subscription_id: String,
        customer_id: String,
    },
    /// Admin alert for a high-value consultation purchase.
    HighValuePurchase {
        order_id: String,
        total: Money,
    },
}

/// Delivery errors, visible only to the dispatcher's log line.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

/// The delivery seam (email service, CRM webhook, ...).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

/// Dispatcher wrapping a notifier with swallow-and-log semantics.
///
/// Holds an `Arc` so tests can keep a handle on a recording notifier and
/// assert on what was (not) sent.
pub struct NotificationDispatcher {
    notifier: std::sync::Arc<dyn Notifier>,
}

impl NotificationDispatcher {
    /// Creates a dispatcher over the given notifier.
    pub fn new(notifier: std::sync::Arc<dyn Notifier>) -> Self {
        NotificationDispatcher { notifier }
    }

    /// Sends an event, fire-and-forget. Never returns an error - failures
    /// are logged and dropped here, by design of the billing sequence.
    pub async fn notify(&self, event: NotificationEvent) {
        match self.notifier.send(&event).await {
            Ok(()) => debug!(event = ?event, "Notification sent"),
            Err(err) => warn!(event = ?event, error = %err, "Notification failed, dropping"),
        }
    }
}

// =============================================================================
// Built-in Notifiers
// =============================================================================

/// Notifier that just logs the event payload. Default for development and
/// for deployments without a mail integration.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let payload =
            serde_json::to_string(event).map_err(|e| NotifyError::Delivery(e.to_string()))?;
        debug!(payload = %payload, "notification");
        Ok(())
    }
}

/// Test notifier: records events, optionally failing every send.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: std::sync::Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        RecordingNotifier::default()
    }

    /// A notifier whose every send fails (delivery outage).
    pub fn failing() -> Self {
        RecordingNotifier {
            events: std::sync::Mutex::new(vec![]),
            fail: true,
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().expect("notifier lock").clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        self.events.lock().expect("notifier lock").push(event.clone());
        if self.fail {
            return Err(NotifyError::Delivery("smtp outage".to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
