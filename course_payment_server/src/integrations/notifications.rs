use std::time::Duration;

use course_payment_engine::events::{EventHandlers, EventHooks, EventType};
use futures::future::BoxFuture;
use log::*;
use reqwest::Client;

use crate::errors::ServerError;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;
const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Forwards lifecycle events to an external notification service.
///
/// Every event is POSTed as JSON to `url`, tagged with its `event` name:
///
/// 1. `enrollment_granted` - A student has been enrolled, either after a verified payment or for a free course. This is
///    where confirmation emails and the like are sent from.
/// 2. `payment_failed` - A checkout attempt failed. The `reason` says why.
/// 3. `transaction_refunded` - An administrator refunded a payment.
///
/// Delivery is fire-and-forget. Failures are logged and never reach the payment flow.
pub fn create_notification_event_handlers(url: &str) -> Result<EventHandlers, ServerError> {
    let client = Client::builder()
        .timeout(NOTIFICATION_TIMEOUT)
        .build()
        .map_err(|e| ServerError::InitializeError(format!("Could not create the notification client. {e}")))?;
    let mut hooks = EventHooks::default();
    let (c, u) = (client.clone(), url.to_string());
    hooks.on_enrollment_granted(move |ev| {
        debug!("📬️ {} enrolled in {}. Sending notification.", ev.enrollment.student_id, ev.enrollment.course_id);
        notify(c.clone(), u.clone(), ev.into())
    });
    let (c, u) = (client.clone(), url.to_string());
    hooks.on_payment_failed(move |ev| {
        debug!("📬️ Transaction {} failed ({}). Sending notification.", ev.transaction.id, ev.reason);
        notify(c.clone(), u.clone(), ev.into())
    });
    let u = url.to_string();
    hooks.on_transaction_refunded(move |ev| {
        debug!("📬️ Transaction {} was refunded. Sending notification.", ev.transaction.id);
        notify(client.clone(), u.clone(), ev.into())
    });
    Ok(EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks))
}

fn notify(client: Client, url: String, event: EventType) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        match client.post(&url).json(&event).send().await {
            Ok(res) if res.status().is_success() => trace!("📬️ Notification delivered to {url}"),
            Ok(res) => warn!("📬️ Notification service at {url} responded with {}", res.status()),
            Err(e) => warn!("📬️ Could not deliver notification to {url}. {e}"),
        }
    })
}
