use async_trait::async_trait;

use super::{Notifier, NotifyError};
use crate::domain::events::DomainEvent;

/// Publishes every event as JSON on its `storefront.<entity>.<event>` subject.
#[derive(Clone, Debug)]
pub struct NatsNotifier {
    client: async_nats::Client,
}

impl NatsNotifier {
    pub fn new(client: async_nats::Client) -> Self { Self { client } }
}

#[async_trait]
impl Notifier for NatsNotifier {
    fn name(&self) -> &'static str { "nats" }

    async fn notify(&self, event: &DomainEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_vec(event)?;
        self.client
            .publish(event.subject(), payload.into())
            .await
            .map_err(|e| NotifyError::Publish(e.to_string()))?;
        tracing::debug!(subject = %event.subject(), "event published");
        Ok(())
    }
}
