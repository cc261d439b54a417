use crate::ports::notification_gateway::{
    NotificationGateway as NotificationGatewayTrait, Result, SentMessage,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use thiserror::Error;

/// Recipient address rejected by the gateway
#[derive(Debug, Error)]
#[error("Invalid recipient address: {0:?}")]
pub struct InvalidRecipient(pub String);

/// Recording implementation of NotificationGateway
///
/// Does not deliver anything over the network.
/// Each accepted message is logged and appended to an in-memory outbox
/// that can be listed in send order.
pub struct NotificationGateway {
    sent: Mutex<Vec<SentMessage>>,
}

impl NotificationGateway {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Number of messages recorded so far
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl Default for NotificationGateway {
    fn default() -> Self {
        Self::new()
    }
}

fn is_deliverable(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !address.contains(' '),
        None => false,
    }
}

#[async_trait]
impl NotificationGatewayTrait for NotificationGateway {
    /// Record the message, rejecting addresses that could never be delivered
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<SentMessage> {
        if !is_deliverable(to) {
            return Err(Box::new(InvalidRecipient(to.to_string())));
        }

        let message = SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
            sent_at: Utc::now(),
        };
        self.sent.lock().unwrap().push(message.clone());

        tracing::info!(to, subject, "Notification sent");
        Ok(message)
    }

    async fn list_sent(&self) -> Result<Vec<SentMessage>> {
        Ok(self.sent.lock().unwrap().clone())
    }
}
