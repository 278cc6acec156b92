//! NATS publisher for fraud alerts and request replies

use crate::types::alert::FlaggedTransaction;
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::{debug, error};

/// Publishes flagged transactions to the alert subject
#[derive(Clone)]
pub struct AlertProducer {
    client: Client,
    subject: String,
}

impl AlertProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish one flagged transaction
    pub async fn publish(&self, alert: &FlaggedTransaction) -> Result<()> {
        let payload = serde_json::to_vec(alert)?;

        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            alert_id = %alert.alert_id,
            account_id = %alert.account_id,
            risk_score = alert.risk_score,
            status = ?alert.status,
            "Published fraud alert"
        );

        Ok(())
    }

    /// Publish several alerts; individual failures are logged, not returned.
    pub async fn publish_batch(&self, alerts: &[FlaggedTransaction]) {
        for alert in alerts {
            if let Err(e) = self.publish(alert).await {
                error!(
                    alert_id = %alert.alert_id,
                    error = %e,
                    "Failed to publish alert"
                );
            }
        }
    }

    /// Send a request reply on the same connection
    pub async fn reply(&self, reply_to: Subject, body: Vec<u8>) -> Result<()> {
        self.client.publish(reply_to, body.into()).await?;
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}
