//! NATS request consumer for the engine's request/reply subjects

use crate::handler::{RequestKind, Routes};
use anyhow::Result;
use async_nats::{Client, Message, Subscriber};
use futures::stream::{select_all, SelectAll};
use tracing::info;

/// Subscribes to every routed subject and yields messages as one stream
pub struct RequestConsumer {
    client: Client,
    routes: Routes,
}

impl RequestConsumer {
    pub fn new(client: Client, routes: Routes) -> Self {
        Self { client, routes }
    }

    /// Subscribe to all request subjects, merged into one stream
    pub async fn subscribe(&self) -> Result<SelectAll<Subscriber>> {
        let mut subscribers = Vec::new();
        for subject in self.routes.subjects() {
            subscribers.push(self.client.subscribe(subject.to_string()).await?);
            info!(subject = %subject, "Subscribed to request subject");
        }
        Ok(select_all(subscribers))
    }

    /// Which operation a message asks for, if any
    pub fn classify(&self, message: &Message) -> Option<RequestKind> {
        self.routes.resolve(&message.subject)
    }
}
