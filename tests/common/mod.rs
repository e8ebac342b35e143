#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use htmx_chat_widget::transport::{GenerateResponse, Transport, TransportError};
use htmx_chat_widget::widget::{Message, OutgoingMessage};
use tokio::sync::Notify;

/// Replies with a fixed JSON body, decoded like the real endpoint's.
#[derive(Debug)]
pub struct JsonReply(pub &'static str);

#[async_trait]
impl Transport for JsonReply {
    async fn exchange(&self, _: OutgoingMessage) -> Result<Vec<Message>, TransportError> {
        Ok(GenerateResponse::from_slice(self.0.as_bytes())?.into_messages())
    }
}

/// Always fails as if the endpoint were down.
#[derive(Debug)]
pub struct Failing;

#[async_trait]
impl Transport for Failing {
    async fn exchange(&self, _: OutgoingMessage) -> Result<Vec<Message>, TransportError> {
        Err(TransportError::Status {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

/// Holds every exchange until [`Gated::release`] is called.
#[derive(Debug, Default)]
pub struct Gated {
    gate: Notify,
    seen: Mutex<Vec<OutgoingMessage>>,
}

impl Gated {
    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn seen(&self) -> Vec<OutgoingMessage> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Gated {
    async fn exchange(&self, outgoing: OutgoingMessage) -> Result<Vec<Message>, TransportError> {
        self.seen.lock().unwrap().push(outgoing);
        self.gate.notified().await;
        Ok(vec![Message::agent("done", Vec::new())])
    }
}
