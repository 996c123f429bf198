//! [FakePubSub] is an in-process [PubSub] fake: publishing on a topic forwards directly to any
//! receiver currently subscribed to it, with no network involved.

use crate::error::EdgeError;
use crate::pubsub::PubSub;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct FakePubSub {
    senders: Mutex<HashMap<String, mpsc::Sender<String>>>,
}

impl FakePubSub {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PubSub for FakePubSub {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), EdgeError> {
        if let Some(sender) = self.senders.lock().expect("lock poisoned").get(topic) {
            // A full channel would mean the test subscriber stopped draining; that's a test bug,
            // not a condition this fake needs to model as back-pressure.
            let _ = sender.try_send(message.to_string());
        }
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, EdgeError> {
        let (tx, rx) = mpsc::channel(128);
        self.senders
            .lock()
            .expect("lock poisoned")
            .insert(topic.to_string(), tx);
        Ok(rx)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn published_message_reaches_subscriber() {
        let pubsub = FakePubSub::new();
        let mut rx = pubsub.subscribe("signIn").await.unwrap();

        pubsub.publish("signIn", "uuid-1").await.unwrap();

        assert_eq!(Some("uuid-1".to_string()), rx.recv().await);
    }

    #[tokio::test]
    async fn publish_with_no_subscriber_is_not_an_error() {
        let pubsub = FakePubSub::new();
        assert!(pubsub.publish("signIn", "uuid-1").await.is_ok());
    }
}
