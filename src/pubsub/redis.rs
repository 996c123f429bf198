//! The production [RedisPubSub] implementation, built on redis's async pub/sub support.

use crate::error::EdgeError;
use crate::pubsub::PubSub;
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::sync::mpsc;
use tracing::warn;

/// [RedisPubSub] keeps a [ConnectionManager] for publishing and opens a fresh dedicated
/// connection per subscription, since redis multiplexes subscriber connections differently from
/// regular command connections.
#[derive(Clone)]
pub struct RedisPubSub {
    client: redis::Client,
    publish_conn: ConnectionManager,
}

impl RedisPubSub {
    pub async fn connect(address: &str) -> Result<Self, EdgeError> {
        let client = redis::Client::open(address)?;
        let publish_conn = client.get_connection_manager().await?;
        Ok(Self {
            client,
            publish_conn,
        })
    }
}

#[async_trait]
impl PubSub for RedisPubSub {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), EdgeError> {
        let mut conn = self.publish_conn.clone();
        let _: () = conn.publish(topic, message).await?;
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, EdgeError> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(topic).await?;

        let (tx, rx) = mpsc::channel(128);
        tokio::spawn(async move {
            let mut stream = pubsub.into_on_message();
            while let Some(msg) = stream.next().await {
                let payload: String = match msg.get_payload() {
                    Ok(payload) => payload,
                    Err(err) => {
                        warn!(error = %err, "dropping undecodable pubsub payload");
                        continue;
                    }
                };
                if tx.send(payload).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
