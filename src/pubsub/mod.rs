//! The pubsub module carries sign-in events from the sign-in ingress handler to the scanner's
//! priority producer (`spec.md` §4.6, §4.5: topic `signIn`).

pub mod redis;
pub mod testing;

use crate::error::EdgeError;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// [PubSub] is the publish side used by the sign-in handler and the subscribe side used by the
/// scanner's priority producer. A single implementation backs both, since they share one
/// connection to the same broker.
#[async_trait]
pub trait PubSub: Send + Sync {
    async fn publish(&self, topic: &str, message: &str) -> Result<(), EdgeError>;

    /// Subscribes to `topic` and returns the receiving half of a channel fed by a background
    /// task for as long as the subscription lives. The channel has no bound beyond memory: the
    /// scanner's priority queue is what actually back-pressures (`spec.md` §4.5).
    async fn subscribe(&self, topic: &str) -> Result<mpsc::Receiver<String>, EdgeError>;
}
