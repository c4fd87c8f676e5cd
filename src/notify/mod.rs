//! Notification fan-out to realtime subscribers
//!
//! Delivery is fire-and-forget: callers log publish failures and never
//! roll back the mutation that triggered them. Each user gets a private
//! event lane; market snapshots go out on a shared public lane.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

use crate::common::errors::Result;
use crate::common::types::{MarketEntry, TradeMode};
use crate::trading::{PortfolioView, WalletSummary};

/// Default capacity for subscriber channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Updated portfolio pushed after a trade commits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioUpdate {
    pub mode: TradeMode,
    pub portfolio: PortfolioView,
}

/// Acknowledgement sent when a connection is established
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedAck {
    pub ok: bool,
}

/// Event frame pushed to realtime subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum UserEvent {
    /// Updated portfolio projection for one trade mode
    Portfolio(PortfolioUpdate),
    /// Updated wallet summary
    Wallet(WalletSummary),
    /// Market snapshot page, broadcast to everyone
    Markets(Vec<MarketEntry>),
    /// Connection acknowledgement
    Connected(ConnectedAck),
}

/// Outbound seam for realtime notifications
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Deliver an event to one user's subscribers
    async fn publish(&self, user_id: &str, event: UserEvent) -> Result<()>;

    /// Deliver an event to every subscriber
    async fn broadcast(&self, event: UserEvent) -> Result<()>;
}

/// Type alias for a shared publisher
pub type BoxedPublisher = Arc<dyn Publisher>;

/// Broadcast-channel publisher with one lane per user plus a public lane
pub struct ChannelPublisher {
    capacity: usize,
    users: RwLock<HashMap<String, broadcast::Sender<UserEvent>>>,
    public: broadcast::Sender<UserEvent>,
}

impl ChannelPublisher {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (public, _) = broadcast::channel(capacity);
        Self {
            capacity,
            users: RwLock::new(HashMap::new()),
            public,
        }
    }

    /// Subscribe to one user's private lane
    pub async fn subscribe_user(&self, user_id: &str) -> broadcast::Receiver<UserEvent> {
        let mut users = self.users.write().await;
        users
            .entry(user_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to the public lane
    pub fn subscribe_public(&self) -> broadcast::Receiver<UserEvent> {
        self.public.subscribe()
    }
}

impl Default for ChannelPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Publisher for ChannelPublisher {
    async fn publish(&self, user_id: &str, event: UserEvent) -> Result<()> {
        let users = self.users.read().await;
        if let Some(sender) = users.get(user_id) {
            // a send error just means nobody is connected right now
            let _ = sender.send(event);
        }
        Ok(())
    }

    async fn broadcast(&self, event: UserEvent) -> Result<()> {
        let _ = self.public.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> UserEvent {
        UserEvent::Connected(ConnectedAck { ok: true })
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = ChannelPublisher::new();
        publisher.publish("user-1", connected()).await.unwrap();
        publisher.broadcast(connected()).await.unwrap();
    }

    #[tokio::test]
    async fn test_user_lane_is_private() {
        let publisher = ChannelPublisher::new();
        let mut alice = publisher.subscribe_user("alice").await;
        let mut bob = publisher.subscribe_user("bob").await;

        publisher.publish("alice", connected()).await.unwrap();

        assert_eq!(alice.recv().await.unwrap(), connected());
        assert!(bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_public_subscribers() {
        let publisher = ChannelPublisher::new();
        let mut rx = publisher.subscribe_public();

        publisher.broadcast(UserEvent::Markets(vec![])).await.unwrap();

        assert!(matches!(rx.recv().await.unwrap(), UserEvent::Markets(_)));
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(connected()).unwrap();
        assert_eq!(json["event"], "connected");
        assert_eq!(json["data"]["ok"], true);

        let json = serde_json::to_value(UserEvent::Markets(vec![])).unwrap();
        assert_eq!(json["event"], "markets");
        assert!(json["data"].as_array().unwrap().is_empty());
    }
}
