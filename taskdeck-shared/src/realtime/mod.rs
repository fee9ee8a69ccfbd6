//! Real-time notification push
//!
//! A single `tokio::sync::broadcast` channel carries every [`UserEvent`].
//! Each subscriber is bound to one user id (its "room") and skips events
//! addressed to anyone else. Delivery is best-effort: events published while
//! a user has no open subscription are dropped, and a lagging subscriber
//! skips what it missed. The persisted notification rows remain the source
//! of truth.
//!
//! # Event Types
//!
//! - `notification` - a newly created notification
//! - `notifications_updated` - the recipient's unread count changed
//!
//! # Example
//!
//! ```rust
//! use taskdeck_shared::realtime::{NotificationHub, PushEvent};
//! use uuid::Uuid;
//!
//! # async fn example() {
//! let hub = NotificationHub::new(256);
//! let user_id = Uuid::new_v4();
//! let mut subscription = hub.subscribe(user_id);
//!
//! hub.publish(user_id, PushEvent::NotificationsUpdated { unread_count: 3 });
//!
//! let event = subscription.recv().await;
//! assert!(matches!(event, Some(PushEvent::NotificationsUpdated { unread_count: 3 })));
//! # }
//! ```

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::notification::Notification;

/// Default channel capacity
pub const DEFAULT_HUB_CAPACITY: usize = 1024;

/// Event pushed to a user's room
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// A notification was created for the user
    Notification(Notification),

    /// The user's unread count changed
    NotificationsUpdated { unread_count: i64 },
}

#[derive(Serialize)]
struct UnreadCountPayload {
    unread_count: i64,
}

impl PushEvent {
    /// SSE event name
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::Notification(_) => "notification",
            PushEvent::NotificationsUpdated { .. } => "notifications_updated",
        }
    }

    /// JSON payload sent as the SSE data line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            PushEvent::Notification(notification) => serde_json::to_string(notification),
            PushEvent::NotificationsUpdated { unread_count } => {
                serde_json::to_string(&UnreadCountPayload {
                    unread_count: *unread_count,
                })
            }
        }
    }
}

/// An event addressed to one user
#[derive(Debug, Clone)]
pub struct UserEvent {
    pub user_id: Uuid,
    pub event: PushEvent,
}

/// In-process publish/subscribe hub with one room per user
#[derive(Debug, Clone)]
pub struct NotificationHub {
    tx: broadcast::Sender<UserEvent>,
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_CAPACITY)
    }
}

impl NotificationHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes an event to `user_id`'s room
    ///
    /// Returns the number of open subscriptions (across all users) that will
    /// see the event; 0 when nobody is listening.
    pub fn publish(&self, user_id: Uuid, event: PushEvent) -> usize {
        let name = event.name();
        match self.tx.send(UserEvent { user_id, event }) {
            Ok(receivers) => {
                debug!(user_id = %user_id, event = name, receivers, "Pushed event");
                receivers
            }
            Err(_) => {
                debug!(user_id = %user_id, event = name, "No subscribers for event");
                0
            }
        }
    }

    /// Opens a subscription to `user_id`'s room
    pub fn subscribe(&self, user_id: Uuid) -> UserSubscription {
        UserSubscription {
            user_id,
            rx: self.tx.subscribe(),
        }
    }

    /// Number of open subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving end of one user's room
pub struct UserSubscription {
    user_id: Uuid,
    rx: broadcast::Receiver<UserEvent>,
}

impl UserSubscription {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Waits for the next event addressed to this user
    ///
    /// Returns `None` once the hub has been dropped.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        loop {
            match self.rx.recv().await {
                Ok(UserEvent { user_id, event }) if user_id == self.user_id => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(user_id = %self.user_id, skipped, "Subscriber lagged, skipping events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::notification::NotificationKind;
    use chrono::Utc;
    use tokio::time::{timeout, Duration};

    fn notification_for(user_id: Uuid) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            message: "Task shared with you".to_string(),
            kind: NotificationKind::Info,
            read: false,
            task_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let hub = NotificationHub::default();
        let delivered =
            hub.publish(Uuid::new_v4(), PushEvent::NotificationsUpdated { unread_count: 0 });
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_subscriber_receives_own_events_only() {
        let hub = NotificationHub::new(16);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let mut alice_sub = hub.subscribe(alice);

        hub.publish(bob, PushEvent::NotificationsUpdated { unread_count: 9 });
        hub.publish(alice, PushEvent::Notification(notification_for(alice)));

        let event = timeout(Duration::from_secs(1), alice_sub.recv())
            .await
            .expect("event should arrive")
            .expect("hub still open");

        match event {
            PushEvent::Notification(n) => assert_eq!(n.user_id, alice),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_multiple_subscriptions_same_user() {
        let hub = NotificationHub::new(16);
        let user = Uuid::new_v4();

        let mut tab1 = hub.subscribe(user);
        let mut tab2 = hub.subscribe(user);
        assert_eq!(hub.subscriber_count(), 2);

        hub.publish(user, PushEvent::NotificationsUpdated { unread_count: 2 });

        for sub in [&mut tab1, &mut tab2] {
            let event = sub.recv().await;
            assert!(matches!(
                event,
                Some(PushEvent::NotificationsUpdated { unread_count: 2 })
            ));
        }
    }

    #[tokio::test]
    async fn test_lagged_subscriber_skips_and_continues() {
        let hub = NotificationHub::new(2);
        let user = Uuid::new_v4();
        let mut sub = hub.subscribe(user);

        for n in 0..5 {
            hub.publish(user, PushEvent::NotificationsUpdated { unread_count: n });
        }

        // Oldest events were overwritten; the newest survive
        let event = sub.recv().await;
        assert!(matches!(
            event,
            Some(PushEvent::NotificationsUpdated { unread_count: 3 })
        ));
    }

    #[tokio::test]
    async fn test_recv_ends_when_hub_dropped() {
        let hub = NotificationHub::new(4);
        let mut sub = hub.subscribe(Uuid::new_v4());
        drop(hub);

        assert!(sub.recv().await.is_none());
    }

    #[test]
    fn test_event_names_and_payloads() {
        let updated = PushEvent::NotificationsUpdated { unread_count: 4 };
        assert_eq!(updated.name(), "notifications_updated");
        assert_eq!(updated.to_json().unwrap(), r#"{"unread_count":4}"#);

        let user = Uuid::new_v4();
        let created = PushEvent::Notification(notification_for(user));
        assert_eq!(created.name(), "notification");
        let json: serde_json::Value = serde_json::from_str(&created.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "info");
        assert_eq!(json["user_id"], user.to_string());
    }
}
