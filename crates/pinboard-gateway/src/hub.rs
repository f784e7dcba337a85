use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::{broadcast, mpsc};
use tracing::debug;
use uuid::Uuid;

use pinboard_core::Notifier;
use pinboard_types::events::Notification;

type ProfileChannels = HashMap<Uuid, Vec<(Uuid, mpsc::UnboundedSender<Notification>)>>;

/// Routes notifications to the gateway connections of their receivers.
#[derive(Clone)]
pub struct NotificationHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    /// Every notification, for in-process observers
    broadcast_tx: broadcast::Sender<Notification>,

    /// profile_id -> live connections (conn_id, sender)
    channels: RwLock<ProfileChannels>,
}

impl NotificationHub {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self {
            inner: Arc::new(HubInner {
                broadcast_tx,
                channels: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to every notification the hub dispatches.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.broadcast_tx.subscribe()
    }

    /// Register a connection for `profile_id`. Returns (conn_id, receiver).
    pub fn register(&self, profile_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<Notification>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.write()
            .entry(profile_id)
            .or_default()
            .push((conn_id, tx));
        (conn_id, rx)
    }

    /// Drop one connection. Other connections of the same profile stay registered.
    pub fn unregister(&self, profile_id: Uuid, conn_id: Uuid) {
        let mut channels = self.write();
        if let Some(conns) = channels.get_mut(&profile_id) {
            conns.retain(|(id, _)| *id != conn_id);
            if conns.is_empty() {
                channels.remove(&profile_id);
            }
        }
    }

    pub fn connection_count(&self, profile_id: Uuid) -> usize {
        self.read().get(&profile_id).map_or(0, Vec::len)
    }

    fn read(&self) -> RwLockReadGuard<'_, ProfileChannels> {
        self.inner
            .channels
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ProfileChannels> {
        self.inner
            .channels
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for NotificationHub {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for NotificationHub {
    fn notify(&self, notification: Notification) {
        {
            let channels = self.read();
            let mut delivered = 0;
            for receiver in &notification.receiver_ids {
                for (_, tx) in channels.get(receiver).into_iter().flatten() {
                    if tx.send(notification.clone()).is_ok() {
                        delivered += 1;
                    }
                }
            }
            debug!(
                "{:?} on {} delivered to {} connections",
                notification.action_type, notification.thing_id, delivered
            );
        }
        let _ = self.inner.broadcast_tx.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pinboard_types::events::ActionType;
    use pinboard_types::models::ThingKind;

    fn notification(receivers: Vec<Uuid>) -> Notification {
        Notification {
            receiver_ids: receivers,
            sender_id: Uuid::new_v4(),
            thing_type: ThingKind::Board,
            action_type: ActionType::BoardMemberAdded,
            message: "added".into(),
            thing_id: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_only_to_receivers() {
        let hub = NotificationHub::new();
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let (_, mut alice_rx) = hub.register(alice);
        let (_, mut bob_rx) = hub.register(bob);
        let mut firehose = hub.subscribe();

        let sent = notification(vec![alice]);
        hub.notify(sent.clone());

        assert_eq!(alice_rx.recv().await, Some(sent.clone()));
        assert!(bob_rx.try_recv().is_err());
        assert_eq!(firehose.recv().await.unwrap(), sent);
    }

    #[tokio::test]
    async fn every_connection_of_a_profile_receives() {
        let hub = NotificationHub::new();
        let alice = Uuid::new_v4();
        let (first, mut rx1) = hub.register(alice);
        let (_, mut rx2) = hub.register(alice);
        assert_eq!(hub.connection_count(alice), 2);

        hub.notify(notification(vec![alice]));
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());

        hub.unregister(alice, first);
        assert_eq!(hub.connection_count(alice), 1);
    }

    #[test]
    fn notify_without_listeners_is_harmless() {
        let hub = NotificationHub::new();
        hub.notify(notification(vec![Uuid::new_v4()]));
    }
}
