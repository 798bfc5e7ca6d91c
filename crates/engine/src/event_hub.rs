// SPDX-License-Identifier: MIT

//! Fan-out of status and log events to live subscribers (spec §4.6).
//! Grounded on `internal/sse/sse.go`'s `SseManager` (one manager select-loops
//! over a status stream and a log stream and fans out to a client map) and
//! `internal/sse/client.go`'s one-pinger-per-client design, ported to a
//! concurrent subscriber map plus per-subscriber `mpsc` sinks instead of
//! direct buffered-writer calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ote_core::{LogEvent, StatusEvent};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::time::interval;

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 64;
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// One message delivered to a subscriber's sink. `Heartbeat` carries no
/// payload; the server layer serializes it as `{"ping":"pong"}`.
#[derive(Debug, Clone)]
pub enum HubMessage {
    Status(StatusEvent),
    Log(LogEvent),
    Heartbeat,
}

pub type Subscription = mpsc::Receiver<HubMessage>;

/// Concurrent subscriber registry plus best-effort fan-out. A write failure
/// (full or closed sink) drops that subscriber without affecting any other;
/// the hub does not buffer events beyond what's already sitting in each
/// subscriber's bounded channel.
pub struct EventHub {
    subscribers: RwLock<std::collections::HashMap<u64, mpsc::Sender<HubMessage>>>,
    next_id: AtomicU64,
}

impl EventHub {
    pub fn new() -> Arc<Self> {
        let hub = Arc::new(Self {
            subscribers: RwLock::new(std::collections::HashMap::new()),
            next_id: AtomicU64::new(1),
        });
        tokio::spawn(run_heartbeat(hub.clone()));
        hub
    }

    /// Register a new subscriber and return its id plus the receiving end
    /// of its sink.
    pub fn subscribe(&self) -> (u64, Subscription) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        self.subscribers.write().insert(id, tx);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: u64) {
        self.subscribers.write().remove(&id);
    }

    pub fn publish_status(&self, event: StatusEvent) {
        self.fan_out(HubMessage::Status(event));
    }

    pub fn publish_log(&self, event: LogEvent) {
        self.fan_out(HubMessage::Log(event));
    }

    fn fan_out(&self, message: HubMessage) {
        let dead: Vec<u64> = {
            let subscribers = self.subscribers.read();
            subscribers
                .iter()
                .filter_map(|(id, tx)| match tx.try_send(message.clone()) {
                    Ok(()) => None,
                    Err(_) => Some(*id),
                })
                .collect()
        };
        if !dead.is_empty() {
            let mut subscribers = self.subscribers.write();
            for id in dead {
                subscribers.remove(&id);
            }
        }
    }
}

async fn run_heartbeat(hub: Arc<EventHub>) {
    let mut ticker = interval(HEARTBEAT_INTERVAL);
    loop {
        ticker.tick().await;
        hub.fan_out(HubMessage::Heartbeat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_events() {
        let hub = EventHub::new();
        let (_id, mut rx) = hub.subscribe();

        hub.publish_status(StatusEvent {
            task_id: 1,
            status: ote_core::TaskStatus::Running,
            reason: String::new(),
            exit_code: 0,
        });

        match rx.recv().await.unwrap() {
            HubMessage::Status(e) => assert_eq!(e.task_id, 1),
            other => panic!("expected status event, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsubscribed_id_receives_nothing_further() {
        let hub = EventHub::new();
        let (id, mut rx) = hub.subscribe();
        hub.unsubscribe(id);

        hub.publish_log(LogEvent {
            task_id: 1,
            line_number: 1,
            line: "hi".into(),
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_subscriber_channel_drops_subscriber_without_affecting_others() {
        let hub = EventHub::new();
        let (_slow_id, _slow_rx_never_drained) = hub.subscribe();
        let (_fast_id, mut fast_rx) = hub.subscribe();

        for i in 0..(SUBSCRIBER_CHANNEL_CAPACITY as u64 + 5) {
            hub.publish_log(LogEvent {
                task_id: 1,
                line_number: i,
                line: format!("line {i}"),
            });
            // Drain the fast subscriber as we go so only the neglected one overflows.
            let _ = fast_rx.try_recv();
        }

        assert_eq!(hub.subscribers.read().len(), 1);
        hub.publish_log(LogEvent {
            task_id: 1,
            line_number: 999,
            line: "final".into(),
        });
        assert!(fast_rx.recv().await.is_some());
    }
}
