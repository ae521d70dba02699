use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use safesewa_common::{LiveEvent, Topic};

/// Per-subscriber queue depth. A subscriber that falls this far behind
/// starts losing events (best-effort delivery, no replay).
const QUEUE_CAPACITY: usize = 64;

/// What a subscriber receives: either a live event on one of its topics or a
/// liveness probe it must answer via `record_pong`.
#[derive(Debug, Clone)]
pub enum HubMessage {
    Event(LiveEvent),
    Ping,
}

/// Handle returned to a new subscriber. Dropping the receiver is enough to
/// get cleaned up on the next publish or sweep; `unsubscribe` is immediate.
pub struct Subscription {
    pub id: Uuid,
    pub rx: mpsc::Receiver<HubMessage>,
}

struct Subscriber {
    topics: HashSet<Topic>,
    tx: mpsc::Sender<HubMessage>,
    last_pong: Instant,
}

/// Topic-based fan-out to currently-connected subscribers.
///
/// The subscriber map is guarded by a plain mutex that is never held across
/// an await; every send is a non-blocking `try_send`.
pub struct BroadcastHub {
    subscribers: Mutex<HashMap<Uuid, Subscriber>>,
    ping_interval: Duration,
    pong_timeout: Duration,
}

impl BroadcastHub {
    pub fn new(ping_interval: Duration, pong_timeout: Duration) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            ping_interval,
            pong_timeout,
        }
    }

    /// Register a connection interested in `topics`.
    pub fn subscribe(&self, topics: impl IntoIterator<Item = Topic>) -> Subscription {
        let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
        let id = Uuid::new_v4();
        let subscriber = Subscriber {
            topics: topics.into_iter().collect(),
            tx,
            last_pong: Instant::now(),
        };
        let mut subs = self.subscribers.lock().expect("hub lock");
        subs.insert(id, subscriber);
        debug!(subscriber = %id, total = subs.len(), "Subscriber attached");
        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, id: Uuid) {
        let mut subs = self.subscribers.lock().expect("hub lock");
        if subs.remove(&id).is_some() {
            debug!(subscriber = %id, total = subs.len(), "Subscriber detached");
        }
    }

    /// Record a liveness answer from a subscriber.
    pub fn record_pong(&self, id: Uuid) {
        let mut subs = self.subscribers.lock().expect("hub lock");
        if let Some(sub) = subs.get_mut(&id) {
            sub.last_pong = Instant::now();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().expect("hub lock").len()
    }

    /// Fan an event out to every subscriber of its topic. Never fails:
    /// a full queue drops the event for that subscriber, a closed one is
    /// evicted on the spot.
    pub fn publish(&self, event: &LiveEvent) {
        let topic = event.topic();
        let mut dead = Vec::new();
        let mut subs = self.subscribers.lock().expect("hub lock");
        let mut delivered = 0usize;
        for (id, sub) in subs.iter() {
            if !sub.topics.contains(&topic) {
                continue;
            }
            match sub.tx.try_send(HubMessage::Event(event.clone())) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!(subscriber = %id, event = event.name(), "Queue full, dropping event");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => dead.push(*id),
            }
        }
        for id in dead {
            subs.remove(&id);
            debug!(subscriber = %id, "Removed closed subscriber");
        }
        debug!(event = event.name(), topic = %topic, delivered, "Published event");
    }

    /// Start the ping/pong sweep: every `ping_interval` evict subscribers
    /// whose last pong is older than `pong_timeout`, then probe the rest.
    /// This is the sole mechanism for reclaiming dead connections.
    pub fn spawn_liveness_sweep(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let hub = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(hub.ping_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                hub.sweep(Instant::now());
            }
        })
    }

    fn sweep(&self, now: Instant) {
        let mut subs = self.subscribers.lock().expect("hub lock");
        let before = subs.len();
        subs.retain(|id, sub| {
            if now.duration_since(sub.last_pong) > self.pong_timeout {
                warn!(subscriber = %id, "Evicting unresponsive subscriber");
                return false;
            }
            // A closed channel means the connection task is already gone.
            // A full queue just misses this probe; the pong timeout decides.
            !matches!(
                sub.tx.try_send(HubMessage::Ping),
                Err(mpsc::error::TrySendError::Closed(_))
            )
        });
        if subs.len() < before {
            info!(evicted = before - subs.len(), remaining = subs.len(), "Liveness sweep");
        }
    }
}
