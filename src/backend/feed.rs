use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// In-process fan-out channel used for realtime notifications.
///
/// Each subscriber may be scoped to a key (a user id); scoped subscribers only
/// see events published for that key. Dropping the returned [`Subscription`]
/// removes the subscriber immediately.
pub struct Feed<T> {
    inner: Arc<Mutex<FeedInner<T>>>,
}

struct FeedInner<T> {
    next_id: u64,
    subscribers: Vec<Subscriber<T>>,
}

struct Subscriber<T> {
    id: u64,
    scope: Option<String>,
    tx: mpsc::Sender<T>,
}

impl<T> Default for Feed<T> {
    fn default() -> Self {
        Feed {
            inner: Arc::new(Mutex::new(FeedInner {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }
}

fn lock<T>(inner: &Mutex<FeedInner<T>>) -> MutexGuard<'_, FeedInner<T>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone> Feed<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. `scope = None` receives every event.
    pub fn subscribe(&self, scope: Option<&str>) -> Subscription<T> {
        let (tx, rx) = mpsc::channel();
        let mut inner = lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push(Subscriber {
            id,
            scope: scope.map(str::to_string),
            tx,
        });
        tracing::debug!(subscriber = id, scope = ?scope, "feed subscribe");
        Subscription {
            id,
            rx,
            feed: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to unscoped subscribers and those scoped to `scope`.
    pub fn publish(&self, scope: &str, event: &T) {
        self.deliver(|s| s.scope.as_deref().is_none_or(|k| k == scope), event);
    }

    /// Deliver `event` to every subscriber regardless of scope.
    pub fn broadcast(&self, event: &T) {
        self.deliver(|_| true, event);
    }

    fn deliver(&self, wants: impl Fn(&Subscriber<T>) -> bool, event: &T) {
        let mut inner = lock(&self.inner);
        // A failed send means the receiver is gone; prune it.
        inner
            .subscribers
            .retain(|s| !wants(s) || s.tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }
}

/// Handle for one feed subscriber. Unsubscribes on drop.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::Receiver<T>,
    feed: Weak<Mutex<FeedInner<T>>>,
}

impl<T> Subscription<T> {
    pub fn try_recv(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Take every pending event without blocking.
    pub fn drain(&self) -> Vec<T> {
        self.rx.try_iter().collect()
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(feed) = self.feed.upgrade() {
            lock(&feed).subscribers.retain(|s| s.id != self.id);
            tracing::debug!(subscriber = self.id, "feed unsubscribe");
        }
    }
}

impl<T> std::fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
