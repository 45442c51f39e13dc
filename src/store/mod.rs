//! Access to the hosted database holding enrollments and courses.
//!
//! A store hands out one [`Subscription`] per collection. Every event on it is
//! either a full-collection snapshot (never a delta) or a channel error. Writes
//! are plain async calls that report failure through [`AppError`].

pub mod firebase;
pub mod memory;

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::AppError;

pub use firebase::FirebaseStore;
pub use memory::MemoryStore;

/// Field map of one remote record, or of a whole collection keyed by id.
pub type RawRecord = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Enrollments,
    Courses,
}

impl Collection {
    pub fn path(&self) -> &'static str {
        match self {
            Collection::Enrollments => "enrollments",
            Collection::Courses => "courses",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// Complete contents of the collection. `None` when the path has no entries.
    Snapshot(Option<RawRecord>),
    /// Transient channel failure. Previously delivered data stays valid.
    Error(String),
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Starts delivering snapshots of `collection`, beginning with its current contents.
    fn subscribe(&self, collection: Collection) -> Subscription;
    /// Inserts a record and returns the id the store assigned to it.
    async fn create(&self, collection: Collection, payload: RawRecord) -> Result<String, AppError>;
    async fn update(&self, collection: Collection, id: &str, partial: RawRecord) -> Result<(), AppError>;
    async fn delete(&self, collection: Collection, id: &str) -> Result<(), AppError>;
}

/// Producer half of a subscription, owned by the store.
#[derive(Clone)]
pub struct SubscriptionSender {
    collection: Collection,
    tx: mpsc::UnboundedSender<StoreEvent>,
    closed: Arc<AtomicBool>,
}

impl SubscriptionSender {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Returns false once the subscriber has gone away.
    pub fn send(&self, event: StoreEvent) -> bool {
        if self.is_closed() {
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }
}

/// Consumer half of a live collection feed. Dropping it closes it.
pub struct Subscription {
    collection: Collection,
    rx: mpsc::UnboundedReceiver<StoreEvent>,
    closed: Arc<AtomicBool>,
    producer: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn channel(collection: Collection) -> (SubscriptionSender, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let sender = SubscriptionSender {
            collection,
            tx,
            closed: closed.clone(),
        };
        let subscription = Subscription {
            collection,
            rx,
            closed,
            producer: None,
        };
        (sender, subscription)
    }

    /// Ties a background producer to this subscription; it is aborted on close.
    pub fn with_producer(mut self, handle: JoinHandle<()>) -> Self {
        self.producer = Some(handle);
        self
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Next event in emission order. Always `None` after [`Subscription::close`].
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        if self.is_closed() {
            return None;
        }
        let event = self.rx.recv().await?;
        if self.is_closed() {
            return None;
        }
        Some(event)
    }

    pub fn close(&mut self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        if let Some(handle) = self.producer.take() {
            handle.abort();
        }
        tracing::debug!("closed subscription to {}", self.collection);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("closed", &self.is_closed())
            .finish()
    }
}
