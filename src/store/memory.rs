use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;

use super::{Collection, RawRecord, RemoteStore, StoreEvent, Subscription, SubscriptionSender};

/// In-process store with the same snapshot contract as the remote one.
/// Tests use the extra hooks to push data, inject channel errors and make
/// writes fail or never finish.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<Collection, RawRecord>,
    subscribers: Vec<SubscriptionSender>,
    fail_writes: Option<String>,
    hang_writes: bool,
    create_calls: usize,
    update_calls: usize,
    delete_calls: usize,
}

impl Inner {
    fn snapshot(&self, collection: Collection) -> Option<RawRecord> {
        self.collections
            .get(&collection)
            .filter(|records| !records.is_empty())
            .cloned()
    }

    fn broadcast(&mut self, collection: Collection) {
        let snapshot = self.snapshot(collection);
        self.subscribers.retain(|sender| {
            if sender.collection() != collection {
                return !sender.is_closed();
            }
            sender.send(StoreEvent::Snapshot(snapshot.clone()))
        });
    }

    fn write_gate(&self) -> Result<bool, AppError> {
        if let Some(body) = &self.fail_writes {
            return Err(AppError::Store {
                status: 503,
                body: body.clone(),
            });
        }
        Ok(self.hang_writes)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces a collection wholesale and pushes the new snapshot.
    /// Anything other than a JSON object empties the collection.
    pub fn set_collection(&self, collection: Collection, value: Value) {
        let records = match value {
            Value::Object(map) => map,
            _ => RawRecord::new(),
        };
        let mut inner = self.lock();
        inner.collections.insert(collection, records);
        inner.broadcast(collection);
    }

    /// Re-sends the current snapshot without changing anything.
    pub fn emit(&self, collection: Collection) {
        self.lock().broadcast(collection);
    }

    pub fn emit_error(&self, collection: Collection, message: &str) {
        let mut inner = self.lock();
        inner.subscribers.retain(|sender| {
            if sender.collection() != collection {
                return !sender.is_closed();
            }
            sender.send(StoreEvent::Error(message.to_string()))
        });
    }

    /// Makes every following write fail with `message`, or succeed again with `None`.
    pub fn fail_writes(&self, message: Option<&str>) {
        self.lock().fail_writes = message.map(str::to_string);
    }

    /// Makes every following write wait forever.
    pub fn hang_writes(&self, hang: bool) {
        self.lock().hang_writes = hang;
    }

    pub fn record(&self, collection: Collection, id: &str) -> Option<RawRecord> {
        self.lock()
            .collections
            .get(&collection)
            .and_then(|records| records.get(id))
            .and_then(Value::as_object)
            .cloned()
    }

    pub fn subscriber_count(&self, collection: Collection) -> usize {
        self.lock()
            .subscribers
            .iter()
            .filter(|sender| sender.collection() == collection && !sender.is_closed())
            .count()
    }

    pub fn create_calls(&self) -> usize {
        self.lock().create_calls
    }

    pub fn update_calls(&self) -> usize {
        self.lock().update_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.lock().delete_calls
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    fn subscribe(&self, collection: Collection) -> Subscription {
        let (sender, subscription) = Subscription::channel(collection);
        let mut inner = self.lock();
        sender.send(StoreEvent::Snapshot(inner.snapshot(collection)));
        inner.subscribers.push(sender);
        subscription
    }

    async fn create(&self, collection: Collection, mut payload: RawRecord) -> Result<String, AppError> {
        let hang = {
            let mut inner = self.lock();
            inner.create_calls += 1;
            inner.write_gate()?
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let id = Uuid::new_v4().to_string();
        let now = Value::from(Utc::now().timestamp_millis());
        payload.insert("createdAt".to_string(), now.clone());
        payload.insert("updatedAt".to_string(), now);

        let mut inner = self.lock();
        inner
            .collections
            .entry(collection)
            .or_default()
            .insert(id.clone(), Value::Object(payload));
        inner.broadcast(collection);
        Ok(id)
    }

    async fn update(&self, collection: Collection, id: &str, partial: RawRecord) -> Result<(), AppError> {
        let hang = {
            let mut inner = self.lock();
            inner.update_calls += 1;
            inner.write_gate()?
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut inner = self.lock();
        let record = inner
            .collections
            .get_mut(&collection)
            .and_then(|records| records.get_mut(id))
            .and_then(Value::as_object_mut)
            .ok_or(AppError::NotFound)?;
        for (key, value) in partial {
            record.insert(key, value);
        }
        record.insert("updatedAt".to_string(), Value::from(Utc::now().timestamp_millis()));
        inner.broadcast(collection);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), AppError> {
        if id.is_empty() {
            return Ok(());
        }
        let hang = {
            let mut inner = self.lock();
            inner.delete_calls += 1;
            inner.write_gate()?
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut inner = self.lock();
        if let Some(records) = inner.collections.get_mut(&collection) {
            records.remove(id);
        }
        inner.broadcast(collection);
        Ok(())
    }
}
