use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::AppError;

use super::{Collection, RawRecord, RemoteStore, StoreEvent, Subscription, SubscriptionSender};

/// Realtime Database REST client. Live updates are polled on `poll_interval`.
#[derive(Clone)]
pub struct FirebaseStore {
    client: Client,
    config: StoreConfig,
}

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

impl FirebaseStore {
    pub fn new(config: StoreConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        match &self.config.auth_token {
            Some(token) => format!("{}/{}.json?auth={}", self.config.database_url, path, token),
            None => format!("{}/{}.json", self.config.database_url, path),
        }
    }

    pub async fn fetch_collection(&self, collection: Collection) -> Result<Option<RawRecord>, AppError> {
        let request = self.client.get(self.endpoint(collection.path()));
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body)?;
        Ok(collection_from_value(value))
    }

    async fn poll_loop(self, sender: SubscriptionSender) {
        let collection = sender.collection();
        let mut last_emitted: Option<Option<RawRecord>> = None;

        info!("polling {} every {:?}", collection, self.config.poll_interval);
        loop {
            if sender.is_closed() {
                break;
            }

            match self.fetch_collection(collection).await {
                Ok(snapshot) => {
                    if last_emitted.as_ref() != Some(&snapshot) {
                        last_emitted = Some(snapshot.clone());
                        if !sender.send(StoreEvent::Snapshot(snapshot)) {
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!("failed to fetch {}: {}", collection, e);
                    if !sender.send(StoreEvent::Error(e.to_string())) {
                        break;
                    }
                }
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
        debug!("stopped polling {}", collection);
    }
}

#[async_trait]
impl RemoteStore for FirebaseStore {
    fn subscribe(&self, collection: Collection) -> Subscription {
        let (sender, subscription) = Subscription::channel(collection);
        let handle = tokio::spawn(self.clone().poll_loop(sender));
        subscription.with_producer(handle)
    }

    async fn create(&self, collection: Collection, mut payload: RawRecord) -> Result<String, AppError> {
        payload.insert("createdAt".to_string(), server_timestamp());
        payload.insert("updatedAt".to_string(), server_timestamp());

        let request = self.client.post(self.endpoint(collection.path())).json(&payload);
        let response = check_status(request.send().await?).await?;
        let body = response.text().await?;
        let pushed: PushResponse = serde_json::from_str(&body)?;

        info!("created {}/{}", collection, pushed.name);
        Ok(pushed.name)
    }

    async fn update(&self, collection: Collection, id: &str, mut partial: RawRecord) -> Result<(), AppError> {
        if id.is_empty() {
            return Err(AppError::BadRequest("record id is empty".to_string()));
        }
        partial.insert("updatedAt".to_string(), server_timestamp());

        let path = format!("{}/{}", collection.path(), id);
        let request = self.client.patch(self.endpoint(&path)).json(&partial);
        check_status(request.send().await?).await?;

        info!("updated {}", path);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), AppError> {
        if id.is_empty() {
            return Ok(());
        }

        let path = format!("{}/{}", collection.path(), id);
        let request = self.client.delete(self.endpoint(&path));
        check_status(request.send().await?).await?;

        info!("deleted {}", path);
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, AppError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::Store {
        status: status.as_u16(),
        body,
    })
}

fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

/// The REST API returns `null` for an empty path and a JSON array when every
/// key happens to be a small integer.
pub(crate) fn collection_from_value(value: Value) -> Option<RawRecord> {
    let map = match value {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| !item.is_null())
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        _ => return None,
    };
    if map.is_empty() { None } else { Some(map) }
}
