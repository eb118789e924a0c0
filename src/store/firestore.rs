//! Cloud Firestore REST (v1) document store.
//!
//! Documents are exchanged as Firestore typed values and converted to plain
//! JSON at the boundary, so the rest of the application never sees them.

use super::{CollectionPath, Direction, Document, DocumentStore, Fields, OrderBy, StoreError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

const FIRESTORE_API: &str = "https://firestore.googleapis.com/v1";
const PAGE_SIZE: usize = 300;

/// Connection settings for a Firestore project.
#[derive(Debug, Clone)]
pub struct FirestoreSettings {
    pub project_id: String,
    pub database: String,
    pub api_key: Option<String>,
    /// Bearer token of an already signed-in identity.
    pub auth_token: Option<String>,
    pub timeout_seconds: u64,
    /// Override of the API root (emulator or tests).
    pub base_url: Option<String>,
}

impl Default for FirestoreSettings {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            database: "(default)".to_string(),
            api_key: None,
            auth_token: None,
            timeout_seconds: 30,
            base_url: None,
        }
    }
}

/// Firestore REST client implementing [`DocumentStore`].
pub struct FirestoreStore {
    settings: FirestoreSettings,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunQueryItem {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

impl FirestoreStore {
    /// Create a client for the given project.
    pub fn new(settings: FirestoreSettings) -> Result<Self, StoreError> {
        if settings.project_id.is_empty() {
            return Err(StoreError::Transport(
                "Firestore project id is not configured".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        Ok(Self {
            settings,
            http_client,
        })
    }

    /// `.../projects/{p}/databases/{db}/documents`
    fn documents_root(&self) -> String {
        let api = self.settings.base_url.as_deref().unwrap_or(FIRESTORE_API);
        format!(
            "{}/projects/{}/databases/{}/documents",
            api.trim_end_matches('/'),
            self.settings.project_id,
            self.settings.database
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http_client.request(method, url);
        if let Some(ref key) = self.settings.api_key {
            builder = builder.query(&[("key", key)]);
        }
        if let Some(ref token) = self.settings.auth_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                StoreError::Transport(format!(
                    "request timed out after {}s",
                    self.settings.timeout_seconds
                ))
            } else if e.is_connect() {
                StoreError::Transport("cannot connect to Firestore".to_string())
            } else {
                StoreError::Transport(e.to_string())
            }
        })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (envelope.error.status, envelope.error.message),
            Err(_) => (String::new(), body),
        };

        if code == "NOT_FOUND" || status == 404 {
            return Err(StoreError::NotFound {
                collection: String::new(),
                id: message,
            });
        }
        Err(StoreError::Backend {
            status,
            message: if code.is_empty() {
                message
            } else {
                format!("{}: {}", code, message)
            },
        })
    }

    async fn list_unordered(&self, path: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let url = format!("{}/{}", self.documents_root(), path);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut builder = self
                .request(reqwest::Method::GET, &url)
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(ref token) = page_token {
                builder = builder.query(&[("pageToken", token)]);
            }

            let page: ListResponse = self
                .send(builder)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Decode(e.to_string()))?;

            documents.extend(page.documents.into_iter().map(from_raw));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!("Listed {} documents from {}", documents.len(), path);
        Ok(documents)
    }

    async fn list_ordered(
        &self,
        path: &CollectionPath,
        order: &OrderBy,
    ) -> Result<Vec<Document>, StoreError> {
        let parent = match path.parent() {
            Some(parent) => format!("{}/{}", self.documents_root(), parent),
            None => self.documents_root(),
        };
        let url = format!("{}:runQuery", parent);
        let direction = match order.direction {
            Direction::Ascending => "ASCENDING",
            Direction::Descending => "DESCENDING",
        };
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": path.collection_id() }],
                "orderBy": [{ "field": { "fieldPath": order.field }, "direction": direction }]
            }
        });

        let result = self
            .send(self.request(reqwest::Method::POST, &url).json(&body))
            .await;

        let response = match result {
            Ok(response) => response,
            Err(ref e) if is_missing_index(e) => {
                debug!("Ordered query rejected: {}", e);
                return Err(StoreError::OrderingUnsupported {
                    collection: path.to_string(),
                    field: order.field.clone(),
                });
            }
            Err(e) => return Err(e),
        };

        let items: Vec<RunQueryItem> = response
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(items
            .into_iter()
            .filter_map(|item| item.document)
            .map(from_raw)
            .collect())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(
        &self,
        path: &CollectionPath,
        order: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        match order {
            Some(order) => self.list_ordered(path, order).await,
            None => self.list_unordered(path).await,
        }
    }

    async fn create(&self, path: &CollectionPath, fields: Fields) -> Result<String, StoreError> {
        let url = format!("{}/{}", self.documents_root(), path);
        let body = json!({ "fields": encode_fields(&fields) });

        let created: RawDocument = self
            .send(self.request(reqwest::Method::POST, &url).json(&body))
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?;

        Ok(document_id(&created.name).to_string())
    }

    async fn update(
        &self,
        path: &CollectionPath,
        id: &str,
        fields: Fields,
    ) -> Result<(), StoreError> {
        let url = format!("{}/{}/{}", self.documents_root(), path, id);
        let mut query: Vec<(&str, String)> = fields
            .keys()
            .map(|k| ("updateMask.fieldPaths", k.clone()))
            .collect();
        query.push(("currentDocument.exists", "true".to_string()));

        let body = json!({ "fields": encode_fields(&fields) });
        let result = self
            .send(
                self.request(reqwest::Method::PATCH, &url)
                    .query(&query)
                    .json(&body),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(StoreError::NotFound {
                collection: path.to_string(),
                id: id.to_string(),
            }),
            Err(e) => Err(e),
        }
    }

    async fn remove(&self, path: &CollectionPath, id: &str) -> Result<(), StoreError> {
        let url = format!("{}/{}/{}", self.documents_root(), path, id);
        match self.send(self.request(reqwest::Method::DELETE, &url)).await {
            Ok(_) | Err(StoreError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn describe(&self) -> String {
        format!("firestore:{}", self.settings.project_id)
    }
}

/// Last path segment of a full document resource name.
fn document_id(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

fn from_raw(raw: RawDocument) -> Document {
    let id = document_id(&raw.name).to_string();
    Document::new(id, decode_fields(&raw.fields))
}

/// A query the backend refuses for lack of a composite index. Firestore
/// reports this only as the `FAILED_PRECONDITION` status.
fn is_missing_index(err: &StoreError) -> bool {
    match err {
        StoreError::Backend { message, .. } => message
            .split_once(':')
            .is_some_and(|(code, _)| code == "FAILED_PRECONDITION"),
        _ => false,
    }
}

/// Plain JSON -> Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64().unwrap_or(0.0) })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(encode_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

/// Firestore typed value -> plain JSON.
pub fn decode_value(value: &Value) -> Value {
    let Some(map) = value.as_object() else {
        return Value::Null;
    };

    if let Some(s) = map.get("stringValue").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(b) = map.get("booleanValue").and_then(Value::as_bool) {
        return Value::Bool(b);
    }
    if let Some(i) = map.get("integerValue") {
        let parsed = match i {
            Value::String(s) => s.parse::<i64>().ok(),
            other => other.as_i64(),
        };
        return parsed.map(Value::from).unwrap_or(Value::Null);
    }
    if let Some(d) = map.get("doubleValue").and_then(Value::as_f64) {
        return json!(d);
    }
    if let Some(t) = map.get("timestampValue").and_then(Value::as_str) {
        return Value::String(t.to_string());
    }
    if let Some(ref_value) = map.get("referenceValue").and_then(Value::as_str) {
        return Value::String(ref_value.to_string());
    }
    if let Some(array) = map.get("arrayValue") {
        let values = array
            .get("values")
            .and_then(Value::as_array)
            .map(|vs| vs.iter().map(decode_value).collect())
            .unwrap_or_default();
        return Value::Array(values);
    }
    if let Some(inner) = map.get("mapValue") {
        let fields = inner
            .get("fields")
            .and_then(Value::as_object)
            .map(decode_fields)
            .unwrap_or_default();
        return Value::Object(fields);
    }
    Value::Null
}

fn decode_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), decode_value(v)))
        .collect()
}
