/// Document database collaborator (Firestore REST).
///
/// The core stages writes as plain JSON documents and chunks them into
/// bounded batches; the collaborator only executes committed batches.
/// There is exactly one write contract — `set(collection, documentId,
/// document)` with full-overwrite semantics — matching the full-rebuild
/// aggregation model: every run overwrites the derived documents.

use std::time::Duration;

use serde_json::{json, Value};

use crate::logging::{self, Subsystem};

/// Upper bound on writes per committed batch; Firestore rejects larger
/// commits.
pub const MAX_BATCH_SIZE: usize = 500;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum FirestoreError {
    /// Credential or project environment variable is absent.
    MissingCredentials(&'static str),
    /// Request could not be sent.
    Request(String),
    /// Non-2xx response from the commit endpoint.
    Http { status: u16, body: String },
}

impl std::fmt::Display for FirestoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FirestoreError::MissingCredentials(var) => {
                write!(f, "missing environment variable {}", var)
            }
            FirestoreError::Request(msg) => write!(f, "request failed: {}", msg),
            FirestoreError::Http { status, body } => write!(f, "HTTP {}: {}", status, body),
        }
    }
}

impl std::error::Error for FirestoreError {}

// ---------------------------------------------------------------------------
// Write contract
// ---------------------------------------------------------------------------

/// One staged document write.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentWrite {
    pub collection: String,
    pub document_id: String,
    pub document: Value,
}

impl DocumentWrite {
    pub fn new(collection: &str, document_id: String, document: Value) -> Self {
        Self {
            collection: collection.to_string(),
            document_id,
            document,
        }
    }
}

/// Batched document writes. Implementations execute one committed batch at
/// a time and never see more than `MAX_BATCH_SIZE` writes per call.
pub trait DocumentStore {
    fn write_batch(&self, writes: &[DocumentWrite]) -> Result<(), FirestoreError>;
}

/// Chunks `writes` into bounded batches and commits them in order. Any
/// batch failure aborts the remainder — indexing is all-or-nothing per run
/// and the next run rebuilds from scratch anyway.
pub fn commit_in_batches(
    store: &dyn DocumentStore,
    writes: &[DocumentWrite],
) -> Result<(), FirestoreError> {
    for chunk in writes.chunks(MAX_BATCH_SIZE) {
        store.write_batch(chunk)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// REST client
// ---------------------------------------------------------------------------

pub struct FirestoreClient {
    client: reqwest::blocking::Client,
    project_id: String,
    database_id: String,
    token: String,
}

impl FirestoreClient {
    /// Builds a client from the environment: `GOOGLE_CLOUD_PROJECT`,
    /// `FIRESTORE_DATABASE` (defaults to `(default)`) and an OAuth bearer
    /// token in `GOOGLE_OAUTH_ACCESS_TOKEN`.
    pub fn from_env() -> Result<Self, FirestoreError> {
        let project_id = std::env::var("GOOGLE_CLOUD_PROJECT")
            .map_err(|_| FirestoreError::MissingCredentials("GOOGLE_CLOUD_PROJECT"))?;
        let database_id =
            std::env::var("FIRESTORE_DATABASE").unwrap_or_else(|_| "(default)".to_string());
        let token = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN")
            .map_err(|_| FirestoreError::MissingCredentials("GOOGLE_OAUTH_ACCESS_TOKEN"))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| FirestoreError::Request(e.to_string()))?;
        Ok(Self {
            client,
            project_id,
            database_id,
            token,
        })
    }

    fn document_name(&self, write: &DocumentWrite) -> String {
        format!(
            "projects/{}/databases/{}/documents/{}/{}",
            self.project_id, self.database_id, write.collection, write.document_id
        )
    }
}

impl DocumentStore for FirestoreClient {
    fn write_batch(&self, writes: &[DocumentWrite]) -> Result<(), FirestoreError> {
        if writes.is_empty() {
            return Ok(());
        }

        let body = json!({
            "writes": writes
                .iter()
                .map(|write| {
                    json!({
                        "update": {
                            "name": self.document_name(write),
                            "fields": to_firestore_fields(&write.document),
                        }
                    })
                })
                .collect::<Vec<_>>(),
        });

        let url = format!(
            "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents:commit",
            self.project_id, self.database_id
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .map_err(|e| FirestoreError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(FirestoreError::Http {
                status: status.as_u16(),
                body,
            });
        }

        logging::debug(
            Subsystem::Firestore,
            None,
            &format!("Committed batch of {} writes", writes.len()),
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// JSON → Firestore value mapping
// ---------------------------------------------------------------------------

/// Maps a JSON object's members into Firestore `fields`. Non-object
/// documents become a single-field map (does not occur with our payloads).
fn to_firestore_fields(document: &Value) -> Value {
    match document {
        Value::Object(members) => {
            let fields: serde_json::Map<String, Value> = members
                .iter()
                .map(|(name, value)| (name.clone(), to_firestore_value(value)))
                .collect();
            Value::Object(fields)
        }
        other => json!({ "value": to_firestore_value(other) }),
    }
}

fn to_firestore_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                // Firestore carries integers as decimal strings
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": {
                "values": items.iter().map(to_firestore_value).collect::<Vec<_>>(),
            }
        }),
        Value::Object(_) => json!({ "mapValue": { "fields": to_firestore_fields(value) } }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
