use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use tracing::debug;
use tracing::warn;

use super::DeltaSender;
use super::DesiredPatch;
use super::DocumentState;
use super::ReportedPatch;
use super::ShadowDelta;
use super::ShadowDocument;
use super::ShadowError;
use super::ShadowStore;

/// Shadow store kept in process memory.
///
/// Behaves like the hosted service as far as this bridge can observe:
/// partial writes are merged key by key (a `null` value removes the key),
/// every write bumps the document version, reading a thing that was never
/// written is a 404 rejection, and each desired write publishes the keys in
/// which desired now differs from reported.
#[derive(Debug, Default)]
pub struct MemoryShadowStore {
    documents: Mutex<HashMap<String, ShadowDocument>>,
    deltas: Option<DeltaSender>,
    writes: AtomicUsize,
}

impl MemoryShadowStore {
    /// Store that does not publish deltas
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deltas(deltas: DeltaSender) -> Self {
        Self {
            deltas: Some(deltas),
            ..Default::default()
        }
    }

    /// Install a document directly, bypassing write accounting and deltas.
    pub fn insert_document(
        &self,
        thing: &str,
        desired: Map<String, Value>,
        reported: Map<String, Value>,
    ) -> Result<(), ShadowError> {
        let mut documents = self.documents.lock().map_err(|_| ShadowError::Closed)?;
        documents.insert(
            thing.to_string(),
            ShadowDocument {
                state: DocumentState { desired, reported },
                version: 1,
            },
        );
        Ok(())
    }

    /// Number of desired and reported writes accepted so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of one document
    pub fn document(&self, thing: &str) -> Option<ShadowDocument> {
        self.documents.lock().ok()?.get(thing).cloned()
    }

    fn merge(target: &mut Map<String, Value>, patch: Map<String, Value>) {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(&key);
            } else {
                target.insert(key, value);
            }
        }
    }

    fn pending_delta(document: &ShadowDocument) -> Map<String, Value> {
        document
            .state
            .desired
            .iter()
            .filter(|(key, value)| document.state.reported.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

#[async_trait]
impl ShadowStore for MemoryShadowStore {
    async fn get(&self, thing: &str) -> Result<ShadowDocument, ShadowError> {
        let documents = self.documents.lock().map_err(|_| ShadowError::Closed)?;
        documents
            .get(thing)
            .cloned()
            .ok_or_else(|| ShadowError::Rejected {
                thing: thing.to_string(),
                operation: "get",
                code: 404,
                message: format!("No shadow exists with name: '{}'", thing),
            })
    }

    async fn update_desired(&self, thing: &str, patch: &DesiredPatch) -> Result<(), ShadowError> {
        let delta = {
            let mut documents = self.documents.lock().map_err(|_| ShadowError::Closed)?;
            let document = documents.entry(thing.to_string()).or_default();
            Self::merge(&mut document.state.desired, patch.state().to_map());
            document.version += 1;
            self.writes.fetch_add(1, Ordering::SeqCst);

            ShadowDelta {
                thing: thing.to_string(),
                state: Self::pending_delta(document),
                version: Some(document.version),
                client_token: None,
            }
        };

        debug!("Desired state of {} updated (v{:?})", thing, delta.version);

        if let Some(tx) = &self.deltas {
            if !delta.state.is_empty() {
                if let Err(e) = tx.send(delta).await {
                    warn!("Failed to publish delta for {}: {}", thing, e);
                }
            }
        }

        Ok(())
    }

    async fn update_reported(
        &self,
        thing: &str,
        patch: &ReportedPatch,
    ) -> Result<(), ShadowError> {
        let mut documents = self.documents.lock().map_err(|_| ShadowError::Closed)?;
        let document = documents.entry(thing.to_string()).or_default();
        Self::merge(&mut document.state.reported, patch.state().to_map());
        document.version += 1;
        self.writes.fetch_add(1, Ordering::SeqCst);

        debug!("Reported state of {} updated (v{})", thing, document.version);
        Ok(())
    }
}
