//! InstanceStore - per-tool mapping from instance id to private state
//!
//! Each concrete tool owns exactly one store. Records for different ids are
//! disjoint; the lock is only held for the duration of a synchronous closure,
//! never across an await point, so slow work on one instance (a subprocess)
//! does not block the others.

use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use super::ToolError;
use super::traits::InstanceId;

/// Arena of instance records keyed by opaque id
#[derive(Debug)]
pub struct InstanceStore<S> {
    tool: &'static str,
    records: Mutex<HashMap<InstanceId, S>>,
}

impl<S> InstanceStore<S> {
    pub fn new(tool: &'static str) -> Self {
        Self {
            tool,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Register an instance, generating an id when none is supplied
    ///
    /// Creating an id that already exists keeps its current record.
    pub async fn create(&self, requested: Option<InstanceId>, init: impl FnOnce() -> S) -> InstanceId {
        let id = requested.unwrap_or_else(|| Uuid::now_v7().to_string());
        let mut records = self.records.lock().await;
        if records.contains_key(&id) {
            debug!(tool = self.tool, %id, "InstanceStore::create: reusing existing instance");
        } else {
            records.insert(id.clone(), init());
            info!(tool = self.tool, %id, "Created tool instance");
        }
        id
    }

    /// Run a closure against one record
    pub async fn with<R>(&self, id: &str, f: impl FnOnce(&mut S) -> R) -> Result<R, ToolError> {
        let mut records = self.records.lock().await;
        match records.get_mut(id) {
            Some(record) => Ok(f(record)),
            None => {
                debug!(tool = self.tool, %id, "InstanceStore::with: unknown instance");
                Err(ToolError::UnknownInstance { id: id.to_string() })
            }
        }
    }

    /// Fail with `UnknownInstance` unless the id is registered
    pub async fn ensure(&self, id: &str) -> Result<(), ToolError> {
        self.with(id, |_| ()).await
    }

    /// Remove an instance and hand back its final record
    pub async fn release(&self, id: &str) -> Result<S, ToolError> {
        let removed = self.records.lock().await.remove(id);
        match removed {
            Some(record) => {
                info!(tool = self.tool, %id, "Released tool instance");
                Ok(record)
            }
            None => Err(ToolError::UnknownInstance { id: id.to_string() }),
        }
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.records.lock().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_generates_unique_ids() {
        let store: InstanceStore<u32> = InstanceStore::new("test");
        let a = store.create(None, || 0).await;
        let b = store.create(None, || 0).await;

        assert_ne!(a, b);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_create_is_idempotent() {
        let store: InstanceStore<u32> = InstanceStore::new("test");
        let id = store.create(Some("traj-1".to_string()), || 0).await;
        store.with(&id, |n| *n += 5).await.unwrap();

        let again = store.create(Some("traj-1".to_string()), || 0).await;
        assert_eq!(again, "traj-1");
        assert_eq!(store.with(&id, |n| *n).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_unknown_instance() {
        let store: InstanceStore<u32> = InstanceStore::new("test");
        let result = store.with("missing", |n| *n).await;
        assert!(matches!(result, Err(ToolError::UnknownInstance { .. })));
        assert!(store.ensure("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_release_twice() {
        let store: InstanceStore<u32> = InstanceStore::new("test");
        let id = store.create(None, || 7).await;

        assert_eq!(store.release(&id).await.unwrap(), 7);
        assert!(matches!(store.release(&id).await, Err(ToolError::UnknownInstance { .. })));
        assert!(!store.contains(&id).await);
        assert!(store.is_empty().await);
    }
}
