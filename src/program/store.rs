//! The shared in-memory program record
//!
//! There is exactly one record per process. Writers take the lock for the
//! whole mutation, so concurrent chats interleave as "last write wins" but
//! never see a half-applied update.

use tokio::sync::RwLock;

use super::model::{ConcertProgram, MetadataUpdate, Performance};

/// Shared, lock-protected concert program
#[derive(Default)]
pub struct ProgramStore {
    inner: RwLock<ConcertProgram>,
}

impl ProgramStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record
    pub fn with_program(program: ConcertProgram) -> Self {
        Self {
            inner: RwLock::new(program),
        }
    }

    /// Copy of the current record
    pub async fn snapshot(&self) -> ConcertProgram {
        self.inner.read().await.clone()
    }

    /// Replace the performance list and apply any provided metadata.
    pub async fn replace_performances(
        &self,
        performances: Vec<Performance>,
        metadata: &MetadataUpdate,
    ) -> ConcertProgram {
        let mut program = self.inner.write().await;
        program.performances = performances;
        program.normalize();
        metadata.apply_to(&mut program);
        program.clone()
    }

    pub async fn apply_metadata(&self, metadata: &MetadataUpdate) -> ConcertProgram {
        let mut program = self.inner.write().await;
        metadata.apply_to(&mut program);
        program.clone()
    }

    /// Shallow-merge a corrected record into the current one.
    ///
    /// Top-level keys present in `update` overwrite the current values; keys
    /// it omits are kept. The merged JSON is read back into a typed record,
    /// and on failure the store is left untouched.
    pub async fn merge_json(
        &self,
        update: serde_json::Map<String, serde_json::Value>,
    ) -> Result<ConcertProgram, serde_json::Error> {
        let mut program = self.inner.write().await;

        let mut merged = match serde_json::to_value(&*program)? {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        for (key, value) in update {
            merged.insert(key, value);
        }

        let mut updated: ConcertProgram = serde_json::from_value(serde_json::Value::Object(merged))?;
        updated.normalize();
        *program = updated.clone();
        Ok(updated)
    }
}
