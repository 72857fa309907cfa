//! Store state that hydrates from [`KvStorage`] on open and writes a snapshot
//! back after every mutation.

use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::error::{StorageError, StorageResult};
use super::KvStorage;

/// State that can live inside a [`PersistedStore`].
///
/// The snapshot decides which part of the state survives a restart; fields
/// left out of it start from their `Default` value on every open.
pub trait Persisted: Default + Send + Sync + 'static {
    const STORAGE_KEY: &'static str;

    type Snapshot: Serialize + DeserializeOwned + Send;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);
}

/// Cloneable handle to one store. All clones share the same state.
#[derive(Debug)]
pub struct PersistedStore<S> {
    state: Arc<RwLock<S>>,
    storage: KvStorage,
}

impl<S> Clone for PersistedStore<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            storage: self.storage.clone(),
        }
    }
}

impl<S: Persisted> PersistedStore<S> {
    pub async fn open(storage: KvStorage) -> StorageResult<Self> {
        let mut state = S::default();

        match storage.get_item::<S::Snapshot>(S::STORAGE_KEY).await {
            Ok(Some(snapshot)) => {
                state.restore(snapshot);
                debug!(key = S::STORAGE_KEY, "store hydrated");
            }
            Ok(None) => {}
            // an unreadable snapshot is dropped rather than blocking startup
            Err(StorageError::Json { key, source }) => {
                warn!("discarding unreadable snapshot for `{key}`: {source}");
            }
            Err(error) => return Err(error),
        }

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            storage,
        })
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.state.read();
        f(&*guard)
    }

    /// Applies `f` and persists the resulting snapshot. The lock is released
    /// before the write, so a concurrent update may land first; the last save
    /// wins.
    pub async fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> StorageResult<R> {
        let (out, snapshot) = {
            let mut guard = self.state.write();
            let out = f(&mut *guard);
            (out, guard.snapshot())
        };

        self.storage.set_item(S::STORAGE_KEY, &snapshot).await?;
        Ok(out)
    }
}

impl<S: Persisted + Clone> PersistedStore<S> {
    pub fn get(&self) -> S {
        self.state.read().clone()
    }
}
