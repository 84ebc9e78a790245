//! Async facade over [`SyncEngine`].
//!
//! Operations on the same target run one at a time, in the order they were
//! submitted; different targets proceed in parallel. File work runs on the
//! blocking pool.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::engine::{Preview, RestoreMode, SyncEngine, SyncReport, SyncRequest, TargetStatus};
use crate::error::{Result, SyncError};
use crate::model::{ConfigEntry, EntryInput, TargetKind};

#[derive(Clone)]
pub struct SyncService {
    engine: Arc<SyncEngine>,
    droid_lock: Arc<Mutex<()>>,
    opencode_lock: Arc<Mutex<()>>,
}

impl SyncService {
    pub fn new(engine: SyncEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            droid_lock: Arc::new(Mutex::new(())),
            opencode_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    fn lock_for(&self, kind: TargetKind) -> &Arc<Mutex<()>> {
        match kind {
            TargetKind::Droid => &self.droid_lock,
            TargetKind::OpenCode => &self.opencode_lock,
        }
    }

    /// Run `op` against the engine while holding the target's lock.
    ///
    /// If the returned future is dropped while still waiting for the lock the
    /// operation never starts; once started it runs to completion, and the
    /// lock stays held by the worker until it does.
    async fn run<T, F>(&self, kind: TargetKind, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SyncEngine, TargetKind) -> Result<T> + Send + 'static,
    {
        let guard = Arc::clone(self.lock_for(kind)).lock_owned().await;
        let engine = Arc::clone(&self.engine);
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            op(&engine, kind)
        })
            .await
            .map_err(|e| {
                tracing::error!(target_kind = %kind, "sync worker failed: {}", e);
                SyncError::Task(e.to_string())
            })?
    }

    pub async fn get_status(&self, kind: TargetKind) -> Result<TargetStatus> {
        self.run(kind, |e, k| e.get_status(k)).await
    }

    pub async fn preview_merge(&self, kind: TargetKind, selected_ids: Vec<String>) -> Result<Preview> {
        self.run(kind, move |e, k| e.preview_merge(k, &selected_ids))
            .await
    }

    pub async fn execute_sync(&self, kind: TargetKind, request: SyncRequest) -> Result<SyncReport> {
        self.run(kind, move |e, k| e.execute_sync(k, request)).await
    }

    pub async fn execute_restore(&self, kind: TargetKind, mode: RestoreMode) -> Result<()> {
        self.run(kind, move |e, k| e.execute_restore(k, mode)).await
    }

    pub async fn get_config_content(&self, kind: TargetKind, file_name: Option<String>) -> Result<String> {
        self.run(kind, move |e, k| e.get_config_content(k, file_name.as_deref()))
            .await
    }

    pub async fn reorder_entries(
        &self,
        kind: TargetKind,
        entries: Vec<EntryInput>,
        from: usize,
        to: usize,
    ) -> Result<Vec<ConfigEntry>> {
        self.run(kind, move |e, k| e.reorder_entries(k, entries, from, to))
            .await
    }

    pub async fn remove_entry(
        &self,
        kind: TargetKind,
        entries: Vec<EntryInput>,
        uid: Uuid,
    ) -> Result<Vec<ConfigEntry>> {
        self.run(kind, move |e, k| e.remove_entry(k, entries, uid)).await
    }
}
