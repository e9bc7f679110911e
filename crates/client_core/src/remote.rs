//! Collaborators backed by the server's read commands.

use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::ChangeFlags,
    protocol::{HistoryEntry, HistoryState, ProcessList, RowPage},
};
use tracing::{debug, info};

use crate::{
    pipeline::Updater,
    transport::{decode, param, CommandTransport},
    widgets::{DataView, FacetEngine, HistoryWidget, ProcessMonitor},
};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

pub struct RemoteHistory {
    transport: Arc<dyn CommandTransport>,
    state: RwLock<HistoryState>,
    last_undo: RwLock<Option<HistoryEntry>>,
}

impl RemoteHistory {
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        Self {
            transport,
            state: RwLock::new(HistoryState::default()),
            last_undo: RwLock::new(None),
        }
    }

    pub fn state(&self) -> HistoryState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entry most recently offered for undo.
    pub fn last_undo(&self) -> Option<HistoryEntry> {
        self.last_undo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl HistoryWidget for RemoteHistory {
    async fn update(&self) -> Result<()> {
        let value = self.transport.get_json("get-history", &[]).await?;
        let history: HistoryState = decode("get-history", value)?;
        debug!(
            past = history.past.len(),
            future = history.future.len(),
            "history refreshed"
        );
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = history;
        Ok(())
    }

    fn show_undo(&self, entry: &HistoryEntry) {
        info!(entry = %entry.id, description = %entry.description, "undo available");
        *self.last_undo.write().unwrap_or_else(PoisonError::into_inner) = Some(entry.clone());
    }
}

/// Filter state plus the facet results the server last computed for it.
pub struct RemoteFacetEngine {
    transport: Arc<dyn CommandTransport>,
    config: RwLock<Value>,
    facets: RwLock<Value>,
}

impl RemoteFacetEngine {
    pub fn new(transport: Arc<dyn CommandTransport>) -> Self {
        Self::with_config(transport, json!({ "facets": [], "includeDependent": false }))
    }

    pub fn with_config(transport: Arc<dyn CommandTransport>, config: Value) -> Self {
        Self {
            transport,
            config: RwLock::new(config),
            facets: RwLock::new(Value::Null),
        }
    }

    pub fn set_config(&self, config: Value) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = config;
    }

    pub fn facets(&self) -> Value {
        self.facets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl FacetEngine for RemoteFacetEngine {
    async fn update(&self) -> Result<()> {
        let engine = self.get_json();
        let reply = self
            .transport
            .post_json("compute-facets", &[], &[param("engine", engine)])
            .await?;
        let facets = reply.get("facets").cloned().unwrap_or(Value::Null);
        *self.facets.write().unwrap_or_else(PoisonError::into_inner) = facets;
        Ok(())
    }

    fn get_json(&self) -> Value {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct RemoteDataView {
    transport: Arc<dyn CommandTransport>,
    engine: Arc<dyn FacetEngine>,
    page_size: usize,
    start: RwLock<usize>,
    page: RwLock<RowPage>,
}

impl RemoteDataView {
    pub fn new(
        transport: Arc<dyn CommandTransport>,
        engine: Arc<dyn FacetEngine>,
        page_size: usize,
    ) -> Self {
        Self {
            transport,
            engine,
            page_size: page_size.max(1),
            start: RwLock::new(0),
            page: RwLock::new(RowPage::default()),
        }
    }

    pub fn page(&self) -> RowPage {
        self.page
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Moves the window; takes effect on the next update.
    pub fn set_start(&self, start: usize) {
        *self.start.write().unwrap_or_else(PoisonError::into_inner) = start;
    }
}

#[async_trait]
impl DataView for RemoteDataView {
    async fn update(&self) -> Result<()> {
        let start = *self.start.read().unwrap_or_else(PoisonError::into_inner);
        let params = vec![
            param("engine", self.engine.get_json()),
            param("start", start),
            param("limit", self.page_size),
        ];
        let value = self.transport.get_json("get-rows", &params).await?;
        let page: RowPage = decode("get-rows", value)?;
        debug!(
            start = page.start,
            rows = page.rows.len(),
            filtered = page.filtered,
            total = page.total,
            "rows refreshed"
        );
        *self.page.write().unwrap_or_else(PoisonError::into_inner) = page;
        Ok(())
    }
}

/// Polls `get-processes` until the queue drains, then refreshes the project
/// with the flags of the command that started the work.
pub struct RemoteProcessMonitor {
    updater: Arc<Updater>,
    interval: Duration,
}

impl RemoteProcessMonitor {
    pub fn new(updater: Arc<Updater>, interval: Duration) -> Self {
        Self { updater, interval }
    }
}

#[async_trait]
impl ProcessMonitor for RemoteProcessMonitor {
    async fn update(&self, flags: ChangeFlags) -> Result<()> {
        loop {
            let value = self
                .updater
                .transport()
                .get_json("get-processes", &[])
                .await?;
            let processes: ProcessList = decode("get-processes", value)?;
            if processes.is_idle() {
                break;
            }
            debug!(
                queued = processes.processes.len(),
                "processes still running"
            );
            tokio::time::sleep(self.interval).await;
        }
        self.updater.update(flags, None).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
