//! Collaborators the update pipeline and the dispatcher drive.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use shared::{domain::ChangeFlags, protocol::HistoryEntry};
use tracing::error;

#[async_trait]
pub trait HistoryWidget: Send + Sync {
    async fn update(&self) -> Result<()>;
    fn show_undo(&self, entry: &HistoryEntry);
}

#[async_trait]
pub trait DataView: Send + Sync {
    async fn update(&self) -> Result<()>;
}

#[async_trait]
pub trait FacetEngine: Send + Sync {
    async fn update(&self) -> Result<()>;
    /// Current filter state, sent as `engine` with commands and row queries.
    fn get_json(&self) -> Value;
}

/// Follows long-running server processes started by a `pending` command.
#[async_trait]
pub trait ProcessMonitor: Send + Sync {
    async fn update(&self, flags: ChangeFlags) -> Result<()>;
}

pub trait BusyIndicator: Send + Sync {
    fn show(&self);
    fn dismiss(&self);
}

pub struct NoopBusyIndicator;

impl BusyIndicator for NoopBusyIndicator {
    fn show(&self) {}
    fn dismiss(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackKind {
    Done,
    Error,
    Pending,
    FinallyDone,
}

/// Single sink for failures raised by caller-supplied callbacks.
pub trait ExceptionReporter: Send + Sync {
    fn report(&self, kind: CallbackKind, err: &anyhow::Error);
}

pub struct TracingReporter;

impl ExceptionReporter for TracingReporter {
    fn report(&self, kind: CallbackKind, err: &anyhow::Error) {
        error!(callback = ?kind, "callback failed: {err:#}");
    }
}
