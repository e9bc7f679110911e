//! Mutating-command dispatch for one loaded project.

use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::{ChangeFlags, UpdateOptions},
    protocol::{HistoryEntry, ResponseCode, ResponseEnvelope},
};
use tracing::{debug, info, warn};

use crate::{
    activity::ActivityFlag,
    context::SharedProject,
    error::{DispatchError, UpdateError},
    pipeline::{FinallyCallback, Updater, Widgets},
    transport::{param, CommandTransport, Params},
    widgets::{CallbackKind, ExceptionReporter, ProcessMonitor},
};

pub type ResponseCallback = Box<dyn FnOnce(&ResponseEnvelope) -> Result<()> + Send>;

/// Caller hooks for one dispatch. Their failures are reported, never returned.
#[derive(Default)]
pub struct Callbacks {
    on_done: Option<ResponseCallback>,
    on_error: Option<ResponseCallback>,
    on_pending: Option<ResponseCallback>,
    on_finally_done: Option<FinallyCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_done(mut self, f: impl FnOnce(&ResponseEnvelope) -> Result<()> + Send + 'static) -> Self {
        self.on_done = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&ResponseEnvelope) -> Result<()> + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_pending(
        mut self,
        f: impl FnOnce(&ResponseEnvelope) -> Result<()> + Send + 'static,
    ) -> Self {
        self.on_pending = Some(Box::new(f));
        self
    }

    pub fn on_finally_done(mut self, f: impl FnOnce() -> Result<()> + Send + 'static) -> Self {
        self.on_finally_done = Some(Box::new(f));
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    Applied { history_entry: Option<HistoryEntry> },
    Failed { message: Option<String> },
    Pending,
    Unrecognized,
}

pub struct ProjectSession {
    updater: Arc<Updater>,
    process: Arc<dyn ProcessMonitor>,
}

impl ProjectSession {
    pub fn new(updater: Arc<Updater>, process: Arc<dyn ProcessMonitor>) -> Self {
        Self { updater, process }
    }

    pub fn transport(&self) -> &Arc<dyn CommandTransport> {
        self.updater.transport()
    }

    pub fn project(&self) -> &SharedProject {
        self.updater.project()
    }

    pub fn widgets(&self) -> &Widgets {
        self.updater.widgets()
    }

    pub fn activity(&self) -> &ActivityFlag {
        self.updater.activity()
    }

    fn reporter(&self) -> &Arc<dyn ExceptionReporter> {
        self.updater.reporter()
    }

    pub async fn update(
        &self,
        flags: ChangeFlags,
        on_finally_done: Option<FinallyCallback>,
    ) -> Result<(), UpdateError> {
        self.updater.update(flags, on_finally_done).await
    }

    /// Sends `command` with the current engine state (unless the options
    /// exclude it) and continues according to the reply code.
    ///
    /// The activity flag is raised before the request and released exactly
    /// once when this call returns, whatever the outcome.
    pub async fn post_process(
        &self,
        command: &str,
        params: Params,
        mut body: Params,
        options: UpdateOptions,
        callbacks: Callbacks,
    ) -> Result<DispatchOutcome, DispatchError> {
        let _activity = self.activity().begin();

        if options.include_engine {
            body.retain(|(key, _)| key != "engine");
            body.push(param("engine", self.widgets().facets.get_json()));
        }

        let busy = self.updater.arm_busy();
        let response = self
            .transport()
            .post_command(command, &params, &body)
            .await;
        busy.finish();
        let envelope = response?;
        debug!(command, code = ?envelope.code, "command replied");

        let Callbacks {
            on_done,
            on_error,
            on_pending,
            on_finally_done,
        } = callbacks;

        match envelope.code {
            ResponseCode::Error => {
                warn!(command, message = ?envelope.message, "command failed");
                self.invoke(CallbackKind::Error, on_error, &envelope);
                Ok(DispatchOutcome::Failed {
                    message: envelope.message,
                })
            }
            ResponseCode::Ok => {
                self.invoke(CallbackKind::Done, on_done, &envelope);
                // Undo is offered whether or not the refresh succeeds.
                let refreshed = self.updater.update(options.flags, on_finally_done).await;
                if let Some(entry) = &envelope.history_entry {
                    self.widgets().history.show_undo(entry);
                }
                refreshed?;
                info!(command, "command applied");
                Ok(DispatchOutcome::Applied {
                    history_entry: envelope.history_entry,
                })
            }
            ResponseCode::Pending => {
                self.invoke(CallbackKind::Done, on_done, &envelope);
                self.invoke(CallbackKind::Pending, on_pending, &envelope);
                info!(command, "command queued as a long-running process");
                self.process
                    .update(options.flags)
                    .await
                    .map_err(DispatchError::Process)?;
                if let Some(callback) = on_finally_done {
                    if let Err(err) = callback() {
                        self.reporter().report(CallbackKind::FinallyDone, &err);
                    }
                }
                Ok(DispatchOutcome::Pending)
            }
            ResponseCode::Unknown => {
                warn!(command, "command replied with an unrecognized code");
                Ok(DispatchOutcome::Unrecognized)
            }
        }
    }

    fn invoke(
        &self,
        kind: CallbackKind,
        callback: Option<ResponseCallback>,
        envelope: &ResponseEnvelope,
    ) {
        if let Some(callback) = callback {
            if let Err(err) = callback(envelope) {
                self.reporter().report(kind, &err);
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
