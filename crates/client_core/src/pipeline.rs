//! Refresh pipeline run after the server accepted a mutating command.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use shared::{domain::ChangeFlags, protocol::ProjectMetadata};
use tracing::{debug, info};

use crate::{
    activity::ActivityFlag,
    busy::{BusyGuard, DEFAULT_BUSY_DELAY},
    chain::Chain,
    context::{ProjectContext, SharedProject},
    error::UpdateError,
    transport::{decode, CommandTransport},
    widgets::{
        BusyIndicator, CallbackKind, DataView, ExceptionReporter, FacetEngine, HistoryWidget,
        NoopBusyIndicator, TracingReporter,
    },
};

pub type FinallyCallback = Box<dyn FnOnce() -> Result<()> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    CommitHistory,
    ReloadModels,
    RefreshDataView,
    RefreshFacets,
}

/// History always comes first; the data view is refreshed before the facets.
pub fn build_pipeline(flags: &ChangeFlags) -> Vec<PipelineStep> {
    let mut steps = vec![PipelineStep::CommitHistory];
    if flags.reloads_models() {
        steps.push(PipelineStep::ReloadModels);
    }
    if flags.refreshes_view() {
        steps.push(PipelineStep::RefreshDataView);
        steps.push(PipelineStep::RefreshFacets);
    }
    steps
}

#[derive(Clone)]
pub struct Widgets {
    pub history: Arc<dyn HistoryWidget>,
    pub data_view: Arc<dyn DataView>,
    pub facets: Arc<dyn FacetEngine>,
}

pub struct Updater {
    transport: Arc<dyn CommandTransport>,
    project: SharedProject,
    widgets: Widgets,
    busy: Arc<dyn BusyIndicator>,
    busy_delay: Duration,
    activity: ActivityFlag,
    reporter: Arc<dyn ExceptionReporter>,
}

impl Updater {
    pub fn new(transport: Arc<dyn CommandTransport>, project: SharedProject, widgets: Widgets) -> Self {
        Self {
            transport,
            project,
            widgets,
            busy: Arc::new(NoopBusyIndicator),
            busy_delay: DEFAULT_BUSY_DELAY,
            activity: ActivityFlag::new(),
            reporter: Arc::new(TracingReporter),
        }
    }

    pub fn with_busy_indicator(mut self, busy: Arc<dyn BusyIndicator>, delay: Duration) -> Self {
        self.busy = busy;
        self.busy_delay = delay;
        self
    }

    pub fn with_activity(mut self, activity: ActivityFlag) -> Self {
        self.activity = activity;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ExceptionReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn transport(&self) -> &Arc<dyn CommandTransport> {
        &self.transport
    }

    pub fn project(&self) -> &SharedProject {
        &self.project
    }

    pub fn widgets(&self) -> &Widgets {
        &self.widgets
    }

    pub fn activity(&self) -> &ActivityFlag {
        &self.activity
    }

    pub fn reporter(&self) -> &Arc<dyn ExceptionReporter> {
        &self.reporter
    }

    pub(crate) fn arm_busy(&self) -> BusyGuard {
        BusyGuard::arm(Arc::clone(&self.busy), self.busy_delay)
    }

    /// Runs a freshly built pipeline for `flags`, one step at a time.
    ///
    /// A failing step stops the pipeline and `on_finally_done` is not called;
    /// the busy indicator and the activity flag are released either way.
    pub async fn update(
        &self,
        flags: ChangeFlags,
        on_finally_done: Option<FinallyCallback>,
    ) -> Result<(), UpdateError> {
        let _activity = self.activity.begin();
        let busy = self.arm_busy();

        let steps = build_pipeline(&flags);
        info!(?flags, steps = steps.len(), "running update pipeline");
        for step in steps {
            debug!(?step, "update step");
            self.run_step(step)
                .await
                .map_err(|source| UpdateError { step, source })?;
        }

        busy.finish();
        if let Some(callback) = on_finally_done {
            if let Err(err) = callback() {
                self.reporter.report(CallbackKind::FinallyDone, &err);
            }
        }
        Ok(())
    }

    async fn run_step(&self, step: PipelineStep) -> Result<()> {
        match step {
            PipelineStep::CommitHistory => self.widgets.history.update().await,
            PipelineStep::ReloadModels => self.reload_models().await,
            PipelineStep::RefreshDataView => self.widgets.data_view.update().await,
            PipelineStep::RefreshFacets => self.widgets.facets.update().await,
        }
    }

    async fn reload_models(&self) -> Result<()> {
        Chain::<ProjectContext>::new()
            .fetch("get-project-metadata", Vec::new(), |project, value| {
                let metadata: ProjectMetadata = decode("get-project-metadata", value)?;
                project.metadata = Some(metadata);
                Ok(())
            })
            .fetch("get-models", Vec::new(), |project, value| {
                project.apply_models(decode("get-models", value)?);
                Ok(())
            })
            .run(self.transport.as_ref(), &self.project)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/pipeline_tests.rs"]
mod tests;
