use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use shared::{
    domain::{ChangeFlags, ProjectId},
    protocol::{HistoryEntry, ProjectMetadata, ResponseEnvelope},
};

use crate::{
    activity::ActivityFlag,
    context::{ProjectContext, SharedProject},
    error::ClientError,
    pipeline::{Updater, Widgets},
    session::ProjectSession,
    transport::{CommandBody, CommandTransport},
    widgets::{
        BusyIndicator, CallbackKind, DataView, ExceptionReporter, FacetEngine, HistoryWidget,
        ProcessMonitor,
    },
};

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn entries(journal: &Journal) -> Vec<String> {
    journal.lock().expect("journal").clone()
}

fn missing(command: &str) -> ClientError {
    ClientError::Decode {
        command: command.to_string(),
        source: serde_json::from_str::<Value>("").expect_err("empty input never parses"),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedPost {
    pub command: String,
    pub params: Vec<(String, String)>,
    pub body: Vec<(String, String)>,
    pub activity_raised: bool,
}

#[derive(Default)]
pub struct FakeTransport {
    pub journal: Journal,
    gets: Mutex<HashMap<String, Value>>,
    get_queues: Mutex<HashMap<String, VecDeque<Value>>>,
    posts: Mutex<HashMap<String, ResponseEnvelope>>,
    json_posts: Mutex<HashMap<String, Value>>,
    downloads: Mutex<HashMap<String, Vec<u8>>>,
    delays: Mutex<HashMap<String, Duration>>,
    watched_activity: Mutex<Option<ActivityFlag>>,
    pub recorded_gets: Mutex<Vec<(String, Vec<(String, String)>)>>,
    pub recorded_posts: Mutex<Vec<RecordedPost>>,
    pub recorded_downloads: Mutex<Vec<(String, CommandBody)>>,
}

impl FakeTransport {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            ..Self::default()
        }
    }

    pub fn with_get(self, command: &str, value: Value) -> Self {
        self.gets
            .lock()
            .expect("gets")
            .insert(command.to_string(), value);
        self
    }

    /// Replies consumed in order before falling back to `with_get`.
    pub fn with_get_sequence(self, command: &str, values: Vec<Value>) -> Self {
        self.get_queues
            .lock()
            .expect("queues")
            .insert(command.to_string(), values.into());
        self
    }

    pub fn with_post(self, command: &str, envelope: ResponseEnvelope) -> Self {
        self.posts
            .lock()
            .expect("posts")
            .insert(command.to_string(), envelope);
        self
    }

    pub fn with_post_json(self, command: &str, value: Value) -> Self {
        self.json_posts
            .lock()
            .expect("json posts")
            .insert(command.to_string(), value);
        self
    }

    pub fn with_download(self, command: &str, bytes: &[u8]) -> Self {
        self.downloads
            .lock()
            .expect("downloads")
            .insert(command.to_string(), bytes.to_vec());
        self
    }

    pub fn with_delay(self, command: &str, delay: Duration) -> Self {
        self.delays
            .lock()
            .expect("delays")
            .insert(command.to_string(), delay);
        self
    }

    pub fn watch_activity(&self, flag: &ActivityFlag) {
        *self.watched_activity.lock().expect("watched activity") = Some(flag.clone());
    }

    pub fn with_project_fixtures(self) -> Self {
        self.with_get("get-project-metadata", json!({ "name": "Birds" }))
            .with_get(
                "get-models",
                json!({
                    "columnModel": {
                        "columns": [{ "cellIndex": 0, "headerLabel": "species" }]
                    }
                }),
            )
            .with_get(
                "get-column-model",
                json!({
                    "columns": [
                        { "cellIndex": 0, "headerLabel": "species" },
                        { "cellIndex": 1, "headerLabel": "count" }
                    ]
                }),
            )
    }

    async fn pause_for(&self, command: &str) {
        let delay = self.delays.lock().expect("delays").get(command).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn record(&self, entry: String) {
        self.journal.lock().expect("journal").push(entry);
    }

    fn record_post(&self, command: &str, params: &[(String, String)], body: &[(String, String)]) {
        self.record(format!("POST {command}"));
        let activity_raised = self
            .watched_activity
            .lock()
            .expect("watched activity")
            .as_ref()
            .map(ActivityFlag::is_active)
            .unwrap_or(false);
        self.recorded_posts.lock().expect("posts").push(RecordedPost {
            command: command.to_string(),
            params: params.to_vec(),
            body: body.to_vec(),
            activity_raised,
        });
    }
}

#[async_trait]
impl CommandTransport for FakeTransport {
    fn project_id(&self) -> ProjectId {
        ProjectId(1)
    }

    async fn get_json(
        &self,
        command: &str,
        params: &[(String, String)],
    ) -> Result<Value, ClientError> {
        self.record(format!("GET {command}"));
        self.recorded_gets
            .lock()
            .expect("gets")
            .push((command.to_string(), params.to_vec()));
        self.pause_for(command).await;
        let queued = self
            .get_queues
            .lock()
            .expect("queues")
            .get_mut(command)
            .and_then(VecDeque::pop_front);
        if let Some(value) = queued {
            return Ok(value);
        }
        self.gets
            .lock()
            .expect("gets")
            .get(command)
            .cloned()
            .ok_or_else(|| missing(command))
    }

    async fn post_command(
        &self,
        command: &str,
        params: &[(String, String)],
        body: &[(String, String)],
    ) -> Result<ResponseEnvelope, ClientError> {
        self.record_post(command, params, body);
        self.pause_for(command).await;
        self.posts
            .lock()
            .expect("posts")
            .get(command)
            .cloned()
            .ok_or_else(|| missing(command))
    }

    async fn post_json(
        &self,
        command: &str,
        params: &[(String, String)],
        body: &[(String, String)],
    ) -> Result<Value, ClientError> {
        self.record_post(command, params, body);
        self.pause_for(command).await;
        self.json_posts
            .lock()
            .expect("json posts")
            .get(command)
            .cloned()
            .ok_or_else(|| missing(command))
    }

    async fn post_for_bytes(
        &self,
        command: &str,
        body: CommandBody,
    ) -> Result<Vec<u8>, ClientError> {
        self.record(format!("DOWNLOAD {command}"));
        self.recorded_downloads
            .lock()
            .expect("downloads")
            .push((command.to_string(), body));
        self.downloads
            .lock()
            .expect("downloads")
            .get(command)
            .cloned()
            .ok_or_else(|| missing(command))
    }
}

pub struct RecordingHistory {
    journal: Journal,
    pub undo_entries: Mutex<Vec<HistoryEntry>>,
    pub fail: bool,
}

impl RecordingHistory {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            undo_entries: Mutex::new(Vec::new()),
            fail: false,
        }
    }
}

#[async_trait]
impl HistoryWidget for RecordingHistory {
    async fn update(&self) -> Result<()> {
        self.journal.lock().expect("journal").push("history".to_string());
        if self.fail {
            return Err(anyhow!("history unavailable"));
        }
        Ok(())
    }

    fn show_undo(&self, entry: &HistoryEntry) {
        self.journal.lock().expect("journal").push("show-undo".to_string());
        self.undo_entries.lock().expect("undo").push(entry.clone());
    }
}

pub struct RecordingDataView {
    journal: Journal,
    pub delay: Option<Duration>,
}

impl RecordingDataView {
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            delay: None,
        }
    }
}

#[async_trait]
impl DataView for RecordingDataView {
    async fn update(&self) -> Result<()> {
        self.journal
            .lock()
            .expect("journal")
            .push("data-view:start".to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.journal
            .lock()
            .expect("journal")
            .push("data-view:end".to_string());
        Ok(())
    }
}

pub struct RecordingFacets {
    journal: Journal,
}

impl RecordingFacets {
    pub fn new(journal: Journal) -> Self {
        Self { journal }
    }
}

#[async_trait]
impl FacetEngine for RecordingFacets {
    async fn update(&self) -> Result<()> {
        self.journal.lock().expect("journal").push("facets".to_string());
        Ok(())
    }

    fn get_json(&self) -> Value {
        json!({ "facets": [{ "name": "species" }] })
    }
}

pub struct RecordingProcess {
    journal: Journal,
    pub flags: Mutex<Vec<ChangeFlags>>,
}

#[async_trait]
impl ProcessMonitor for RecordingProcess {
    async fn update(&self, flags: ChangeFlags) -> Result<()> {
        self.journal.lock().expect("journal").push("process".to_string());
        self.flags.lock().expect("flags").push(flags);
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingBusy {
    pub shown: AtomicUsize,
    pub dismissed: AtomicUsize,
}

impl CountingBusy {
    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn dismissed(&self) -> usize {
        self.dismissed.load(Ordering::SeqCst)
    }
}

impl BusyIndicator for CountingBusy {
    fn show(&self) {
        self.shown.fetch_add(1, Ordering::SeqCst);
    }

    fn dismiss(&self) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    pub reports: Mutex<Vec<(CallbackKind, String)>>,
}

impl RecordingReporter {
    pub fn kinds(&self) -> Vec<CallbackKind> {
        self.reports
            .lock()
            .expect("reports")
            .iter()
            .map(|(kind, _)| *kind)
            .collect()
    }
}

impl ExceptionReporter for RecordingReporter {
    fn report(&self, kind: CallbackKind, err: &anyhow::Error) {
        self.reports
            .lock()
            .expect("reports")
            .push((kind, err.to_string()));
    }
}

pub fn named_project(name: &str) -> SharedProject {
    let mut context = ProjectContext::new(ProjectId(1));
    context.metadata = Some(ProjectMetadata {
        name: name.to_string(),
        created: None,
        modified: None,
    });
    context.into_shared()
}

pub struct Harness {
    pub journal: Journal,
    pub transport: Arc<FakeTransport>,
    pub history: Arc<RecordingHistory>,
    pub process: Arc<RecordingProcess>,
    pub busy: Arc<CountingBusy>,
    pub reporter: Arc<RecordingReporter>,
    pub updater: Arc<Updater>,
    pub session: ProjectSession,
}

pub struct HarnessBuilder {
    journal: Journal,
    transport: FakeTransport,
    history: RecordingHistory,
    data_view: RecordingDataView,
    project: SharedProject,
    busy_delay: Duration,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        let journal = Journal::default();
        Self {
            transport: FakeTransport::new(journal.clone()).with_project_fixtures(),
            history: RecordingHistory::new(journal.clone()),
            data_view: RecordingDataView::new(journal.clone()),
            journal,
            project: named_project("Birds"),
            busy_delay: Duration::from_millis(500),
        }
    }

    pub fn transport(mut self, f: impl FnOnce(FakeTransport) -> FakeTransport) -> Self {
        self.transport = f(self.transport);
        self
    }

    pub fn failing_history(mut self) -> Self {
        self.history.fail = true;
        self
    }

    pub fn slow_data_view(mut self, delay: Duration) -> Self {
        self.data_view.delay = Some(delay);
        self
    }

    pub fn project(mut self, project: SharedProject) -> Self {
        self.project = project;
        self
    }

    pub fn build(self) -> Harness {
        let transport = Arc::new(self.transport);
        let history = Arc::new(self.history);
        let process = Arc::new(RecordingProcess {
            journal: self.journal.clone(),
            flags: Mutex::new(Vec::new()),
        });
        let busy = Arc::new(CountingBusy::default());
        let reporter = Arc::new(RecordingReporter::default());
        let widgets = Widgets {
            history: history.clone(),
            data_view: Arc::new(self.data_view),
            facets: Arc::new(RecordingFacets::new(self.journal.clone())),
        };
        let updater = Arc::new(
            Updater::new(transport.clone(), self.project, widgets)
                .with_busy_indicator(busy.clone(), self.busy_delay)
                .with_reporter(reporter.clone()),
        );
        transport.watch_activity(updater.activity());
        let session = ProjectSession::new(updater.clone(), process.clone());
        Harness {
            journal: self.journal,
            transport,
            history,
            process,
            busy,
            reporter,
            updater,
            session,
        }
    }
}
