use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{HistoryEntryId, ProcessId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseCode {
    Ok,
    Error,
    Pending,
    #[serde(other)]
    Unknown,
}

/// Reply to a mutating command. Command-specific payload sits at the top level
/// next to `code`, and is kept in `payload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub code: ResponseCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(
        rename = "historyEntry",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub history_entry: Option<HistoryEntry>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl ResponseEnvelope {
    pub fn ok() -> Self {
        Self {
            code: ResponseCode::Ok,
            message: None,
            history_entry: None,
            payload: Map::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            code: ResponseCode::Error,
            message: Some(message.into()),
            history_entry: None,
            payload: Map::new(),
        }
    }

    pub fn pending() -> Self {
        Self {
            code: ResponseCode::Pending,
            message: None,
            history_entry: None,
            payload: Map::new(),
        }
    }

    pub fn with_history_entry(mut self, entry: HistoryEntry) -> Self {
        self.history_entry = Some(entry);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.code == ResponseCode::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: HistoryEntryId,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl HistoryEntry {
    pub fn new(id: i64, description: impl Into<String>) -> Self {
        Self {
            id: HistoryEntryId(id),
            description: description.into(),
            time: None,
        }
    }
}

/// Payload of `get-history`: applied entries and undone entries that can be redone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryState {
    pub past: Vec<HistoryEntry>,
    pub future: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub cell_index: usize,
    pub header_label: String,
    /// Display-only state, never sent by the server.
    #[serde(default, skip_serializing)]
    pub collapsed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnModel {
    #[serde(default)]
    pub columns: Vec<Column>,
}

impl ColumnModel {
    pub fn expand_all(&mut self) {
        for column in &mut self.columns {
            column.collapsed = false;
        }
    }

    pub fn header_labels(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(|column| column.header_label.as_str())
            .collect()
    }
}

/// Payload of `get-models`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectModels {
    #[serde(default)]
    pub column_model: ColumnModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protograph: Option<Value>,
}

/// Payload of `get-rows`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowPage {
    pub start: usize,
    pub limit: usize,
    pub total: usize,
    pub filtered: usize,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Pending,
    Running,
    Done,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub id: ProcessId,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub immediate: bool,
    pub status: ProcessStatus,
    #[serde(default)]
    pub progress: i32,
}

/// Payload of `get-processes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessList {
    pub processes: Vec<ProcessInfo>,
}

impl ProcessList {
    pub fn is_idle(&self) -> bool {
        self.processes.iter().all(|process| {
            !matches!(
                process.status,
                ProcessStatus::Pending | ProcessStatus::Running
            )
        })
    }
}
