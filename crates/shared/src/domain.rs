use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ProjectId);
id_newtype!(HistoryEntryId);
id_newtype!(ProcessId);

/// Which parts of the project a mutating command touched.
///
/// The flags are independent; `everything_changed` implies every other one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangeFlags {
    pub everything_changed: bool,
    pub models_changed: bool,
    pub rows_changed: bool,
    pub row_metadata_changed: bool,
    pub cells_changed: bool,
    pub column_stats_changed: bool,
    pub engine_changed: bool,
}

impl ChangeFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn everything() -> Self {
        Self {
            everything_changed: true,
            ..Self::default()
        }
    }

    pub fn models() -> Self {
        Self {
            models_changed: true,
            ..Self::default()
        }
    }

    pub fn rows() -> Self {
        Self {
            rows_changed: true,
            ..Self::default()
        }
    }

    pub fn cells() -> Self {
        Self {
            cells_changed: true,
            ..Self::default()
        }
    }

    pub fn engine() -> Self {
        Self {
            engine_changed: true,
            ..Self::default()
        }
    }

    /// Project metadata and the column model must be fetched again.
    pub fn reloads_models(&self) -> bool {
        self.everything_changed || self.models_changed || self.column_stats_changed
    }

    /// The data view and the facets must be recomputed.
    pub fn refreshes_view(&self) -> bool {
        self.everything_changed
            || self.models_changed
            || self.rows_changed
            || self.row_metadata_changed
            || self.cells_changed
            || self.engine_changed
    }
}

/// Change flags plus the per-request switches a mutating command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    pub flags: ChangeFlags,
    pub include_engine: bool,
}

impl UpdateOptions {
    pub fn new(flags: ChangeFlags) -> Self {
        Self {
            flags,
            include_engine: true,
        }
    }

    pub fn without_engine(mut self) -> Self {
        self.include_engine = false;
        self
    }
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self::new(ChangeFlags::default())
    }
}

impl From<ChangeFlags> for UpdateOptions {
    fn from(flags: ChangeFlags) -> Self {
        Self::new(flags)
    }
}

/// Output formats offered by `export-rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Tsv,
    Csv,
    Html,
    Xls,
    Tripleloader,
    Mqlwrite,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Tsv => "tsv",
            ExportFormat::Csv => "csv",
            ExportFormat::Html => "html",
            ExportFormat::Xls => "xls",
            ExportFormat::Tripleloader => "tripleloader",
            ExportFormat::Mqlwrite => "mqlwrite",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Tripleloader | ExportFormat::Mqlwrite => "txt",
            other => other.as_str(),
        }
    }

    /// Triple-based formats can only be produced once a schema alignment exists.
    pub fn requires_schema_alignment(&self) -> bool {
        matches!(self, ExportFormat::Tripleloader | ExportFormat::Mqlwrite)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "tsv" => Some(ExportFormat::Tsv),
            "csv" => Some(ExportFormat::Csv),
            "html" => Some(ExportFormat::Html),
            "xls" => Some(ExportFormat::Xls),
            "tripleloader" => Some(ExportFormat::Tripleloader),
            "mqlwrite" => Some(ExportFormat::Mqlwrite),
            _ => None,
        }
    }
}
