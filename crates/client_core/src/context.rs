use std::sync::Arc;

use serde_json::Value;
use shared::{
    domain::ProjectId,
    protocol::{ColumnModel, ProjectMetadata, ProjectModels},
};
use tokio::sync::RwLock;

const TITLE_SUFFIX: &str = " - Gridworks";

/// In-memory view of one loaded project.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectContext {
    pub id: ProjectId,
    pub metadata: Option<ProjectMetadata>,
    pub column_model: Option<ColumnModel>,
    pub protograph: Option<Value>,
}

pub type SharedProject = Arc<RwLock<ProjectContext>>;

impl ProjectContext {
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            metadata: None,
            column_model: None,
            protograph: None,
        }
    }

    pub fn into_shared(self) -> SharedProject {
        Arc::new(RwLock::new(self))
    }

    pub fn name(&self) -> Option<&str> {
        self.metadata.as_ref().map(|metadata| metadata.name.as_str())
    }

    pub fn title(&self) -> String {
        match self.name() {
            Some(name) => format!("{name}{TITLE_SUFFIX}"),
            None => format!("Project {}{TITLE_SUFFIX}", self.id),
        }
    }

    pub fn apply_models(&mut self, models: ProjectModels) {
        let mut column_model = models.column_model;
        column_model.expand_all();
        self.column_model = Some(column_model);
        self.protograph = models.protograph;
    }

    /// File name stem used for exports, derived from the project name.
    pub fn export_basename(&self) -> String {
        self.name()
            .map(export_basename)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| format!("project-{}", self.id))
    }
}

/// Non-word characters become spaces, then whitespace runs collapse into `-`.
pub fn export_basename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                ' '
            }
        })
        .collect();
    spaced.split_whitespace().collect::<Vec<_>>().join("-")
}
