//! Project menu commands: rename, exports and the denormalize operation.

use shared::{
    domain::{ChangeFlags, ExportFormat, UpdateOptions},
    error::CommandFailure,
};
use tracing::info;

use crate::{
    error::ActionError,
    session::{Callbacks, DispatchOutcome, ProjectSession},
    transport::{param, CommandBody},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed(String),
    Unchanged,
}

impl ProjectSession {
    /// Blank names and the current name are ignored without a request.
    pub async fn rename_project(&self, requested: &str) -> Result<RenameOutcome, ActionError> {
        let name = requested.trim();
        {
            let project = self.project().read().await;
            let current = project.name().ok_or(ActionError::MetadataMissing)?;
            if name.is_empty() || name == current {
                return Ok(RenameOutcome::Unchanged);
            }
        }

        let envelope = self
            .transport()
            .post_command("rename-project", &[], &[param("name", name)])
            .await?;
        if !envelope.is_ok() {
            return Err(CommandFailure::from_envelope("rename-project", &envelope).into());
        }

        let mut project = self.project().write().await;
        if let Some(metadata) = project.metadata.as_mut() {
            metadata.name = name.to_string();
        }
        info!(project = %project.id, title = %project.title(), "project renamed");
        Ok(RenameOutcome::Renamed(name.to_string()))
    }

    /// Rows matching the current filter, in `format`.
    pub async fn export_rows(&self, format: ExportFormat) -> Result<Vec<u8>, ActionError> {
        let basename = {
            let project = self.project().read().await;
            if format.requires_schema_alignment() && project.protograph.is_none() {
                return Err(ActionError::SchemaAlignmentMissing {
                    format: format.as_str(),
                });
            }
            project.export_basename()
        };

        let command = format!("export-rows/{basename}.{}", format.extension());
        let body = CommandBody::Multipart(vec![
            param("engine", self.widgets().facets.get_json()),
            param("format", format.as_str()),
        ]);
        let _activity = self.activity().begin();
        let bytes = self.transport().post_for_bytes(&command, body).await?;
        info!(command = %command, bytes = bytes.len(), "rows exported");
        Ok(bytes)
    }

    /// The whole project as a `.gridworks.tar.gz` archive.
    pub async fn export_project(&self) -> Result<Vec<u8>, ActionError> {
        let basename = self.project().read().await.export_basename();
        let command = format!("export-project/{basename}.gridworks.tar.gz");
        let _activity = self.activity().begin();
        let bytes = self
            .transport()
            .post_for_bytes(&command, CommandBody::Form(Vec::new()))
            .await?;
        info!(command = %command, bytes = bytes.len(), "project exported");
        Ok(bytes)
    }

    pub async fn denormalize(&self) -> Result<DispatchOutcome, ActionError> {
        let outcome = self
            .post_process(
                "denormalize",
                Vec::new(),
                Vec::new(),
                UpdateOptions::new(ChangeFlags::models()),
                Callbacks::new(),
            )
            .await?;
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
