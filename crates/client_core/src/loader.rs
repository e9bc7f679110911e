use shared::{
    domain::ProjectId,
    protocol::{ColumnModel, ProjectMetadata},
};
use tokio::sync::RwLock;
use tracing::info;

use crate::{
    chain::Chain,
    context::ProjectContext,
    error::ChainError,
    transport::{decode, CommandTransport},
};

/// Fetches what the project screen needs before anything is drawn: metadata,
/// then the column model with every column expanded.
pub async fn load_project(
    transport: &dyn CommandTransport,
    project_id: ProjectId,
) -> Result<ProjectContext, ChainError> {
    let context = RwLock::new(ProjectContext::new(project_id));

    Chain::<ProjectContext>::new()
        .fetch("get-project-metadata", Vec::new(), |project, value| {
            let metadata: ProjectMetadata = decode("get-project-metadata", value)?;
            project.metadata = Some(metadata);
            Ok(())
        })
        .fetch("get-column-model", Vec::new(), |project, value| {
            let mut column_model: ColumnModel = decode("get-column-model", value)?;
            column_model.expand_all();
            project.column_model = Some(column_model);
            Ok(())
        })
        .then(|project| {
            info!(project = %project.id, title = %project.title(), "project loaded");
            Ok(())
        })
        .run(transport, &context)
        .await?;

    Ok(context.into_inner())
}
