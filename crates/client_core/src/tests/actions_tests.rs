use super::*;
use crate::test_support::{entries, named_project, HarnessBuilder};
use serde_json::json;
use shared::protocol::ResponseEnvelope;

#[tokio::test]
async fn rename_updates_name_and_title_on_ok() {
    let harness = HarnessBuilder::new()
        .transport(|t| t.with_post("rename-project", ResponseEnvelope::ok()))
        .build();

    let outcome = harness
        .session
        .rename_project("  Migratory Birds ")
        .await
        .expect("rename");

    assert_eq!(outcome, RenameOutcome::Renamed("Migratory Birds".to_string()));
    let project = harness.session.project().read().await;
    assert_eq!(project.title(), "Migratory Birds - Gridworks");
    let posts = harness.transport.recorded_posts.lock().expect("posts");
    assert_eq!(posts[0].body, vec![param("name", "Migratory Birds")]);
}

#[tokio::test]
async fn rename_skips_blank_and_unchanged_names() {
    let harness = HarnessBuilder::new().build();

    assert_eq!(
        harness.session.rename_project("   ").await.expect("blank"),
        RenameOutcome::Unchanged
    );
    assert_eq!(
        harness.session.rename_project("Birds").await.expect("same"),
        RenameOutcome::Unchanged
    );
    assert!(entries(&harness.journal).is_empty());
}

#[tokio::test]
async fn rename_failure_keeps_old_name() {
    let harness = HarnessBuilder::new()
        .transport(|t| t.with_post("rename-project", ResponseEnvelope::error("name taken")))
        .build();

    let err = harness
        .session
        .rename_project("Other")
        .await
        .expect_err("server refuses");

    match err {
        ActionError::Command(failure) => assert_eq!(failure.message, "name taken"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(harness.session.project().read().await.name(), Some("Birds"));
}

#[tokio::test]
async fn export_rows_posts_engine_and_format_to_named_file() {
    let harness = HarnessBuilder::new()
        .project(named_project("Bird Counts (2024)"))
        .transport(|t| t.with_download("export-rows/Bird-Counts-2024.csv", b"species,count\n"))
        .build();

    let bytes = harness
        .session
        .export_rows(ExportFormat::Csv)
        .await
        .expect("export");

    assert_eq!(bytes, b"species,count\n".to_vec());
    let downloads = harness.transport.recorded_downloads.lock().expect("downloads");
    let (command, body) = &downloads[0];
    assert_eq!(command, "export-rows/Bird-Counts-2024.csv");
    assert!(matches!(body, CommandBody::Multipart(_)));
    assert!(body.fields().contains(&param("format", "csv")));
    assert!(body.fields().iter().any(|(key, _)| key == "engine"));
    assert!(!harness.session.activity().is_active());
}

#[tokio::test]
async fn triple_exports_require_schema_alignment() {
    let harness = HarnessBuilder::new().build();

    let err = harness
        .session
        .export_rows(ExportFormat::Tripleloader)
        .await
        .expect_err("no protograph");
    assert!(matches!(err, ActionError::SchemaAlignmentMissing { .. }));
    assert!(entries(&harness.journal).is_empty());

    harness.session.project().write().await.protograph = Some(json!({ "rootNodes": [] }));
    let harness_transport = harness.transport.clone();
    let err = harness
        .session
        .export_rows(ExportFormat::Mqlwrite)
        .await
        .expect_err("no download fixture");
    assert!(matches!(err, ActionError::Client(_)));
    let downloads = harness_transport.recorded_downloads.lock().expect("downloads");
    assert_eq!(downloads[0].0, "export-rows/Birds.txt");
}

#[tokio::test]
async fn export_project_uses_archive_name() {
    let harness = HarnessBuilder::new()
        .transport(|t| t.with_download("export-project/Birds.gridworks.tar.gz", b"\x1f\x8b"))
        .build();

    let bytes = harness.session.export_project().await.expect("export");

    assert_eq!(bytes, vec![0x1f, 0x8b]);
}

#[tokio::test]
async fn denormalize_reloads_models() {
    let harness = HarnessBuilder::new()
        .transport(|t| t.with_post("denormalize", ResponseEnvelope::ok()))
        .build();

    let outcome = harness.session.denormalize().await.expect("denormalize");

    assert_eq!(
        outcome,
        DispatchOutcome::Applied {
            history_entry: None
        }
    );
    assert!(entries(&harness.journal).contains(&"GET get-models".to_string()));
}
