use shared::error::CommandFailure;
use thiserror::Error;

use crate::pipeline::PipelineStep;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("request to {command} failed: {source}")]
    Transport {
        command: String,
        source: reqwest::Error,
    },
    #[error("unexpected response from {command}: {source}")]
    Decode {
        command: String,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain step {index} failed to fetch: {source}")]
    Fetch {
        index: usize,
        source: ClientError,
    },
    #[error("chain step {index} ({label}) handler failed: {source}")]
    Handler {
        index: usize,
        label: String,
        source: anyhow::Error,
    },
}

#[derive(Debug, Error)]
#[error("update step {step:?} failed: {source}")]
pub struct UpdateError {
    pub step: PipelineStep,
    pub source: anyhow::Error,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Update(#[from] UpdateError),
    #[error("process monitor failed: {0}")]
    Process(anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("project metadata is not loaded")]
    MetadataMissing,
    #[error("no schema alignment exists yet, so there is nothing to export as {format}")]
    SchemaAlignmentMissing { format: &'static str },
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Command(#[from] CommandFailure),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}
