//! Sequential fetches that each fold their reply into a shared context.

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    error::ChainError,
    transport::{CommandTransport, Params},
};

type FetchHandler<Ctx> = Box<dyn FnOnce(&mut Ctx, Value) -> anyhow::Result<()> + Send>;
type ThenCallback<Ctx> = Box<dyn FnOnce(&mut Ctx) -> anyhow::Result<()> + Send>;

enum ChainStep<Ctx> {
    Fetch {
        command: String,
        params: Params,
        handler: FetchHandler<Ctx>,
    },
    Then(ThenCallback<Ctx>),
}

/// Steps run strictly in order. A handler sees the context as left by every
/// earlier handler, and the next request is only sent once it has returned.
pub struct Chain<Ctx> {
    steps: Vec<ChainStep<Ctx>>,
}

impl<Ctx> Default for Chain<Ctx> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<Ctx: Send + Sync> Chain<Ctx> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch<F>(mut self, command: impl Into<String>, params: Params, handler: F) -> Self
    where
        F: FnOnce(&mut Ctx, Value) -> anyhow::Result<()> + Send + 'static,
    {
        self.steps.push(ChainStep::Fetch {
            command: command.into(),
            params,
            handler: Box::new(handler),
        });
        self
    }

    pub fn then<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&mut Ctx) -> anyhow::Result<()> + Send + 'static,
    {
        self.steps.push(ChainStep::Then(Box::new(callback)));
        self
    }

    /// Stops at the first failing fetch or handler; later steps never run.
    pub async fn run(
        self,
        transport: &dyn CommandTransport,
        context: &RwLock<Ctx>,
    ) -> Result<(), ChainError> {
        for (index, step) in self.steps.into_iter().enumerate() {
            match step {
                ChainStep::Fetch {
                    command,
                    params,
                    handler,
                } => {
                    debug!(index, command = %command, "chain fetch");
                    let value = transport
                        .get_json(&command, &params)
                        .await
                        .map_err(|source| ChainError::Fetch { index, source })?;
                    let mut guard = context.write().await;
                    handler(&mut guard, value).map_err(|source| ChainError::Handler {
                        index,
                        label: command,
                        source,
                    })?;
                }
                ChainStep::Then(callback) => {
                    let mut guard = context.write().await;
                    callback(&mut guard).map_err(|source| ChainError::Handler {
                        index,
                        label: "then".to_string(),
                        source,
                    })?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/chain_tests.rs"]
mod tests;
