//! HTTP access to the `/command/*` endpoints of a Gridworks server.

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::de::DeserializeOwned;
use serde_json::Value;
use shared::{domain::ProjectId, protocol::ResponseEnvelope};
use tracing::debug;
use url::Url;

use crate::error::ClientError;

pub type Params = Vec<(String, String)>;

pub fn param(key: impl Into<String>, value: impl ToString) -> (String, String) {
    (key.into(), value.to_string())
}

/// Request body of a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandBody {
    Form(Params),
    Multipart(Params),
}

impl CommandBody {
    pub fn fields(&self) -> &[(String, String)] {
        match self {
            CommandBody::Form(fields) | CommandBody::Multipart(fields) => fields,
        }
    }
}

/// Every request is scoped to one project. JSON calls carry `project=<id>` in
/// the query; `post_for_bytes` sends it as a form or multipart field instead.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    fn project_id(&self) -> ProjectId;

    async fn get_json(&self, command: &str, params: &[(String, String)])
        -> Result<Value, ClientError>;

    async fn post_command(
        &self,
        command: &str,
        params: &[(String, String)],
        body: &[(String, String)],
    ) -> Result<ResponseEnvelope, ClientError>;

    /// Posts a read command whose reply is a bare JSON object without a `code`.
    async fn post_json(
        &self,
        command: &str,
        params: &[(String, String)],
        body: &[(String, String)],
    ) -> Result<Value, ClientError>;

    /// Posts a command whose reply is a file rather than a JSON envelope.
    async fn post_for_bytes(&self, command: &str, body: CommandBody)
        -> Result<Vec<u8>, ClientError>;
}

pub fn decode<T: DeserializeOwned>(command: &str, value: Value) -> Result<T, ClientError> {
    serde_json::from_value(value).map_err(|source| ClientError::Decode {
        command: command.to_string(),
        source,
    })
}

#[derive(Clone)]
pub struct ProjectClient {
    http: Client,
    command_root: Url,
    project_id: ProjectId,
}

impl ProjectClient {
    pub fn new(server_url: &str, project_id: ProjectId) -> Result<Self, ClientError> {
        Self::with_http(Client::new(), server_url, project_id)
    }

    pub fn with_http(
        http: Client,
        server_url: &str,
        project_id: ProjectId,
    ) -> Result<Self, ClientError> {
        let root = format!("{}/command/", server_url.trim_end_matches('/'));
        let command_root = Url::parse(&root).map_err(|source| ClientError::InvalidUrl {
            url: server_url.to_string(),
            source,
        })?;
        Ok(Self {
            http,
            command_root,
            project_id,
        })
    }

    pub fn command_url(&self, command: &str) -> Result<Url, ClientError> {
        self.command_root
            .join(command.trim_start_matches('/'))
            .map_err(|source| ClientError::InvalidUrl {
                url: format!("{}{command}", self.command_root),
                source,
            })
    }

    fn query(&self, params: &[(String, String)]) -> Params {
        let mut query = Vec::with_capacity(params.len() + 1);
        query.push(param("project", self.project_id));
        query.extend(params.iter().filter(|(key, _)| key != "project").cloned());
        query
    }

    fn transport_error(command: &str) -> impl FnOnce(reqwest::Error) -> ClientError + '_ {
        move |source| ClientError::Transport {
            command: command.to_string(),
            source,
        }
    }
}

#[async_trait]
impl CommandTransport for ProjectClient {
    fn project_id(&self) -> ProjectId {
        self.project_id
    }

    async fn get_json(
        &self,
        command: &str,
        params: &[(String, String)],
    ) -> Result<Value, ClientError> {
        debug!(command, project = %self.project_id, "GET command");
        self.http
            .get(self.command_url(command)?)
            .query(&self.query(params))
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(Self::transport_error(command))?
            .json::<Value>()
            .await
            .map_err(Self::transport_error(command))
    }

    async fn post_command(
        &self,
        command: &str,
        params: &[(String, String)],
        body: &[(String, String)],
    ) -> Result<ResponseEnvelope, ClientError> {
        let value = self.post_json(command, params, body).await?;
        decode(command, value)
    }

    async fn post_json(
        &self,
        command: &str,
        params: &[(String, String)],
        body: &[(String, String)],
    ) -> Result<Value, ClientError> {
        debug!(command, project = %self.project_id, "POST command");
        self.http
            .post(self.command_url(command)?)
            .query(&self.query(params))
            .form(body)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(Self::transport_error(command))?
            .json::<Value>()
            .await
            .map_err(Self::transport_error(command))
    }

    async fn post_for_bytes(
        &self,
        command: &str,
        body: CommandBody,
    ) -> Result<Vec<u8>, ClientError> {
        debug!(command, project = %self.project_id, "POST export");
        let request = self.http.post(self.command_url(command)?);
        let request = match body {
            CommandBody::Form(fields) => request.form(&self.query(&fields)),
            CommandBody::Multipart(fields) => {
                let form = self
                    .query(&fields)
                    .into_iter()
                    .fold(multipart::Form::new(), |form, (key, value)| {
                        form.text(key, value)
                    });
                request.multipart(form)
            }
        };
        let bytes = request
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(Self::transport_error(command))?
            .bytes()
            .await
            .map_err(Self::transport_error(command))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
