//! HTTP transport to the conversion service.
//!
//! [`ConvertApi`] is the full remote surface; [`Transport`] is the reqwest
//! implementation.  Every outbound request flows through one decoration
//! chokepoint that attaches the caller identity header, so correlation is a
//! cross-cutting guarantee rather than per-call discipline.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart;

use crate::config::Config;
use crate::error::ClientError;
use crate::history::HistoryItem;
use crate::identity::IdentityProvider;
use crate::task::types::{Engine, StatusResponse, SubmitResponse};

/// Header carrying the caller identity on every outbound request.
pub const SESSION_HEADER: &str = "X-Session-ID";

/// The remote conversion API surface.
///
/// [`Transport`] is the production implementation; tests substitute scripted
/// in-process mocks to drive the task lifecycle without a network.
#[async_trait]
pub trait ConvertApi: Send + Sync + 'static {
    /// Upload a document and start a conversion.
    async fn submit(
        &self,
        file_name: &str,
        payload: Bytes,
        engine: Engine,
    ) -> Result<SubmitResponse, ClientError>;

    /// Fetch the current status of a task.
    async fn status(&self, task_id: &str) -> Result<StatusResponse, ClientError>;

    /// Fetch the caller's completed conversions, ordered as the service
    /// returns them (newest first).
    async fn history(&self) -> Result<Vec<HistoryItem>, ClientError>;

    /// Delete every artifact scoped to the caller identity.
    async fn clear_session(&self) -> Result<(), ClientError>;

    /// Download the finished audio for a task.
    async fn download(&self, task_id: &str) -> Result<Bytes, ClientError>;

    /// Resolve the playable URL for a finished task.  No network I/O.
    fn download_url(&self, task_id: &str) -> String;
}

/// reqwest-backed [`ConvertApi`] implementation.
pub struct Transport {
    client: reqwest::Client,
    base_url: String,
    identity: IdentityProvider,
}

impl Transport {
    /// Build a transport against `config.base_url`.
    ///
    /// The identity provider is injected here and composed into every
    /// request; call sites never attach the header themselves.
    pub fn new(config: &Config, identity: IdentityProvider) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("aurora-client/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            identity,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Attach the caller identity to an outbound request.
    fn decorate(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let id = self.identity.identity()?;
        Ok(req.header(SESSION_HEADER, id))
    }

    /// Dispatch a request and surface non-2xx responses as typed failures.
    /// Never retries.
    async fn send(&self, req: reqwest::RequestBuilder) -> Result<reqwest::Response, ClientError> {
        let resp = self.decorate(req)?.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.json::<serde_json::Value>().await.ok();
        Err(ClientError::Request {
            http_status: Some(status.as_u16()),
            server_message: server_message(status, body.as_ref()),
        })
    }
}

/// Extract the service's `{ "error": … }` message, falling back to the HTTP
/// reason phrase.
fn server_message(status: reqwest::StatusCode, body: Option<&serde_json::Value>) -> String {
    body.and_then(|b| b.get("error"))
        .and_then(|e| e.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_owned()
        })
}

#[async_trait]
impl ConvertApi for Transport {
    async fn submit(
        &self,
        file_name: &str,
        payload: Bytes,
        engine: Engine,
    ) -> Result<SubmitResponse, ClientError> {
        let part = multipart::Part::bytes(payload.to_vec()).file_name(file_name.to_owned());
        let form = multipart::Form::new()
            .part("file", part)
            .text("engine", engine.to_string());

        let resp = self
            .send(self.client.post(self.url("upload")).multipart(form))
            .await?;
        Ok(resp.json::<SubmitResponse>().await?)
    }

    async fn status(&self, task_id: &str) -> Result<StatusResponse, ClientError> {
        let resp = self
            .send(self.client.get(self.url(&format!("status/{task_id}"))))
            .await?;
        Ok(resp.json::<StatusResponse>().await?)
    }

    async fn history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        let resp = self.send(self.client.get(self.url("history"))).await?;
        Ok(resp.json::<Vec<HistoryItem>>().await?)
    }

    async fn clear_session(&self) -> Result<(), ClientError> {
        self.send(self.client.post(self.url("cleanup-session")))
            .await?;
        Ok(())
    }

    async fn download(&self, task_id: &str) -> Result<Bytes, ClientError> {
        let resp = self
            .send(self.client.get(self.url(&format!("download/{task_id}"))))
            .await?;
        Ok(resp.bytes().await?)
    }

    fn download_url(&self, task_id: &str) -> String {
        self.url(&format!("download/{task_id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Transport {
        Transport::new(
            &Config::with_base_url("http://localhost:5000/"),
            IdentityProvider::in_memory(),
        )
        .expect("client build")
    }

    #[test]
    fn url_joins_without_doubled_slashes() {
        let t = transport();
        assert_eq!(t.url("history"), "http://localhost:5000/history");
        assert_eq!(t.download_url("abc"), "http://localhost:5000/download/abc");
    }

    #[test]
    fn every_request_carries_the_same_identity_header() {
        let t = transport();
        let first = t
            .decorate(t.client.get(t.url("history")))
            .unwrap()
            .build()
            .unwrap();
        let second = t
            .decorate(t.client.post(t.url("cleanup-session")))
            .unwrap()
            .build()
            .unwrap();

        let a = first.headers().get(SESSION_HEADER).expect("header");
        let b = second.headers().get(SESSION_HEADER).expect("header");
        assert_eq!(a, b, "identity must be stable across requests");
        assert!(!a.to_str().unwrap().is_empty());
    }

    #[test]
    fn server_message_prefers_error_body() {
        let body = serde_json::json!({ "error": "Invalid file type. Only PDF allowed." });
        assert_eq!(
            server_message(reqwest::StatusCode::BAD_REQUEST, Some(&body)),
            "Invalid file type. Only PDF allowed."
        );
    }

    #[test]
    fn server_message_falls_back_to_reason_phrase() {
        assert_eq!(
            server_message(reqwest::StatusCode::INTERNAL_SERVER_ERROR, None),
            "Internal Server Error"
        );
        let non_object = serde_json::json!("oops");
        assert_eq!(
            server_message(reqwest::StatusCode::NOT_FOUND, Some(&non_object)),
            "Not Found"
        );
    }
}
