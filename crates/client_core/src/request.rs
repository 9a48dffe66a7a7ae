use std::time::Duration;

use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use shared::{error::ErrorKind, protocol::ActionEnvelope};
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    StartExam,
    FinishExam,
    RunTest,
    RelayStatus,
    SetManualErrors,
    ResetRelays,
    AdminLogin,
    ClearDatabase,
    ConnectWifi,
    ShutdownSystem,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::StartExam => "/start_exam",
            Self::FinishExam => "/finish_exam",
            Self::RunTest => "/run_test",
            Self::RelayStatus => "/api/relay_status",
            Self::SetManualErrors => "/set_manual_errors",
            Self::ResetRelays => "/reset_relays",
            Self::AdminLogin => "/admin_login",
            Self::ClearDatabase => "/clear_database",
            Self::ConnectWifi => "/api/network/wifi/connect",
            Self::ShutdownSystem => "/shutdown_system",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Self::RelayStatus => Method::GET,
            _ => Method::POST,
        }
    }
}

/// One JSON round trip per call, translated into `Result<T, ErrorKind>`.
#[derive(Clone)]
pub struct ActionClient {
    http: Client,
    base_url: Url,
}

impl ActionClient {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ErrorKind> {
        let base_url = Url::parse(server_url)
            .map_err(|err| ErrorKind::Network(format!("invalid server url '{server_url}': {err}")))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ErrorKind::Network(format!("failed to build http client: {err}")))?;
        Ok(Self { http, base_url })
    }

    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    pub fn url_for(&self, path: &str) -> Result<Url, ErrorKind> {
        self.base_url
            .join(path)
            .map_err(|err| ErrorKind::Network(format!("invalid path '{path}': {err}")))
    }

    /// Issues `endpoint` without a body.
    pub async fn perform<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, ErrorKind> {
        self.execute(endpoint, None).await
    }

    /// Issues `endpoint` with `payload` serialized as the JSON body.
    pub async fn perform_json<T, P>(&self, endpoint: Endpoint, payload: &P) -> Result<T, ErrorKind>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let body = serde_json::to_value(payload)
            .map_err(|err| ErrorKind::Network(format!("failed to encode payload: {err}")))?;
        self.execute(endpoint, Some(body)).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        body: Option<Value>,
    ) -> Result<T, ErrorKind> {
        let url = self.url_for(endpoint.path())?;
        let mut request = self
            .http
            .request(endpoint.method(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(body) = &body {
            request = request.json(body);
        }

        debug!(endpoint = endpoint.path(), "issuing action request");
        let response = request.send().await.map_err(|err| {
            warn!(endpoint = endpoint.path(), error = %err, "action request did not complete");
            ErrorKind::Network(err.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(endpoint = endpoint.path(), status = status.as_u16(), "action request failed");
            return Err(ErrorKind::Transport {
                status: status.as_u16(),
            });
        }

        let value: Value = response.json().await.map_err(|err| {
            warn!(endpoint = endpoint.path(), error = %err, "action response was not json");
            ErrorKind::Network(err.to_string())
        })?;
        decode_response(endpoint, value)
    }
}

fn decode_response<T: DeserializeOwned>(endpoint: Endpoint, value: Value) -> Result<T, ErrorKind> {
    let envelope: ActionEnvelope = serde_json::from_value(value.clone()).map_err(|err| {
        warn!(endpoint = endpoint.path(), error = %err, "action response lacks a success flag");
        ErrorKind::Network(format!("malformed response: {err}"))
    })?;
    if !envelope.success {
        let reason = envelope.rejection_reason();
        debug!(endpoint = endpoint.path(), %reason, "action rejected by server");
        return Err(ErrorKind::Rejected(reason));
    }

    serde_json::from_value(value).map_err(|err| {
        warn!(endpoint = endpoint.path(), error = %err, "action response has unexpected shape");
        ErrorKind::Network(format!("malformed response: {err}"))
    })
}

#[cfg(test)]
#[path = "tests/request_tests.rs"]
mod tests;
