use http::StatusCode;
use indexmap::IndexMap;
use reqwest::header::{HeaderMap, HeaderValue};

use crate::{
    build_http_client,
    input::{PermissionMap, RepositoryList},
    retry::{with_retry, RetryPolicy},
};

pub(crate) struct PermissionizerClient {
    token_url: url::Url,
    bearer_token: String,
    client: reqwest::Client,
    retry_policy: RetryPolicy,
}

#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct TokenRequest {
    #[serde(rename = "target_repositories")]
    pub(crate) repositories: RepositoryList,
    pub(crate) permissions: PermissionMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum GrantedAccess {
    Read,
    Write,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub(crate) struct IssuedBy {
    pub(crate) repository: String,
    #[serde(rename = "ref")]
    pub(crate) git_ref: String,
    pub(crate) workflow_ref: String,
    pub(crate) run_id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) token: String,
    pub(crate) expires_at: String,
    pub(crate) permissions: IndexMap<String, GrantedAccess>,
    pub(crate) repositories: Vec<String>,
    pub(crate) issued_by: IssuedBy,
}

/// Problem-details style error body returned by the permissionizer server.
///
/// Only used to log the well-formed case; the user-facing message is built from
/// the raw JSON by [`describe_error_response`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub(crate) struct ServiceError {
    #[serde(rename = "type")]
    pub(crate) kind: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) status: Option<u16>,
    pub(crate) instance: Option<String>,
    pub(crate) properties: Option<ServiceErrorProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
pub(crate) struct ServiceErrorProperties {
    pub(crate) request_id: Option<String>,
}

impl ServiceError {
    pub(crate) fn request_id(&self) -> Option<&str> {
        self.properties.as_ref()?.request_id.as_deref()
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ClientError {
    #[error("Error fetching token: {0}")]
    Transport(#[source] reqwest::Error),
    /// A `>= 400` response, already rendered by [`describe_error_response`].
    #[error("{0}")]
    Status(String),
    #[error("Decoding token response (status {status}): {source}")]
    Decode {
        status: StatusCode,
        #[source]
        source: serde_json::Error,
    },
    #[error("Building HTTP client: {0}")]
    Build(#[source] reqwest::Error),
}

fn permissionizer_headers() -> HeaderMap {
    let mut header_map = HeaderMap::new();

    header_map.insert(
        reqwest::header::ACCEPT,
        HeaderValue::from_static("application/json"),
    );
    header_map
}

/// Renders an error response as a single diagnostic line, preferring the server's
/// structured `detail` and falling back to the raw body.
pub(crate) fn describe_error_response(status: StatusCode, body: &[u8]) -> String {
    let status = status.as_u16();
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();

    let json = serde_json::from_str::<serde_json::Value>(trimmed).ok();
    if trimmed.is_empty() || matches!(json, Some(serde_json::Value::Null)) {
        return format!("Status: {status}, Body: [no error body]");
    }

    if let Some(json) = json.filter(|json| json.get("detail").is_some()) {
        if let Ok(error) = serde_json::from_value::<ServiceError>(json.clone()) {
            tracing::debug!(
                kind = ?error.kind,
                title = ?error.title,
                status = ?error.status,
                instance = ?error.instance,
                request_id = ?error.request_id(),
                "Permissionizer server returned a structured error"
            );
        }

        let detail = match &json["detail"] {
            serde_json::Value::String(detail) => detail.clone(),
            other => other.to_string(),
        };
        let request_id = match json.pointer("/properties/request_id") {
            Some(serde_json::Value::String(id)) => id.clone(),
            Some(serde_json::Value::Number(id)) => id.to_string(),
            _ => "unknown".to_string(),
        };
        return format!("Status: {status}, Error: {detail}. Request ID: {request_id}");
    }

    format!("Status: {status}, Body: {trimmed}")
}

impl PermissionizerClient {
    /// `token_url` is the full `.../v1/token` endpoint, already validated.
    pub(crate) fn new(token_url: url::Url, bearer_token: String) -> Result<Self, ClientError> {
        let client = build_http_client()
            .default_headers(permissionizer_headers())
            .build()
            .map_err(ClientError::Build)?;

        Ok(Self {
            token_url,
            bearer_token,
            client,
            retry_policy: RetryPolicy::default(),
        })
    }

    pub(crate) fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[tracing::instrument(
        skip_all,
        fields(
            url = %self.token_url,
            repositories = request.repositories.len(),
            permissions = request.permissions.len(),
        )
    )]
    pub(crate) async fn request_token(
        &self,
        request: &TokenRequest,
    ) -> Result<TokenResponse, ClientError> {
        with_retry(self.retry_policy, || self.post_token_request(request)).await
    }

    async fn post_token_request(&self, request: &TokenRequest) -> Result<TokenResponse, ClientError> {
        let response = self
            .client
            .post(self.token_url.clone())
            .bearer_auth(&self.bearer_token)
            .json(request)
            .send()
            .await
            .map_err(ClientError::Transport)?;

        let status = response.status();
        tracing::trace!(
            status = tracing::field::display(status),
            "Got token POST response"
        );

        let body = response.bytes().await.map_err(ClientError::Transport)?;

        if status.as_u16() >= 400 {
            return Err(ClientError::Status(describe_error_response(status, &body)));
        }

        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { status, source })
    }
}
