use crate::{
    cli::RequestTokenCli,
    error::Error,
    input::{parse_permission_map, parse_repository_list},
    permissionizer_client::TokenRequest,
    retry::RetryPolicy,
};

pub(crate) const PERMISSIONIZER_SERVER: &str = "https://permissionizer.app";

/// Everything needed to request a token, validated before any network call.
#[derive(Debug)]
pub(crate) struct RequestContext {
    /// The server as given by the user, used for the ID token audience.
    pub(crate) server: String,
    /// `{server}/v1/token`, keeping any path prefix of the server URL.
    pub(crate) token_url: url::Url,
    pub(crate) request: TokenRequest,
    pub(crate) retry_policy: RetryPolicy,
}

impl RequestContext {
    pub(crate) fn from_cli_and_env(cli: &RequestTokenCli) -> Result<Self, Error> {
        let id_token_available = std::env::var("ACTIONS_ID_TOKEN_REQUEST_URL")
            .map(|url| !url.is_empty())
            .unwrap_or(false);

        Self::from_cli(cli, id_token_available)
    }

    #[tracing::instrument(skip_all)]
    pub(crate) fn from_cli(cli: &RequestTokenCli, id_token_available: bool) -> Result<Self, Error> {
        if !id_token_available {
            return Err(Error::IdTokenUnavailable);
        }

        let repositories = parse_repository_list(cli.target_repository.trim())?;
        if repositories.is_empty() {
            return Err(Error::NoRepositories);
        }
        for repository in &repositories {
            tracing::debug!(
                owner = repository.owner(),
                repo = repository.name(),
                "Requesting access to repository"
            );
        }

        let permissions = parse_permission_map(cli.permissions.trim())?;
        if permissions.is_empty() {
            return Err(Error::NoPermissions);
        }
        for (permission, access) in permissions.iter() {
            tracing::debug!(permission, %access, "Requesting permission");
        }

        let server = cli
            .permissionizer_server
            .0
            .clone()
            .unwrap_or_else(|| PERMISSIONIZER_SERVER.to_string());
        if !server.starts_with("http") {
            return Err(Error::InvalidServerUrl(server));
        }
        let token_url =
            token_url(&server).ok_or_else(|| Error::InvalidServerUrl(server.clone()))?;

        Ok(Self {
            server,
            token_url,
            request: TokenRequest {
                repositories,
                permissions,
            },
            retry_policy: cli.retry_policy(),
        })
    }

    /// Audience of the identity token presented to the server.
    pub(crate) fn audience(&self) -> String {
        format!("permissionizer-server ({})", self.server)
    }
}

/// `None` when `server` is not an absolute URL that can carry a path.
fn token_url(server: &str) -> Option<url::Url> {
    let mut url = url::Url::parse(server).ok()?;
    url.path_segments_mut()
        .ok()?
        .pop_if_empty()
        .extend(["v1", "token"]);
    Some(url)
}
