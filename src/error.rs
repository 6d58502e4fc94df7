use crate::input::ParseError;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("Environment variable 'ACTIONS_ID_TOKEN_REQUEST_URL' is not set. Make sure that the action is running with 'id-token: write' permission.")]
    IdTokenUnavailable,
    #[error("'target-repository' must be set and contain at least one repository")]
    NoRepositories,
    #[error("'permissions' must be set and contain at least a single permission")]
    NoPermissions,
    #[error("Invalid permissionizer-server URL: {0}. Must start with 'http' or 'https'.")]
    InvalidServerUrl(String),
    #[error(transparent)]
    Input(#[from] ParseError),
}

impl Error {
    pub(crate) fn should_suggest_issue(&self) -> bool {
        match self {
            Self::IdTokenUnavailable
            | Self::NoRepositories
            | Self::NoPermissions
            | Self::InvalidServerUrl(_)
            | Self::Input(_) => false,
        }
    }

    /// Output a Github Actions annotation command if desired.
    // Note: These may only be one line! Any further lines will not be printed!
    pub(crate) fn maybe_github_actions_annotation(&self) {
        if crate::github_actions::is_github_actions() {
            let title = match self {
                Error::IdTokenUnavailable => "Missing id-token permission",
                Error::NoRepositories | Error::NoPermissions | Error::Input(_) => "Invalid input",
                Error::InvalidServerUrl(_) => "Invalid permissionizer-server",
            };
            println!("::error title={title}::{self}");
        }
    }
}
