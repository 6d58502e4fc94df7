use std::{io::IsTerminal, process::ExitCode, time::Duration};

use clap::Parser;
use color_eyre::eyre::Result;
use error::Error;

use crate::request_context::RequestContext;

mod cli;
mod error;
mod github;
mod github_actions;
mod input;
mod issue;
mod permissionizer_client;
mod request_context;
mod retry;

pub(crate) fn build_http_client() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .user_agent("permissionizer/request-token")
        .timeout(Duration::from_secs(30))
        .redirect(reqwest::redirect::Policy::limited(3))
}

#[tokio::main]
async fn main() -> Result<std::process::ExitCode> {
    color_eyre::config::HookBuilder::default()
        .issue_url(concat!(env!("CARGO_PKG_REPOSITORY"), "/issues/new"))
        .add_issue_metadata("version", env!("CARGO_PKG_VERSION"))
        .add_issue_metadata("os", std::env::consts::OS)
        .add_issue_metadata("arch", std::env::consts::ARCH)
        .theme(if !std::io::stderr().is_terminal() {
            color_eyre::config::Theme::new()
        } else {
            color_eyre::config::Theme::dark()
        })
        .issue_filter(|kind| match kind {
            color_eyre::ErrorKind::NonRecoverable(_) => true,
            color_eyre::ErrorKind::Recoverable(error) => {
                if let Some(known_error) = error.downcast_ref::<Error>() {
                    known_error.should_suggest_issue()
                } else {
                    true
                }
            }
        })
        .install()?;

    match execute().await {
        Ok(exit) => Ok(exit),
        Err(error) => {
            if let Some(known_error) = error.downcast_ref::<Error>() {
                known_error.maybe_github_actions_annotation()
            } else {
                github_actions::error(&error.to_string());
            }
            Err(error)
        }
    }
}

async fn execute() -> Result<std::process::ExitCode> {
    let cli = cli::RequestTokenCli::parse();
    cli.instrumentation.setup()?;

    let ctx = RequestContext::from_cli_and_env(&cli)?;

    let response = issue::issue_token(&ctx, github::get_actions_id_bearer_token).await?;

    issue::set_token_outputs(&response).await?;

    tracing::info!(
        "Token was successfully requested and was set as an output 'token'. Expires at: {}",
        response.expires_at
    );

    Ok(ExitCode::SUCCESS)
}
