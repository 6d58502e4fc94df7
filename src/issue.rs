use std::future::Future;

use color_eyre::eyre::WrapErr;

use crate::{
    github_actions,
    permissionizer_client::{PermissionizerClient, TokenResponse},
    request_context::RequestContext,
};

/// Exchanges an identity token from `get_id_token` for a scoped token.
///
/// `get_id_token` is given the audience and must return the caller's identity token.
/// Both the identity token and the issued token are masked before anything else
/// touches them.
#[tracing::instrument(
    skip_all,
    fields(
        server = %ctx.server,
        repositories = ctx.request.repositories.len(),
        permissions = ctx.request.permissions.len(),
    )
)]
pub(crate) async fn issue_token<F, Fut>(
    ctx: &RequestContext,
    get_id_token: F,
) -> color_eyre::Result<TokenResponse>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = color_eyre::Result<String>>,
{
    tracing::info!("Issuing ID Token from GitHub API");
    let id_token = get_id_token(ctx.audience())
        .await
        .wrap_err("Getting ID token from GitHub")?;
    github_actions::add_mask(&id_token);

    tracing::info!("Requesting a scoped token from {}", ctx.server);
    let client = PermissionizerClient::new(ctx.token_url.clone(), id_token)?
        .with_retry_policy(ctx.retry_policy);
    let response = client.request_token(&ctx.request).await?;

    github_actions::add_mask(&response.token);

    Ok(response)
}

/// Named outputs published for later steps. Structured values are compact JSON.
pub(crate) fn token_outputs(
    response: &TokenResponse,
) -> Result<Vec<(&'static str, String)>, serde_json::Error> {
    Ok(vec![
        ("token", response.token.clone()),
        ("issued-by", serde_json::to_string(&response.issued_by)?),
        ("expires-at", response.expires_at.clone()),
        ("repositories", serde_json::to_string(&response.repositories)?),
        ("permissions", serde_json::to_string(&response.permissions)?),
    ])
}

pub(crate) async fn set_token_outputs(response: &TokenResponse) -> color_eyre::Result<()> {
    let outputs = token_outputs(response).wrap_err("Serializing token outputs")?;

    for (output_name, value) in outputs {
        if let Err(e) = github_actions::set_output(output_name, &value).await {
            // Never log the value, it may be the token.
            tracing::warn!("Failed to set the `{}` output: {}", output_name, e);
        }
    }

    Ok(())
}
