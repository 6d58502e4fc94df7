use color_eyre::eyre::{eyre, WrapErr};

use crate::build_http_client;

/// Fetches a GitHub Actions OIDC token for `audience` from the runner.
#[tracing::instrument(skip_all, fields(audience = %audience))]
pub(crate) async fn get_actions_id_bearer_token(audience: String) -> color_eyre::Result<String> {
    let actions_id_token_request_url = std::env::var("ACTIONS_ID_TOKEN_REQUEST_URL").wrap_err(
        "`ACTIONS_ID_TOKEN_REQUEST_URL` is required, add `id-token: write` to the job's `permissions`",
    )?;
    let actions_id_token_request_token = std::env::var("ACTIONS_ID_TOKEN_REQUEST_TOKEN")
        // We do want to preserve the whitespace here
        .wrap_err("\
No `ACTIONS_ID_TOKEN_REQUEST_TOKEN` found, a GitHub OIDC token is required to request a scoped token. To provide this, add `permissions` to your job, eg:

# ...
jobs:
    example:
    runs-on: ubuntu-latest
    permissions:
        id-token: write # Authenticate against the permissionizer server
    steps:
    - uses: permissionizer/request-token@v1
    # ...\n\
        ")?;

    fetch_id_token(
        &actions_id_token_request_url,
        &actions_id_token_request_token,
        &audience,
    )
    .await
}

async fn fetch_id_token(
    request_url: &str,
    request_token: &str,
    audience: &str,
) -> color_eyre::Result<String> {
    let mut request_url = url::Url::parse(request_url)
        .wrap_err("Parsing `ACTIONS_ID_TOKEN_REQUEST_URL`")?;
    request_url
        .query_pairs_mut()
        .append_pair("audience", audience);

    let actions_id_token_client = build_http_client().build()?;
    let response = actions_id_token_client
        .get(request_url)
        .bearer_auth(request_token)
        .send()
        .await
        .wrap_err("Getting Actions ID bearer token")?
        .error_for_status()
        .wrap_err("Getting Actions ID bearer token")?;

    let response_json: serde_json::Value = response
        .json()
        .await
        .wrap_err("Getting JSON from Actions ID bearer token response")?;

    let response_bearer_token = response_json
        .get("value")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| eyre!("Getting value from Actions ID bearer token response"))?;

    Ok(response_bearer_token.to_string())
}
