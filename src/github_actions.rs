use tokio::io::AsyncWriteExt;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("The `GITHUB_OUTPUT` environment variable is unset.")]
    GithubOutputUnset,

    #[error("Failure opening {0:?}: {1}")]
    OpenFile(std::ffi::OsString, std::io::Error),

    #[error("Writing to {0:?}: {1}")]
    WriteFile(std::ffi::OsString, std::io::Error),
}

pub(crate) fn is_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok()
}

pub(crate) async fn set_output<'a>(name: &'a str, value: &'a str) -> Result<(), Error> {
    let output_path = std::env::var_os("GITHUB_OUTPUT").ok_or(Error::GithubOutputUnset)?;
    let mut fh = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&output_path)
        .await
        .map_err(|e| Error::OpenFile(output_path.clone(), e))?;

    fh.write_all(format_output(name, value).as_bytes())
        .await
        .map_err(|e| Error::WriteFile(output_path, e))?;

    Ok(())
}

// Multi-line values need the heredoc form, a plain `name=value` line would be cut short.
fn format_output(name: &str, value: &str) -> String {
    if value.contains('\n') {
        let mut delimiter = String::from("ghadelimiter");
        while value.contains(&delimiter) {
            delimiter.push('_');
        }
        format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
    } else {
        format!("{name}={value}\n")
    }
}

/// Registers `secret` with the runner so it is redacted from all later log output.
pub(crate) fn add_mask(secret: &str) {
    if !secret.is_empty() {
        println!("::add-mask::{}", escape_data(secret));
    }
}

/// Emits a `::warning::` annotation when running inside GitHub Actions.
pub(crate) fn warning(message: &str) {
    if is_github_actions() {
        println!("::warning::{}", escape_data(message));
    }
}

/// Emits an `::error::` annotation when running inside GitHub Actions.
pub(crate) fn error(message: &str) {
    if is_github_actions() {
        println!("::error::{}", escape_data(message));
    }
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
