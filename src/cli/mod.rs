pub(crate) mod instrumentation;

use std::time::Duration;

use crate::retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};

#[derive(Debug, clap::Parser)]
#[clap(version)]
pub(crate) struct RequestTokenCli {
    /// Repositories to request access to: `owner/repo` separated by commas or newlines, or a JSON array.
    #[clap(long, env = "PERMISSIONIZER_TARGET_REPOSITORY", default_value = "")]
    pub(crate) target_repository: String,

    /// Permissions to request: `name: access` / `name=access` separated by commas or newlines, or a JSON object.
    #[clap(long, env = "PERMISSIONIZER_PERMISSIONS", default_value = "")]
    pub(crate) permissions: String,

    /// Base URL of the permissionizer server. Defaults to `https://permissionizer.app`.
    #[clap(long, env = "PERMISSIONIZER_SERVER", value_parser = StringToNoneParser, default_value = "")]
    pub(crate) permissionizer_server: OptionString,

    #[clap(long, env = "PERMISSIONIZER_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub(crate) max_attempts: u32,

    #[clap(long, env = "PERMISSIONIZER_RETRY_DELAY_MS", default_value_t = 500)]
    pub(crate) retry_delay_ms: u64,

    #[clap(flatten)]
    pub instrumentation: instrumentation::Instrumentation,
}

#[derive(Clone, Debug)]
pub struct OptionString(pub Option<String>);

#[derive(Clone)]
struct StringToNoneParser;

impl clap::builder::TypedValueParser for StringToNoneParser {
    type Value = OptionString;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let inner = clap::builder::StringValueParser::new();
        let val = inner.parse_ref(cmd, arg, value)?;
        let val = val.trim();

        if val.is_empty() {
            Ok(OptionString(None))
        } else {
            Ok(OptionString(Some(val.to_string())))
        }
    }
}

impl RequestTokenCli {
    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.retry_delay_ms),
        )
    }
}
