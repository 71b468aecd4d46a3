use crate::{RayError, Result};

/// Client-wide request defaults.
///
/// Applied to every call that does not override them through its
/// [`RequestOptions`](crate::RequestOptions).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-attempt timeout in seconds. `0` disables the deadline.
    pub timeout_secs: u64,
    /// Total number of attempts per call, including the first one.
    pub retry_times: usize,
    /// Proxy used when a request does not name its own.
    pub proxy: Option<String>,
    /// Base retry backoff in milliseconds (exponential strategy). `0` retries immediately.
    pub retry_backoff_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 3,
            retry_times: 2,
            proxy: None,
            retry_backoff_ms: 0,
        }
    }
}

impl ClientOptions {
    /// Reads defaults from the environment, falling back to [`ClientOptions::default`].
    ///
    /// Reads:
    /// - `RAY_HTTP_TIMEOUT_SECS`
    /// - `RAY_HTTP_RETRY_TIMES` (values below 1 are clamped to 1)
    /// - `RAY_HTTP_PROXY`
    /// - `RAY_HTTP_RETRY_BACKOFF_MS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut opts = Self::default();

        if let Some(value) = lookup("RAY_HTTP_TIMEOUT_SECS") {
            opts.timeout_secs = parse_number("RAY_HTTP_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = lookup("RAY_HTTP_RETRY_TIMES") {
            let times: usize = parse_number("RAY_HTTP_RETRY_TIMES", &value)?;
            opts.retry_times = times.max(1);
        }
        if let Some(value) = lookup("RAY_HTTP_PROXY") {
            let value = value.trim();
            opts.proxy = (!value.is_empty()).then(|| value.to_owned());
        }
        if let Some(value) = lookup("RAY_HTTP_RETRY_BACKOFF_MS") {
            opts.retry_backoff_ms = parse_number("RAY_HTTP_RETRY_BACKOFF_MS", &value)?;
        }

        Ok(opts)
    }
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|err| {
        RayError::config(
            "ray.options.env",
            format!("{key} must be a non-negative integer, got '{value}': {err}"),
        )
    })
}
