use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{
    header::{HeaderName, HeaderValue, CONTENT_TYPE},
    Method, StatusCode,
};
use tokio::time::sleep;

use crate::{
    encode::{decode_json, resolve_query},
    logger::{std_logger, LoggerHandle},
    ClientOptions, HandlerError, OptionHandle, RayError, RequestOptions, Result,
};

#[derive(Clone)]
/// HTTP request client holding the defaults every call starts from.
///
/// Defaults change only through `&mut self` setters, so they apply to
/// subsequent calls and never to one already in flight.
pub struct Client {
    http: reqwest::Client,
    options: ClientOptions,
    logger: Option<LoggerHandle>,
}

// Verify Client is Send + Sync at compile time
const _: fn() = || {
    const fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Client>();
};

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("options", &self.options)
            .field("logger", &self.logger.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client with default options and [`std_logger`] installed.
    pub fn new() -> Self {
        let logger: LoggerHandle = Arc::new(std_logger);
        Self {
            http: reqwest::Client::new(),
            options: ClientOptions::default(),
            logger: Some(logger),
        }
    }

    /// Creates a client whose defaults are read from `RAY_HTTP_*` variables.
    ///
    /// See [`ClientOptions::from_env`].
    pub fn from_env() -> Result<Self> {
        Ok(Self::new().with_options(ClientOptions::from_env()?))
    }

    /// Replaces all client defaults.
    ///
    /// An attempt budget below 1 is clamped to 1.
    pub fn with_options(mut self, mut opts: ClientOptions) -> Self {
        opts.retry_times = opts.retry_times.max(1);
        self.options = opts;
        self
    }

    /// Current client defaults.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sets the default timeout (seconds) and total attempt budget.
    ///
    /// `retry_times` below 1 is clamped to 1.
    pub fn set_default_retry_times_and_timeout(&mut self, timeout_secs: u64, retry_times: usize) {
        self.options.timeout_secs = timeout_secs;
        self.options.retry_times = retry_times.max(1);
    }

    /// Sets the proxy used by requests that do not name their own.
    ///
    /// An empty string disables the default proxy.
    pub fn set_default_proxy(&mut self, proxy: impl Into<String>) {
        let proxy = proxy.into();
        self.options.proxy = (!proxy.is_empty()).then_some(proxy);
    }

    /// Replaces the default logger; `None` disables logging.
    pub fn set_global_logger(&mut self, logger: Option<LoggerHandle>) {
        self.logger = logger;
    }

    /// Builds request options from this client's defaults and `handles`.
    ///
    /// Defaults are applied first; handles then run in order.
    pub fn new_options<I>(&self, handles: I) -> RequestOptions
    where
        I: IntoIterator<Item = OptionHandle>,
    {
        RequestOptions::new(self.options.timeout_secs, self.options.retry_times).apply(handles)
    }

    /// Performs attempts until one succeeds or the budget is spent.
    ///
    /// Budget `n` means at most `n` requests; at least one is always made.
    /// Configuration errors end the sequence at once. The body is rewound
    /// before every attempt after the first, and a failed rewind ends the
    /// sequence with [`RayError::Body`].
    pub async fn do_retry(&self, opts: &mut RequestOptions) -> Result<Vec<u8>> {
        let budget = opts.retry_times.max(1);
        let mut attempt = 1usize;
        loop {
            let err = match self.attempt(opts).await {
                Ok(body) => return Ok(body),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= budget {
                return Err(err);
            }

            self.wait_before_retry(attempt - 1).await;
            opts.rewind_body().map_err(|source| RayError::Body {
                context: "ray.request.doretry.body.seek",
                source,
            })?;
            attempt += 1;
        }
    }

    /// Runs [`Client::do_retry`] and decodes the response as JSON.
    pub async fn do_json<T>(&self, opts: &mut RequestOptions) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        let body = self
            .do_retry(opts)
            .await
            .map_err(|err| err.with_context("ray.request.dojson"))?;
        decode_json("ray.request.dojson.unmarshal", &body)
    }

    /// Performs exactly one request.
    ///
    /// The response body is fully buffered. Any status other than 200 is a
    /// [`RayError::Http`]. On success the request logger, else the client
    /// logger, is called; its result is ignored.
    pub async fn attempt(&self, opts: &mut RequestOptions) -> Result<Vec<u8>> {
        let request = self.build_request(opts, "ray.request.do")?;

        let response = request.send().await.map_err(|source| RayError::Transport {
            context: "ray.request.do.request",
            source,
        })?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| RayError::Transport {
                context: "ray.request.do.resp.body.readall",
                source,
            })?;

        if status != StatusCode::OK {
            return Err(RayError::Http {
                context: "ray.request.do.resp.code",
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        self.log(opts);
        Ok(body.to_vec())
    }

    /// Performs one request and hands the response body to `handler` chunk by chunk.
    ///
    /// No retry is made and no logger is called. A handler failure ends the
    /// stream with [`RayError::Handler`].
    pub async fn do_stream<F>(&self, opts: &mut RequestOptions, mut handler: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> std::result::Result<(), HandlerError>,
    {
        let request = self.build_request(opts, "ray.request.dostream")?;

        let mut response = request.send().await.map_err(|source| RayError::Transport {
            context: "ray.request.dostream.request",
            source,
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.map_err(|source| RayError::Transport {
                context: "ray.request.dostream.resp.body",
                source,
            })?;
            return Err(RayError::Http {
                context: "ray.request.dostream.resp.code",
                status: status.as_u16(),
                body,
            });
        }

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|source| RayError::Transport {
                context: "ray.request.dostream.resp.body",
                source,
            })?
        {
            handler(&chunk).map_err(|err| RayError::Handler {
                context: "ray.request.dostream.handfn",
                source: err,
            })?;
        }
        Ok(())
    }

    fn build_request(
        &self,
        opts: &mut RequestOptions,
        context: &'static str,
    ) -> Result<reqwest::RequestBuilder> {
        if opts.url.is_empty() {
            return Err(RayError::config(context, "invalid url, url:"));
        }

        let mut url = opts.url.clone();
        if let Some(query) = opts.query.as_ref() {
            let query = resolve_query(query).map_err(|err| err.with_context(context))?;
            if !query.is_empty() {
                url.push('?');
                url.push_str(&query);
            }
        }

        let url = reqwest::Url::parse(&url)
            .map_err(|err| RayError::config(context, format!("invalid url '{url}': {err}")))?;

        let method = Method::from_bytes(opts.method.as_bytes()).map_err(|err| {
            RayError::config(context, format!("invalid method '{}': {err}", opts.method))
        })?;

        let http = self.transport_for(opts, context)?;
        let mut request = http.request(method, url);

        if opts.timeout_secs > 0 {
            request = request.timeout(Duration::from_secs(opts.timeout_secs));
        }

        for (key, value) in &opts.headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|err| {
                RayError::config(context, format!("invalid header name '{key}': {err}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|err| {
                RayError::config(context, format!("invalid value for header '{key}': {err}"))
            })?;
            request = request.header(name, value);
        }

        if let Some(content_type) = opts.content_type.as_deref() {
            let value = HeaderValue::from_str(content_type).map_err(|err| {
                RayError::config(context, format!("invalid content type '{content_type}': {err}"))
            })?;
            request = request.header(CONTENT_TYPE, value);
        }

        let body = opts
            .read_body()
            .map_err(|source| RayError::Body { context, source })?;
        if let Some(body) = body {
            request = request.body(body);
        }

        Ok(request)
    }

    /// Picks the shared transport, or a proxied one with certificate
    /// verification disabled when a proxy is configured.
    fn transport_for(
        &self,
        opts: &RequestOptions,
        context: &'static str,
    ) -> Result<Cow<'_, reqwest::Client>> {
        let Some(proxy) = self.resolve_proxy(opts) else {
            return Ok(Cow::Borrowed(&self.http));
        };

        let proxy = reqwest::Proxy::all(proxy).map_err(|err| {
            RayError::config(context, format!("invalid proxy url '{proxy}': {err}"))
        })?;
        reqwest::Client::builder()
            .proxy(proxy)
            .danger_accept_invalid_certs(true)
            .build()
            .map(Cow::Owned)
            .map_err(|err| RayError::config(context, format!("proxy transport: {err}")))
    }

    /// Request proxy if set, else the client default. Empty strings count as unset.
    fn resolve_proxy<'a>(&'a self, opts: &'a RequestOptions) -> Option<&'a str> {
        opts.proxy
            .as_deref()
            .filter(|proxy| !proxy.is_empty())
            .or(self.options.proxy.as_deref())
            .filter(|proxy| !proxy.is_empty())
    }

    fn log(&self, opts: &mut RequestOptions) {
        let Some(logger) = opts.logger.clone().or_else(|| self.logger.clone()) else {
            return;
        };
        if let Err(source) = logger(opts, None) {
            let _err = RayError::Handler {
                context: "ray.request.do.logger",
                source,
            };
            #[cfg(feature = "tracing")]
            tracing::warn!("request logger failed: {}", _err);
        }
    }

    /// Waits before the next attempt with exponential backoff.
    async fn wait_before_retry(&self, attempt: usize) {
        let exp = attempt.min(16) as u32;
        let multiplier = 1u64 << exp;
        let delay_ms = self.options.retry_backoff_ms.saturating_mul(multiplier);

        #[cfg(feature = "tracing")]
        tracing::debug!("retrying request after {} ms", delay_ms);

        if delay_ms > 0 {
            sleep(Duration::from_millis(delay_ms)).await;
        }
    }
}
