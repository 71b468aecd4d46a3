/// Error produced by caller-supplied callbacks (loggers, stream handlers).
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Error type returned by this crate.
///
/// Every variant carries a stable call-site identifier (`context`) so a
/// failure can be traced to the operation that produced it.
#[derive(Debug, thiserror::Error)]
pub enum RayError {
    /// Invalid request configuration. Never retried.
    #[error("{context}: invalid configuration: {message}")]
    Config {
        context: &'static str,
        message: String,
    },
    /// Network or request execution error from `reqwest`.
    #[error("{context}: transport error: {source}")]
    Transport {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// Non-200 HTTP status code with raw response body.
    #[error("{context}: http error {status}: {body}")]
    Http {
        context: &'static str,
        status: u16,
        body: String,
    },
    /// Response body could not be decoded; `body` holds the raw text.
    #[error("{context}: decode error: {message}; body: {body}")]
    Decode {
        context: &'static str,
        message: String,
        body: String,
    },
    /// Reading or rewinding the outbound body stream failed.
    #[error("{context}: body stream error: {source}")]
    Body {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    /// A caller-supplied callback failed.
    #[error("{context}: handler error: {source}")]
    Handler {
        context: &'static str,
        #[source]
        source: HandlerError,
    },
    /// An inner error annotated with the identifier of the calling operation.
    #[error("{context}: {source}")]
    Context {
        context: &'static str,
        #[source]
        source: Box<RayError>,
    },
}

impl RayError {
    pub(crate) fn config(context: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            context,
            message: message.into(),
        }
    }

    /// Wraps this error with the identifier of an outer call site.
    pub fn with_context(self, context: &'static str) -> Self {
        Self::Context {
            context,
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, looking through [`RayError::Context`].
    pub fn root(&self) -> &RayError {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// Identifier of the outermost call site.
    pub fn context(&self) -> &'static str {
        match self {
            Self::Config { context, .. }
            | Self::Transport { context, .. }
            | Self::Http { context, .. }
            | Self::Decode { context, .. }
            | Self::Body { context, .. }
            | Self::Handler { context, .. }
            | Self::Context { context, .. } => context,
        }
    }

    /// HTTP status of a status failure, if that is what this error is.
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the retry driver may attempt the request again.
    ///
    /// Status failures are retried exactly like transport failures,
    /// including 4xx responses.
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), Self::Transport { .. } | Self::Http { .. })
    }
}
