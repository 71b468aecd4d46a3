use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    io::{self, Cursor, Read, Seek, SeekFrom},
};

use crate::{LoggerHandle, Query};

/// Outbound payload stream that can be rewound for a retry.
pub trait SeekableBody: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableBody for T {}

/// Mutates [`RequestOptions`] before dispatch.
pub type OptionHandle = Box<dyn FnOnce(&mut RequestOptions) + Send>;

/// Options for one logical call.
///
/// Built fresh per call and reused across its retries; only the body stream
/// is rewound between attempts. Nothing here is validated until dispatch.
pub struct RequestOptions {
    pub url: String,
    pub method: String,
    pub query: Option<Query>,
    pub headers: HashMap<String, String>,
    pub body: Option<Box<dyn SeekableBody>>,
    pub content_type: Option<String>,
    /// Per-attempt timeout in seconds, `0` for none.
    pub timeout_secs: u64,
    /// Total attempts allowed, including the first.
    pub retry_times: usize,
    /// Overrides the client proxy when set.
    pub proxy: Option<String>,
    /// Overrides the client logger for this call only.
    pub logger: Option<LoggerHandle>,
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("query", &self.query)
            .field("headers", &self.sorted_headers())
            .field("body", &self.body.as_ref().map(|_| "<stream>"))
            .field("content_type", &self.content_type)
            .field("timeout_secs", &self.timeout_secs)
            .field("retry_times", &self.retry_times)
            .field("proxy", &self.proxy)
            .field("logger", &self.logger.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl RequestOptions {
    /// Creates options with `GET` and the given timeout and attempt budget.
    pub fn new(timeout_secs: u64, retry_times: usize) -> Self {
        Self {
            url: String::new(),
            method: "GET".to_owned(),
            query: None,
            headers: HashMap::new(),
            body: None,
            content_type: None,
            timeout_secs,
            retry_times,
            proxy: None,
            logger: None,
        }
    }

    /// Runs each handle in order over these options.
    pub fn apply<I>(mut self, handles: I) -> Self
    where
        I: IntoIterator<Item = OptionHandle>,
    {
        for handle in handles {
            handle(&mut self);
        }
        self
    }

    /// Headers in key order, for stable rendering.
    pub fn sorted_headers(&self) -> BTreeMap<&str, &str> {
        self.headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Reads the whole body from offset 0, leaving the stream rewound.
    pub fn body_snapshot(&mut self) -> io::Result<Option<Vec<u8>>> {
        let Some(body) = self.body.as_mut() else {
            return Ok(None);
        };
        body.seek(SeekFrom::Start(0))?;
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        body.seek(SeekFrom::Start(0))?;
        Ok(Some(buf))
    }

    /// Reads the body from its current position, as an attempt does.
    pub(crate) fn read_body(&mut self) -> io::Result<Option<Vec<u8>>> {
        let Some(body) = self.body.as_mut() else {
            return Ok(None);
        };
        let mut buf = Vec::new();
        body.read_to_end(&mut buf)?;
        Ok(Some(buf))
    }

    pub(crate) fn rewind_body(&mut self) -> io::Result<()> {
        if let Some(body) = self.body.as_mut() {
            body.seek(SeekFrom::Start(0))?;
        }
        Ok(())
    }
}

/// Sets the request URL.
pub fn with_url(url: impl Into<String>) -> OptionHandle {
    let url = url.into();
    Box::new(move |opts| opts.url = url)
}

/// Sets the HTTP method.
pub fn with_method(method: impl Into<String>) -> OptionHandle {
    let method = method.into();
    Box::new(move |opts| opts.method = method)
}

/// Sets the query, replacing any earlier one.
pub fn with_query(query: impl Into<Query>) -> OptionHandle {
    let query = query.into();
    Box::new(move |opts| opts.query = Some(query))
}

/// Merges headers into the options; repeated keys are overwritten.
pub fn with_header<I, K, V>(headers: I) -> OptionHandle
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let headers: Vec<(String, String)> = headers
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    Box::new(move |opts| opts.headers.extend(headers))
}

/// Buffers `reader` into a rewindable body.
///
/// A read failure leaves an empty body in place.
pub fn with_body(mut reader: impl Read) -> OptionHandle {
    let mut buf = Vec::new();
    if reader.read_to_end(&mut buf).is_err() {
        buf.clear();
    }
    with_body_reader(Cursor::new(buf))
}

/// Uses a string as the body.
pub fn with_body_str(body: impl Into<String>) -> OptionHandle {
    with_body_reader(Cursor::new(body.into().into_bytes()))
}

/// Installs a caller-supplied seekable stream as the body.
pub fn with_body_reader(body: impl SeekableBody + 'static) -> OptionHandle {
    let body: Box<dyn SeekableBody> = Box::new(body);
    Box::new(move |opts| opts.body = Some(body))
}

/// Sets the `Content-Type` entry appended at dispatch.
pub fn with_content_type(content_type: impl Into<String>) -> OptionHandle {
    let content_type = content_type.into();
    Box::new(move |opts| opts.content_type = Some(content_type))
}

/// Sets the per-attempt timeout in seconds.
pub fn with_timeout(timeout_secs: u64) -> OptionHandle {
    Box::new(move |opts| opts.timeout_secs = timeout_secs)
}

/// Sets the total attempt budget. Not clamped.
pub fn with_retry_times(times: usize) -> OptionHandle {
    Box::new(move |opts| opts.retry_times = times)
}

/// Routes this request through `proxy`.
pub fn with_proxy(proxy: impl Into<String>) -> OptionHandle {
    let proxy = proxy.into();
    Box::new(move |opts| opts.proxy = Some(proxy))
}

/// Uses `logger` instead of the client logger for this call.
pub fn with_logger(logger: LoggerHandle) -> OptionHandle {
    Box::new(move |opts| opts.logger = Some(logger))
}
