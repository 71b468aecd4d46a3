//! Request trace hooks.
//!
//! A logger runs after a successful attempt with the resolved options. Its
//! result is ignored by the dispatch path, so a logger may fail with any
//! error type.

use std::sync::Arc;

use crate::{HandlerError, RayError, RequestOptions, Result};

/// Result returned by a logger.
pub type LoggerResult = std::result::Result<(), HandlerError>;

/// Callback invoked after a completed attempt.
pub type LoggerHandle =
    Arc<dyn Fn(&mut RequestOptions, Option<&RayError>) -> LoggerResult + Send + Sync>;

/// Wraps a closure as a [`LoggerHandle`].
pub fn logger_fn<F>(f: F) -> LoggerHandle
where
    F: Fn(&mut RequestOptions, Option<&RayError>) -> LoggerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Default logger: writes [`render_trace`] to stderr.
pub fn std_logger(opts: &mut RequestOptions, err: Option<&RayError>) -> LoggerResult {
    let trace = render_trace(opts, err)?;
    eprintln!("{trace}");
    Ok(())
}

/// Emits the trace fields as a `tracing` event on the `ray_http` target.
#[cfg(feature = "tracing")]
pub fn tracing_logger(opts: &mut RequestOptions, err: Option<&RayError>) -> LoggerResult {
    let body = snapshot_text(opts)?;
    let query = opts.query.as_ref().map(ToString::to_string);
    let headers = format!("{:?}", opts.sorted_headers());

    tracing::info!(
        target: "ray_http",
        url = %opts.url,
        method = %opts.method,
        retry = opts.retry_times,
        timeout = opts.timeout_secs,
        content_type = opts.content_type.as_deref(),
        query = query.as_deref(),
        headers = %headers,
        body = body.as_deref(),
        error = err.map(tracing::field::display),
        "ray trace"
    );
    Ok(())
}

/// Renders the multi-line request trace used by [`std_logger`].
///
/// Empty fields are omitted. The body is read from offset 0 and the stream
/// is left rewound.
pub fn render_trace(opts: &mut RequestOptions, err: Option<&RayError>) -> Result<String> {
    let mut out = String::from("ray trace \n");
    if !opts.url.is_empty() {
        out.push_str(&format!("url:{}\n", opts.url));
    }
    if !opts.method.is_empty() {
        out.push_str(&format!("method:{}\n", opts.method));
    }
    if opts.retry_times != 0 {
        out.push_str(&format!("retry:{}\n", opts.retry_times));
    }
    if opts.timeout_secs != 0 {
        out.push_str(&format!("timeout:{}\n", opts.timeout_secs));
    }
    if let Some(content_type) = opts.content_type.as_deref() {
        out.push_str(&format!("content-type:{content_type}\n"));
    }
    if let Some(query) = opts.query.as_ref() {
        out.push_str(&format!("query:{query}\n"));
    }
    if !opts.headers.is_empty() {
        out.push_str(&format!("header:{:?}\n", opts.sorted_headers()));
    }
    if let Some(body) = snapshot_text(opts)? {
        out.push_str(&format!("body:{body}\n"));
    }
    if let Some(err) = err {
        out.push_str(&format!("error:{err}\n"));
    }
    out.push_str(&format!(
        "time:{}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    Ok(out)
}

fn snapshot_text(opts: &mut RequestOptions) -> Result<Option<String>> {
    let snapshot = opts.body_snapshot().map_err(|source| RayError::Body {
        context: "ray.logger.body",
        source,
    })?;
    Ok(snapshot.map(|bytes| String::from_utf8_lossy(&bytes).into_owned()))
}
