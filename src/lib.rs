//! `ray-http` is a convenience async HTTP request client.
//!
//! Requests are described by [`RequestOptions`], assembled from
//! [`OptionHandle`]s, and sent by a [`Client`] that holds the defaults:
//! - [`Client::attempt`] performs one request
//! - [`Client::do_retry`] repeats it up to the attempt budget
//! - [`Client::get`], [`Client::post_form`], [`Client::post_raw`] and their
//!   JSON variants wrap the common cases

mod client;
mod encode;
mod error;
pub mod logger;
mod options;
mod params;
mod request;
mod verbs;

pub use client::Client;
pub use encode::encode;
pub use error::{HandlerError, RayError};
#[cfg(feature = "tracing")]
pub use logger::tracing_logger;
pub use logger::{logger_fn, render_trace, std_logger, LoggerHandle, LoggerResult};
pub use options::ClientOptions;
pub use params::{JsonBody, Query};
pub use request::{
    with_body, with_body_reader, with_body_str, with_content_type, with_header, with_logger,
    with_method, with_proxy, with_query, with_retry_times, with_timeout, with_url, OptionHandle,
    RequestOptions, SeekableBody,
};
pub use verbs::Headers;

pub type Result<T> = std::result::Result<T, RayError>;
