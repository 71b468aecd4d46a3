//! `GET`/`POST` shorthands built on [`Client::do_retry`].
//!
//! Each call takes an optional query and an optional header map as its
//! trailing arguments.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use crate::{
    encode::{decode_json, resolve_query},
    with_body_str, with_content_type, with_header, with_method, with_query, with_url, Client,
    JsonBody, OptionHandle, Query, Result,
};

/// Header map accepted by the shorthands.
pub type Headers = HashMap<String, String>;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_CONTENT_TYPE: &str = "application/json";

impl Client {
    /// Sends a `GET` request and returns the response body.
    pub async fn get(
        &self,
        url: &str,
        query: Option<Query>,
        headers: Option<Headers>,
    ) -> Result<Vec<u8>> {
        let mut opts = self.new_options(base_handles(url, query, headers));
        self.do_retry(&mut opts)
            .await
            .map_err(|err| err.with_context("ray.request.get.do"))
    }

    /// Sends a `GET` request and decodes the JSON response.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: Option<Query>,
        headers: Option<Headers>,
    ) -> Result<T> {
        let body = self
            .get(url, query, headers)
            .await
            .map_err(|err| err.with_context("ray.request.getjson.get"))?;
        decode_json("ray.request.getjson.get.unmarshal", &body)
    }

    /// Sends a form-encoded `POST`.
    ///
    /// A raw body is sent verbatim, a structured one is form-encoded. The
    /// content type is only set when a body is present.
    pub async fn post_form(
        &self,
        url: &str,
        body: Option<Query>,
        query: Option<Query>,
        headers: Option<Headers>,
    ) -> Result<Vec<u8>> {
        let mut handles = base_handles(url, query, headers);
        handles.push(with_method("POST"));
        if let Some(body) = body {
            let text = resolve_query(&body)
                .map_err(|err| err.with_context("ray.request.postform.query.encode"))?;
            handles.push(with_body_str(text));
            handles.push(with_content_type(FORM_CONTENT_TYPE));
        }

        let mut opts = self.new_options(handles);
        self.do_retry(&mut opts)
            .await
            .map_err(|err| err.with_context("ray.request.postform.do"))
    }

    /// Sends a JSON `POST`.
    ///
    /// A raw body is sent verbatim, a structured one is serialized. The
    /// content type is only set when a body is present.
    pub async fn post_raw(
        &self,
        url: &str,
        body: Option<JsonBody>,
        query: Option<Query>,
        headers: Option<Headers>,
    ) -> Result<Vec<u8>> {
        let mut handles = base_handles(url, query, headers);
        handles.push(with_method("POST"));
        if let Some(body) = body {
            handles.push(with_body_str(body.into_text()?));
            handles.push(with_content_type(JSON_CONTENT_TYPE));
        }

        let mut opts = self.new_options(handles);
        self.do_retry(&mut opts)
            .await
            .map_err(|err| err.with_context("ray.request.postraw.do"))
    }

    /// [`Client::post_form`] with a JSON-decoded response.
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<Query>,
        query: Option<Query>,
        headers: Option<Headers>,
    ) -> Result<T> {
        let resp = self
            .post_form(url, body, query, headers)
            .await
            .map_err(|err| err.with_context("ray.request.postformjson"))?;
        decode_json("ray.request.postformjson.unmarshal", &resp)
    }

    /// [`Client::post_raw`] with a JSON-decoded response.
    pub async fn post_raw_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: Option<JsonBody>,
        query: Option<Query>,
        headers: Option<Headers>,
    ) -> Result<T> {
        let resp = self
            .post_raw(url, body, query, headers)
            .await
            .map_err(|err| err.with_context("ray.request.postrawjson"))?;
        decode_json("ray.request.postrawjson.unmarshal", &resp)
    }
}

fn base_handles(url: &str, query: Option<Query>, headers: Option<Headers>) -> Vec<OptionHandle> {
    let mut handles = Vec::with_capacity(6);
    handles.push(with_url(url));
    if let Some(query) = query {
        handles.push(with_query(query));
    }
    if let Some(headers) = headers {
        handles.push(with_header(headers));
    }
    handles
}
