use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use serde::Serialize;

use crate::{RayError, Result};

/// Query string or form payload.
///
/// Raw strings skip the encoder, though the URL parser still percent-encodes
/// characters that are not valid in a query. Structured values are encoded
/// with [`encode`](crate::encode) when the request is dispatched.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Pre-encoded `key=value&...` text.
    Raw(String),
    /// A JSON object whose fields become query keys.
    Structured(serde_json::Value),
}

impl Query {
    /// Builds a raw query.
    pub fn raw(value: impl Into<String>) -> Self {
        Self::Raw(value.into())
    }

    /// Captures any serializable value as a structured query.
    ///
    /// Field names come from `serde`, so `#[serde(rename = "...")]` sets the
    /// query key.
    pub fn structured<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value).map(Self::Structured).map_err(|err| {
            RayError::config("ray.query.structured", format!("value is not serializable: {err}"))
        })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw(value) => f.write_str(value),
            Self::Structured(value) => write!(f, "{value}"),
        }
    }
}

impl From<String> for Query {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

impl From<serde_json::Value> for Query {
    fn from(value: serde_json::Value) -> Self {
        Self::Structured(value)
    }
}

impl<K: Into<String>, V: Into<String>> From<HashMap<K, V>> for Query {
    fn from(values: HashMap<K, V>) -> Self {
        Self::Structured(string_object(values))
    }
}

impl<K: Into<String>, V: Into<String>> From<BTreeMap<K, V>> for Query {
    fn from(values: BTreeMap<K, V>) -> Self {
        Self::Structured(string_object(values))
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Query {
    fn from(values: [(K, V); N]) -> Self {
        Self::Structured(string_object(values))
    }
}

fn string_object<I, K, V>(pairs: I) -> serde_json::Value
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    serde_json::Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k.into(), serde_json::Value::String(v.into())))
            .collect(),
    )
}

/// Body of a JSON post.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonBody {
    /// Already serialized JSON text.
    Raw(String),
    /// A value serialized with `serde_json` at send time.
    Value(serde_json::Value),
}

impl JsonBody {
    /// Captures any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value).map(Self::Value).map_err(|err| {
            RayError::config("ray.body.json", format!("value is not serializable: {err}"))
        })
    }

    pub(crate) fn into_text(self) -> Result<String> {
        match self {
            Self::Raw(text) => Ok(text),
            Self::Value(value) => serde_json::to_string(&value).map_err(|err| {
                RayError::config("ray.request.postraw.body.marshal", err.to_string())
            }),
        }
    }
}

impl From<String> for JsonBody {
    fn from(value: String) -> Self {
        Self::Raw(value)
    }
}

impl From<&str> for JsonBody {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

impl From<serde_json::Value> for JsonBody {
    fn from(value: serde_json::Value) -> Self {
        Self::Value(value)
    }
}
