use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as JsonValue;
use url::form_urlencoded;

use crate::{Query, RayError, Result};

/// Encodes a serializable value into a `key=value&...` query string.
///
/// Keys are sorted alphabetically and escaped as
/// `application/x-www-form-urlencoded` (space becomes `+`). Array fields
/// repeat their key, `null` fields are skipped, and nested objects are
/// flattened as `parent[child]`. The top-level value must serialize to an
/// object.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)
        .map_err(|err| RayError::config("ray.encode", format!("value is not serializable: {err}")))?;
    encode_value(&value)
}

pub(crate) fn encode_value(value: &JsonValue) -> Result<String> {
    let object = match value {
        JsonValue::Object(object) => object,
        JsonValue::Null => return Ok(String::new()),
        other => {
            return Err(RayError::config(
                "ray.encode",
                format!("expected an object with named fields, got {}", kind_of(other)),
            ))
        }
    };

    let mut pairs = Vec::new();
    for (key, value) in object {
        flatten(key.clone(), value, &mut pairs)?;
    }
    // Stable, so repeated array keys keep their order.
    pairs.sort_by(|left, right| left.0.cmp(&right.0));

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, text) in &pairs {
        serializer.append_pair(key, text);
    }
    Ok(serializer.finish())
}

fn flatten(key: String, value: &JsonValue, pairs: &mut Vec<(String, String)>) -> Result<()> {
    match value {
        JsonValue::Null => {}
        JsonValue::Object(object) => {
            for (child, value) in object {
                flatten(format!("{key}[{child}]"), value, pairs)?;
            }
        }
        JsonValue::Array(items) => {
            for item in items {
                if let Some(text) = scalar_text(&key, item)? {
                    pairs.push((key.clone(), text));
                }
            }
        }
        other => {
            if let Some(text) = scalar_text(&key, other)? {
                pairs.push((key, text));
            }
        }
    }
    Ok(())
}

/// Resolves a query option into the text appended after `?`.
pub(crate) fn resolve_query(query: &Query) -> Result<String> {
    match query {
        Query::Raw(text) => Ok(text.clone()),
        Query::Structured(value) => encode_value(value),
    }
}

/// Decodes a response body, keeping the raw text on failure.
pub(crate) fn decode_json<T: DeserializeOwned>(context: &'static str, body: &[u8]) -> Result<T> {
    serde_json::from_slice(body).map_err(|err| RayError::Decode {
        context,
        message: err.to_string(),
        body: String::from_utf8_lossy(body).into_owned(),
    })
}

fn scalar_text(key: &str, value: &JsonValue) -> Result<Option<String>> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::Bool(flag) => Ok(Some(flag.to_string())),
        JsonValue::Number(number) => Ok(Some(number.to_string())),
        JsonValue::String(text) => Ok(Some(text.clone())),
        other => Err(RayError::config(
            "ray.encode",
            format!("field '{key}' holds {}, which has no query form", kind_of(other)),
        )),
    }
}

fn kind_of(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::Serialize;
    use serde_json::json;

    use crate::{encode, encode::decode_json, encode::resolve_query, Query, RayError};

    #[derive(Serialize)]
    struct Contact {
        #[serde(rename = "name")]
        name: String,
        #[serde(rename = "email")]
        email: String,
    }

    #[test]
    fn encodes_struct_sorted_with_form_escaping() {
        let contact = Contact {
            name: "John Doe".to_owned(),
            email: "johndoe@example.com".to_owned(),
        };
        assert_eq!(
            encode(&contact).expect("must encode"),
            "email=johndoe%40example.com&name=John+Doe"
        );
    }

    #[test]
    fn encodes_numbers_verbatim() {
        #[derive(Serialize)]
        struct Auth {
            id: u32,
            token: String,
        }

        let auth = Auth {
            id: 123,
            token: "abc123".to_owned(),
        };
        assert_eq!(encode(&auth).expect("must encode"), "id=123&token=abc123");
    }

    #[test]
    fn arrays_repeat_key_and_nulls_are_skipped() {
        let value = json!({"tag": ["a", "b"], "missing": null, "on": true});
        assert_eq!(encode(&value).expect("must encode"), "on=true&tag=a&tag=b");
    }

    #[test]
    fn map_is_encoded_in_key_order() {
        let map = HashMap::from([("b", "2"), ("a", "1")]);
        assert_eq!(encode(&map).expect("must encode"), "a=1&b=2");
    }

    #[test]
    fn nested_objects_use_bracket_keys() {
        #[derive(Serialize)]
        struct Page {
            number: u32,
        }
        #[derive(Serialize)]
        struct Search {
            q: String,
            page: Page,
        }

        let search = Search {
            q: "rust".to_owned(),
            page: Page { number: 2 },
        };
        assert_eq!(encode(&search).expect("must encode"), "page%5Bnumber%5D=2&q=rust");

        let deep = json!({"a": {"b": {"c": ["x", "y"], "skip": null}}});
        assert_eq!(
            encode(&deep).expect("must encode"),
            "a%5Bb%5D%5Bc%5D=x&a%5Bb%5D%5Bc%5D=y"
        );
    }

    #[test]
    fn rejects_objects_in_arrays_and_scalars() {
        let listed = encode(&json!({"items": [{"k": "v"}]})).expect_err("must fail");
        assert!(matches!(listed, RayError::Config { .. }));

        let scalar = encode(&42).expect_err("must fail");
        assert!(matches!(scalar, RayError::Config { .. }));
    }

    // Resolution leaves raw text alone; the URL parser may still escape it on the wire.
    #[test]
    fn raw_query_resolves_without_encoding() {
        let query = Query::raw("a=1&b=hello world");
        assert_eq!(resolve_query(&query).expect("must resolve"), "a=1&b=hello world");
    }

    #[test]
    fn decode_failure_keeps_body() {
        let err = decode_json::<HashMap<String, String>>("ray.test", b"<html>")
            .expect_err("must fail");
        match err {
            RayError::Decode { body, context, .. } => {
                assert_eq!(body, "<html>");
                assert_eq!(context, "ray.test");
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }
}
