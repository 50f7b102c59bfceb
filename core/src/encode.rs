//! Header assembly and request body encoding.
//!
//! Body encoding precedence:
//! 1. field records under `Content-Type: application/json` become JSON text;
//! 2. other field records become a flat `key=value&...` query string;
//! 3. text and multipart payloads pass through unchanged.
//!
//! Nested values in a query-string record are not expanded: they are coerced
//! to a string the same way a browser coerces them (`[object Object]`,
//! comma-joined arrays).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::{Map, Value};

use crate::descriptor::RequestBody;
use crate::error::ApiError;
use crate::http::{find_header, Payload};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";

/// Everything except `A-Z a-z 0-9 - _ . ! ~ * ' ( )` is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Merge the explicit header list with the content-type shorthand. The
/// shorthand replaces any existing `Content-Type` entry in place.
pub fn assemble_headers(
    headers: Vec<(String, String)>,
    content_type: Option<&str>,
) -> Vec<(String, String)> {
    let Some(content_type) = content_type else {
        return headers;
    };
    let mut assembled: Vec<(String, String)> = Vec::with_capacity(headers.len() + 1);
    let mut replaced = false;
    for (name, value) in headers {
        if name.eq_ignore_ascii_case(CONTENT_TYPE) {
            if !replaced {
                assembled.push((CONTENT_TYPE.to_string(), content_type.to_string()));
                replaced = true;
            }
        } else {
            assembled.push((name, value));
        }
    }
    if !replaced {
        assembled.push((CONTENT_TYPE.to_string(), content_type.to_string()));
    }
    assembled
}

/// Encode a caller-supplied body against the already assembled headers.
pub fn encode_body(
    body: Option<RequestBody>,
    headers: &[(String, String)],
) -> Result<Option<Payload>, ApiError> {
    let payload = match body {
        None => None,
        Some(RequestBody::Fields(fields)) => {
            if find_header(headers, CONTENT_TYPE) == Some(APPLICATION_JSON) {
                let json = serde_json::to_string(&fields)
                    .map_err(|e| ApiError::Serialization(e.to_string()))?;
                Some(Payload::Text(json))
            } else {
                Some(Payload::Text(url_encode(&fields)))
            }
        }
        Some(RequestBody::Form(form)) => Some(Payload::Form(form)),
        Some(RequestBody::Text(text)) => Some(Payload::Text(text)),
    };
    Ok(payload)
}

/// Single-level `application/x-www-form-urlencoded`-style string, using
/// `%20` for spaces. Entries keep their insertion order.
pub fn url_encode(fields: &Map<String, Value>) -> String {
    fields
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, COMPONENT),
                utf8_percent_encode(&coerce_to_string(value), COMPONENT)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// String coercion of a JSON value, matching how a browser stringifies it.
pub fn coerce_to_string(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
                format!("{f:.0}")
            }
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => coerce_to_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::http::FormData;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn shorthand_overrides_explicit_header() {
        let headers = vec![
            ("content-type".to_string(), "text/plain".to_string()),
            ("X-Trace".to_string(), "1".to_string()),
        ];
        let assembled = assemble_headers(headers, Some("application/json"));
        assert_eq!(
            assembled,
            vec![
                ("Content-Type".to_string(), "application/json".to_string()),
                ("X-Trace".to_string(), "1".to_string()),
            ]
        );
    }

    #[test]
    fn shorthand_is_appended_when_absent() {
        let assembled = assemble_headers(Vec::new(), Some("text/csv"));
        assert_eq!(assembled, vec![("Content-Type".to_string(), "text/csv".to_string())]);
    }

    #[test]
    fn headers_untouched_without_shorthand() {
        let headers = vec![("Accept".to_string(), "*/*".to_string())];
        assert_eq!(assemble_headers(headers.clone(), None), headers);
    }

    #[test]
    fn fields_url_encode_in_insertion_order() {
        let body = RequestBody::Fields(fields(json!({"foo": "a b", "bar": 2})));
        let payload = encode_body(Some(body), &[]).unwrap();
        assert_eq!(payload, Some(Payload::Text("foo=a%20b&bar=2".to_string())));
    }

    #[test]
    fn fields_become_json_under_json_content_type() {
        let headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        let body = RequestBody::Fields(fields(json!({"foo": "a b", "bar": 2})));
        let payload = encode_body(Some(body), &headers).unwrap();
        assert_eq!(payload, Some(Payload::Text(r#"{"foo":"a b","bar":2}"#.to_string())));
    }

    #[test]
    fn json_content_type_must_match_exactly() {
        let headers = vec![(
            CONTENT_TYPE.to_string(),
            "application/json; charset=utf-8".to_string(),
        )];
        let body = RequestBody::Fields(fields(json!({"a": 1})));
        let payload = encode_body(Some(body), &headers).unwrap();
        assert_eq!(payload, Some(Payload::Text("a=1".to_string())));
    }

    #[test]
    fn text_and_form_pass_through() {
        let headers = vec![(CONTENT_TYPE.to_string(), APPLICATION_JSON.to_string())];
        let text = encode_body(Some(RequestBody::Text("{raw".to_string())), &headers).unwrap();
        assert_eq!(text, Some(Payload::Text("{raw".to_string())));

        let form = FormData::new().text("name", "value");
        let payload = encode_body(Some(RequestBody::Form(form.clone())), &headers).unwrap();
        assert_eq!(payload, Some(Payload::Form(form)));
    }

    #[test]
    fn absent_body_is_null_payload() {
        assert_eq!(encode_body(None, &[]).unwrap(), None);
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let encoded = url_encode(&fields(json!({"q&a": "x=y/z?", "tilde": "~*'()!"})));
        assert_eq!(encoded, "q%26a=x%3Dy%2Fz%3F&tilde=~*'()!");
    }

    #[test]
    fn unicode_is_percent_encoded_as_utf8() {
        assert_eq!(url_encode(&fields(json!({"k": "é"}))), "k=%C3%A9");
    }

    #[test]
    fn coercion_matches_browser_stringification() {
        assert_eq!(coerce_to_string(&json!(null)), "null");
        assert_eq!(coerce_to_string(&json!(true)), "true");
        assert_eq!(coerce_to_string(&json!(2)), "2");
        assert_eq!(coerce_to_string(&json!(2.0)), "2");
        assert_eq!(coerce_to_string(&json!(2.5)), "2.5");
        assert_eq!(coerce_to_string(&json!([1, null, "a"])), "1,,a");
        assert_eq!(coerce_to_string(&json!({"nested": 1})), "[object Object]");
    }
}
