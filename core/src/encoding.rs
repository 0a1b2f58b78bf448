//! Request body encoding.
//!
//! Form bodies flatten nested objects into bracketed keys
//! (`plainPassword[first]=...`) and scalar arrays into `key[]=...`, the
//! convention the backend's form handling understands. Values a form body
//! cannot express are construction errors; nothing is dropped.

use serde_json::Value;
use url::form_urlencoded;

use crate::config::BodyEncoding;
use crate::error::ApiError;
use crate::http::Parameters;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// A serialized request body and the content type describing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedBody {
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub fn encode_body(params: &Parameters, encoding: BodyEncoding) -> Result<EncodedBody, ApiError> {
    match encoding {
        BodyEncoding::Form => Ok(EncodedBody {
            content_type: FORM_CONTENT_TYPE,
            bytes: encode_form(params)?.into_bytes(),
        }),
        BodyEncoding::Json => {
            let bytes = serde_json::to_vec(params)
                .map_err(|e| ApiError::Construction(format!("json body: {e}")))?;
            Ok(EncodedBody {
                content_type: JSON_CONTENT_TYPE,
                bytes,
            })
        }
    }
}

pub fn encode_form(params: &Parameters) -> Result<String, ApiError> {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        append_value(&mut serializer, key, value)?;
    }
    Ok(serializer.finish())
}

fn append_value(
    serializer: &mut form_urlencoded::Serializer<'_, String>,
    key: &str,
    value: &Value,
) -> Result<(), ApiError> {
    match value {
        Value::Object(fields) => {
            if fields.is_empty() {
                return Err(unencodable(key, "empty object"));
            }
            for (field, nested) in fields {
                append_value(serializer, &format!("{key}[{field}]"), nested)?;
            }
        }
        Value::Array(items) => {
            if items.is_empty() {
                return Err(unencodable(key, "empty array"));
            }
            let item_key = format!("{key}[]");
            for item in items {
                let text = scalar_text(item).ok_or_else(|| unencodable(key, "nested array element"))?;
                serializer.append_pair(&item_key, &text);
            }
        }
        scalar => {
            let text = scalar_text(scalar).ok_or_else(|| unencodable(key, "null"))?;
            serializer.append_pair(key, &text);
        }
    }
    Ok(())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn unencodable(key: &str, what: &str) -> ApiError {
    ApiError::Construction(format!("{what} at `{key}` cannot be form-encoded"))
}

/// Parameters as a form body carries them: every scalar replaced by the text
/// it is encoded as. `decode_form(encode_form(p))` equals `form_view(p)`.
///
/// Values that `encode_form` rejects (`null`) are kept as they are.
pub fn form_view(params: &Parameters) -> Parameters {
    params
        .iter()
        .map(|(key, value)| (key.clone(), wire_text(value)))
        .collect()
}

fn wire_text(value: &Value) -> Value {
    match value {
        Value::Object(fields) => Value::Object(form_view(fields)),
        Value::Array(items) => Value::Array(items.iter().map(wire_text).collect()),
        scalar => scalar_text(scalar).map_or(Value::Null, Value::String),
    }
}

/// Rebuild parameters from a form body.
///
/// Bracketed keys become nested objects and `[]` keys become arrays. Form
/// bodies carry no types, so every scalar comes back as a string.
pub fn decode_form(body: &[u8]) -> Parameters {
    let mut params = Parameters::new();
    for (key, value) in form_urlencoded::parse(body) {
        let segments = split_key(&key);
        insert_path(&mut params, &segments, value.into_owned());
    }
    params
}

fn split_key(key: &str) -> Vec<&str> {
    let Some(open) = key.find('[') else {
        return vec![key];
    };
    let (base, rest) = key.split_at(open);
    let inner = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']'));
    match inner {
        Some(inner) if !base.is_empty() => {
            let mut segments = vec![base];
            segments.extend(inner.split("]["));
            segments
        }
        _ => vec![key],
    }
}

fn insert_path(map: &mut Parameters, segments: &[&str], value: String) {
    match segments {
        [] => {}
        [last] => {
            map.insert((*last).to_string(), Value::String(value));
        }
        [head, ""] => {
            let slot = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if !slot.is_array() {
                *slot = Value::Array(Vec::new());
            }
            if let Value::Array(items) = slot {
                items.push(Value::String(value));
            }
        }
        [head, rest @ ..] => {
            let slot = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Parameters::new()));
            if !slot.is_object() {
                *slot = Value::Object(Parameters::new());
            }
            if let Value::Object(nested) = slot {
                insert_path(nested, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::config::ApiConfig;
    use crate::endpoint::{Operation, PasswordConfirmation, RegistrationForm};

    fn params(value: Value) -> Parameters {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn form_encodes_flat_pairs_in_order() {
        let body = encode_form(&params(json!({ "_username": "ilaytest", "_password": "1234567" })))
            .unwrap();
        assert_eq!(body, "_username=ilaytest&_password=1234567");
    }

    #[test]
    fn form_escapes_reserved_characters() {
        let body = encode_form(&params(json!({ "_username": "a&b=c d", "_password": "+%?" }))).unwrap();
        assert_eq!(body, "_username=a%26b%3Dc+d&_password=%2B%25%3F");
    }

    #[test]
    fn form_brackets_nested_objects() {
        let body = encode_form(&params(json!({
            "plainPassword": { "first": "x", "second": "y" },
            "districtId": 7,
        })))
        .unwrap();
        assert_eq!(
            body,
            "plainPassword%5Bfirst%5D=x&plainPassword%5Bsecond%5D=y&districtId=7"
        );
    }

    #[test]
    fn form_encodes_scalar_arrays_and_bools() {
        let body = encode_form(&params(json!({ "roles": ["a", "b"], "subscribe": true }))).unwrap();
        assert_eq!(body, "roles%5B%5D=a&roles%5B%5D=b&subscribe=true");
    }

    #[test]
    fn form_rejects_unencodable_values() {
        for value in [
            json!({ "k": null }),
            json!({ "k": [] }),
            json!({ "k": {} }),
            json!({ "k": [["nested"]] }),
            json!({ "k": { "inner": null } }),
        ] {
            let err = encode_body(&params(value.clone()), BodyEncoding::Form).unwrap_err();
            assert!(err.is_construction(), "{value}");
        }
    }

    #[test]
    fn json_encoding_keeps_types() {
        let input = params(json!({ "districtId": 7, "plainPassword": { "first": "x" }, "k": null }));
        let body = encode_body(&input, BodyEncoding::Json).unwrap();
        assert_eq!(body.content_type, JSON_CONTENT_TYPE);
        let back: Parameters = serde_json::from_slice(&body.bytes).unwrap();
        assert_eq!(back, input);
    }

    #[test]
    fn decode_form_rebuilds_nesting() {
        let decoded = decode_form(
            b"username=u&plainPassword%5Bfirst%5D=x&plainPassword%5Bsecond%5D=y&roles%5B%5D=a&roles%5B%5D=b",
        );
        assert_eq!(
            Value::Object(decoded),
            json!({
                "username": "u",
                "plainPassword": { "first": "x", "second": "y" },
                "roles": ["a", "b"],
            })
        );
    }

    #[test]
    fn decode_form_treats_malformed_brackets_as_plain_keys() {
        let decoded = decode_form(b"a%5Bb=1&%5Bx%5D=2");
        assert_eq!(Value::Object(decoded), json!({ "a[b": "1", "[x]": "2" }));
    }

    fn every_operation() -> Vec<Operation> {
        vec![
            Operation::login("a&b=c d", "p%20+ ?#"),
            Operation::login("", ""),
            Operation::CurrentUser,
            Operation::Districts,
            Operation::Register(RegistrationForm {
                username: "ilaytest".to_string(),
                surname: "Petrova".to_string(),
                name: "Анна".to_string(),
                email: "anna+tag@example.test".to_string(),
                password: PasswordConfirmation {
                    first: "p=w[1]".to_string(),
                    second: "other".to_string(),
                },
                district_id: 7,
            }),
            Operation::Profile { id: 3 },
        ]
    }

    #[test]
    fn every_operation_round_trips_through_form() {
        let config = ApiConfig::new("http://localhost:3000").unwrap();
        for op in every_operation() {
            let Some(original) = op.request_spec(&config).parameters else {
                continue;
            };
            let body = encode_body(&original, BodyEncoding::Form).unwrap();
            let decoded = decode_form(&body.bytes);
            assert_eq!(decoded, form_view(&original), "{op:?}");

            let mut decoded_keys: Vec<_> = decoded.keys().collect();
            let mut original_keys: Vec<_> = original.keys().collect();
            decoded_keys.sort();
            original_keys.sort();
            assert_eq!(decoded_keys, original_keys, "{op:?}");
        }
    }

    #[test]
    fn every_operation_round_trips_through_json() {
        let config = ApiConfig::new("http://localhost:3000").unwrap();
        for op in every_operation() {
            let Some(original) = op.request_spec(&config).parameters else {
                continue;
            };
            let body = encode_body(&original, BodyEncoding::Json).unwrap();
            let decoded: Parameters = serde_json::from_slice(&body.bytes).unwrap();
            assert_eq!(decoded, original, "{op:?}");
        }
    }

    #[test]
    fn form_view_stringifies_scalars_only() {
        let view = form_view(&params(json!({
            "districtId": 7,
            "subscribe": false,
            "plainPassword": { "first": "x" },
            "roles": ["a", 2],
        })));
        assert_eq!(
            Value::Object(view),
            json!({
                "districtId": "7",
                "subscribe": "false",
                "plainPassword": { "first": "x" },
                "roles": ["a", "2"],
            })
        );
    }

    #[test]
    fn form_round_trip_ignores_insertion_order() {
        let forward = params(json!({ "_username": "é & ü", "_password": "" }));
        let mut reversed = Parameters::new();
        reversed.insert("_password".to_string(), json!(""));
        reversed.insert("_username".to_string(), json!("é & ü"));

        let decoded = decode_form(encode_form(&forward).unwrap().as_bytes());
        let mut decoded_keys: Vec<_> = decoded.keys().cloned().collect();
        let mut original_keys: Vec<_> = reversed.keys().cloned().collect();
        decoded_keys.sort();
        original_keys.sort();
        assert_eq!(decoded_keys, original_keys);
        for (key, value) in &reversed {
            assert_eq!(&decoded[key], value);
        }
    }
}
