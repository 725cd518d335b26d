//! Label request parsing.
//!
//! Requests arrive loosely typed (a JSON body or a preview query string).
//! `copies` and `offset` never fail validation: anything unusable falls back
//! to the default and is clamped to the minimum. Only `packageIds` can reject
//! a request.

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

pub const DEFAULT_COPIES: usize = 1;
pub const DEFAULT_OFFSET: usize = 0;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LabelRequest {
    #[serde(default, rename = "packageIds", alias = "package_ids")]
    pub package_ids: Option<Value>,
    #[serde(default)]
    pub copies: Option<Value>,
    #[serde(default)]
    pub offset: Option<Value>,
}

/// A request whose fields are known-good.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedRequest {
    pub package_ids: Vec<String>,
    pub copies: usize,
    pub offset: usize,
}

impl LabelRequest {
    pub fn new(package_ids: &[&str], copies: usize, offset: usize) -> Self {
        Self {
            package_ids: Some(Value::from(package_ids.to_vec())),
            copies: Some(Value::from(copies)),
            offset: Some(Value::from(offset)),
        }
    }

    pub fn from_json(body: &str) -> Result<Self, Error> {
        serde_json::from_str(body).map_err(|e| Error::Validation(format!("malformed JSON body: {e}")))
    }

    /// Parse `packageIds=a,b&copies=2&offset=1`. Repeated `packageIds` keys accumulate.
    pub fn from_query(query: &str) -> Self {
        let mut req = LabelRequest::default();
        let mut ids: Vec<Value> = Vec::new();
        for pair in query.trim_start_matches('?').split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = form_decode(value);
            match form_decode(key).as_str() {
                "packageIds" | "package_ids" => {
                    ids.extend(
                        value
                            .split(',')
                            .filter(|s| !s.trim().is_empty())
                            .map(|s| Value::String(s.to_string())),
                    )
                }
                "copies" => req.copies = Some(Value::String(value)),
                "offset" => req.offset = Some(Value::String(value)),
                other => log::debug!("ignoring query parameter {other}"),
            }
        }
        if !ids.is_empty() {
            req.package_ids = Some(Value::Array(ids));
        }
        req
    }

    pub fn validate(&self) -> Result<ValidatedRequest, Error> {
        let package_ids = parse_package_ids(self.package_ids.as_ref())?;
        let copies = coerce_count(self.copies.as_ref(), DEFAULT_COPIES, 1);
        let offset = coerce_count(self.offset.as_ref(), DEFAULT_OFFSET, 0);
        Ok(ValidatedRequest {
            package_ids,
            copies,
            offset,
        })
    }
}

fn parse_package_ids(value: Option<&Value>) -> Result<Vec<String>, Error> {
    let items: Vec<&Value> = match value {
        None | Some(Value::Null) => {
            return Err(Error::Validation("packageIds is required".into()));
        }
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::String(_)) => {
            return parse_package_ids(value.map(split_csv).as_ref());
        }
        Some(other) => {
            return Err(Error::Validation(format!(
                "packageIds must be a list of IDs, got {other}"
            )));
        }
    };

    let mut ids = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Value::String(s) if !s.trim().is_empty() => ids.push(s.trim().to_string()),
            other => {
                return Err(Error::Validation(format!(
                    "packageIds[{i}] must be a non-empty string, got {other}"
                )));
            }
        }
    }
    if ids.is_empty() {
        return Err(Error::Validation("packageIds must contain at least one ID".into()));
    }
    Ok(ids)
}

fn split_csv(value: &Value) -> Value {
    let s = value.as_str().unwrap_or_default();
    Value::Array(
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Value::String(p.to_string()))
            .collect(),
    )
}

/// Integer-prefix coercion: numbers truncate, strings read their leading
/// integer, anything else (or zero digits) yields `default`. Result is at least `min`.
fn coerce_count(value: Option<&Value>, default: usize, min: usize) -> usize {
    let parsed = match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Some(Value::String(s)) => parse_int_prefix(s),
        _ => None,
    };
    let n = match parsed {
        // A parsed zero counts as absent, so `copies=0` means one copy.
        Some(0) | None => default as i64,
        Some(n) => n,
    };
    usize::try_from(n).unwrap_or(0).max(min)
}

fn parse_int_prefix(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = &digits[..digits.bytes().take_while(u8::is_ascii_digit).count()];
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits
        .bytes()
        .fold(0i64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as i64));
    Some(if negative { -magnitude } else { magnitude })
}

/// Form-style decoding: `+` is a space, `%XX` a byte. Invalid UTF-8 is replaced.
fn form_decode(s: &str) -> String {
    percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn req(v: Value) -> LabelRequest {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn defaults_when_absent() {
        let v = req(json!({ "packageIds": ["a"] })).validate().unwrap();
        assert_eq!((v.copies, v.offset), (1, 0));
    }

    #[test]
    fn clamps_and_coerces() {
        let v = req(json!({ "packageIds": ["a"], "copies": -3, "offset": -7 }))
            .validate()
            .unwrap();
        assert_eq!((v.copies, v.offset), (1, 0));

        let v = req(json!({ "packageIds": ["a"], "copies": "3abc", "offset": "12" }))
            .validate()
            .unwrap();
        assert_eq!((v.copies, v.offset), (3, 12));

        let v = req(json!({ "packageIds": ["a"], "copies": "lots", "offset": true }))
            .validate()
            .unwrap();
        assert_eq!((v.copies, v.offset), (1, 0));

        let v = req(json!({ "packageIds": ["a"], "copies": 2.9, "offset": 0 }))
            .validate()
            .unwrap();
        assert_eq!((v.copies, v.offset), (2, 0));
    }

    #[test]
    fn snake_case_alias_accepted() {
        let v = req(json!({ "package_ids": ["x", "y"] })).validate().unwrap();
        assert_eq!(v.package_ids, vec!["x", "y"]);
    }

    #[test]
    fn rejects_missing_or_bad_ids() {
        for body in [
            json!({}),
            json!({ "packageIds": [] }),
            json!({ "packageIds": [""] }),
            json!({ "packageIds": [1, 2] }),
            json!({ "packageIds": { "a": 1 } }),
        ] {
            assert!(
                matches!(req(body.clone()).validate(), Err(Error::Validation(_))),
                "{body} should be rejected"
            );
        }
    }

    #[test]
    fn query_string_shape() {
        let v = LabelRequest::from_query("?packageIds=a%20b,c&copies=2&offset=5&theme=dark")
            .validate()
            .unwrap();
        assert_eq!(v.package_ids, vec!["a b", "c"]);
        assert_eq!((v.copies, v.offset), (2, 5));
    }

    #[test]
    fn query_escapes_need_two_hex_digits() {
        let v = LabelRequest::from_query("packageIds=a%+1b,c%2Bd+e,f%4").validate().unwrap();
        assert_eq!(v.package_ids, vec!["a% 1b", "c+d e", "f%4"]);
        assert!(v.package_ids.iter().all(|id| !id.chars().any(char::is_control)));
    }

    #[test]
    fn comma_string_ids() {
        let v = req(json!({ "packageIds": "a, b,,c" })).validate().unwrap();
        assert_eq!(v.package_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn malformed_json_is_validation_error() {
        assert!(matches!(
            LabelRequest::from_json("{ nope"),
            Err(Error::Validation(_))
        ));
    }
}
