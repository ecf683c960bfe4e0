//! Lossless response decoding
//!
//! LINE Pay transaction ids are 19-digit integers, beyond what an `f64` holds
//! exactly. Responses are parsed with `serde_json`'s arbitrary-precision
//! numbers and then every number in the tree is narrowed:
//!
//! - integers within ±(2^53 - 1) stay JSON numbers
//! - decimals with at most 15 significant digits stay JSON numbers
//! - anything else becomes a JSON string holding the exact numeral
//!
//! Digits are never altered. `serde_json` writes exponents with an explicit
//! sign, so `1e400` comes back as `"1e+400"`.
//!
//! The provider does not mark which fields can overflow, so the rule applies
//! to every field of the response, not just ids.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

use crate::error::{Error, ProviderError, SUCCESS_RETURN_CODE};

/// Largest integer an `f64` represents exactly, along with all smaller ones
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;
/// Significant digits an `f64` round-trips for any decimal literal
const MAX_SIGNIFICANT_DIGITS: usize = 15;

/// Parse a JSON document without losing numeric precision
pub fn decode_lossless(text: &str) -> Result<Value, Error> {
    let value: Value = serde_json::from_str(text)?;
    Ok(narrow(value))
}

/// Narrow every number in `value` to a native number or an exact string
pub fn narrow(value: Value) -> Value {
    match value {
        Value::Number(n) => narrow_number(&n),
        Value::Array(items) => Value::Array(items.into_iter().map(narrow).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, narrow(v))).collect()),
        other => other,
    }
}

fn narrow_number(n: &Number) -> Value {
    let literal = n.to_string();
    match exact_number(&literal) {
        Some(native) => Value::Number(native),
        None => Value::String(literal),
    }
}

/// Convert a numeric literal to a native number only when the conversion is exact
fn exact_number(literal: &str) -> Option<Number> {
    if !literal.contains(['.', 'e', 'E']) {
        return literal
            .parse::<i64>()
            .ok()
            .filter(|i| i.unsigned_abs() <= MAX_SAFE_INTEGER)
            .map(Number::from);
    }

    let float: f64 = literal.parse().ok()?;
    let digits = significant_digits(literal);
    if !float.is_finite() || digits > MAX_SIGNIFICANT_DIGITS {
        return None;
    }
    // underflow to zero
    if float == 0.0 && digits > 0 {
        return None;
    }
    Number::from_f64(float)
}

fn significant_digits(literal: &str) -> usize {
    let mantissa = literal.split(['e', 'E']).next().unwrap_or(literal);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}

/// Deserialize a field that may arrive as a string or as a number
///
/// After [`narrow`], an id is a number when it is small and a string when it
/// is not; typed views always want the string.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, found {}",
            other
        ))),
    }
}

/// Decoded LINE Pay response envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResult {
    /// Provider result code, `"0000"` on success
    pub return_code: String,
    /// Provider message
    #[serde(default)]
    pub return_message: String,
    /// Operation-specific payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

impl ApiResult {
    /// Decode a raw response body
    pub fn from_body(text: &str) -> Result<Self, Error> {
        let Value::Object(mut body) = decode_lossless(text)? else {
            return Err(Error::InvalidResponse(
                "response body is not a JSON object".to_string(),
            ));
        };

        let return_code = match body.remove("returnCode") {
            Some(Value::String(code)) => code,
            _ => {
                return Err(Error::InvalidResponse(
                    "response body has no returnCode".to_string(),
                ))
            }
        };
        let return_message = match body.remove("returnMessage") {
            Some(Value::String(message)) => message,
            _ => String::new(),
        };

        Ok(Self {
            return_code,
            return_message,
            info: body.remove("info"),
        })
    }

    /// Check if the provider accepted the call
    pub fn is_success(&self) -> bool {
        self.return_code == SUCCESS_RETURN_CODE
    }

    /// Turn a provider failure into [`Error::Provider`]
    pub fn into_result(self) -> Result<Self, Error> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ProviderError {
                return_code: self.return_code,
                return_message: self.return_message,
            }
            .into())
        }
    }

    /// Deserialize `info` into a typed view
    pub fn info_as<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let info = self.info.clone().unwrap_or(Value::Null);
        serde_json::from_value(info).map_err(|e| Error::UnexpectedInfo(e.to_string()))
    }
}
