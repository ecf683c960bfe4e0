//! Parameter validation
//!
//! Every operation takes a loose JSON object and declares which keys it
//! requires and which it merely accepts. [`OperationSpec::validate`] is the
//! single routine that checks a parameter object against such a declaration,
//! and it runs before any request is signed or sent.
//!
//! Required keys are checked first, in declaration order. A required key
//! counts as missing when it is absent or falsy (`null`, `false`, `0`, `""`).
//! Then every present key must belong to the required or optional set.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::Error;

/// Parameter object passed to an operation
pub type Params = Map<String, Value>;

/// Required and optional keys of one operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    /// Keys that must be present and truthy
    pub required: &'static [&'static str],
    /// Keys that may be present
    pub optional: &'static [&'static str],
}

impl OperationSpec {
    /// Declare an operation's parameter set
    pub const fn new(required: &'static [&'static str], optional: &'static [&'static str]) -> Self {
        Self { required, optional }
    }

    /// Check whether `key` is a recognized parameter
    pub fn allows(&self, key: &str) -> bool {
        self.required.contains(&key) || self.optional.contains(&key)
    }

    /// Validate a parameter object against this spec
    pub fn validate(&self, params: &Params) -> Result<(), Error> {
        for name in self.required {
            if params.get(*name).map_or(true, is_falsy) {
                return Err(Error::config(format!(
                    "Required parameter {} is missing.",
                    name
                )));
            }
        }

        if let Some(unknown) = params.keys().find(|key| !self.allows(key)) {
            return Err(Error::config(format!(
                "{} is not a valid parameter.",
                unknown
            )));
        }

        Ok(())
    }
}

/// Client construction options
pub const CLIENT_OPTIONS: OperationSpec = OperationSpec::new(
    &["channelId", "channelSecret"],
    &["proxyUrl", "hostname", "isSandbox", "protocolVersion"],
);

/// Reserve payment, v2 protocol
pub const RESERVE_V2: OperationSpec = OperationSpec::new(
    &["productName", "amount", "currency", "confirmUrl", "orderId"],
    &[
        "productImageUrl",
        "mid",
        "oneTimeKey",
        "confirmUrlType",
        "checkConfirmUrlBrowser",
        "cancelUrl",
        "packageName",
        "deliveryPlacePhone",
        "payType",
        "langCd",
        "capture",
        "extras",
    ],
);

/// Reserve payment, v3 protocol
///
/// One of `confirmUrl` or `redirectUrls` must also be present; the client
/// checks that separately.
pub const RESERVE_V3: OperationSpec = OperationSpec::new(
    &["productName", "amount", "currency", "orderId"],
    &[
        "productImageUrl",
        "confirmUrl",
        "confirmUrlType",
        "cancelUrl",
        "packages",
        "redirectUrls",
        "options",
        "payType",
        "capture",
        "langCd",
    ],
);

/// Confirm a reserved payment
pub const CONFIRM: OperationSpec =
    OperationSpec::new(&["transactionId", "amount", "currency"], &[]);

/// Pay with a preapproved regKey
pub const PAY_PREAPPROVED: OperationSpec = OperationSpec::new(
    &["regKey", "productName", "amount", "currency", "orderId"],
    &["capture"],
);

/// Check availability of a regKey
pub const CHECK_REG_KEY: OperationSpec = OperationSpec::new(&["regKey"], &["creditCardAuth"]);

/// Expire a regKey
pub const EXPIRE_REG_KEY: OperationSpec = OperationSpec::new(&["regKey"], &[]);

/// Void an authorization
pub const VOID: OperationSpec = OperationSpec::new(&["transactionId"], &[]);

/// Inquire authorizations
pub const INQUIRE_AUTHORIZATION: OperationSpec =
    OperationSpec::new(&[], &["transactionId", "orderId"]);

/// Capture an authorization
pub const CAPTURE: OperationSpec =
    OperationSpec::new(&["transactionId", "amount", "currency"], &[]);

/// Inquire payments
pub const PAYMENT_DETAILS: OperationSpec =
    OperationSpec::new(&[], &["transactionId", "orderId", "fields"]);

/// Refund a payment
pub const REFUND: OperationSpec = OperationSpec::new(&["transactionId"], &["refundAmount"]);

/// Check whether a value counts as missing
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Serialize caller input into a parameter object
pub fn to_params<T: Serialize + ?Sized>(value: &T) -> Result<Params, Error> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(Error::config("Parameters must be an object.")),
        Err(e) => Err(Error::config(format!("Invalid parameters: {}", e))),
    }
}

/// Render a parameter value for a URL path or query
///
/// Strings are used as-is; numbers keep their exact literal.
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
