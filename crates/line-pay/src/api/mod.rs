//! LINE Pay API client
//!
//! This module implements the LINE Pay online payment API, v3 (signed
//! requests) and v2 (static secret header).
//! See <https://pay.line.me/jp/developers/apis/onlineApis> for the reference.
//!
//! # Endpoints
//!
//! All paths are prefixed with the API version, e.g. `/v3`.
//!
//! ## Payments
//!
//! | Method | Endpoint | Client method |
//! |--------|----------|---------------|
//! | POST | `/payments/request` | [`LinePay::request`] |
//! | POST | `/payments/{transactionId}/confirm` | [`LinePay::confirm`] |
//! | POST | `/payments/{transactionId}/refund` | [`LinePay::refund`] |
//! | GET | `/payments` | [`LinePay::payment_details`] |
//!
//! **Payment Flow:**
//! 1. Reserve with `request` and redirect the buyer to `info.paymentUrl.web`
//! 2. The buyer approves and is sent back to `confirmUrl?transactionId=...`
//! 3. Confirm with the same amount and currency
//!
//! ## Authorizations
//!
//! | Method | Endpoint | Client method |
//! |--------|----------|---------------|
//! | GET | `/payments/authorizations` | [`LinePay::inquire_authorization`] |
//! | POST | `/payments/authorizations/{transactionId}/capture` | [`LinePay::capture`] |
//! | POST | `/payments/authorizations/{transactionId}/void` | [`LinePay::void`] |
//!
//! ## Preapproved Payments
//!
//! | Method | Endpoint | Client method |
//! |--------|----------|---------------|
//! | POST | `/payments/preapprovedPay/{regKey}/payment` | [`LinePay::pay_preapproved`] |
//! | GET | `/payments/preapprovedPay/{regKey}/check` | [`LinePay::check_reg_key`] |
//! | POST | `/payments/preapprovedPay/{regKey}/expire` | [`LinePay::expire_reg_key`] |
//!
//! # Authentication
//!
//! See [`crate::auth`]. The strategy follows
//! [`LinePayConfig::protocol_version`].
//!
//! # Responses
//!
//! Every response is decoded losslessly (see [`crate::decode`]). A
//! `returnCode` other than `"0000"` becomes [`Error::Provider`].

pub mod types;

use std::sync::Arc;

use reqwest::header::HeaderMap;
use reqwest::Method;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Authenticator, HmacSigner, StaticSecret};
use crate::config::{LinePayConfig, ProtocolVersion};
use crate::decode::ApiResult;
use crate::error::Error;
use crate::params::{self, is_falsy, render, to_params, OperationSpec, Params};
use crate::transport::{ApiRequest, HttpTransport, ReqwestTransport};

/// A request ready to be authenticated and sent
struct Call {
    action: &'static str,
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<Value>,
}

impl Call {
    fn get(action: &'static str, path: String) -> Self {
        Self {
            action,
            method: Method::GET,
            path,
            query: Vec::new(),
            body: None,
        }
    }

    fn post(action: &'static str, path: String, body: Option<Value>) -> Self {
        Self {
            action,
            method: Method::POST,
            path,
            query: Vec::new(),
            body,
        }
    }

    fn query(mut self, name: &'static str, value: String) -> Self {
        self.query.push((name, value));
        self
    }
}

/// LINE Pay API client
///
/// Cheap to clone; clones share the transport and nonce sequence.
#[derive(Clone)]
pub struct LinePay {
    config: Arc<LinePayConfig>,
    base_url: Url,
    headers: HeaderMap,
    auth: Arc<dyn Authenticator>,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for LinePay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinePay")
            .field("channel_id", &self.config.channel_id)
            .field("base_url", &self.base_url.as_str())
            .field("protocol_version", &self.config.protocol_version)
            .field("auth", &self.auth)
            .finish()
    }
}

impl LinePay {
    /// Create a client with its own `reqwest` transport
    pub fn new(config: LinePayConfig) -> Result<Self, Error> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.proxy_url.as_deref())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client from a loose option object
    ///
    /// ```rust,no_run
    /// # fn main() -> Result<(), line_pay::Error> {
    /// let pay = line_pay::LinePay::from_options(&serde_json::json!({
    ///     "channelId": "1234567890",
    ///     "channelSecret": "secret",
    ///     "isSandbox": true
    /// }))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_options<T: Serialize + ?Sized>(options: &T) -> Result<Self, Error> {
        Self::new(LinePayConfig::from_options(options)?)
    }

    /// Create a client on top of a caller-supplied transport
    pub fn with_transport(
        config: LinePayConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let auth: Arc<dyn Authenticator> = match config.protocol_version {
            ProtocolVersion::V2 => Arc::new(StaticSecret::new(&config.channel_secret)?),
            ProtocolVersion::V3 => Arc::new(HmacSigner::new(&config.channel_secret)),
        };

        Ok(Self {
            base_url: config.base_url()?,
            headers: config.default_headers()?,
            config: Arc::new(config),
            auth,
            transport,
        })
    }

    /// Client configuration
    pub fn config(&self) -> &LinePayConfig {
        &self.config
    }

    /// Headers sent with every request, before authentication
    pub fn default_headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn url(&self, path: &str, query: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!(
            "{}{}",
            self.base_url.path().trim_end_matches('/'),
            path
        ));
        url.set_query((!query.is_empty()).then_some(query));
        url
    }

    /// Authenticate, send and decode one call
    async fn dispatch(&self, call: Call) -> Result<ApiResult, Error> {
        let path = format!("/{}{}", self.auth.api_version(), call.path);
        let query = call
            .query
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&");

        let request = if call.method == Method::GET {
            ApiRequest {
                headers: self.auth.authenticate(&self.headers, &path, &query)?,
                url: self.url(&path, &query),
                method: call.method,
                body: None,
            }
        } else {
            let body = match call.body {
                Some(ref body) => serde_json::to_string(body)?,
                None => String::new(),
            };
            ApiRequest {
                headers: self.auth.authenticate(&self.headers, &path, &body)?,
                url: self.url(&path, &query),
                method: call.method,
                body: Some(body),
            }
        };

        let text = self.transport.send(request).await?;

        match ApiResult::from_body(&text).and_then(ApiResult::into_result) {
            Ok(result) => {
                debug!("Completed {}.", call.action);
                debug!("{:?}", result);
                Ok(result)
            }
            Err(e) => {
                warn!("Failed to {}: {}", call.action, e);
                Err(e)
            }
        }
    }

    // ==================== Payment Endpoints ====================

    /// Reserve a payment
    ///
    /// Requires `productName`, `amount`, `currency`, `orderId` and
    /// `confirmUrl`; on v3 `redirectUrls` may stand in for `confirmUrl`. On v3
    /// the flat fields are mapped onto the v3
    /// body (`packages`, `redirectUrls`, `options`) unless those are given.
    pub async fn request<T: Serialize + ?Sized>(&self, options: &T) -> Result<ApiResult, Error> {
        let params = to_params(options)?;

        let body = match self.config.protocol_version {
            ProtocolVersion::V2 => {
                params::RESERVE_V2.validate(&params)?;
                Value::Object(params)
            }
            ProtocolVersion::V3 => {
                params::RESERVE_V3.validate(&params)?;
                if ["confirmUrl", "redirectUrls"]
                    .iter()
                    .all(|name| params.get(*name).map_or(true, is_falsy))
                {
                    return Err(Error::config("Required parameter confirmUrl is missing."));
                }
                reserve_body_v3(params)
            }
        };

        debug!("Going to reserve payment...");
        self.dispatch(Call::post(
            "reserve payment",
            "/payments/request".to_string(),
            Some(body),
        ))
        .await
    }

    /// Reserve a payment
    #[deprecated(note = "use `request`")]
    pub async fn reserve<T: Serialize + ?Sized>(&self, options: &T) -> Result<ApiResult, Error> {
        self.request(options).await
    }

    /// Confirm a reserved payment
    ///
    /// Requires `transactionId`, `amount`, `currency`.
    pub async fn confirm<T: Serialize + ?Sized>(&self, options: &T) -> Result<ApiResult, Error> {
        let params = validated(options, &params::CONFIRM)?;
        let transaction_id = segment(&params, "transactionId");

        debug!(
            "Going to confirm payment of transaction: {}...",
            transaction_id
        );
        self.dispatch(Call::post(
            "confirm payment",
            format!("/payments/{}/confirm", transaction_id),
            Some(amount_body(&params)),
        ))
        .await
    }

    /// Refund a captured payment
    ///
    /// Requires `transactionId`; `refundAmount` for a partial refund.
    pub async fn refund<T: Serialize + ?Sized>(&self, options: &T) -> Result<ApiResult, Error> {
        let params = validated(options, &params::REFUND)?;
        let transaction_id = segment(&params, "transactionId");

        let mut body = Map::new();
        if let Some(refund_amount) = params.get("refundAmount").filter(|v| !v.is_null()) {
            body.insert("refundAmount".to_string(), refund_amount.clone());
        }

        debug!("Going to refund payment of transaction: {}...", transaction_id);
        self.dispatch(Call::post(
            "refund payment",
            format!("/payments/{}/refund", transaction_id),
            Some(Value::Object(body)),
        ))
        .await
    }

    /// Inquire payments by `transactionId` or `orderId`
    pub async fn payment_details<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        let params = validated(options, &params::PAYMENT_DETAILS)?;

        debug!("Going to inquire payment...");
        let call = filter_query(
            Call::get("inquire payment", "/payments".to_string()),
            &params,
            &["transactionId", "orderId", "fields"],
        );
        self.dispatch(call).await
    }

    /// Inquire payments
    #[deprecated(note = "use `payment_details`")]
    pub async fn inquire_payment<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        self.payment_details(options).await
    }

    // ==================== Authorization Endpoints ====================

    /// Inquire authorizations by `transactionId` or `orderId`
    pub async fn inquire_authorization<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        let params = validated(options, &params::INQUIRE_AUTHORIZATION)?;

        debug!("Going to inquire authorization...");
        let call = filter_query(
            Call::get("inquire authorization", "/payments/authorizations".to_string()),
            &params,
            &["transactionId", "orderId"],
        );
        self.dispatch(call).await
    }

    /// Capture an authorized payment
    ///
    /// Requires `transactionId`, `amount`, `currency`.
    pub async fn capture<T: Serialize + ?Sized>(&self, options: &T) -> Result<ApiResult, Error> {
        let params = validated(options, &params::CAPTURE)?;
        let transaction_id = segment(&params, "transactionId");

        debug!("Going to capture payment of transaction: {}...", transaction_id);
        self.dispatch(Call::post(
            "capture payment",
            format!("/payments/authorizations/{}/capture", transaction_id),
            Some(amount_body(&params)),
        ))
        .await
    }

    /// Void an authorized payment
    ///
    /// Requires `transactionId`.
    pub async fn void<T: Serialize + ?Sized>(&self, options: &T) -> Result<ApiResult, Error> {
        let params = validated(options, &params::VOID)?;
        let transaction_id = segment(&params, "transactionId");

        debug!(
            "Going to void authorized payment of transaction: {}...",
            transaction_id
        );
        self.dispatch(Call::post(
            "void payment",
            format!("/payments/authorizations/{}/void", transaction_id),
            None,
        ))
        .await
    }

    /// Void an authorized payment
    #[deprecated(note = "use `void`")]
    pub async fn void_authorization<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        self.void(options).await
    }

    // ==================== Preapproved Payment Endpoints ====================

    /// Pay with a preapproved regKey
    ///
    /// Requires `regKey`, `productName`, `amount`, `currency`, `orderId`.
    pub async fn pay_preapproved<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        let mut params = validated(options, &params::PAY_PREAPPROVED)?;
        let reg_key = segment(&params, "regKey");
        params.remove("regKey");

        debug!("Going to execute preapproved payment for regKey: {}...", reg_key);
        self.dispatch(Call::post(
            "execute preapproved payment",
            format!("/payments/preapprovedPay/{}/payment", reg_key),
            Some(Value::Object(params)),
        ))
        .await
    }

    /// Pay with a preapproved regKey
    #[deprecated(note = "use `pay_preapproved`")]
    pub async fn confirm_preapproved_pay<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        self.pay_preapproved(options).await
    }

    /// Check that a regKey can still be used
    ///
    /// Requires `regKey`; `creditCardAuth: true` runs a minimum-amount card
    /// authorization as part of the check.
    pub async fn check_reg_key<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        let params = validated(options, &params::CHECK_REG_KEY)?;
        let reg_key = segment(&params, "regKey");

        let mut call = Call::get(
            "check preapproved payment",
            format!("/payments/preapprovedPay/{}/check", reg_key),
        );
        if params.get("creditCardAuth") == Some(&Value::Bool(true)) {
            call = call.query("creditCardAuth", "true".to_string());
        }

        debug!(
            "Going to check availability of preapproved payment for regKey: {}...",
            reg_key
        );
        self.dispatch(call).await
    }

    /// Check that a regKey can still be used
    #[deprecated(note = "use `check_reg_key`")]
    pub async fn check_preapproved_pay<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        self.check_reg_key(options).await
    }

    /// Expire a regKey
    ///
    /// Requires `regKey`.
    pub async fn expire_reg_key<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        let params = validated(options, &params::EXPIRE_REG_KEY)?;
        let reg_key = segment(&params, "regKey");

        debug!("Going to expire preapproved payment for regKey: {}...", reg_key);
        self.dispatch(Call::post(
            "expire preapproved payment",
            format!("/payments/preapprovedPay/{}/expire", reg_key),
            None,
        ))
        .await
    }

    /// Expire a regKey
    #[deprecated(note = "use `expire_reg_key`")]
    pub async fn expire_preapproved_pay<T: Serialize + ?Sized>(
        &self,
        options: &T,
    ) -> Result<ApiResult, Error> {
        self.expire_reg_key(options).await
    }
}

fn validated<T: Serialize + ?Sized>(options: &T, spec: &OperationSpec) -> Result<Params, Error> {
    let params = to_params(options)?;
    spec.validate(&params)?;
    Ok(params)
}

/// Percent-encoded path segment for an identifier parameter
fn segment(params: &Params, name: &str) -> String {
    let value = params.get(name).map(render).unwrap_or_default();
    urlencoding::encode(&value).into_owned()
}

fn amount_body(params: &Params) -> Value {
    json!({
        "amount": params.get("amount"),
        "currency": params.get("currency"),
    })
}

fn filter_query(mut call: Call, params: &Params, names: &[&'static str]) -> Call {
    for &name in names {
        if let Some(value) = params.get(name).filter(|v| !is_falsy(v)) {
            call = call.query(name, render(value));
        }
    }
    call
}

/// Map flat reserve parameters onto the v3 request body
fn reserve_body_v3(mut params: Params) -> Value {
    let product_name = params.remove("productName").unwrap_or(Value::Null);
    let product_image_url = params.remove("productImageUrl");
    let confirm_url = params.remove("confirmUrl");
    let confirm_url_type = params.remove("confirmUrlType");
    let cancel_url = params.remove("cancelUrl");
    let pay_type = params.remove("payType");
    let capture = params.remove("capture");
    let lang_cd = params.remove("langCd");

    let amount = params.get("amount").cloned().unwrap_or(Value::Null);
    let order_id = params.get("orderId").cloned().unwrap_or(Value::Null);

    if !params.contains_key("packages") {
        let mut product = json!({
            "name": product_name,
            "quantity": 1,
            "price": amount,
        });
        if let Some(image_url) = product_image_url {
            product["imageUrl"] = image_url;
        }
        params.insert(
            "packages".to_string(),
            json!([{
                "id": order_id,
                "amount": amount,
                "name": product_name,
                "products": [product],
            }]),
        );
    }

    if !params.contains_key("redirectUrls") {
        let mut redirect_urls = Map::new();
        for (name, value) in [
            ("confirmUrl", confirm_url),
            ("confirmUrlType", confirm_url_type),
            ("cancelUrl", cancel_url),
        ] {
            if let Some(value) = value {
                redirect_urls.insert(name.to_string(), value);
            }
        }
        if !redirect_urls.is_empty() {
            params.insert("redirectUrls".to_string(), Value::Object(redirect_urls));
        }
    }

    let mut options = match params.remove("options") {
        Some(Value::Object(options)) => options,
        _ => Map::new(),
    };
    for (section, name, value) in [
        ("payment", "payType", pay_type),
        ("payment", "capture", capture),
        ("display", "locale", lang_cd),
    ] {
        if let Some(value) = value {
            let entry = options
                .entry(section)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(entry) = entry {
                entry.entry(name).or_insert(value);
            }
        }
    }
    if !options.is_empty() {
        params.insert("options".to_string(), Value::Object(options));
    }

    Value::Object(params)
}
