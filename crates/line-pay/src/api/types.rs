//! LINE Pay type definitions
//!
//! Operations accept any serializable JSON object, so these request types are
//! a convenience: they serialize to the same `camelCase` keys the loose
//! parameter objects use, and skip unset fields.
//!
//! Response types are typed views over [`ApiResult::info`](crate::ApiResult),
//! read with [`ApiResult::info_as`](crate::ApiResult::info_as).
//!
//! ## Transaction ids
//!
//! LINE Pay transaction ids are 19-digit integers. They always come back as
//! `String` here, whatever size they had on the wire.
//!
//! ## Supported Currencies
//!
//! `JPY`, `TWD`, `THB`, `USD`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::decode::string_or_number;
use crate::error::Error;

/// Currencies accepted by LINE Pay
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Japanese Yen
    JPY,
    /// New Taiwan Dollar
    TWD,
    /// Thai Baht
    THB,
    /// US Dollar
    USD,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::JPY => write!(f, "JPY"),
            Currency::TWD => write!(f, "TWD"),
            Currency::THB => write!(f, "THB"),
            Currency::USD => write!(f, "USD"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JPY" => Ok(Currency::JPY),
            "TWD" => Ok(Currency::TWD),
            "THB" => Ok(Currency::THB),
            "USD" => Ok(Currency::USD),
            _ => Err(Error::config(format!("Unknown currency: {}", s))),
        }
    }
}

/// Where LINE Pay sends the buyer after approval
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmUrlType {
    /// Buyer's browser is redirected to `confirmUrl`
    Client,
    /// LINE Pay calls `confirmUrl` server to server
    Server,
    /// No redirect
    None,
}

/// Payment type
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayType {
    /// One-off payment
    Normal,
    /// Registers a regKey for later preapproved payments
    Preapproved,
}

/// Reserve (request) payment parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveRequest {
    /// Product name shown to the buyer
    pub product_name: String,
    /// Payment amount
    pub amount: u64,
    /// Payment currency
    pub currency: Currency,
    /// Merchant order id, unique per payment
    pub order_id: String,
    /// URL the buyer returns to after approval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_url: Option<String>,
    /// How `confirm_url` is used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm_url_type: Option<ConfirmUrlType>,
    /// URL the buyer returns to after cancelling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_url: Option<String>,
    /// Product image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_image_url: Option<String>,
    /// Payment type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pay_type: Option<PayType>,
    /// Capture on confirm (`true`) or only authorize (`false`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<bool>,
    /// Payment page language
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang_cd: Option<String>,
}

impl ReserveRequest {
    /// Create a reserve request with the required fields
    pub fn new(
        product_name: impl Into<String>,
        amount: u64,
        currency: Currency,
        order_id: impl Into<String>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            amount,
            currency,
            order_id: order_id.into(),
            confirm_url: None,
            confirm_url_type: None,
            cancel_url: None,
            product_image_url: None,
            pay_type: None,
            capture: None,
            lang_cd: None,
        }
    }

    /// Set the confirm URL
    pub fn confirm_url(mut self, url: impl Into<String>, kind: Option<ConfirmUrlType>) -> Self {
        self.confirm_url = Some(url.into());
        self.confirm_url_type = kind;
        self
    }

    /// Set the cancel URL
    pub fn cancel_url(mut self, url: impl Into<String>) -> Self {
        self.cancel_url = Some(url.into());
        self
    }

    /// Set the payment type
    pub fn pay_type(mut self, pay_type: PayType) -> Self {
        self.pay_type = Some(pay_type);
        self
    }

    /// Authorize only; capture later
    pub fn authorize_only(mut self) -> Self {
        self.capture = Some(false);
        self
    }
}

/// Confirm or capture parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    /// Transaction id returned by reserve
    pub transaction_id: String,
    /// Amount, must match the reservation
    pub amount: u64,
    /// Currency, must match the reservation
    pub currency: Currency,
}

/// Capture uses the same parameters as confirm
pub type CaptureRequest = ConfirmRequest;

/// Preapproved payment parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreapprovedPayRequest {
    /// regKey returned by a PREAPPROVED confirm
    pub reg_key: String,
    /// Product name
    pub product_name: String,
    /// Payment amount
    pub amount: u64,
    /// Payment currency
    pub currency: Currency,
    /// Merchant order id
    pub order_id: String,
    /// Capture immediately, defaults to `true` on the provider side
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<bool>,
}

/// Refund parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    /// Transaction id to refund
    pub transaction_id: String,
    /// Partial refund amount, full refund when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<u64>,
}

/// Filter for payment and authorization inquiries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InquiryQuery {
    /// Transaction id to look up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Order id to look up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}

impl InquiryQuery {
    /// Look up by transaction id
    pub fn transaction(transaction_id: impl Into<String>) -> Self {
        Self {
            transaction_id: Some(transaction_id.into()),
            order_id: None,
        }
    }

    /// Look up by order id
    pub fn order(order_id: impl Into<String>) -> Self {
        Self {
            transaction_id: None,
            order_id: Some(order_id.into()),
        }
    }
}

/// Payment page URLs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUrl {
    /// URL for desktop/mobile browsers
    pub web: String,
    /// URL for the LINE app
    pub app: String,
}

/// `info` of a successful reserve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveInfo {
    /// Transaction id to confirm later
    #[serde(deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Payment page URLs
    pub payment_url: PaymentUrl,
    /// Token for the LINE Pay in-app flow
    #[serde(default)]
    pub payment_access_token: Option<String>,
}

/// One payment method used in a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayInfo {
    /// Payment method, e.g. `BALANCE` or `CREDIT_CARD`
    pub method: String,
    /// Amount paid with this method
    pub amount: f64,
    /// Card nickname
    #[serde(default)]
    pub credit_card_nickname: Option<String>,
    /// Card brand
    #[serde(default)]
    pub credit_card_brand: Option<String>,
}

/// `info` of a successful confirm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmInfo {
    /// Merchant order id
    pub order_id: String,
    /// Transaction id
    #[serde(deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Payment methods used
    #[serde(default)]
    pub pay_info: Vec<PayInfo>,
    /// Issued for PREAPPROVED payments
    #[serde(default)]
    pub reg_key: Option<String>,
}

/// `info` of a successful preapproved payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreapprovedPayInfo {
    /// Transaction id
    #[serde(deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Transaction time (ISO 8601)
    pub transaction_date: String,
}

/// `info` of a successful refund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundInfo {
    /// Id of the refund transaction
    #[serde(deserialize_with = "string_or_number")]
    pub refund_transaction_id: String,
    /// Refund time (ISO 8601)
    pub refund_transaction_date: String,
}

/// One entry of a payment or authorization inquiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetail {
    /// Transaction id
    #[serde(deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Transaction time (ISO 8601)
    pub transaction_date: String,
    /// `PAYMENT`, `PAYMENT_REFUND` or `PARTIAL_REFUND`
    pub transaction_type: String,
    /// Merchant order id
    #[serde(default)]
    pub order_id: Option<String>,
    /// Product name
    #[serde(default)]
    pub product_name: Option<String>,
    /// Currency
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Payment methods used
    #[serde(default)]
    pub pay_info: Vec<PayInfo>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::decode::ApiResult;

    #[test]
    fn test_reserve_request_serializes_camel_case() {
        let request = ReserveRequest::new("demo product", 1, Currency::JPY, "order-1")
            .confirm_url("https://example.com/confirm", Some(ConfirmUrlType::Server))
            .pay_type(PayType::Preapproved);

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "productName": "demo product",
                "amount": 1,
                "currency": "JPY",
                "orderId": "order-1",
                "confirmUrl": "https://example.com/confirm",
                "confirmUrlType": "SERVER",
                "payType": "PREAPPROVED"
            })
        );
    }

    #[test]
    fn test_currency_from_str() {
        assert_eq!("jpy".parse::<Currency>().unwrap(), Currency::JPY);
        assert!("ZZZ".parse::<Currency>().is_err());
    }

    #[test]
    fn test_reserve_info_keeps_transaction_id() {
        let result = ApiResult::from_body(
            r#"{"returnCode":"0000","returnMessage":"OK","info":{"transactionId":1234567890123456789,"paymentUrl":{"web":"https://pay.example/w","app":"https://pay.example/a"},"paymentAccessToken":"187568751124"}}"#,
        )
        .unwrap();

        let info: ReserveInfo = result.info_as().unwrap();
        assert_eq!(info.transaction_id, "1234567890123456789");
        assert_eq!(info.payment_url.app, "https://pay.example/a");
        assert_eq!(info.payment_access_token.as_deref(), Some("187568751124"));
    }

    #[test]
    fn test_payment_details_list() {
        let result = ApiResult::from_body(
            r#"{"returnCode":"0000","returnMessage":"OK","info":[{"transactionId":2019049910005496810,"transactionDate":"2019-04-09T07:01:53Z","transactionType":"PAYMENT","currency":"JPY","payInfo":[{"method":"BALANCE","amount":1}]}]}"#,
        )
        .unwrap();

        let details: Vec<PaymentDetail> = result.info_as().unwrap();
        assert_eq!(details[0].transaction_id, "2019049910005496810");
        assert_eq!(details[0].currency, Some(Currency::JPY));
        assert_eq!(details[0].pay_info[0].method, "BALANCE");
        assert_eq!(details[0].pay_info[0].amount, 1.0);
    }
}
