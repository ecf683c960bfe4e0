//! LINE Pay REST API client
//!
//! Builds authenticated requests for the LINE Pay payment lifecycle (reserve,
//! confirm, capture, void, refund, preapproved payments and inquiries),
//! validates parameters before anything is sent, and decodes responses
//! without losing the precision of 19-digit transaction ids.
//!
//! ```rust,no_run
//! use line_pay::{LinePay, LinePayConfig};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), line_pay::Error> {
//! let pay = LinePay::new(LinePayConfig::new("1234567890", "secret").sandbox(true))?;
//!
//! let reserved = pay
//!     .request(&json!({
//!         "productName": "demo product",
//!         "amount": 1,
//!         "currency": "JPY",
//!         "orderId": "order-1",
//!         "confirmUrl": "https://shop.example/pay/confirm"
//!     }))
//!     .await?;
//!
//! let info = reserved.info.unwrap_or_default();
//! pay.confirm(&json!({
//!     "transactionId": info["transactionId"],
//!     "amount": 1,
//!     "currency": "JPY"
//! }))
//! .await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod api;
pub mod auth;
pub mod checkout;
pub mod config;
pub mod decode;
pub mod env_vars;
pub mod error;
pub mod params;
pub mod transport;

pub use api::types;
pub use api::LinePay;
pub use auth::{Authenticator, HmacSigner, NonceGenerator, StaticSecret};
pub use checkout::{checkout_router, MemoryReservationStore, Reservation, ReservationStore};
pub use config::{LinePayConfig, ProtocolVersion};
pub use decode::ApiResult;
pub use error::{Error, ProviderError};
pub use params::{OperationSpec, Params};
pub use transport::{ApiRequest, HttpTransport, ReqwestTransport};
