//! Redirect checkout flow
//!
//! An axum [`Router`] that drives the browser side of a LINE Pay payment:
//!
//! 1. `GET /` reserves a payment built from a [`ReserveRequest`] template with
//!    a fresh `orderId`, stores the reservation and redirects the buyer to
//!    `info.paymentUrl.web`.
//! 2. LINE Pay sends the buyer back to the template's `confirmUrl` with
//!    `?transactionId=...`. Mount the router so that URL hits `GET /confirm`.
//! 3. `GET /confirm` takes the stored reservation and confirms it with the
//!    stored amount and currency, answering with the decoded result as JSON.
//!
//! Reservations live in a [`ReservationStore`]; [`MemoryReservationStore`]
//! keeps them in process, optionally with a TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::types::{ConfirmRequest, Currency, ReserveInfo, ReserveRequest};
use crate::api::LinePay;
use crate::error::Error;

/// A reserved payment waiting for confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    /// Transaction id returned by reserve
    pub transaction_id: String,
    /// Merchant order id
    pub order_id: String,
    /// Reserved amount
    pub amount: u64,
    /// Reserved currency
    pub currency: Currency,
}

/// Storage for reservations between reserve and confirm
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Save a reservation under its transaction id
    async fn put(&self, reservation: Reservation) -> Result<(), Error>;

    /// Remove and return the reservation for `transaction_id`
    async fn take(&self, transaction_id: &str) -> Result<Option<Reservation>, Error>;
}

/// In-process [`ReservationStore`]
///
/// Without a TTL, reservations of buyers who never come back stay until the
/// process exits. Use [`MemoryReservationStore::with_ttl`] for a long-running
/// server.
#[derive(Debug, Default)]
pub struct MemoryReservationStore {
    ttl: Option<Duration>,
    reservations: RwLock<HashMap<String, (Instant, Reservation)>>,
}

impl MemoryReservationStore {
    /// Create an empty store that keeps reservations indefinitely
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that drops reservations older than `ttl`
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            reservations: RwLock::default(),
        }
    }

    fn is_expired(&self, stored_at: Instant) -> bool {
        self.ttl.is_some_and(|ttl| stored_at.elapsed() >= ttl)
    }

    /// Number of pending reservations
    pub async fn len(&self) -> usize {
        self.reservations.read().await.len()
    }

    /// Check if no reservation is pending
    pub async fn is_empty(&self) -> bool {
        self.reservations.read().await.is_empty()
    }
}

#[async_trait]
impl ReservationStore for MemoryReservationStore {
    async fn put(&self, reservation: Reservation) -> Result<(), Error> {
        let mut reservations = self.reservations.write().await;
        reservations.retain(|_, (stored_at, _)| !self.is_expired(*stored_at));
        reservations.insert(
            reservation.transaction_id.clone(),
            (Instant::now(), reservation),
        );
        Ok(())
    }

    async fn take(&self, transaction_id: &str) -> Result<Option<Reservation>, Error> {
        let taken = self.reservations.write().await.remove(transaction_id);
        Ok(taken
            .filter(|(stored_at, _)| !self.is_expired(*stored_at))
            .map(|(_, reservation)| reservation))
    }
}

/// State shared by the checkout handlers
#[derive(Clone)]
pub struct CheckoutState {
    client: LinePay,
    template: ReserveRequest,
    store: Arc<dyn ReservationStore>,
}

/// Query LINE Pay appends to `confirmUrl`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmQuery {
    /// Transaction being confirmed
    pub transaction_id: String,
}

fn error_response(e: &Error) -> Response {
    match e {
        Error::Configuration(message) => (StatusCode::BAD_REQUEST, message.clone()).into_response(),
        Error::Provider(provider) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "returnCode": provider.return_code,
                "returnMessage": provider.return_message,
            })),
        )
            .into_response(),
        Error::UnexpectedInfo(_) => {
            (StatusCode::BAD_GATEWAY, "Unexpected LINE Pay response").into_response()
        }
        _ => (StatusCode::BAD_GATEWAY, "LINE Pay unavailable").into_response(),
    }
}

/// Reserve a payment and redirect the buyer to the payment page
async fn handle_reserve(State(state): State<CheckoutState>) -> Response {
    let mut request = state.template.clone();
    request.order_id = Uuid::new_v4().to_string();

    let info: ReserveInfo = match state
        .client
        .request(&request)
        .await
        .and_then(|result| result.info_as())
    {
        Ok(info) => info,
        Err(e) => {
            warn!("Failed to reserve payment for order {}: {}", request.order_id, e);
            return error_response(&e);
        }
    };

    let reservation = Reservation {
        transaction_id: info.transaction_id,
        order_id: request.order_id,
        amount: request.amount,
        currency: request.currency,
    };
    debug!("Reservation was made: {:?}", reservation);

    if let Err(e) = state.store.put(reservation).await {
        warn!("Failed to store reservation: {}", e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Could not store reservation").into_response();
    }

    Redirect::to(&info.payment_url.web).into_response()
}

/// Confirm the stored reservation for the returning buyer
async fn handle_confirm(
    State(state): State<CheckoutState>,
    Query(query): Query<ConfirmQuery>,
) -> Response {
    debug!("Buyer returned for transaction {}", query.transaction_id);

    let reservation = match state.store.take(&query.transaction_id).await {
        Ok(Some(reservation)) => reservation,
        Ok(None) => {
            warn!("Reservation not found: {}", query.transaction_id);
            return (StatusCode::NOT_FOUND, "Reservation not found.").into_response();
        }
        Err(e) => {
            warn!("Failed to load reservation: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Could not load reservation")
                .into_response();
        }
    };

    let request = ConfirmRequest {
        transaction_id: reservation.transaction_id.clone(),
        amount: reservation.amount,
        currency: reservation.currency,
    };

    match state.client.confirm(&request).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            // keep it so the buyer can retry the confirm URL
            if let Err(store_err) = state.store.put(reservation).await {
                warn!("Failed to restore reservation: {}", store_err);
            }
            error_response(&e)
        }
    }
}

/// Create an Axum router for the reserve/confirm redirect flow
///
/// `template` must carry an absolute `confirmUrl` that routes back to this
/// router's `/confirm`; its `orderId` is replaced on every reservation.
pub fn checkout_router(
    client: LinePay,
    template: ReserveRequest,
    store: Arc<dyn ReservationStore>,
) -> Router {
    let state = CheckoutState {
        client,
        template,
        store,
    };

    Router::new()
        .route("/", get(handle_reserve))
        .route("/confirm", get(handle_confirm))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::header::LOCATION;
    use serde_json::Value;

    use super::*;
    use crate::api::types::ConfirmUrlType;
    use crate::config::LinePayConfig;
    use crate::transport::mock::MockTransport;

    fn state(transport: &MockTransport, store: Arc<MemoryReservationStore>) -> CheckoutState {
        let config = LinePayConfig::new("1234567890", "secret").sandbox(true);
        CheckoutState {
            client: LinePay::with_transport(config, Arc::new(transport.clone())).unwrap(),
            template: ReserveRequest::new("demo product", 1, Currency::JPY, "")
                .confirm_url("https://shop.example/pay/confirm", Some(ConfirmUrlType::Server)),
            store,
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_reserve_stores_and_redirects() {
        let transport = MockTransport::ok(json!({
            "transactionId": 1234567890123456789u64,
            "paymentUrl": {"web": "https://sandbox-web-pay.line.me/web", "app": "line://pay/app"}
        }));
        let store = Arc::new(MemoryReservationStore::new());

        let response = handle_reserve(State(state(&transport, store.clone()))).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(LOCATION).unwrap(),
            "https://sandbox-web-pay.line.me/web"
        );

        let request = transport.last().await;
        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        let order_id = body["orderId"].as_str().unwrap().to_string();
        assert!(Uuid::parse_str(&order_id).is_ok());
        assert_eq!(body["redirectUrls"]["confirmUrlType"], json!("SERVER"));

        let reservation = store.take("1234567890123456789").await.unwrap().unwrap();
        assert_eq!(reservation.order_id, order_id);
        assert_eq!(reservation.amount, 1);
        assert_eq!(reservation.currency, Currency::JPY);
    }

    #[tokio::test]
    async fn test_reserve_provider_failure() {
        let transport =
            MockTransport::new(r#"{"returnCode":"1104","returnMessage":"Merchant not found."}"#);
        let store = Arc::new(MemoryReservationStore::new());

        let response = handle_reserve(State(state(&transport, store.clone()))).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(json_body(response).await["returnCode"], json!("1104"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_confirm_uses_stored_reservation() {
        let transport = MockTransport::ok(json!({"orderId": "order-1", "transactionId": 1234567890123456789u64}));
        let store = Arc::new(MemoryReservationStore::new());
        store
            .put(Reservation {
                transaction_id: "1234567890123456789".to_string(),
                order_id: "order-1".to_string(),
                amount: 1,
                currency: Currency::JPY,
            })
            .await
            .unwrap();

        let response = handle_confirm(
            State(state(&transport, store.clone())),
            Query(ConfirmQuery {
                transaction_id: "1234567890123456789".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["returnCode"], json!("0000"));
        assert_eq!(body["info"]["transactionId"], json!("1234567890123456789"));

        let request = transport.last().await;
        assert_eq!(
            request.url.path(),
            "/v3/payments/1234567890123456789/confirm"
        );
        assert_eq!(request.body.as_deref(), Some(r#"{"amount":1,"currency":"JPY"}"#));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_confirm_unknown_transaction() {
        let transport = MockTransport::ok(json!({}));
        let store = Arc::new(MemoryReservationStore::new());

        let response = handle_confirm(
            State(state(&transport, store)),
            Query(ConfirmQuery {
                transaction_id: "404".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(transport.calls().await, 0);
    }

    fn reservation(transaction_id: &str) -> Reservation {
        Reservation {
            transaction_id: transaction_id.to_string(),
            order_id: "order-1".to_string(),
            amount: 1,
            currency: Currency::JPY,
        }
    }

    #[tokio::test]
    async fn test_memory_store_ttl() {
        let store = MemoryReservationStore::with_ttl(Duration::ZERO);
        store.put(reservation("1")).await.unwrap();
        store.put(reservation("2")).await.unwrap();

        // "1" was evicted when "2" was stored
        assert_eq!(store.len().await, 1);
        assert_eq!(store.take("2").await.unwrap(), None);
        assert!(store.is_empty().await);

        let store = MemoryReservationStore::with_ttl(Duration::from_secs(3600));
        store.put(reservation("1")).await.unwrap();
        assert_eq!(store.take("1").await.unwrap(), Some(reservation("1")));
    }

    #[tokio::test]
    async fn test_reserve_unexpected_info() {
        let transport = MockTransport::ok(json!({"transactionId": 1}));
        let store = Arc::new(MemoryReservationStore::new());

        let response = handle_reserve(State(state(&transport, store.clone()))).await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"Unexpected LINE Pay response");
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_confirm_keeps_reservation() {
        let transport =
            MockTransport::new(r#"{"returnCode":"2102","returnMessage":"Invalid currency"}"#);
        let store = Arc::new(MemoryReservationStore::new());
        store
            .put(Reservation {
                transaction_id: "1".to_string(),
                order_id: "order-1".to_string(),
                amount: 1,
                currency: Currency::JPY,
            })
            .await
            .unwrap();

        let response = handle_confirm(
            State(state(&transport, store.clone())),
            Query(ConfirmQuery {
                transaction_id: "1".to_string(),
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(store.len().await, 1);
    }
}
