//! Request authentication
//!
//! LINE Pay has two ways of authenticating a request, one per API version:
//!
//! - v3 ([`HmacSigner`]): every request carries a fresh nonce and an
//!   HMAC-SHA256 signature over `channelSecret + path + body + nonce`, base64
//!   encoded, in `X-LINE-Authorization-Nonce` / `X-LINE-Authorization`.
//!   For GET requests the query string (without `?`) takes the body's place.
//! - v2 ([`StaticSecret`]): the channel secret is sent as-is in
//!   `X-LINE-ChannelSecret`; nothing is signed.
//!
//! Both implement [`Authenticator`] and the client picks one from its
//! configuration. Neither touches the caller's header map.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use ring::hmac;

use crate::error::Error;

/// Channel id header
pub const CHANNEL_ID_HEADER: &str = "X-LINE-ChannelId";
/// Channel secret header (v2 only)
pub const CHANNEL_SECRET_HEADER: &str = "X-LINE-ChannelSecret";
/// Nonce header (v3 only)
pub const NONCE_HEADER: &str = "X-LINE-Authorization-Nonce";
/// Signature header (v3 only)
pub const SIGNATURE_HEADER: &str = "X-LINE-Authorization";

/// Strategy for attaching credentials to a request
pub trait Authenticator: std::fmt::Debug + Send + Sync {
    /// API version path segment, e.g. `"v3"`
    fn api_version(&self) -> &'static str;

    /// Return a copy of `headers` carrying this strategy's credentials
    ///
    /// `path` includes the version segment. `signed_part` is the serialized
    /// body for POST requests and the query string for GET requests.
    fn authenticate(
        &self,
        headers: &HeaderMap,
        path: &str,
        signed_part: &str,
    ) -> Result<HeaderMap, Error>;
}

/// Strictly increasing millisecond nonces
///
/// Wall-clock milliseconds are used while the clock moves forward. Calls that
/// land in the same millisecond (or after the clock stepped back) get the
/// previous nonce plus one, so no two calls through one generator share a nonce.
#[derive(Debug, Default)]
pub struct NonceGenerator {
    last: AtomicU64,
}

impl NonceGenerator {
    /// Create a new generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce
    pub fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();

        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(last + 1);
            match self.last.compare_exchange_weak(
                last,
                candidate,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(current) => last = current,
            }
        }
    }
}

/// v3 authentication: nonce + HMAC-SHA256 signature
pub struct HmacSigner {
    channel_secret: String,
    key: hmac::Key,
    nonces: NonceGenerator,
}

impl HmacSigner {
    /// Create a signer keyed with the channel secret
    pub fn new(channel_secret: &str) -> Self {
        Self {
            channel_secret: channel_secret.to_string(),
            key: hmac::Key::new(hmac::HMAC_SHA256, channel_secret.as_bytes()),
            nonces: NonceGenerator::new(),
        }
    }

    /// Compute the base64 signature for a given nonce
    pub fn signature(&self, path: &str, signed_part: &str, nonce: &str) -> String {
        let mut ctx = hmac::Context::with_key(&self.key);
        ctx.update(self.channel_secret.as_bytes());
        ctx.update(path.as_bytes());
        ctx.update(signed_part.as_bytes());
        ctx.update(nonce.as_bytes());
        STANDARD.encode(ctx.sign().as_ref())
    }

    /// Sign with a caller-chosen nonce
    pub fn sign_with_nonce(
        &self,
        headers: &HeaderMap,
        path: &str,
        signed_part: &str,
        nonce: &str,
    ) -> Result<HeaderMap, Error> {
        let signature = self.signature(path, signed_part, nonce);

        let mut signed = headers.clone();
        signed.insert(
            HeaderName::from_static("x-line-authorization-nonce"),
            header_value("nonce", nonce)?,
        );
        signed.insert(
            HeaderName::from_static("x-line-authorization"),
            header_value("signature", &signature)?,
        );
        Ok(signed)
    }
}

impl std::fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSigner")
            .field("nonces", &self.nonces)
            .finish_non_exhaustive()
    }
}

impl Authenticator for HmacSigner {
    fn api_version(&self) -> &'static str {
        "v3"
    }

    fn authenticate(
        &self,
        headers: &HeaderMap,
        path: &str,
        signed_part: &str,
    ) -> Result<HeaderMap, Error> {
        let nonce = self.nonces.next().to_string();
        self.sign_with_nonce(headers, path, signed_part, &nonce)
    }
}

/// v2 authentication: static channel secret header
#[derive(Debug)]
pub struct StaticSecret {
    channel_secret: HeaderValue,
}

impl StaticSecret {
    /// Create the strategy from the channel secret
    pub fn new(channel_secret: &str) -> Result<Self, Error> {
        let mut channel_secret = header_value("channelSecret", channel_secret)?;
        channel_secret.set_sensitive(true);
        Ok(Self { channel_secret })
    }
}

impl Authenticator for StaticSecret {
    fn api_version(&self) -> &'static str {
        "v2"
    }

    fn authenticate(
        &self,
        headers: &HeaderMap,
        _path: &str,
        _signed_part: &str,
    ) -> Result<HeaderMap, Error> {
        let mut authenticated = headers.clone();
        authenticated.insert(
            HeaderName::from_static("x-line-channelsecret"),
            self.channel_secret.clone(),
        );
        Ok(authenticated)
    }
}

/// Header value for `field`; the value itself never appears in the error
pub(crate) fn header_value(field: &str, value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value)
        .map_err(|_| Error::config(format!("Invalid {} header value", field)))
}
