//! Configuration types for the LINE Pay client

use std::fmt;
use std::str::FromStr;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

use crate::auth::header_value;
use crate::error::Error;
use crate::params::{to_params, CLIENT_OPTIONS};

/// Production API host
pub const PRODUCTION_HOSTNAME: &str = "api-pay.line.me";
/// Sandbox API host
pub const SANDBOX_HOSTNAME: &str = "sandbox-api-pay.line.me";

/// LINE Pay API version, which also decides how requests are authenticated
///
/// Parsed from `v2`/`v3` in any case or a bare `2`/`3`, from strings and
/// numbers alike.
#[derive(Debug, Clone, Copy, Default, Hash, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Legacy API, channel secret sent as a header
    V2,
    /// Current API, HMAC-signed requests
    #[default]
    V3,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V2 => write!(f, "v2"),
            ProtocolVersion::V3 => write!(f, "v3"),
        }
    }
}

impl FromStr for ProtocolVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "v2" | "2" => Ok(ProtocolVersion::V2),
            "v3" | "3" => Ok(ProtocolVersion::V3),
            _ => Err(Error::config(format!("Unknown protocol version: {}", s))),
        }
    }
}

impl<'de> Deserialize<'de> for ProtocolVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let version = match Value::deserialize(deserializer)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            other => {
                return Err(de::Error::custom(format!(
                    "expected protocol version, found {}",
                    other
                )))
            }
        };
        version.trim().parse().map_err(de::Error::custom)
    }
}

/// LINE Pay client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LinePayConfig {
    /// LINE Pay channel id
    pub channel_id: String,
    /// LINE Pay channel secret
    pub channel_secret: String,
    /// API host override. Normally derived from `is_sandbox`.
    /// A value with a scheme (e.g. `http://127.0.0.1:8080`) is used verbatim.
    #[serde(default)]
    pub hostname: Option<String>,
    /// Use the sandbox environment
    #[serde(default)]
    pub is_sandbox: bool,
    /// Outbound proxy URL
    #[serde(default)]
    pub proxy_url: Option<String>,
    /// API version, `v3` unless set
    #[serde(default)]
    pub protocol_version: ProtocolVersion,
}

impl LinePayConfig {
    /// Create a production configuration
    pub fn new(channel_id: impl Into<String>, channel_secret: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            channel_secret: channel_secret.into(),
            hostname: None,
            is_sandbox: false,
            proxy_url: None,
            protocol_version: ProtocolVersion::default(),
        }
    }

    /// Use the sandbox environment
    pub fn sandbox(mut self, is_sandbox: bool) -> Self {
        self.is_sandbox = is_sandbox;
        self
    }

    /// Override the API host
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Route requests through a proxy
    pub fn proxy_url(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    /// Select the API version
    pub fn protocol_version(mut self, version: ProtocolVersion) -> Self {
        self.protocol_version = version;
        self
    }

    /// Build a configuration from a loose option object
    ///
    /// Accepts `channelId`, `channelSecret` (required) and `proxyUrl`,
    /// `hostname`, `isSandbox`, `protocolVersion`. Anything else is rejected.
    pub fn from_options<T: Serialize + ?Sized>(options: &T) -> Result<Self, Error> {
        let params = to_params(options)?;
        CLIENT_OPTIONS.validate(&params)?;

        serde_json::from_value(Value::Object(params))
            .map_err(|e| Error::config(format!("Invalid configuration: {}", e)))
    }

    /// Check credentials and derived values
    pub fn validate(&self) -> Result<(), Error> {
        CLIENT_OPTIONS.validate(&to_params(self)?)?;
        self.base_url()?;
        header_value("channelId", &self.channel_id)?;
        Ok(())
    }

    /// Host requests are sent to
    pub fn api_hostname(&self) -> &str {
        match self.hostname.as_deref() {
            Some(hostname) if !hostname.is_empty() => hostname,
            _ if self.is_sandbox => SANDBOX_HOSTNAME,
            _ => PRODUCTION_HOSTNAME,
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> Result<Url, Error> {
        let hostname = self.api_hostname();
        let url = if hostname.contains("://") {
            Url::parse(hostname)
        } else {
            Url::parse(&format!("https://{}", hostname))
        };

        url.map_err(|e| Error::config(format!("Invalid hostname {}: {}", hostname, e)))
    }

    /// Headers sent with every request, before authentication
    pub fn default_headers(&self) -> Result<HeaderMap, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static("x-line-channelid"),
            header_value("channelId", &self.channel_id)?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_options_missing_channel_id() {
        let err = LinePayConfig::from_options(&json!({
            "channelSecret": "secret",
            "isSandbox": true
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Required parameter channelId is missing.");
    }

    #[test]
    fn test_from_options_invalid_parameter() {
        let err = LinePayConfig::from_options(&json!({
            "channelId": "1234",
            "channelSecret": "secret",
            "isSandbox": true,
            "invalidParam": true
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "invalidParam is not a valid parameter.");
    }

    #[test]
    fn test_sandbox_hostname() {
        let config = LinePayConfig::from_options(&json!({
            "channelId": "1234",
            "channelSecret": "secret",
            "isSandbox": true
        }))
        .unwrap();

        assert_eq!(config.api_hostname(), SANDBOX_HOSTNAME);
        assert_eq!(
            config.base_url().unwrap().as_str(),
            "https://sandbox-api-pay.line.me/"
        );
        assert_eq!(config.protocol_version, ProtocolVersion::V3);
    }

    #[test]
    fn test_production_hostname() {
        let config = LinePayConfig::new("1234", "secret");
        assert_eq!(config.api_hostname(), PRODUCTION_HOSTNAME);
    }

    #[test]
    fn test_hostname_override() {
        let config = LinePayConfig::new("1234", "secret")
            .sandbox(true)
            .hostname("http://127.0.0.1:8080");
        assert_eq!(config.base_url().unwrap().as_str(), "http://127.0.0.1:8080/");
    }

    #[test]
    fn test_protocol_version_option() {
        let config = LinePayConfig::from_options(&json!({
            "channelId": "1234",
            "channelSecret": "secret",
            "protocolVersion": "v2"
        }))
        .unwrap();
        assert_eq!(config.protocol_version, ProtocolVersion::V2);

        assert!(LinePayConfig::from_options(&json!({
            "channelId": "1234",
            "channelSecret": "secret",
            "protocolVersion": "v9"
        }))
        .is_err());
    }

    #[test]
    fn test_protocol_version_spellings_match_env() {
        for (value, expected) in [
            (json!("V3"), ProtocolVersion::V3),
            (json!("3"), ProtocolVersion::V3),
            (json!(2), ProtocolVersion::V2),
            (json!("v2"), ProtocolVersion::V2),
        ] {
            let config = LinePayConfig::from_options(&json!({
                "channelId": "1234",
                "channelSecret": "secret",
                "protocolVersion": value.clone()
            }))
            .unwrap();
            assert_eq!(config.protocol_version, expected);

            if let Value::String(s) = &value {
                assert_eq!(s.parse::<ProtocolVersion>().unwrap(), expected);
            }
        }
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let err = LinePayConfig::new("1234", "").validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Required parameter channelSecret is missing."
        );
    }

    #[test]
    fn test_default_headers() {
        let headers = LinePayConfig::new("1234", "secret")
            .default_headers()
            .unwrap();
        assert_eq!(headers.get("X-LINE-ChannelId").unwrap(), "1234");
        assert_eq!(headers.get("Content-Type").unwrap(), "application/json");
        assert!(headers.get("X-LINE-ChannelSecret").is_none());
    }
}
