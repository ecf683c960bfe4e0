//! LINE Pay environment variables

use std::env;

use crate::config::LinePayConfig;

/// Channel id
pub const ENV_LINE_PAY_CHANNEL_ID: &str = "LINE_PAY_CHANNEL_ID";
/// Channel secret
pub const ENV_LINE_PAY_CHANNEL_SECRET: &str = "LINE_PAY_CHANNEL_SECRET";
/// API host override
pub const ENV_LINE_PAY_HOSTNAME: &str = "LINE_PAY_HOSTNAME";
/// Outbound proxy URL
pub const ENV_LINE_PAY_PROXY_URL: &str = "LINE_PAY_PROXY_URL";
/// `true` to use the sandbox
pub const ENV_LINE_PAY_IS_SANDBOX: &str = "LINE_PAY_IS_SANDBOX";
/// `v2` or `v3`
pub const ENV_LINE_PAY_PROTOCOL_VERSION: &str = "LINE_PAY_PROTOCOL_VERSION";

impl LinePayConfig {
    /// Override fields with any LINE Pay variables set in the environment
    pub fn from_env(mut self) -> Self {
        if let Ok(channel_id) = env::var(ENV_LINE_PAY_CHANNEL_ID) {
            self.channel_id = channel_id;
        }

        if let Ok(channel_secret) = env::var(ENV_LINE_PAY_CHANNEL_SECRET) {
            self.channel_secret = channel_secret;
        }

        if let Ok(hostname) = env::var(ENV_LINE_PAY_HOSTNAME) {
            self.hostname = Some(hostname);
        }

        if let Ok(proxy_url) = env::var(ENV_LINE_PAY_PROXY_URL) {
            self.proxy_url = Some(proxy_url);
        }

        if let Ok(is_sandbox) = env::var(ENV_LINE_PAY_IS_SANDBOX) {
            if let Ok(is_sandbox) = is_sandbox.trim().parse() {
                self.is_sandbox = is_sandbox;
            }
        }

        if let Ok(version) = env::var(ENV_LINE_PAY_PROTOCOL_VERSION) {
            if let Ok(version) = version.trim().parse() {
                self.protocol_version = version;
            }
        }

        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProtocolVersion;

    #[test]
    fn test_from_env() {
        env::set_var(ENV_LINE_PAY_CHANNEL_ID, "env-channel");
        env::set_var(ENV_LINE_PAY_IS_SANDBOX, "true");
        env::set_var(ENV_LINE_PAY_PROTOCOL_VERSION, "v2");

        let config = LinePayConfig::new("1234", "secret").from_env();

        env::remove_var(ENV_LINE_PAY_CHANNEL_ID);
        env::remove_var(ENV_LINE_PAY_IS_SANDBOX);
        env::remove_var(ENV_LINE_PAY_PROTOCOL_VERSION);

        assert_eq!(config.channel_id, "env-channel");
        assert_eq!(config.channel_secret, "secret");
        assert!(config.is_sandbox);
        assert_eq!(config.protocol_version, ProtocolVersion::V2);
    }
}
