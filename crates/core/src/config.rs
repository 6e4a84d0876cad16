//! Runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the client and the
//! server. Binaries read the environment; everything below works on plain optional values so it
//! can be exercised without touching process-wide state.

use crate::constants::{DEFAULT_API_ENDPOINT, DEFAULT_API_TIMEOUT_SECS, DEFAULT_REST_ADDR};
use crate::{GlucoError, GlucoResult};
use std::net::SocketAddr;
use std::time::Duration;

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Settings for talking to the record backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    api_endpoint: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_endpoint: impl Into<String>) -> GlucoResult<Self> {
        let api_endpoint = api_endpoint.into().trim().trim_end_matches('/').to_string();
        if !(api_endpoint.starts_with("http://") || api_endpoint.starts_with("https://")) {
            return Err(GlucoError::Config(format!(
                "API endpoint must be an http(s) URL, got {api_endpoint:?}"
            )));
        }
        Ok(Self {
            api_endpoint,
            username: None,
            password: None,
            timeout: Duration::from_secs(DEFAULT_API_TIMEOUT_SECS),
        })
    }

    /// Builds the config from raw `GLUCO_API_*` values. Blank values count as unset.
    pub fn from_env_values(
        endpoint: Option<String>,
        username: Option<String>,
        password: Option<String>,
        timeout_secs: Option<String>,
    ) -> GlucoResult<Self> {
        let endpoint = non_blank(endpoint).unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string());
        let timeout = match non_blank(timeout_secs) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                GlucoError::Config(format!("GLUCO_API_TIMEOUT_SECS is not a number: {raw:?}"))
            })?,
            None => DEFAULT_API_TIMEOUT_SECS,
        };

        let mut config = Self::new(endpoint)?.with_timeout(Duration::from_secs(timeout));
        if let Some(user) = non_blank(username) {
            config = config.with_credentials(user, password.unwrap_or_default());
        }
        Ok(config)
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api_endpoint(&self) -> &str {
        &self.api_endpoint
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Settings for the REST view server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    addr: SocketAddr,
    view_token: Option<String>,
}

impl ServerConfig {
    pub fn from_env_values(addr: Option<String>, view_token: Option<String>) -> GlucoResult<Self> {
        let raw = non_blank(addr).unwrap_or_else(|| DEFAULT_REST_ADDR.to_string());
        let addr = raw
            .parse::<SocketAddr>()
            .map_err(|_| GlucoError::Config(format!("GLUCO_REST_ADDR is not a socket address: {raw:?}")))?;
        Ok(Self {
            addr,
            view_token: non_blank(view_token),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bearer token accepted by the guarded routes. `None` means every request is rejected.
    pub fn view_token(&self) -> Option<&str> {
        self.view_token.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_defaults_apply_when_unset() {
        let config = ClientConfig::from_env_values(None, Some("  ".into()), None, None).unwrap();
        assert_eq!(config.api_endpoint(), DEFAULT_API_ENDPOINT);
        assert_eq!(config.username(), None);
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_API_TIMEOUT_SECS));
    }

    #[test]
    fn client_values_are_trimmed_and_validated() {
        let config = ClientConfig::from_env_values(
            Some(" https://records.example/rest/ ".into()),
            Some("clinic".into()),
            Some("secret".into()),
            Some("5".into()),
        )
        .unwrap();
        assert_eq!(config.api_endpoint(), "https://records.example/rest");
        assert_eq!(config.username(), Some("clinic"));
        assert_eq!(config.password(), Some("secret"));
        assert_eq!(config.timeout(), Duration::from_secs(5));

        assert!(matches!(
            ClientConfig::from_env_values(Some("ftp://x".into()), None, None, None),
            Err(GlucoError::Config(_))
        ));
        assert!(matches!(
            ClientConfig::from_env_values(None, None, None, Some("soon".into())),
            Err(GlucoError::Config(_))
        ));
    }

    #[test]
    fn server_addr_and_token() {
        let config = ServerConfig::from_env_values(None, Some(" ".into())).unwrap();
        assert_eq!(config.addr().port(), 3000);
        assert_eq!(config.view_token(), None);

        let config =
            ServerConfig::from_env_values(Some("127.0.0.1:8080".into()), Some("tkn".into())).unwrap();
        assert_eq!(config.addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.view_token(), Some("tkn"));

        assert!(ServerConfig::from_env_values(Some("nowhere".into()), None).is_err());
    }
}
