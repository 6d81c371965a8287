use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public URL of this service, without a trailing slash.
    /// SAML issuer, assertion-consumer and logout URLs are derived from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path appended to `base_url` to form the SP entity id (issuer).
    #[serde(default = "default_sp_entity_path")]
    pub sp_entity_path: String,

    /// Redirect plain-HTTP requests to HTTPS.
    ///
    /// A request counts as secure when `x-forwarded-proto` is `https` or the
    /// request URI itself carries the `https` scheme.
    #[serde(default)]
    pub require_https: bool,

    /// Directory holding the reader frontend. Served behind the request gate.
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Request body size limit in bytes. SAML responses are POSTed as form data.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: default_base_url(),
            sp_entity_path: default_sp_entity_path(),
            require_https: false,
            static_dir: None,
            body_limit_bytes: default_body_limit(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// SP entity id sent as `Issuer` in every request to an IdP.
    pub fn issuer(&self) -> String {
        format!("{}{}", self.base_url, self.sp_entity_path)
    }

    /// Assertion consumer URL for one IdP.
    pub fn acs_url(&self, idp_code: &str) -> String {
        format!("{}/login/{}/callback", self.base_url, idp_code)
    }

    /// Where IdPs send the browser after single logout.
    pub fn logout_callback_url(&self) -> String {
        format!("{}/logout/callback", self.base_url)
    }

    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Validation(format!("server.base_url '{}' is invalid: {e}", self.base_url))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Validation(
                "server.base_url must use http or https".into(),
            ));
        }
        if self.base_url.ends_with('/') {
            return Err(ConfigError::Validation(
                "server.base_url must not end with '/'".into(),
            ));
        }
        if !self.sp_entity_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "server.sp_entity_path must start with '/'".into(),
            ));
        }
        Ok(())
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_sp_entity_path() -> String {
    "/shibboleth".to_string()
}

fn default_body_limit() -> usize {
    1024 * 1024
}
