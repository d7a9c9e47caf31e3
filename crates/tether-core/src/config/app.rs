//! Server, TLS, and CORS configuration.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Graceful shutdown timeout in seconds.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
    /// TLS configuration.
    #[serde(default)]
    pub tls: TlsConfig,
    /// CORS configuration, also used for the admission origin check.
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_grace_seconds: default_shutdown_grace(),
            tls: TlsConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub(crate) fn validate(&self) -> Result<(), AppError> {
        if self.tls.enabled && (self.tls.cert_path.is_empty() || self.tls.key_path.is_empty()) {
            return Err(AppError::configuration(
                "server.tls.enabled requires both cert_path and key_path",
            ));
        }
        Ok(())
    }
}

/// TLS termination configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TlsConfig {
    /// Whether TLS is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Path to the PEM certificate file.
    #[serde(default)]
    pub cert_path: String,
    /// Path to the PEM private key file.
    #[serde(default)]
    pub key_path: String,
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins (use `["*"]` for development only).
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Max age for preflight cache in seconds.
    #[serde(default = "default_max_age")]
    pub max_age_seconds: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            max_age_seconds: default_max_age(),
        }
    }
}

impl CorsConfig {
    /// Whether any origin is accepted.
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Whether a request carrying `origin` may open a connection.
    ///
    /// A missing `Origin` header only passes under the wildcard.
    pub fn is_origin_allowed(&self, origin: Option<&str>) -> bool {
        if self.allows_any() {
            return true;
        }
        match origin {
            Some(origin) => self.allowed_origins.iter().any(|o| o == origin),
            None => false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_grace() -> u64 {
    10
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_max_age() -> u64 {
    3600
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_allows_missing_origin() {
        let cors = CorsConfig::default();
        assert!(cors.is_origin_allowed(None));
        assert!(cors.is_origin_allowed(Some("https://evil.example")));
    }

    #[test]
    fn test_explicit_origin_list() {
        let cors = CorsConfig {
            allowed_origins: vec!["https://localhost:8080".to_string()],
            max_age_seconds: 60,
        };
        assert!(cors.is_origin_allowed(Some("https://localhost:8080")));
        assert!(!cors.is_origin_allowed(Some("https://other:8080")));
        assert!(!cors.is_origin_allowed(None));
    }

    #[test]
    fn test_tls_requires_paths() {
        let mut server = ServerConfig::default();
        server.tls.enabled = true;
        assert!(server.validate().is_err());
        server.tls.cert_path = "server.crt".to_string();
        server.tls.key_path = "server.key".to_string();
        assert!(server.validate().is_ok());
    }
}
