//! # Service Configuration
//!
//! Read once from the environment in `main` and injected into
//! [`AppState`](crate::state::AppState). Nothing reads the environment after
//! startup.

use std::path::PathBuf;
use std::time::Duration;

use axum::http::HeaderValue;
use keeper_storage::MAX_UPLOAD_URL_TTL;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 4001;

/// Default allowed CORS origin.
pub const DEFAULT_FRONT_END_URL: &str = "http://localhost:5173";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Which object store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Gcs,
    Memory,
}

impl StorageBackend {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gcs" => Ok(Self::Gcs),
            "memory" => Ok(Self::Memory),
            _ => Err(ConfigError::Invalid {
                var: "STORAGE_BACKEND",
                reason: format!("'{raw}' is not one of: gcs, memory"),
            }),
        }
    }
}

/// Process configuration.
///
/// Custom `Debug` prints only the length of the public key PEM.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// PEM-encoded RSA public key used to verify bearer tokens.
    pub jwt_public_key: String,
    pub storage_backend: StorageBackend,
    /// Empty when the memory backend is selected.
    pub gcs_bucket: String,
    pub gcs_project_id: Option<String>,
    pub gcs_service_account_file: Option<PathBuf>,
    /// The single origin allowed by CORS.
    pub front_end_url: String,
    pub upload_url_ttl: Duration,
    pub request_timeout: Duration,
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "jwt_public_key",
                &format_args!("<{} bytes of PEM>", self.jwt_public_key.len()),
            )
            .field("storage_backend", &self.storage_backend)
            .field("gcs_bucket", &self.gcs_bucket)
            .field("gcs_project_id", &self.gcs_project_id)
            .field("gcs_service_account_file", &self.gcs_service_account_file)
            .field("front_end_url", &self.front_end_url)
            .field("upload_url_ttl", &self.upload_url_ttl)
            .field("request_timeout", &self.request_timeout)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `PORT` (default: 4001)
    /// - `JWT_PUBLIC_KEY` (required)
    /// - `STORAGE_BACKEND` (default: `gcs`; `memory` for local development)
    /// - `GCS_BUCKET_NAME` (required for `gcs`)
    /// - `GCS_PROJECT_ID` (optional)
    /// - `GCS_SERVICE_ACCOUNT_FILE` (optional; ambient credentials when unset)
    /// - `FRONT_END_URL` (default: `http://localhost:5173`)
    /// - `UPLOAD_URL_TTL_SECS` (default: 900, capped at 900)
    /// - `REQUEST_TIMEOUT_SECS` (default: 60)
    /// - `KEEPER_METRICS_ENABLED` (default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let jwt_public_key = get("JWT_PUBLIC_KEY").ok_or(ConfigError::Missing("JWT_PUBLIC_KEY"))?;

        let storage_backend = match get("STORAGE_BACKEND") {
            Some(raw) => StorageBackend::parse(&raw)?,
            None => StorageBackend::Gcs,
        };

        let gcs_bucket = get("GCS_BUCKET_NAME").unwrap_or_default();
        if storage_backend == StorageBackend::Gcs && gcs_bucket.is_empty() {
            return Err(ConfigError::Missing("GCS_BUCKET_NAME"));
        }

        let front_end_url =
            get("FRONT_END_URL").unwrap_or_else(|| DEFAULT_FRONT_END_URL.to_string());
        HeaderValue::from_str(&front_end_url).map_err(|e| ConfigError::Invalid {
            var: "FRONT_END_URL",
            reason: e.to_string(),
        })?;

        let upload_ttl_secs = parse_number("UPLOAD_URL_TTL_SECS", get("UPLOAD_URL_TTL_SECS"))?
            .unwrap_or(MAX_UPLOAD_URL_TTL.as_secs());
        if upload_ttl_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "UPLOAD_URL_TTL_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let timeout_secs = parse_number("REQUEST_TIMEOUT_SECS", get("REQUEST_TIMEOUT_SECS"))?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT.as_secs());
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "REQUEST_TIMEOUT_SECS",
                reason: "must be greater than zero".into(),
            });
        }

        let port = match parse_number("PORT", get("PORT"))? {
            Some(p) => u16::try_from(p).map_err(|_| ConfigError::Invalid {
                var: "PORT",
                reason: format!("{p} is out of range"),
            })?,
            None => DEFAULT_PORT,
        };

        let metrics_enabled = match get("KEEPER_METRICS_ENABLED") {
            Some(raw) => parse_bool("KEEPER_METRICS_ENABLED", &raw)?,
            None => true,
        };

        Ok(Self {
            port,
            jwt_public_key,
            storage_backend,
            gcs_bucket,
            gcs_project_id: get("GCS_PROJECT_ID"),
            gcs_service_account_file: get("GCS_SERVICE_ACCOUNT_FILE").map(PathBuf::from),
            front_end_url,
            // Longer lifetimes are clamped rather than rejected.
            upload_url_ttl: Duration::from_secs(upload_ttl_secs).min(MAX_UPLOAD_URL_TTL),
            request_timeout: Duration::from_secs(timeout_secs),
            metrics_enabled,
        })
    }

    /// Configuration for in-process tests: memory backend, defaults elsewhere.
    pub fn for_tests(jwt_public_key: &str) -> Self {
        Self {
            port: 0,
            jwt_public_key: jwt_public_key.to_string(),
            storage_backend: StorageBackend::Memory,
            gcs_bucket: String::new(),
            gcs_project_id: None,
            gcs_service_account_file: None,
            front_end_url: DEFAULT_FRONT_END_URL.to_string(),
            upload_url_ttl: MAX_UPLOAD_URL_TTL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            metrics_enabled: true,
        }
    }
}

fn parse_number(var: &'static str, raw: Option<String>) -> Result<Option<u64>, ConfigError> {
    raw.map(|s| {
        s.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
            var,
            reason: format!("'{s}': {e}"),
        })
    })
    .transpose()
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            reason: format!("'{raw}' is not a boolean"),
        }),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    const MINIMAL: &[(&str, &str)] = &[("JWT_PUBLIC_KEY", "pem"), ("GCS_BUCKET_NAME", "media")];

    #[test]
    fn defaults_apply() {
        let cfg = load(MINIMAL).unwrap();
        assert_eq!(cfg.port, 4001);
        assert_eq!(cfg.storage_backend, StorageBackend::Gcs);
        assert_eq!(cfg.front_end_url, "http://localhost:5173");
        assert_eq!(cfg.upload_url_ttl, Duration::from_secs(900));
        assert_eq!(cfg.request_timeout, Duration::from_secs(60));
        assert!(cfg.metrics_enabled);
        assert!(cfg.gcs_project_id.is_none());
        assert!(cfg.gcs_service_account_file.is_none());
    }

    #[test]
    fn public_key_is_required() {
        let err = load(&[("GCS_BUCKET_NAME", "media")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_PUBLIC_KEY")));
    }

    #[test]
    fn empty_value_counts_as_unset() {
        let err = load(&[("JWT_PUBLIC_KEY", "  "), ("GCS_BUCKET_NAME", "media")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_PUBLIC_KEY")));
    }

    #[test]
    fn bucket_required_only_for_gcs() {
        let err = load(&[("JWT_PUBLIC_KEY", "pem")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GCS_BUCKET_NAME")));

        let cfg = load(&[("JWT_PUBLIC_KEY", "pem"), ("STORAGE_BACKEND", "memory")]).unwrap();
        assert_eq!(cfg.storage_backend, StorageBackend::Memory);
        assert!(cfg.gcs_bucket.is_empty());
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = load(&[("JWT_PUBLIC_KEY", "pem"), ("STORAGE_BACKEND", "s3")]).unwrap_err();
        assert!(err.to_string().contains("STORAGE_BACKEND"));
    }

    #[test]
    fn invalid_port_rejected() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("PORT", "http"));
        assert!(load(&vars).is_err());

        let mut vars = MINIMAL.to_vec();
        vars.push(("PORT", "70000"));
        assert!(load(&vars).unwrap_err().to_string().contains("out of range"));
    }

    #[test]
    fn upload_ttl_is_capped() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("UPLOAD_URL_TTL_SECS", "3600"));
        assert_eq!(load(&vars).unwrap().upload_url_ttl, Duration::from_secs(900));

        let mut vars = MINIMAL.to_vec();
        vars.push(("UPLOAD_URL_TTL_SECS", "120"));
        assert_eq!(load(&vars).unwrap().upload_url_ttl, Duration::from_secs(120));

        let mut vars = MINIMAL.to_vec();
        vars.push(("UPLOAD_URL_TTL_SECS", "0"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn metrics_can_be_disabled() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("KEEPER_METRICS_ENABLED", "false"));
        assert!(!load(&vars).unwrap().metrics_enabled);

        let mut vars = MINIMAL.to_vec();
        vars.push(("KEEPER_METRICS_ENABLED", "maybe"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn front_end_url_must_be_a_header_value() {
        let mut vars = MINIMAL.to_vec();
        vars.push(("FRONT_END_URL", "https://app.example.com\n"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn debug_elides_pem_body() {
        let cfg = AppConfig::for_tests("-----BEGIN PUBLIC KEY-----secret-looking-----");
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("secret-looking"));
        assert!(debug.contains("bytes of PEM"));
    }
}
