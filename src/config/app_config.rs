// Application configuration, read from the environment (after `.env` has been
// loaded). The gateway and the client read different halves of it.

use chrono_tz::Tz;
use std::path::PathBuf;
use thiserror::Error;

use crate::infra::drive::DEFAULT_DRIVE_API_BASE;
use crate::infra::identity::OAuthSettings;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which Drive backend the gateway forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveBackendKind {
    Google,
    Memory,
}

/// How the gateway checks identity tokens (advisory either way).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityCheck {
    Disabled,
    /// Google Sign-In tokens issued to this OAuth client id.
    Google { audience: String },
    /// Firebase Authentication tokens for this project.
    Firebase { project_id: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    /// When set, the gateway also serves the single-page app from here.
    pub static_dir: Option<PathBuf>,
    pub drive_backend: DriveBackendKind,
    pub drive_api_base: String,
    pub identity_check: IdentityCheck,
}

impl GatewayConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            static_dir: None,
            drive_backend: DriveBackendKind::Google,
            drive_api_base: DEFAULT_DRIVE_API_BASE.to_string(),
            identity_check: IdentityCheck::Disabled,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the gateway's `/api`.
    pub api_url: String,
    pub session_db_path: String,
    pub oauth: OAuthSettings,
    /// Timezone used to show modification times.
    pub timezone: Tz,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub client: ClientConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = GatewayConfig::default();

        let port = match get("PORT") {
            Some(value) => value.parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    key: "PORT",
                    value,
                    reason: e.to_string(),
                }
            })?,
            None => defaults.port,
        };

        let drive_backend = match get("DRIVE_BACKEND").as_deref() {
            None | Some("google") => DriveBackendKind::Google,
            Some("memory") => DriveBackendKind::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "DRIVE_BACKEND",
                    value: other.to_string(),
                    reason: "expected 'google' or 'memory'".to_string(),
                })
            }
        };

        let identity_check = match (get("ID_TOKEN_AUDIENCE"), get("FIREBASE_PROJECT_ID")) {
            (Some(audience), _) => IdentityCheck::Google { audience },
            (None, Some(project_id)) => IdentityCheck::Firebase { project_id },
            (None, None) => IdentityCheck::Disabled,
        };

        let allowed_origins = get("ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.allowed_origins);

        let timezone = match get("LETTERS_TIMEZONE") {
            Some(value) => value.parse::<Tz>().map_err(|e| ConfigError::Invalid {
                key: "LETTERS_TIMEZONE",
                value,
                reason: e.to_string(),
            })?,
            None => chrono_tz::UTC,
        };

        Ok(Self {
            gateway: GatewayConfig {
                host: get("HOST").unwrap_or(defaults.host),
                port,
                allowed_origins,
                static_dir: get("STATIC_DIR").map(PathBuf::from),
                drive_backend,
                drive_api_base: get("GOOGLE_DRIVE_API_BASE").unwrap_or(defaults.drive_api_base),
                identity_check,
            },
            client: ClientConfig {
                api_url: get("LETTER_API_URL")
                    .unwrap_or_else(|| "http://localhost:5000/api".to_string()),
                session_db_path: get("SESSION_DB_PATH")
                    .unwrap_or_else(|| "data/session.db".to_string()),
                oauth: OAuthSettings {
                    client_id: get("GOOGLE_CLIENT_ID"),
                    client_secret: get("GOOGLE_CLIENT_SECRET"),
                    redirect_url: get("GOOGLE_REDIRECT_URL"),
                },
                timezone,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.gateway.address(), "127.0.0.1:5000");
        assert_eq!(config.gateway.drive_backend, DriveBackendKind::Google);
        assert_eq!(config.gateway.identity_check, IdentityCheck::Disabled);
        assert_eq!(config.client.api_url, "http://localhost:5000/api");
        assert_eq!(config.client.timezone, chrono_tz::UTC);
    }

    #[test]
    fn redirect_url_has_no_fallback() {
        let config = config_from(&[("GOOGLE_CLIENT_ID", "id")]).unwrap();
        assert_eq!(config.client.oauth.redirect_url, None);
    }

    #[test]
    fn values_are_read() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("DRIVE_BACKEND", "memory"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
            ("FIREBASE_PROJECT_ID", "letters-prod"),
            ("LETTERS_TIMEZONE", "Europe/Berlin"),
        ])
        .unwrap();

        assert_eq!(config.gateway.port, 8081);
        assert_eq!(config.gateway.drive_backend, DriveBackendKind::Memory);
        assert_eq!(
            config.gateway.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(
            config.gateway.identity_check,
            IdentityCheck::Firebase {
                project_id: "letters-prod".to_string()
            }
        );
        assert_eq!(config.client.timezone, chrono_tz::Europe::Berlin);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(matches!(
            config_from(&[("PORT", "eighty")]),
            Err(ConfigError::Invalid { key: "PORT", .. })
        ));
        assert!(matches!(
            config_from(&[("DRIVE_BACKEND", "dropbox")]),
            Err(ConfigError::Invalid { key: "DRIVE_BACKEND", .. })
        ));
        assert!(matches!(
            config_from(&[("LETTERS_TIMEZONE", "Mars/Olympus")]),
            Err(ConfigError::Invalid { key: "LETTERS_TIMEZONE", .. })
        ));
    }
}
