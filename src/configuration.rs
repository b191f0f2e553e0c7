use crate::error::ConfigError;

/// Minimum entropy for each signing secret, in bytes
const MIN_SECRET_LENGTH: usize = 32;

const DEFAULT_ACCESS_TOKEN_EXPIRY: i64 = 900; // 15 minutes
const DEFAULT_REFRESH_TOKEN_EXPIRY: i64 = 2_592_000; // 30 days

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    pub fn connection_string_without_db(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// Token signing and lifetime settings
///
/// Access and refresh tokens are signed with independent secrets so that a
/// leaked access-signing key cannot mint refresh tokens.
#[derive(serde::Deserialize, Clone)]
pub struct AuthSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry: i64, // seconds
    #[serde(default = "default_refresh_token_expiry")]
    pub refresh_token_expiry: i64, // seconds
    #[serde(default)]
    pub secure_cookies: bool,
}

fn default_access_token_expiry() -> i64 {
    DEFAULT_ACCESS_TOKEN_EXPIRY
}

fn default_refresh_token_expiry() -> i64 {
    DEFAULT_REFRESH_TOKEN_EXPIRY
}

impl AuthSettings {
    /// Reject secrets that are absent, too short, or not independent.
    ///
    /// Called at startup; a bad secret configuration is fatal, never a
    /// silent fallback.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "auth.access_secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if self.refresh_secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "auth.refresh_secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if self.access_secret == self.refresh_secret {
            return Err(ConfigError::InvalidValue(
                "auth.access_secret and auth.refresh_secret must differ".to_string(),
            ));
        }
        if self.access_token_expiry <= 0 || self.refresh_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "token expiries must be positive".to_string(),
            ));
        }
        if self.access_token_expiry >= self.refresh_token_expiry {
            return Err(ConfigError::InvalidValue(
                "access token expiry must be shorter than refresh token expiry".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load settings from `configuration.*` plus `APP_`-prefixed environment
/// variables (e.g. `APP_AUTH__ACCESS_SECRET`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    let settings = settings
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::MissingRequired(e.to_string()))?;

    settings.auth.validate()?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_auth_settings() -> AuthSettings {
        AuthSettings {
            access_secret: "access-secret-key-at-least-32-characters".to_string(),
            refresh_secret: "refresh-secret-key-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 2_592_000,
            secure_cookies: false,
        }
    }

    #[test]
    fn test_valid_settings_pass() {
        assert!(valid_auth_settings().validate().is_ok());
    }

    #[test]
    fn test_short_access_secret_rejected() {
        let mut settings = valid_auth_settings();
        settings.access_secret = "too-short".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_short_refresh_secret_rejected() {
        let mut settings = valid_auth_settings();
        settings.refresh_secret = "too-short".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let mut settings = valid_auth_settings();
        settings.refresh_secret = settings.access_secret.clone();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_inverted_expiries_rejected() {
        let mut settings = valid_auth_settings();
        settings.access_token_expiry = settings.refresh_token_expiry;
        assert!(settings.validate().is_err());
    }
}
