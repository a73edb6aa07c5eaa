//! Settings groups read by `gateway-server`'s `GatewayConfig`, one struct per
//! env-var prefix, the way `gateway-storage::ObjectStorageSettings` reads its
//! own prefix.

use gateway_error::GatewayError;

#[derive(Debug, Clone)]
pub struct CookieSettings {
    pub expiration_seconds: i64,
    pub secure: bool,
}

impl CookieSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            expiration_seconds: parse_env("COOKIE_EXPIRATION_SECONDS", 86_400)?,
            secure: parse_bool_env("COOKIE_MODE_SECURE", true),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CsrfProtectionSettings {
    pub enabled: bool,
    pub token_exp_seconds: i64,
    pub secret_key: String,
}

impl CsrfProtectionSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            enabled: parse_bool_env("CSRF_PROTECTION_ENABLED", true),
            token_exp_seconds: parse_env("CSRF_PROTECTION_TOKEN_EXP_SECONDS", 3_600)?,
            secret_key: required_env("CSRF_PROTECTION_SECRET_KEY")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct BruteforceProtectionSettings {
    pub lockout_period_sec: i64,
    pub max_failed_logins: u32,
    pub cleanup_interval_sec: u64,
    pub secret_key: String,
}

impl BruteforceProtectionSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            lockout_period_sec: parse_env("BFP_LOCKOUT_PERIOD_SEC", 3_600)?,
            max_failed_logins: parse_env("BFP_MAX_FAILED_LOGINS", 5)?,
            cleanup_interval_sec: parse_env("BFP_CLEANUP_INTERVAL_SEC", 300)?,
            secret_key: required_env("BFP_SECRET_KEY")?,
        })
    }
}

fn required_env(name: &str) -> Result<String, GatewayError> {
    std::env::var(name).map_err(|_| {
        GatewayError::Internal(format!("missing required environment variable {name}"))
    })
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, GatewayError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| GatewayError::Internal(format!("invalid value for {name}"))),
        Err(_) => Ok(default),
    }
}

fn parse_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}
