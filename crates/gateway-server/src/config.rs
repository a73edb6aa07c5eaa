//! `GatewayConfig`: one sub-struct per settings group named in the external
//! interfaces, each with its own `from_env()`, the way
//! `gateway_storage::ObjectStorageSettings` and `gateway_auth::settings` read
//! their own env-var prefixes.

use gateway_auth::{BruteforceProtectionSettings, CookieSettings, CsrfProtectionSettings};
use gateway_error::GatewayError;
use gateway_storage::ObjectStorageSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
    Test,
}

impl Environment {
    fn parse(raw: &str) -> Result<Self, GatewayError> {
        match raw {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            "test" => Ok(Self::Test),
            other => Err(GatewayError::Internal(format!(
                "invalid ENVIRONMENT value '{other}', expected dev|prod|test"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
            Self::Test => "test",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformType {
    Cloud,
    Onprem,
    Demo,
}

impl PlatformType {
    fn parse(raw: &str) -> Result<Self, GatewayError> {
        match raw {
            "cloud" => Ok(Self::Cloud),
            "onprem" => Ok(Self::Onprem),
            "demo" => Ok(Self::Demo),
            other => Err(GatewayError::Internal(format!(
                "invalid PLATFORM_TYPE value '{other}', expected cloud|onprem|demo"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::Onprem => "onprem",
            Self::Demo => "demo",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentSettings {
    pub environment: Environment,
    pub platform_type: PlatformType,
}

impl EnvironmentSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            environment: Environment::parse(&env_or("ENVIRONMENT", "dev"))?,
            platform_type: PlatformType::parse(&env_or("PLATFORM_TYPE", "onprem"))?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TrashbinSettings {
    pub expiration_seconds: i64,
}

impl TrashbinSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            expiration_seconds: parse_env("TRASHBIN_EXPIRATION_SECONDS", 604_800)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct FuzzerSettings {
    pub min_cpu_usage: i32,
    pub min_ram_usage: i32,
    pub min_tmpfs_usage: i32,
}

impl FuzzerSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            min_cpu_usage: parse_env("FUZZER_MIN_CPU_USAGE", 100)?,
            min_ram_usage: parse_env("FUZZER_MIN_RAM_USAGE", 256)?,
            min_tmpfs_usage: parse_env("FUZZER_MIN_TMPFS_USAGE", 0)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RevisionSettings {
    pub binaries_upload_limit: u64,
    pub seeds_upload_limit: u64,
    pub config_upload_limit: u64,
}

impl RevisionSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            binaries_upload_limit: parse_env("REVISION_BINARIES_UPLOAD_LIMIT", 500_000_000)?,
            seeds_upload_limit: parse_env("REVISION_SEEDS_UPLOAD_LIMIT", 500_000_000)?,
            config_upload_limit: parse_env("REVISION_CONFIG_UPLOAD_LIMIT", 1_000_000)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApiEndpointSettings {
    pub self_url: String,
    pub jira_reporter_url: String,
    pub yt_reporter_url: String,
    pub pool_manager_url: String,
}

impl ApiEndpointSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            self_url: required_env("SELF_URL")?,
            jira_reporter_url: required_env("JIRA_REPORTER_URL")?,
            yt_reporter_url: required_env("YT_REPORTER_URL")?,
            pool_manager_url: required_env("POOL_MANAGER_URL")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
}

impl DatabaseSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            url: required_env("DB_URL")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SystemAdminSettings {
    pub name: String,
    pub password: String,
    pub email: String,
}

impl SystemAdminSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            name: required_env("ROOT_USER_NAME")?,
            password: required_env("ROOT_USER_PASSWORD")?,
            email: required_env("ROOT_USER_EMAIL")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct DefaultUserSettings {
    pub enabled: bool,
    pub name: Option<String>,
    pub password: Option<String>,
    pub email: Option<String>,
}

impl DefaultUserSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        let enabled = parse_bool_env("DEFAULT_USER_ENABLED", false);
        if !enabled {
            return Ok(Self {
                enabled: false,
                name: None,
                password: None,
                email: None,
            });
        }
        Ok(Self {
            enabled,
            name: Some(required_env("DEFAULT_USER_NAME")?),
            password: Some(required_env("DEFAULT_USER_PASSWORD")?),
            email: Some(required_env("DEFAULT_USER_EMAIL")?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MessageQueueSettings {
    pub queue_own: String,
    pub queue_dlq: String,
    pub queue_scheduler: String,
    pub queue_jira_reporter: String,
    pub queue_yt_reporter: String,
    pub queue_pool_manager: String,
    pub region: String,
}

impl MessageQueueSettings {
    pub fn from_env() -> Result<Self, GatewayError> {
        Ok(Self {
            queue_own: required_env("MQ_QUEUE_OWN")?,
            queue_dlq: required_env("MQ_QUEUE_DLQ")?,
            queue_scheduler: required_env("MQ_QUEUE_SCHEDULER")?,
            queue_jira_reporter: required_env("MQ_QUEUE_JIRA_REPORTER")?,
            queue_yt_reporter: required_env("MQ_QUEUE_YT_REPORTER")?,
            queue_pool_manager: required_env("MQ_QUEUE_POOL_MANAGER")?,
            region: env_or("MQ_REGION", "us-east-1"),
        })
    }
}

/// Aggregates every settings group named in the external-interfaces
/// configuration list behind one handle, loaded once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: String,
    pub environment: EnvironmentSettings,
    pub object_storage: ObjectStorageSettings,
    pub message_queue: MessageQueueSettings,
    pub bruteforce_protection: BruteforceProtectionSettings,
    pub csrf_protection: CsrfProtectionSettings,
    pub cookie: CookieSettings,
    pub trashbin: TrashbinSettings,
    pub fuzzer: FuzzerSettings,
    pub revision: RevisionSettings,
    pub api_endpoints: ApiEndpointSettings,
    pub database: DatabaseSettings,
    pub system_admin: SystemAdminSettings,
    pub default_user: DefaultUserSettings,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, GatewayError> {
        let config = Self {
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:8080"),
            environment: EnvironmentSettings::from_env()?,
            object_storage: ObjectStorageSettings::from_env()?,
            message_queue: MessageQueueSettings::from_env()?,
            bruteforce_protection: BruteforceProtectionSettings::from_env()?,
            csrf_protection: CsrfProtectionSettings::from_env()?,
            cookie: CookieSettings::from_env()?,
            trashbin: TrashbinSettings::from_env()?,
            fuzzer: FuzzerSettings::from_env()?,
            revision: RevisionSettings::from_env()?,
            api_endpoints: ApiEndpointSettings::from_env()?,
            database: DatabaseSettings::from_env()?,
            system_admin: SystemAdminSettings::from_env()?,
            default_user: DefaultUserSettings::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// In `prod`, every optional-looking setting that the source treats as
    /// mandatory in production must actually be present.
    fn validate(&self) -> Result<(), GatewayError> {
        if self.environment.environment == Environment::Prod && !self.csrf_protection.enabled {
            return Err(GatewayError::Internal(
                "CSRF protection must stay enabled in the prod environment".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
impl GatewayConfig {
    /// Fully-populated config for unit tests that need an `AppState` but
    /// never touch the environment.
    pub(crate) fn for_tests() -> Self {
        Self {
            bind_addr: "127.0.0.1:0".into(),
            environment: EnvironmentSettings {
                environment: Environment::Test,
                platform_type: PlatformType::Onprem,
            },
            object_storage: ObjectStorageSettings {
                endpoint: Some("http://localhost:9000".into()),
                region: "us-east-1".into(),
                access_key: "test".into(),
                secret_key: "test".into(),
                bucket: "test-bucket".into(),
                upload_length_cap: 500_000_000,
            },
            message_queue: MessageQueueSettings {
                queue_own: "gateway.own".into(),
                queue_dlq: "gateway.dlq".into(),
                queue_scheduler: "scheduler".into(),
                queue_jira_reporter: "jira-reporter".into(),
                queue_yt_reporter: "youtrack-reporter".into(),
                queue_pool_manager: "pool-manager".into(),
                region: "us-east-1".into(),
            },
            bruteforce_protection: BruteforceProtectionSettings {
                lockout_period_sec: 3_600,
                max_failed_logins: 5,
                cleanup_interval_sec: 300,
                secret_key: "test-bfp-secret".into(),
            },
            csrf_protection: CsrfProtectionSettings {
                enabled: true,
                token_exp_seconds: 3_600,
                secret_key: "test-csrf-secret".into(),
            },
            cookie: CookieSettings { expiration_seconds: 86_400, secure: false },
            trashbin: TrashbinSettings { expiration_seconds: 604_800 },
            fuzzer: FuzzerSettings {
                min_cpu_usage: 100,
                min_ram_usage: 256,
                min_tmpfs_usage: 0,
            },
            revision: RevisionSettings {
                binaries_upload_limit: 500_000_000,
                seeds_upload_limit: 500_000_000,
                config_upload_limit: 1_000_000,
            },
            api_endpoints: ApiEndpointSettings {
                self_url: "http://localhost:8080".into(),
                jira_reporter_url: "http://localhost:8081".into(),
                yt_reporter_url: "http://localhost:8082".into(),
                pool_manager_url: "http://localhost:8083".into(),
            },
            database: DatabaseSettings { url: "postgres://test".into() },
            system_admin: SystemAdminSettings {
                name: "root".into(),
                password: "hunter2".into(),
                email: "root@example.test".into(),
            },
            default_user: DefaultUserSettings {
                enabled: false,
                name: None,
                password: None,
                email: None,
            },
        }
    }
}

fn required_env(name: &str) -> Result<String, GatewayError> {
    std::env::var(name).map_err(|_| {
        GatewayError::Internal(format!("missing required environment variable {name}"))
    })
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
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
