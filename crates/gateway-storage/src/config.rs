//! Object-storage connection settings, loaded by `gateway-server`'s
//! `GatewayConfig` as one settings group among several.

use gateway_error::GatewayError;

#[derive(Debug, Clone)]
pub struct ObjectStorageSettings {
    pub endpoint: Option<String>,
    pub region: String,
    pub access_key: String,
    pub secret_key: String,
    pub bucket: String,
    /// Per-stream byte cap applied to binaries/seeds uploads.
    pub upload_length_cap: u64,
}

impl ObjectStorageSettings {
    /// Reads `OBJECT_STORAGE_{ENDPOINT,REGION,ACCESS_KEY,SECRET_KEY,BUCKET,
    /// UPLOAD_LENGTH_CAP}` the way `gateway-server`'s other settings groups
    /// read their own prefix.
    pub fn from_env() -> Result<Self, GatewayError> {
        let region = required_env("OBJECT_STORAGE_REGION")?;
        let access_key = required_env("OBJECT_STORAGE_ACCESS_KEY")?;
        let secret_key = required_env("OBJECT_STORAGE_SECRET_KEY")?;
        let bucket = required_env("OBJECT_STORAGE_BUCKET")?;
        let endpoint = std::env::var("OBJECT_STORAGE_ENDPOINT").ok();
        let upload_length_cap = std::env::var("OBJECT_STORAGE_UPLOAD_LENGTH_CAP")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(512 * 1024 * 1024);

        Ok(Self {
            endpoint,
            region,
            access_key,
            secret_key,
            bucket,
            upload_length_cap,
        })
    }
}

fn required_env(name: &str) -> Result<String, GatewayError> {
    std::env::var(name).map_err(|_| {
        GatewayError::Internal(format!("missing required environment variable {name}"))
    })
}
