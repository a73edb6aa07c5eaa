//! S3-backed [`ObjectStore`].

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::Client;
use bytes::Bytes;
use gateway_error::GatewayError;

use crate::config::ObjectStorageSettings;
use crate::traits::{ObjectStore, Result};

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub async fn new(settings: &ObjectStorageSettings) -> Result<Self> {
        let region = Region::new(settings.region.clone());
        let credentials = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "gateway-storage",
        );

        let mut config_loader = aws_config::from_env()
            .region(region)
            .credentials_provider(credentials);
        if let Some(endpoint) = &settings.endpoint {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;
        Ok(Self {
            client: Client::new(&sdk_config),
            bucket: settings.bucket.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(bytes.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| object_error(key, &e.to_string()))?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(data.into_bytes())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.to_string().contains("404") || e.to_string().contains("NotFound") => {
                Ok(false)
            }
            Err(e) => Err(GatewayError::Internal(e.to_string())),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn copy(&self, src_key: &str, dst_key: &str) -> Result<()> {
        let source = format!("{}/{src_key}", self.bucket);
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(source)
            .key(dst_key)
            .send()
            .await
            .map_err(|e| object_error(src_key, &e.to_string()))?;
        Ok(())
    }
}

fn object_error(key: &str, detail: &str) -> GatewayError {
    if detail.contains("404") || detail.contains("NoSuchKey") || detail.contains("NotFound") {
        GatewayError::Internal(format!("object not found: {key}"))
    } else {
        GatewayError::Internal(detail.to_string())
    }
}
