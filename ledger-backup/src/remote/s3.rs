//! S3-compatible object store over plain signed HTTP.

use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, error};

use super::sign::{self, SigningParams};
use super::ObjectStore;
use crate::config::BackupConfig;
use crate::utils::errors::{BackupError, Result};

/// Path-style client for any S3-compatible endpoint (R2, MinIO, AWS).
pub struct S3ObjectStore {
    client: reqwest::Client,
    endpoint: String,
    bucket: String,
    region: String,
    access_key_id: String,
    secret_access_key: String,
}

impl S3ObjectStore {
    pub fn new(config: &BackupConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            access_key_id: config.access_key_id.clone(),
            secret_access_key: config.secret_access_key.clone(),
        }
    }

    fn canonical_uri(&self, key: &str) -> String {
        format!(
            "/{}/{}",
            sign::uri_encode(&self.bucket, true),
            sign::uri_encode(key, false)
        )
    }

    fn host(&self) -> Result<String> {
        let url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| BackupError::Config(format!("Invalid endpoint {}: {}", self.endpoint, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| BackupError::Config(format!("Endpoint has no host: {}", self.endpoint)))?;

        Ok(match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        })
    }
}

impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let now = Utc::now();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let payload_hash = sign::sha256_hex(&body);
        let canonical_uri = self.canonical_uri(key);

        let headers = vec![
            ("host".to_string(), self.host()?),
            ("content-type".to_string(), content_type.to_string()),
            ("x-amz-content-sha256".to_string(), payload_hash.clone()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];

        let params = SigningParams {
            access_key_id: &self.access_key_id,
            secret_access_key: &self.secret_access_key,
            region: &self.region,
            service: "s3",
        };

        let authorization =
            sign::authorization_header(&params, &now, "PUT", &canonical_uri, "", &headers, &payload_hash)?;

        let url = format!("{}{}", self.endpoint, canonical_uri);
        debug!("PUT {}", url);

        let response = self
            .client
            .put(&url)
            .header("content-type", content_type)
            .header("x-amz-content-sha256", payload_hash)
            .header("x-amz-date", amz_date)
            .header("authorization", authorization)
            .body(body)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Object PUT failed with status {}: {}", status, text);
            Err(BackupError::Remote(format!(
                "PUT {} returned {}: {}",
                key, status, text
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveSelection;
    use ledger_store::StoreConfig;

    fn store_with_endpoint(endpoint: &str) -> S3ObjectStore {
        S3ObjectStore::new(&BackupConfig {
            endpoint: endpoint.to_string(),
            access_key_id: "key".to_string(),
            secret_access_key: "secret".to_string(),
            bucket: "backups".to_string(),
            region: "auto".to_string(),
            system_name: "ledger".to_string(),
            archive_prefix: None,
            selection: ArchiveSelection::default(),
            staging_dir: std::env::temp_dir(),
            store: StoreConfig::default(),
        })
    }

    #[test]
    fn test_canonical_uri_is_path_style() {
        let store = store_with_endpoint("https://acc.r2.example.com");
        assert_eq!(
            store.canonical_uri("ledger/backup-2025-03-09.tar.gz"),
            "/backups/ledger/backup-2025-03-09.tar.gz"
        );
    }

    #[test]
    fn test_host_keeps_explicit_port() {
        let store = store_with_endpoint("http://localhost:9000/");
        assert_eq!(store.host().unwrap(), "localhost:9000");

        let store = store_with_endpoint("https://acc.r2.example.com");
        assert_eq!(store.host().unwrap(), "acc.r2.example.com");
    }

    #[test]
    fn test_invalid_endpoint_is_a_config_error() {
        let store = store_with_endpoint("not a url");
        assert!(matches!(store.host(), Err(BackupError::Config(_))));
    }
}
