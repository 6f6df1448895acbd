//! Supabase storage backend
//!
//! Objects are written with `POST {url}/storage/v1/object/{bucket}/{key}` and
//! served from `{url}/storage/v1/object/public/{bucket}/{key}`.

use crate::keys::{generate_storage_key, validate_key};
use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use beatnexus_core::{Config, StorageBackendKind};
use reqwest::Client;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct SupabaseStorage {
    client: Client,
    base_url: String,
    bucket: String,
    anon_key: String,
    bearer_token: String,
}

impl SupabaseStorage {
    pub fn new(
        base_url: impl Into<String>,
        bucket: impl Into<String>,
        anon_key: impl Into<String>,
        bearer_token: impl Into<String>,
        timeout: Duration,
    ) -> StorageResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            anon_key: anon_key.into(),
            bearer_token: bearer_token.into(),
        })
    }

    pub fn from_config(config: &Config) -> StorageResult<Self> {
        Self::new(
            config.supabase_url.clone(),
            config.storage_bucket.clone(),
            config.supabase_anon_key.clone(),
            config.bearer_token(),
            config.upload_timeout(),
        )
    }

    fn object_url(&self, storage_key: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_key(storage_key)
        )
    }
}

fn encode_key(storage_key: &str) -> String {
    storage_key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl Storage for SupabaseStorage {
    #[tracing::instrument(skip(self, data), fields(
        storage.bucket = %self.bucket,
        size_bytes = data.len()
    ))]
    async fn upload(
        &self,
        owner_id: Uuid,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        let key = generate_storage_key(owner_id, filename);
        let start = std::time::Instant::now();

        let response = self
            .client
            .post(self.object_url(&key))
            .bearer_auth(&self.bearer_token)
            .header("apikey", &self.anon_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await
            .map_err(|e| StorageError::UploadFailed(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(StorageError::UploadFailed(format!(
                "Upload failed with status {}: {}",
                status, text
            )));
        }

        tracing::info!(
            storage_key = %key,
            duration_ms = start.elapsed().as_millis() as u64,
            "Supabase storage upload completed"
        );

        Ok(key)
    }

    fn public_url(&self, storage_key: &str) -> StorageResult<String> {
        validate_key(storage_key)?;
        Ok(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            encode_key(storage_key)
        ))
    }

    fn backend_type(&self) -> StorageBackendKind {
        StorageBackendKind::Supabase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn storage(url: &str) -> SupabaseStorage {
        SupabaseStorage::new(url, "videos", "anon-key", "user-jwt", Duration::from_secs(5))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_posts_bytes_to_bucket() {
        let mut server = mockito::Server::new_async().await;
        let owner = Uuid::new_v4();
        let mock = server
            .mock(
                "POST",
                Matcher::Regex(format!(r"^/storage/v1/object/videos/{}/[a-z0-9]{{16}}\.mp4$", owner)),
            )
            .match_header("authorization", "Bearer user-jwt")
            .match_header("apikey", "anon-key")
            .match_header("content-type", "video/mp4")
            .match_body("video bytes")
            .with_status(200)
            .with_body(r#"{"Key":"videos/x"}"#)
            .create_async()
            .await;

        let key = storage(&server.url())
            .upload(owner, "take.mp4", "video/mp4", b"video bytes".to_vec())
            .await
            .unwrap();

        assert!(key.starts_with(&format!("{}/", owner)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_failure_keeps_server_detail() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", Matcher::Any)
            .with_status(413)
            .with_body(r#"{"error":"Payload too large"}"#)
            .create_async()
            .await;

        let err = storage(&server.url())
            .upload(Uuid::new_v4(), "take.mp4", "video/mp4", vec![0; 8])
            .await
            .unwrap_err();

        match err {
            StorageError::UploadFailed(message) => {
                assert!(message.contains("413"));
                assert!(message.contains("Payload too large"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_public_url_layout() {
        let storage = storage("https://project.supabase.co/");
        assert_eq!(
            storage.public_url("owner/abc123.webm").unwrap(),
            "https://project.supabase.co/storage/v1/object/public/videos/owner/abc123.webm"
        );
    }
}
