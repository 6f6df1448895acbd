use crate::{LocalStorage, Storage, StorageBackendKind, StorageError, StorageResult, SupabaseStorage};
use beatnexus_core::Config;
use std::sync::Arc;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    match config.storage_backend {
        StorageBackendKind::Supabase => {
            let storage = SupabaseStorage::from_config(config)?;
            tracing::info!(bucket = %config.storage_bucket, "Using Supabase storage backend");
            Ok(Arc::new(storage))
        }

        StorageBackendKind::Local => {
            let base_path = config.local_storage_path.clone().ok_or_else(|| {
                StorageError::ConfigError(
                    "BEATNEXUS_LOCAL_STORAGE_PATH not configured".to_string(),
                )
            })?;
            let base_url = config
                .local_storage_base_url
                .clone()
                .unwrap_or_else(|| format!("file://{}", base_path.display()));

            let storage = LocalStorage::new(base_path, base_url).await?;
            tracing::info!("Using local storage backend");
            Ok(Arc::new(storage))
        }
    }
}
