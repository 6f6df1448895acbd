//! Shared key generation for storage backends.

use rand::distr::Alphanumeric;
use rand::Rng;
use std::path::Path;
use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

const RANDOM_NAME_LEN: usize = 16;

/// Generate `{owner_id}/{random}.{ext}` for an uploaded file.
///
/// The extension is taken from `filename`, lowercased; files without one
/// fall back to `bin`.
pub fn generate_storage_key(owner_id: Uuid, filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_lowercase())
        .unwrap_or_else(|| "bin".to_string());

    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_NAME_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();

    format!("{}/{}.{}", owner_id, random, extension)
}

/// Keys are relative and may not traverse upward
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            storage_key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_layout() {
        let owner = Uuid::new_v4();
        let key = generate_storage_key(owner, "My Take.MP4");
        let (prefix, name) = key.split_once('/').unwrap();
        assert_eq!(prefix, owner.to_string());
        let (random, ext) = name.split_once('.').unwrap();
        assert_eq!(ext, "mp4");
        assert_eq!(random.len(), RANDOM_NAME_LEN);
        assert!(random
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_keys_are_unique() {
        let owner = Uuid::new_v4();
        assert_ne!(
            generate_storage_key(owner, "take.webm"),
            generate_storage_key(owner, "take.webm")
        );
    }

    #[test]
    fn test_missing_extension_falls_back() {
        let key = generate_storage_key(Uuid::new_v4(), "take");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("user/abc.mp4").is_ok());
        assert!(validate_key("../etc/passwd").is_err());
        assert!(validate_key("/abs/path").is_err());
        assert!(validate_key("").is_err());
    }
}
