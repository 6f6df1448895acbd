//! Configuration module
//!
//! Settings for the backend endpoints, storage, the native media tools and
//! the compression pass, loaded from the environment (and `.env`).

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{DEFAULT_COMPRESSION_TARGET_MB, DEFAULT_STORAGE_BUCKET, MAX_FILE_SIZE_MB};

// Common constants
const HTTP_TIMEOUT_SECS: u64 = 60;
const UPLOAD_TIMEOUT_SECS: u64 = 300;
const DEFAULT_FFMPEG_PATH: &str = "ffmpeg";
const DEFAULT_FFPROBE_PATH: &str = "ffprobe";

/// Where uploaded videos are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackendKind {
    Supabase,
    Local,
}

impl FromStr for StorageBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "supabase" => Ok(StorageBackendKind::Supabase),
            "local" => Ok(StorageBackendKind::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// User JWT; requests fall back to the anon key when unset
    pub supabase_access_token: Option<String>,
    pub storage_backend: StorageBackendKind,
    pub storage_bucket: String,
    pub local_storage_path: Option<PathBuf>,
    pub local_storage_base_url: Option<String>,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub compression_target_mb: f64,
    pub work_dir: PathBuf,
    pub http_timeout_secs: u64,
    pub upload_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let supabase_url = env::var("SUPABASE_URL")
            .map_err(|_| anyhow::anyhow!("SUPABASE_URL must be set"))?
            .trim_end_matches('/')
            .to_string();

        let supabase_anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| anyhow::anyhow!("SUPABASE_ANON_KEY must be set"))?;

        let supabase_access_token = env::var("SUPABASE_ACCESS_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        let storage_backend = env::var("BEATNEXUS_STORAGE_BACKEND")
            .unwrap_or_else(|_| "supabase".to_string())
            .parse::<StorageBackendKind>()?;

        let storage_bucket = env::var("BEATNEXUS_STORAGE_BUCKET")
            .unwrap_or_else(|_| DEFAULT_STORAGE_BUCKET.to_string());

        let local_storage_path = env::var("BEATNEXUS_LOCAL_STORAGE_PATH")
            .ok()
            .map(PathBuf::from);
        let local_storage_base_url = env::var("BEATNEXUS_LOCAL_STORAGE_BASE_URL").ok();

        let ffmpeg_path = Self::ffmpeg_path_from_env();
        let ffprobe_path = Self::ffprobe_path_from_env();

        let compression_target_mb =
            parse_env("BEATNEXUS_COMPRESSION_TARGET_MB", DEFAULT_COMPRESSION_TARGET_MB)?;

        let work_dir = env::var("BEATNEXUS_WORK_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| env::temp_dir().join("beatnexus"));

        let http_timeout_secs = parse_env("HTTP_TIMEOUT_SECS", HTTP_TIMEOUT_SECS)?;
        let upload_timeout_secs = parse_env("UPLOAD_TIMEOUT_SECS", UPLOAD_TIMEOUT_SECS)?;

        let config = Config {
            environment,
            supabase_url,
            supabase_anon_key,
            supabase_access_token,
            storage_backend,
            storage_bucket,
            local_storage_path,
            local_storage_base_url,
            ffmpeg_path,
            ffprobe_path,
            compression_target_mb,
            work_dir,
            http_timeout_secs,
            upload_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// `FFMPEG_PATH`, without requiring the rest of the configuration
    pub fn ffmpeg_path_from_env() -> String {
        env::var("FFMPEG_PATH").unwrap_or_else(|_| DEFAULT_FFMPEG_PATH.to_string())
    }

    pub fn ffprobe_path_from_env() -> String {
        env::var("FFPROBE_PATH").unwrap_or_else(|_| DEFAULT_FFPROBE_PATH.to_string())
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.supabase_url.starts_with("http://") && !self.supabase_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "SUPABASE_URL must be an http(s) URL, got {}",
                self.supabase_url
            ));
        }

        if self.supabase_anon_key.trim().is_empty() {
            return Err(anyhow::anyhow!("SUPABASE_ANON_KEY must not be empty"));
        }

        if self.storage_bucket.trim().is_empty() || self.storage_bucket.contains('/') {
            return Err(anyhow::anyhow!(
                "BEATNEXUS_STORAGE_BUCKET must be a single path segment"
            ));
        }

        if self.storage_backend == StorageBackendKind::Local && self.local_storage_path.is_none()
        {
            return Err(anyhow::anyhow!(
                "BEATNEXUS_STORAGE_BACKEND=local requires BEATNEXUS_LOCAL_STORAGE_PATH"
            ));
        }

        if !(self.compression_target_mb > 0.0
            && self.compression_target_mb <= MAX_FILE_SIZE_MB as f64)
        {
            return Err(anyhow::anyhow!(
                "BEATNEXUS_COMPRESSION_TARGET_MB must be in (0, {}], got {}",
                MAX_FILE_SIZE_MB,
                self.compression_target_mb
            ));
        }

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    /// Token for `Authorization: Bearer`, preferring the user's session
    pub fn bearer_token(&self) -> &str {
        self.supabase_access_token
            .as_deref()
            .unwrap_or(&self.supabase_anon_key)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    /// Configuration pointing at `supabase_url`, with defaults for everything else
    pub fn for_endpoint(supabase_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Config {
            environment: "development".to_string(),
            supabase_url: supabase_url.into().trim_end_matches('/').to_string(),
            supabase_anon_key: anon_key.into(),
            supabase_access_token: None,
            storage_backend: StorageBackendKind::Supabase,
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            local_storage_path: None,
            local_storage_base_url: None,
            ffmpeg_path: DEFAULT_FFMPEG_PATH.to_string(),
            ffprobe_path: DEFAULT_FFPROBE_PATH.to_string(),
            compression_target_mb: DEFAULT_COMPRESSION_TARGET_MB,
            work_dir: env::temp_dir().join("beatnexus"),
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            upload_timeout_secs: UPLOAD_TIMEOUT_SECS,
        }
    }
}

/// Unset means `default`; a value that does not parse is an error naming the variable
fn parse_env<T>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {:?} ({})", name, raw, e)),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_endpoint_defaults_are_valid() {
        let config = Config::for_endpoint("https://project.supabase.co/", "anon");
        assert_eq!(config.supabase_url, "https://project.supabase.co");
        assert!(config.validate().is_ok());
        assert_eq!(config.bearer_token(), "anon");
        assert!(!config.is_production());
    }

    #[test]
    fn test_access_token_preferred_for_bearer() {
        let mut config = Config::for_endpoint("https://project.supabase.co", "anon");
        config.supabase_access_token = Some("user-jwt".to_string());
        assert_eq!(config.bearer_token(), "user-jwt");
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = Config::for_endpoint("ftp://project", "anon");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_target_above_cap() {
        let mut config = Config::for_endpoint("https://project.supabase.co", "anon");
        config.compression_target_mb = 80.0;
        assert!(config.validate().is_err());
        config.compression_target_mb = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_local_backend_requires_path() {
        let mut config = Config::for_endpoint("https://project.supabase.co", "anon");
        config.storage_backend = StorageBackendKind::Local;
        assert!(config.validate().is_err());
        config.local_storage_path = Some(PathBuf::from("/tmp/beatnexus"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_storage_backend_parse() {
        assert_eq!(
            "LOCAL".parse::<StorageBackendKind>().unwrap(),
            StorageBackendKind::Local
        );
        assert!("s3".parse::<StorageBackendKind>().is_err());
    }

    #[test]
    fn test_parse_env_rejects_malformed_value() {
        env::set_var("BEATNEXUS_TEST_PARSE_ENV_TIMEOUT", "sixty");
        let err = parse_env("BEATNEXUS_TEST_PARSE_ENV_TIMEOUT", 60u64).unwrap_err();
        assert!(err.to_string().contains("BEATNEXUS_TEST_PARSE_ENV_TIMEOUT"));
        assert!(err.to_string().contains("sixty"));

        env::set_var("BEATNEXUS_TEST_PARSE_ENV_TIMEOUT", " 90 ");
        assert_eq!(parse_env("BEATNEXUS_TEST_PARSE_ENV_TIMEOUT", 60u64).unwrap(), 90);
        env::remove_var("BEATNEXUS_TEST_PARSE_ENV_TIMEOUT");
    }

    #[test]
    fn test_parse_env_unset_uses_default() {
        assert_eq!(
            parse_env("BEATNEXUS_TEST_PARSE_ENV_UNSET", 12.5f64).unwrap(),
            12.5
        );
    }

    #[test]
    fn test_tool_paths_match_endpoint_defaults() {
        let config = Config::for_endpoint("https://project.supabase.co", "anon");
        if env::var("FFPROBE_PATH").is_err() {
            assert_eq!(Config::ffprobe_path_from_env(), config.ffprobe_path);
        }
        if env::var("FFMPEG_PATH").is_err() {
            assert_eq!(Config::ffmpeg_path_from_env(), config.ffmpeg_path);
        }
    }
}
