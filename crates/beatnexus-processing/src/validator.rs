use crate::error::ValidationError;
use beatnexus_core::constants::VIDEO_EXTENSIONS;
use beatnexus_core::MediaFile;
use std::path::Path;

/// File gate run before a video is probed.
///
/// Size limits are not enforced here: an oversized file is a format
/// rejection that offers compression, not a gate failure.
pub struct VideoFileValidator {
    allowed_extensions: Vec<String>,
}

impl Default for VideoFileValidator {
    fn default() -> Self {
        Self::new(VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect())
    }
}

impl VideoFileValidator {
    pub fn new(allowed_extensions: Vec<String>) -> Self {
        Self { allowed_extensions }
    }

    pub fn validate_not_empty(&self, size: u64) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }
        Ok(())
    }

    pub fn validate_extension(&self, filename: &str) -> Result<(), ValidationError> {
        let extension = extension_of(filename)?;

        if !self.allowed_extensions.contains(&extension) {
            return Err(ValidationError::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        Ok(())
    }

    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if !content_type.to_lowercase().starts_with("video/") {
            return Err(ValidationError::InvalidContentType {
                content_type: content_type.to_string(),
            });
        }
        Ok(())
    }

    /// Reject a Content-Type that disagrees with the file extension
    pub fn validate_extension_content_type_match(
        &self,
        filename: &str,
        content_type: &str,
    ) -> Result<(), ValidationError> {
        let extension = extension_of(filename)?;
        let normalized = content_type.to_lowercase();

        let expected: &[&str] = match extension.as_str() {
            "mp4" => &["video/mp4"],
            // WebM is a Matroska profile; the h264 fallback is labelled as Matroska
            "webm" => &["video/webm", "video/x-matroska"],
            "mov" => &["video/quicktime"],
            "mkv" => &["video/x-matroska", "video/matroska"],
            "m4v" => &["video/x-m4v", "video/mp4"],
            _ => {
                tracing::debug!(
                    extension = %extension,
                    content_type = %content_type,
                    "Unknown extension, skipping Content-Type/extension cross-validation"
                );
                return Ok(());
            }
        };

        if !expected.iter().any(|ct| *ct == normalized) {
            return Err(ValidationError::InvalidContentType {
                content_type: format!(
                    "{} (does not match extension '{}'. Expected one of: {})",
                    content_type,
                    extension,
                    expected.join(", ")
                ),
            });
        }

        Ok(())
    }

    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: u64,
    ) -> Result<(), ValidationError> {
        self.validate_not_empty(file_size)?;
        self.validate_extension(filename)?;
        self.validate_content_type(content_type)?;
        self.validate_extension_content_type_match(filename, content_type)?;
        Ok(())
    }

    pub fn validate_file(&self, file: &MediaFile) -> Result<(), ValidationError> {
        self.validate_all(&file.name, &file.content_type, file.size_bytes)
    }
}

fn extension_of(filename: &str) -> Result<String, ValidationError> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or_else(|| ValidationError::InvalidFilename(filename.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_supported_videos() {
        let validator = VideoFileValidator::default();
        assert!(validator.validate_all("take.mp4", "video/mp4", 1024).is_ok());
        assert!(validator.validate_all("TAKE.WEBM", "video/webm", 1).is_ok());
        assert!(validator
            .validate_all("take_compressed.webm", "video/x-matroska", 1)
            .is_ok());
        assert!(validator
            .validate_all("take.mov", "video/quicktime", 1024)
            .is_ok());
    }

    #[test]
    fn test_rejects_empty_file() {
        let validator = VideoFileValidator::default();
        assert!(matches!(
            validator.validate_all("take.mp4", "video/mp4", 0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let validator = VideoFileValidator::default();
        assert!(matches!(
            validator.validate_extension("take.avi"),
            Err(ValidationError::InvalidExtension { .. })
        ));
        assert!(matches!(
            validator.validate_extension("take"),
            Err(ValidationError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_rejects_non_video_content_type() {
        let validator = VideoFileValidator::default();
        assert!(matches!(
            validator.validate_content_type("image/png"),
            Err(ValidationError::InvalidContentType { .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_content_type() {
        let validator = VideoFileValidator::default();
        let result = validator.validate_all("take.mp4", "video/webm", 1024);
        match result {
            Err(ValidationError::InvalidContentType { content_type }) => {
                assert!(content_type.contains("does not match extension 'mp4'"));
            }
            other => panic!("expected content type mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_file_uses_derived_content_type() {
        let validator = VideoFileValidator::default();
        let file = MediaFile::new("/tmp/round.mkv", 4096);
        assert!(validator.validate_file(&file).is_ok());

        let text = MediaFile::new("/tmp/notes.txt", 4096);
        assert!(validator.validate_file(&text).is_err());
    }
}
