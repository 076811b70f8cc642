//! Validation and presentation helpers

use base64::Engine;

use super::error::UploadError;
use super::source::UploadFile;
use super::types::{DEFAULT_ALLOWED_TYPES, DEFAULT_IMAGE_MAX_SIZE};

/// Rules for [`validate_image_file`]
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    pub max_size: u64,
    /// Empty list accepts every `image/*` type
    pub allowed_types: Vec<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_IMAGE_MAX_SIZE,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Check a file against an allow-list and size limit
pub fn validate_image_file(
    file: Option<&UploadFile>,
    options: &ValidationOptions,
) -> Result<(), UploadError> {
    let file = file.ok_or(UploadError::MissingFile)?;

    if !file.is_image() {
        return Err(UploadError::NotAnImage);
    }

    if !options.allowed_types.is_empty()
        && !options.allowed_types.iter().any(|t| t == file.mime_type())
    {
        return Err(UploadError::UnsupportedType(file.mime_type().to_string()));
    }

    if file.size() > options.max_size {
        return Err(UploadError::TooLarge {
            size: file.size(),
            max: options.max_size,
        });
    }

    Ok(())
}

/// Human-readable size in 1024-based units, at most two decimals
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    let text = format!("{:.2}", rounded);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[unit])
}

/// Encode an image file as a `data:` URL for local preview
pub async fn create_image_preview(file: &UploadFile) -> Result<String, UploadError> {
    if !file.is_image() {
        return Err(UploadError::NotAnImage);
    }

    let data = file.read_all().await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    Ok(format!("data:{};base64,{}", file.mime_type(), encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(mime: &str, size: usize) -> UploadFile {
        UploadFile::from_bytes("photo", mime, vec![0u8; size])
    }

    #[test]
    fn test_validate_image_file() {
        let options = ValidationOptions::default();

        assert!(validate_image_file(Some(&image("image/png", 10)), &options).is_ok());
        assert!(matches!(
            validate_image_file(None, &options),
            Err(UploadError::MissingFile)
        ));
        assert!(matches!(
            validate_image_file(Some(&image("text/plain", 10)), &options),
            Err(UploadError::NotAnImage)
        ));
        assert!(matches!(
            validate_image_file(Some(&image("image/gif", 10)), &options),
            Err(UploadError::UnsupportedType(_))
        ));

        let small = ValidationOptions {
            max_size: 5,
            allowed_types: vec![],
        };
        assert!(validate_image_file(Some(&image("image/gif", 5)), &small).is_ok());
        assert!(matches!(
            validate_image_file(Some(&image("image/gif", 6)), &small),
            Err(UploadError::TooLarge { size: 6, max: 5 })
        ));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(3 * 1024 * 1024), "3 MB");
        assert_eq!(format_file_size(1_234_567), "1.18 MB");
        assert_eq!(format_file_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[tokio::test]
    async fn test_create_image_preview() {
        let file = UploadFile::from_bytes("p.png", "image/png", b"png".to_vec());
        let url = create_image_preview(&file).await.unwrap();
        assert_eq!(url, "data:image/png;base64,cG5n");

        let text = UploadFile::from_bytes("a.txt", "text/plain", b"hi".to_vec());
        assert!(matches!(
            create_image_preview(&text).await,
            Err(UploadError::NotAnImage)
        ));
    }
}
