//! Storage key derivation shared by every backend and by the upload flow.

use crate::traits::{StorageError, StorageResult};

pub const THUMBNAIL_PREFIX: &str = "thumbnails/";

/// Reject keys that could escape a backend's root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.contains("..") || storage_key.starts_with('/') || storage_key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// `uploads/<unix-millis>-<file name>`
pub fn upload_key(prefix: &str, timestamp_millis: i64, file_name: &str) -> StorageResult<String> {
    let file_name = file_name.trim();
    if file_name.is_empty() || file_name.contains('/') || file_name.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Invalid file name: {}",
            file_name
        )));
    }
    let key = format!("{}{}-{}", prefix, timestamp_millis, file_name);
    validate_key(&key)?;
    Ok(key)
}

/// `thumbnails/<basename>.jpg` for a video key.
pub fn thumbnail_key(video_key: &str) -> StorageResult<String> {
    validate_key(video_key)?;
    let file_name = video_key.rsplit('/').next().unwrap_or(video_key);
    Ok(format!("{}{}.jpg", THUMBNAIL_PREFIX, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_key_has_prefix_and_timestamp() {
        let key = upload_key("uploads/", 1_700_000_000_000, "beach day.mp4").unwrap();
        assert_eq!(key, "uploads/1700000000000-beach day.mp4");
    }

    #[test]
    fn upload_key_rejects_paths() {
        assert!(upload_key("uploads/", 1, "../etc/passwd").is_err());
        assert!(upload_key("uploads/", 1, "nested/file.mp4").is_err());
        assert!(upload_key("uploads/", 1, "  ").is_err());
    }

    #[test]
    fn thumbnail_key_uses_basename() {
        assert_eq!(
            thumbnail_key("uploads/17-cat.mov").unwrap(),
            "thumbnails/17-cat.mov.jpg"
        );
        assert!(thumbnail_key("/abs/path.mp4").is_err());
    }
}
