//! Silkstream Storage Library
//!
//! Object storage for video files and generated thumbnails: the [`Storage`]
//! trait plus S3 and local filesystem backends.
//!
//! # Storage key format
//!
//! - Uploaded videos: `uploads/{unix_millis}-{file_name}`; the key doubles as the video ID
//! - Thumbnails: `thumbnails/{video_file_name}.jpg`
//!
//! Keys must not contain `..` or a leading `/`. Key derivation lives in the
//! `keys` module so all backends stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use keys::{thumbnail_key, upload_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use silkstream_core::StorageBackend;
pub use traits::{ByteStream, ObjectInfo, Storage, StorageError, StorageResult};
