//! Silkstream media processing
//!
//! Thumbnail generation for uploaded videos: a retry policy, the
//! ffprobe/ffmpeg toolchain and the pipeline tying them to object storage.

pub mod retry;
pub mod thumbnail;
pub mod toolchain;

pub use retry::{with_retry, RetryPolicy};
pub use thumbnail::{ThumbnailError, ThumbnailGenerator, ThumbnailPipeline};
pub use toolchain::{parse_probe_output, FFmpegToolchain, ProbeMetadata, VideoToolchain};
