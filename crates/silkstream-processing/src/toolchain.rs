//! ffprobe / ffmpeg invocation

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Container tags checked for the recording time, in priority order.
const CREATION_TAGS: [&str; 3] = ["creation_time", "com.apple.quicktime.creationdate", "date"];

/// What probing a video file yields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeMetadata {
    pub created_date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
}

#[async_trait]
pub trait VideoToolchain: Send + Sync {
    async fn probe(&self, video_path: &Path) -> Result<ProbeMetadata>;

    /// Write one JPEG frame taken at `timestamp_seconds`, scaled to `width` pixels wide.
    async fn extract_frame(
        &self,
        video_path: &Path,
        output_path: &Path,
        timestamp_seconds: f64,
        width: u32,
    ) -> Result<()>;
}

/// Reject paths carrying shell metacharacters or traversal
fn validate_path(path: &str) -> Result<()> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    Ok(())
}

fn validate_executable(path: &str, name: &str) -> Result<()> {
    validate_path(path).with_context(|| format!("Invalid {} path", name))?;

    if !path
        .chars()
        .all(|c| c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\')
    {
        return Err(anyhow!("Invalid {} path: contains unsafe characters", name));
    }

    Ok(())
}

fn checked(path: &Path) -> Result<PathBuf> {
    validate_path(&path.to_string_lossy())?;
    Ok(path.to_path_buf())
}

pub struct FFmpegToolchain {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FFmpegToolchain {
    pub fn new(ffmpeg_path: String, ffprobe_path: String) -> Result<Self> {
        validate_executable(&ffmpeg_path, "ffmpeg")?;
        validate_executable(&ffprobe_path, "ffprobe")?;

        Ok(Self {
            ffmpeg_path,
            ffprobe_path,
        })
    }
}

#[async_trait]
impl VideoToolchain for FFmpegToolchain {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffprobe",
        process.executable.path = %self.ffprobe_path
    ))]
    async fn probe(&self, video_path: &Path) -> Result<ProbeMetadata> {
        let start = std::time::Instant::now();
        let input = checked(video_path).context("Invalid video path")?;

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(&input)
            .output()
            .await
            .context("Failed to execute ffprobe")?;

        if !output.status.success() {
            return Err(anyhow!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let metadata = parse_probe_output(&output.stdout)?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis() as u64,
            video_duration = ?metadata.duration,
            created_date = ?metadata.created_date,
            "Video probe completed"
        );

        Ok(metadata)
    }

    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path
    ))]
    async fn extract_frame(
        &self,
        video_path: &Path,
        output_path: &Path,
        timestamp_seconds: f64,
        width: u32,
    ) -> Result<()> {
        let input = checked(video_path).context("Invalid video path")?;
        let output_file = checked(output_path).context("Invalid thumbnail path")?;

        let seek = format!("{:.3}", timestamp_seconds.max(0.0));
        let scale = format!("scale={}:-2", width);

        let output = Command::new(&self.ffmpeg_path)
            .args(["-y", "-ss", seek.as_str(), "-i"])
            .arg(&input)
            .args(["-frames:v", "1", "-vf", scale.as_str(), "-q:v", "3"])
            .arg(&output_file)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("FFmpeg failed: {}", stderr));
        }

        if !tokio::fs::try_exists(&output_file).await.unwrap_or(false) {
            return Err(anyhow!("FFmpeg produced no frame at {:.3}s", timestamp_seconds));
        }

        Ok(())
    }
}

/// Extract creation date and duration from ffprobe's JSON output.
///
/// Creation time is read from the format tags first, then from the first
/// stream that carries one.
pub fn parse_probe_output(stdout: &[u8]) -> Result<ProbeMetadata> {
    let probe: Value = serde_json::from_slice(stdout).context("Failed to parse ffprobe output")?;
    let format = &probe["format"];

    let duration = match &format["duration"] {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
    .filter(|d| d.is_finite() && *d >= 0.0);

    let stream_tags = probe["streams"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|stream| &stream["tags"]);

    let created_date = std::iter::once(&format["tags"])
        .chain(stream_tags)
        .find_map(creation_date_from_tags);

    Ok(ProbeMetadata {
        created_date,
        duration,
    })
}

fn creation_date_from_tags(tags: &Value) -> Option<DateTime<Utc>> {
    CREATION_TAGS
        .iter()
        .filter_map(|name| tags.get(*name).and_then(Value::as_str))
        .find_map(parse_timestamp)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_duration_and_creation_time() {
        let output = br#"{
            "streams": [{"codec_type": "video"}],
            "format": {
                "duration": "12.480000",
                "tags": {"creation_time": "2023-06-01T10:15:30.000000Z"}
            }
        }"#;

        let metadata = parse_probe_output(output).unwrap();
        assert_eq!(metadata.duration, Some(12.48));
        assert_eq!(
            metadata.created_date,
            Some(Utc.with_ymd_and_hms(2023, 6, 1, 10, 15, 30).unwrap())
        );
    }

    #[test]
    fn falls_back_to_quicktime_tag_with_compact_offset() {
        let output = br#"{
            "format": {
                "duration": "3.0",
                "tags": {"com.apple.quicktime.creationdate": "2022-12-24T18:00:00+0100"}
            }
        }"#;

        let metadata = parse_probe_output(output).unwrap();
        assert_eq!(
            metadata.created_date,
            Some(Utc.with_ymd_and_hms(2022, 12, 24, 17, 0, 0).unwrap())
        );
    }

    #[test]
    fn reads_stream_tags_when_format_has_none() {
        let output = br#"{
            "streams": [{"tags": {"creation_time": "2021-01-02T03:04:05Z"}}],
            "format": {"duration": "1.5"}
        }"#;

        let metadata = parse_probe_output(output).unwrap();
        assert_eq!(
            metadata.created_date,
            Some(Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap())
        );
    }

    #[test]
    fn missing_fields_yield_none() {
        let metadata = parse_probe_output(br#"{"format": {"duration": "N/A"}}"#).unwrap();
        assert_eq!(metadata, ProbeMetadata::default());
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(parse_probe_output(b"not json").is_err());
    }

    #[test]
    fn rejects_unsafe_executable_paths() {
        assert!(FFmpegToolchain::new("ffmpeg".into(), "ffprobe".into()).is_ok());
        assert!(FFmpegToolchain::new("ffmpeg; rm -rf /".into(), "ffprobe".into()).is_err());
        assert!(FFmpegToolchain::new("ffmpeg".into(), "../ffprobe".into()).is_err());
    }
}
