//! Configuration loaded from the environment at startup.

use crate::domain::media::MediaLimits;
use crate::domain::transcode::{AudioPolicy, FitPolicy, TranscodeSpec};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Process-wide configuration, read once at startup and read-only afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Telegram bot credential
    pub bot_token: String,
    /// Maximum declared video duration in seconds
    pub max_duration_secs: u64,
    /// Maximum declared video size in bytes
    pub max_size_bytes: u64,
    /// Transcoder binary name or path
    pub ffmpeg_bin: PathBuf,
    /// Working directory for per-job temp files
    pub tmp_dir: PathBuf,
    /// Liveness listener port
    pub health_port: u16,
    /// Square dimension of the produced video note
    pub note_size: u32,
    /// How the source aspect ratio maps onto the square
    pub fit: FitPolicy,
    /// Keep the audio track (re-encoded) instead of stripping it
    pub keep_audio: bool,
    /// Wall-clock limit for one transcode run, in seconds
    pub transcode_timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics if BOT_TOKEN is not set; everything else has a default.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Self {
            bot_token: env::var("BOT_TOKEN").expect("BOT_TOKEN env var required"),
            max_duration_secs: env::var("VIDEO_MAX_DURATION")
                .unwrap_or_else(|_| String::from("90"))
                .parse()
                .unwrap_or(90),
            max_size_bytes: env::var("VIDEO_MAX_BYTES")
                .unwrap_or_else(|_| String::from("20971520"))
                .parse()
                .unwrap_or(20 * 1024 * 1024),
            ffmpeg_bin: PathBuf::from(
                env::var("FFMPEG_BIN").unwrap_or_else(|_| String::from("ffmpeg")),
            ),
            tmp_dir: PathBuf::from(env::var("TMP_DIR").unwrap_or_else(|_| String::from("tmp"))),
            health_port: env::var("PORT")
                .unwrap_or_else(|_| String::from("10000"))
                .parse()
                .unwrap_or(10000),
            note_size: env::var("VIDEO_NOTE_SIZE")
                .unwrap_or_else(|_| String::from("720"))
                .parse()
                .unwrap_or(720),
            fit: match env::var("VIDEO_FIT").ok().as_deref() {
                Some("crop") => FitPolicy::Crop,
                _ => FitPolicy::Pad,
            },
            keep_audio: env::var("VIDEO_KEEP_AUDIO")
                .unwrap_or_else(|_| String::from("false"))
                .parse()
                .unwrap_or(false),
            transcode_timeout_secs: env::var("TRANSCODE_TIMEOUT")
                .unwrap_or_else(|_| String::from("120"))
                .parse()
                .unwrap_or(120),
        }
    }

    /// Ceilings applied to declared media metadata before any I/O.
    pub fn media_limits(&self) -> MediaLimits {
        MediaLimits {
            max_duration_secs: self.max_duration_secs,
            max_size_bytes: self.max_size_bytes,
        }
    }

    /// The fixed transcode parameters every job runs with.
    pub fn transcode_spec(&self) -> TranscodeSpec {
        TranscodeSpec {
            dimension: self.note_size,
            fit: self.fit,
            audio: if self.keep_audio {
                AudioPolicy::Reencode { bitrate_kbps: 128 }
            } else {
                AudioPolicy::Strip
            },
            timeout: Duration::from_secs(self.transcode_timeout_secs),
            ..TranscodeSpec::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_applies_defaults_then_overrides() {
        env::set_var("BOT_TOKEN", "token-123");

        let config = Config::from_env();
        assert_eq!(config.bot_token, "token-123");
        assert_eq!(config.max_duration_secs, 90);
        assert_eq!(config.max_size_bytes, 20 * 1024 * 1024);
        assert_eq!(config.ffmpeg_bin, PathBuf::from("ffmpeg"));
        assert_eq!(config.tmp_dir, PathBuf::from("tmp"));
        assert_eq!(config.health_port, 10000);
        assert_eq!(config.fit, FitPolicy::Pad);
        assert!(!config.keep_audio);
        assert_eq!(config.transcode_spec().timeout, Duration::from_secs(120));

        env::set_var("VIDEO_MAX_DURATION", "45");
        env::set_var("VIDEO_FIT", "crop");
        env::set_var("VIDEO_KEEP_AUDIO", "true");

        let config = Config::from_env();
        assert_eq!(config.max_duration_secs, 45);
        assert_eq!(config.fit, FitPolicy::Crop);
        assert_eq!(
            config.transcode_spec().audio,
            AudioPolicy::Reencode { bitrate_kbps: 128 }
        );

        env::remove_var("VIDEO_MAX_DURATION");
        env::remove_var("VIDEO_FIT");
        env::remove_var("VIDEO_KEEP_AUDIO");
    }
}
