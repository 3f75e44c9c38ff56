//! Transcode parameters and the external tool's outcome model.

use std::time::Duration;

/// How the source aspect ratio maps onto the square target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPolicy {
    /// Keep the aspect ratio, letterbox the rest
    Pad,
    /// Fill the square, cropping the overflow
    Crop,
}

/// What happens to the source audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioPolicy {
    Strip,
    Reencode { bitrate_kbps: u32 },
}

/// The fixed parameters every conversion runs with. Built from configuration
/// at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct TranscodeSpec {
    pub dimension: u32,
    pub fit: FitPolicy,
    pub video_codec: String,
    pub preset: String,
    pub audio: AudioPolicy,
    pub timeout: Duration,
}

impl Default for TranscodeSpec {
    fn default() -> Self {
        Self {
            dimension: 720,
            fit: FitPolicy::Pad,
            video_codec: String::from("libx264"),
            preset: String::from("fast"),
            audio: AudioPolicy::Strip,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Result of one run of the external transcoding tool. The tool is
/// run-to-completion-or-kill; no partial state is modeled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Zero exit code. Callers must still verify the output artifact exists
    /// and is non-empty; the exit code alone is not trusted.
    Success,
    /// The tool binary could not be located. A configuration fault, not a
    /// transient error.
    NotFound,
    /// The wall-clock timeout elapsed and the process was killed.
    TimedOut,
    /// The tool exited non-zero; `stderr_tail` keeps a bounded suffix of its
    /// stderr for diagnostics.
    NonZeroExit { code: i32, stderr_tail: String },
}
