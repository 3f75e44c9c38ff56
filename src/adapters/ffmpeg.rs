//! The ffmpeg adapter: builds the conversion command line and supervises the
//! child process.

use crate::domain::transcode::{AudioPolicy, FitPolicy, ProcessOutcome, TranscodeSpec};
use crate::ports::transcode::TranscodePort;
use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// How much of the tool's stderr is kept for diagnostics.
const STDERR_TAIL_CHARS: usize = 400;

pub struct FfmpegTranscoder {
    bin: PathBuf,
    spec: TranscodeSpec,
}

impl FfmpegTranscoder {
    pub fn new(bin: PathBuf, spec: TranscodeSpec) -> Self {
        Self { bin, spec }
    }

    fn filter_expr(&self) -> String {
        let d = self.spec.dimension;
        match self.spec.fit {
            FitPolicy::Pad => format!(
                "scale={d}:{d}:force_original_aspect_ratio=decrease,pad={d}:{d}:(ow-iw)/2:(oh-ih)/2"
            ),
            FitPolicy::Crop => {
                format!("scale={d}:{d}:force_original_aspect_ratio=increase,crop={d}:{d}")
            }
        }
    }

    /// The deterministic argument vector for one conversion: square target
    /// with the configured fit policy, explicit codec and preset, fast start
    /// for streaming playback, audio stripped or re-encoded.
    pub fn command_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let mut args = vec![
            String::from("-y"),
            String::from("-i"),
            input.display().to_string(),
            String::from("-vf"),
            self.filter_expr(),
            String::from("-c:v"),
            self.spec.video_codec.clone(),
            String::from("-preset"),
            self.spec.preset.clone(),
            String::from("-movflags"),
            String::from("+faststart"),
        ];
        match self.spec.audio {
            AudioPolicy::Strip => args.push(String::from("-an")),
            AudioPolicy::Reencode { bitrate_kbps } => {
                args.extend([
                    String::from("-c:a"),
                    String::from("aac"),
                    String::from("-b:a"),
                    format!("{bitrate_kbps}k"),
                ]);
            }
        }
        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl TranscodePort for FfmpegTranscoder {
    async fn run(&self, input: &Path, output: &Path) -> io::Result<ProcessOutcome> {
        let args = self.command_args(input, output);
        debug!(bin = %self.bin.display(), args = args.join(" "), "spawning transcoder");

        let mut child = match Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Ok(ProcessOutcome::NotFound)
            }
            Err(err) => return Err(err),
        };

        let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "transcoder stderr was not captured")
        })?;
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr_pipe.read_to_end(&mut buf).await;
            buf
        });

        let status = match timeout(self.spec.timeout, child.wait()).await {
            Ok(waited) => waited?,
            Err(_) => {
                warn!(timeout = ?self.spec.timeout, "transcoder timed out, killing it");
                child.kill().await?;
                return Ok(ProcessOutcome::TimedOut);
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if status.success() {
            Ok(ProcessOutcome::Success)
        } else {
            Ok(ProcessOutcome::NonZeroExit {
                code: status.code().unwrap_or(-1),
                stderr_tail: stderr_tail(&stderr),
            })
        }
    }
}

fn stderr_tail(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim_end();
    let total = text.chars().count();
    if total <= STDERR_TAIL_CHARS {
        text.to_string()
    } else {
        text.chars().skip(total - STDERR_TAIL_CHARS).collect()
    }
}
