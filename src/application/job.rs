//! The per-message conversion job: validate, fetch, transcode, verify,
//! deliver, and always clean up.

use crate::application::workspace::{is_nonempty_file, JobPaths, TempWorkspace};
use crate::domain::media::{validate, MediaLimits, MediaRef, ValidationError};
use crate::domain::transcode::ProcessOutcome;
use crate::ports::chat::{ChatError, ChatPort, StatusMessage};
use crate::ports::transcode::TranscodePort;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

pub(crate) const PROCESSING_TEXT: &str = "Got your video, making the circle... 🔄";
pub(crate) const SUCCESS_TEXT: &str = "Done! Here is your circle 🟣";

/// Everything that can end a job short of success, one variant per cause in
/// the failure taxonomy. Carried as a value through the state machine; no
/// failure ever escapes the job boundary.
#[derive(Debug, Error)]
pub enum JobFailure {
    #[error("fetching the source failed: {0}")]
    Fetch(ChatError),
    #[error("downloaded input is missing or empty")]
    EmptyDownload,
    #[error("transcoder binary not found")]
    ToolMissing,
    #[error("transcode timed out")]
    ToolTimeout,
    #[error("transcoder exited with code {code}: {stderr_tail}")]
    ToolExit { code: i32, stderr_tail: String },
    #[error("transcoder produced no output")]
    EmptyOutput,
    #[error("delivering the video note failed: {0}")]
    Delivery(ChatError),
    #[error("unexpected fault: {0}")]
    Unexpected(String),
}

impl JobFailure {
    /// The message shown to the requester. Specific where the cause is
    /// known; the raw diagnostics stay in the logs.
    fn user_message(&self) -> &'static str {
        match self {
            JobFailure::Fetch(ChatError::Rejected(_)) => {
                "Telegram rejected the request for this file. Please resend the video 📎"
            }
            JobFailure::Fetch(_) => {
                "Couldn't download the video from Telegram. Please try again in a moment 📡"
            }
            JobFailure::EmptyDownload => {
                "The downloaded video turned out empty. Please resend it 📎"
            }
            JobFailure::ToolMissing => {
                "Video conversion is unavailable right now. Please contact the bot operator 🙏"
            }
            JobFailure::ToolTimeout => {
                "Converting took too long and was cancelled. Try a shorter or smaller clip ⏱️"
            }
            JobFailure::ToolExit { .. } | JobFailure::EmptyOutput => {
                "Couldn't convert this video. The format may be unsupported, try another clip 😢"
            }
            JobFailure::Delivery(ChatError::Rejected(_)) => {
                "Telegram refused the converted video note. Try a different clip 😢"
            }
            JobFailure::Delivery(ChatError::Server(_)) => {
                "Telegram had trouble accepting the video note. Please try again later 🛠️"
            }
            JobFailure::Delivery(ChatError::Transport(_)) => {
                "Couldn't upload the video note to Telegram. Please try again 📡"
            }
            JobFailure::Unexpected(_) => "Something went wrong on our side. Please try again 🙈",
        }
    }

    fn stage(&self) -> &'static str {
        match self {
            JobFailure::Fetch(_) | JobFailure::EmptyDownload => "fetching",
            JobFailure::ToolMissing | JobFailure::ToolTimeout | JobFailure::ToolExit { .. } => {
                "transcoding"
            }
            JobFailure::EmptyOutput => "verifying-output",
            JobFailure::Delivery(_) => "delivering",
            JobFailure::Unexpected(_) => "unspecified",
        }
    }
}

fn rejection_text(reason: &ValidationError) -> String {
    match reason {
        ValidationError::TooLong { actual, max } => format!(
            "This video is too long ({actual} s). The maximum duration is {max} s ⏱️"
        ),
        ValidationError::TooLarge { actual, max } => format!(
            "This video is too big ({:.1} MiB). The maximum size is {:.1} MiB 📦",
            mib(*actual),
            mib(*max)
        ),
    }
}

fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// One end-to-end processing of a single inbound video message. Owns its
/// temp paths exclusively; shares nothing with sibling jobs.
pub struct ConversionJob<C, T> {
    id: Uuid,
    chat_id: i64,
    media: MediaRef,
    chat: Arc<C>,
    transcoder: Arc<T>,
    workspace: TempWorkspace,
    limits: MediaLimits,
}

impl<C, T> ConversionJob<C, T>
where
    C: ChatPort,
    T: TranscodePort,
{
    pub fn new(
        chat_id: i64,
        media: MediaRef,
        chat: Arc<C>,
        transcoder: Arc<T>,
        workspace: TempWorkspace,
        limits: MediaLimits,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            media,
            chat,
            transcoder,
            workspace,
            limits,
        }
    }

    /// Drive the job to completion. Never returns an error: every failure is
    /// translated into a user-facing status update, and cleanup runs on
    /// every path that allocated anything.
    pub async fn run(self) {
        info!(job = %self.id, chat = self.chat_id, file = %self.media.file_id, "video accepted");

        // Cheap metadata check first: nothing has touched the disk yet.
        if let Err(reason) = validate(&self.media, &self.limits) {
            warn!(job = %self.id, %reason, "rejected before download");
            if let Err(err) = self
                .chat
                .send_message(self.chat_id, &rejection_text(&reason))
                .await
            {
                warn!(job = %self.id, %err, "could not deliver rejection notice");
            }
            return;
        }

        let status = match self.chat.send_message(self.chat_id, PROCESSING_TEXT).await {
            Ok(handle) => handle,
            Err(err) => {
                error!(job = %self.id, %err, "could not post status message");
                return;
            }
        };

        let paths = match self.workspace.allocate(self.id).await {
            Ok(paths) => paths,
            Err(err) => {
                error!(job = %self.id, %err, "temp workspace allocation failed");
                let failure = JobFailure::Unexpected(err.to_string());
                self.finish(&status, failure.user_message()).await;
                return;
            }
        };

        let result = self.process(&paths).await;
        self.workspace.cleanup(&paths).await;

        let text = match &result {
            Ok(()) => {
                info!(job = %self.id, "video note delivered");
                SUCCESS_TEXT
            }
            Err(failure) => {
                error!(job = %self.id, stage = failure.stage(), %failure, "job failed");
                failure.user_message()
            }
        };
        self.finish(&status, text).await;
    }

    async fn process(&self, paths: &JobPaths) -> Result<(), JobFailure> {
        info!(job = %self.id, "downloading source video");
        let file = self
            .chat
            .file_ref(&self.media.file_id)
            .await
            .map_err(JobFailure::Fetch)?;
        self.chat
            .download(&file, &paths.input)
            .await
            .map_err(JobFailure::Fetch)?;
        if !is_nonempty_file(&paths.input).await {
            return Err(JobFailure::EmptyDownload);
        }

        info!(job = %self.id, "transcoding");
        match self.transcoder.run(&paths.input, &paths.output).await {
            Ok(ProcessOutcome::Success) => {}
            Ok(ProcessOutcome::NotFound) => return Err(JobFailure::ToolMissing),
            Ok(ProcessOutcome::TimedOut) => return Err(JobFailure::ToolTimeout),
            Ok(ProcessOutcome::NonZeroExit { code, stderr_tail }) => {
                return Err(JobFailure::ToolExit { code, stderr_tail })
            }
            Err(err) => return Err(JobFailure::Unexpected(format!("transcoder: {err}"))),
        }
        // The tool's exit code alone is not proof of a usable artifact.
        if !is_nonempty_file(&paths.output).await {
            return Err(JobFailure::EmptyOutput);
        }

        info!(job = %self.id, "delivering video note");
        self.chat
            .send_video_note(self.chat_id, &paths.output)
            .await
            .map_err(JobFailure::Delivery)?;
        Ok(())
    }

    /// Final status edit, best-effort: the message may already be gone.
    async fn finish(&self, status: &StatusMessage, text: &str) {
        if let Err(err) = self.chat.edit_message(status, text).await {
            warn!(job = %self.id, %err, "could not edit status message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::chat::{FileRef, MockChatPort};
    use crate::ports::transcode::MockTranscodePort;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    fn limits() -> MediaLimits {
        MediaLimits {
            max_duration_secs: 90,
            max_size_bytes: 20 * 1024 * 1024,
        }
    }

    fn media(duration_secs: u64, size_bytes: u64) -> MediaRef {
        MediaRef {
            file_id: String::from("media-1"),
            duration_secs: Some(duration_secs),
            size_bytes: Some(size_bytes),
            content_type: Some(String::from("video/mp4")),
        }
    }

    fn expect_status_message(chat: &mut MockChatPort) {
        chat.expect_send_message()
            .withf(|_, text| text == PROCESSING_TEXT)
            .times(1)
            .returning(|chat_id, _| {
                let handle = StatusMessage {
                    chat_id,
                    message_id: 7,
                };
                Box::pin(async move { Ok(handle) })
            });
    }

    fn expect_fetch(chat: &mut MockChatPort, payload: &'static [u8]) {
        chat.expect_file_ref().times(1).returning(|media_id| {
            let file = FileRef {
                remote_path: format!("videos/{media_id}"),
            };
            Box::pin(async move { Ok(file) })
        });
        chat.expect_download().times(1).returning(move |_, dest| {
            std::fs::write(dest, payload).unwrap();
            Box::pin(async move { Ok(()) })
        });
    }

    fn capture_edits(chat: &mut MockChatPort) -> Arc<Mutex<Vec<String>>> {
        let edits = Arc::new(Mutex::new(Vec::new()));
        let sink = edits.clone();
        chat.expect_edit_message().returning(move |_, text| {
            sink.lock().unwrap().push(text.to_string());
            Box::pin(async move { Ok(()) })
        });
        edits
    }

    fn job(
        chat: MockChatPort,
        transcoder: MockTranscodePort,
        workspace: TempWorkspace,
        media: MediaRef,
    ) -> ConversionJob<MockChatPort, MockTranscodePort> {
        ConversionJob::new(
            11,
            media,
            Arc::new(chat),
            Arc::new(transcoder),
            workspace,
            limits(),
        )
    }

    /// Drives a full job where the transcoder reports `outcome` without
    /// writing any artifact, and returns the final status text.
    async fn final_text_for(outcome: ProcessOutcome) -> String {
        let dir = tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path().join("work"));

        let mut chat = MockChatPort::new();
        expect_status_message(&mut chat);
        expect_fetch(&mut chat, b"source-bytes");
        let edits = capture_edits(&mut chat);

        let mut transcoder = MockTranscodePort::new();
        transcoder.expect_run().times(1).returning(move |_, _| {
            let produced = outcome.clone();
            Box::pin(async move { Ok(produced) })
        });

        job(chat, transcoder, workspace, media(30, 5 * 1024 * 1024))
            .run()
            .await;

        let edits = edits.lock().unwrap();
        assert_eq!(edits.len(), 1, "expected exactly one status edit");
        edits[0].clone()
    }

    #[tokio::test]
    async fn success_path_delivers_then_cleans_up() {
        let dir = tempdir().unwrap();
        let work_root = dir.path().join("work");
        let workspace = TempWorkspace::new(work_root.clone());

        let mut chat = MockChatPort::new();
        expect_status_message(&mut chat);
        expect_fetch(&mut chat, b"source-bytes");
        chat.expect_send_video_note()
            .withf(|chat_id, path| *chat_id == 11 && path.exists())
            .times(1)
            .returning(|_, _| Box::pin(async move { Ok(()) }));
        let edits = capture_edits(&mut chat);

        let mut transcoder = MockTranscodePort::new();
        transcoder.expect_run().times(1).returning(|input, output| {
            assert!(input.exists(), "input must be downloaded before transcoding");
            std::fs::write(output, b"circle-bytes").unwrap();
            Box::pin(async move { Ok(ProcessOutcome::Success) })
        });

        job(chat, transcoder, workspace, media(30, 5 * 1024 * 1024))
            .run()
            .await;

        let edits = edits.lock().unwrap();
        assert_eq!(edits.len(), 1, "expected exactly one status edit");
        assert_eq!(edits[0], SUCCESS_TEXT);
        let leftovers: Vec<_> = std::fs::read_dir(&work_root).unwrap().collect();
        assert!(leftovers.is_empty(), "temp files survived the job");
    }

    #[tokio::test]
    async fn too_long_video_is_rejected_with_zero_fs_allocation() {
        let dir = tempdir().unwrap();
        let work_root = dir.path().join("work");
        let workspace = TempWorkspace::new(work_root.clone());

        let mut chat = MockChatPort::new();
        chat.expect_send_message()
            .withf(|chat_id, text| *chat_id == 11 && text.contains("120") && text.contains("90"))
            .times(1)
            .returning(|chat_id, _| {
                let handle = StatusMessage {
                    chat_id,
                    message_id: 1,
                };
                Box::pin(async move { Ok(handle) })
            });
        chat.expect_file_ref().times(0);
        chat.expect_download().times(0);
        chat.expect_send_video_note().times(0);
        chat.expect_edit_message().times(0);

        let mut transcoder = MockTranscodePort::new();
        transcoder.expect_run().times(0);

        job(chat, transcoder, workspace, media(120, 1024)).run().await;

        assert!(!work_root.exists(), "rejection must not touch the filesystem");
    }

    #[tokio::test]
    async fn too_large_video_is_rejected_with_both_values_in_the_message() {
        let dir = tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path().join("work"));

        let mut chat = MockChatPort::new();
        chat.expect_send_message()
            .withf(|_, text| text.contains("25.0 MiB") && text.contains("20.0 MiB"))
            .times(1)
            .returning(|chat_id, _| {
                let handle = StatusMessage {
                    chat_id,
                    message_id: 1,
                };
                Box::pin(async move { Ok(handle) })
            });

        let transcoder = MockTranscodePort::new();
        job(chat, transcoder, workspace, media(30, 25 * 1024 * 1024))
            .run()
            .await;
    }

    #[tokio::test]
    async fn missing_tool_reports_the_operator_apology() {
        let text = final_text_for(ProcessOutcome::NotFound).await;
        assert!(text.contains("operator"), "got: {text}");
    }

    #[tokio::test]
    async fn timeout_suggests_a_shorter_clip() {
        let text = final_text_for(ProcessOutcome::TimedOut).await;
        assert!(text.contains("shorter"), "got: {text}");
    }

    #[tokio::test]
    async fn non_zero_exit_suggests_another_clip() {
        let text = final_text_for(ProcessOutcome::NonZeroExit {
            code: 1,
            stderr_tail: String::from("moov atom not found"),
        })
        .await;
        assert!(text.contains("another clip"), "got: {text}");
    }

    #[tokio::test]
    async fn empty_output_reads_as_a_transcode_failure() {
        // zero exit but nothing written: same user story as an ffmpeg error
        let text = final_text_for(ProcessOutcome::Success).await;
        assert_eq!(
            text,
            JobFailure::EmptyOutput.user_message(),
            "empty artifact must not be delivered"
        );
    }

    async fn final_text_for_fetch_error(err: ChatError) -> String {
        let dir = tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path().join("work"));

        let mut chat = MockChatPort::new();
        expect_status_message(&mut chat);
        chat.expect_file_ref().times(1).returning(move |_| {
            let err = err.clone();
            Box::pin(async move { Err(err) })
        });
        chat.expect_download().times(0);
        let edits = capture_edits(&mut chat);

        job(chat, MockTranscodePort::new(), workspace, media(30, 1024))
            .run()
            .await;

        let edits = edits.lock().unwrap();
        edits[0].clone()
    }

    #[tokio::test]
    async fn fetch_rejection_and_fetch_transport_read_differently() {
        let rejected =
            final_text_for_fetch_error(ChatError::Rejected(String::from("bad file id"))).await;
        let transport =
            final_text_for_fetch_error(ChatError::Transport(String::from("timed out"))).await;
        assert_ne!(rejected, transport);
    }

    #[tokio::test]
    async fn empty_download_is_a_fetch_failure() {
        let dir = tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path().join("work"));

        let mut chat = MockChatPort::new();
        expect_status_message(&mut chat);
        expect_fetch(&mut chat, b"");
        let edits = capture_edits(&mut chat);

        let mut transcoder = MockTranscodePort::new();
        transcoder.expect_run().times(0);

        job(chat, transcoder, workspace, media(30, 1024)).run().await;

        assert_eq!(
            edits.lock().unwrap()[0],
            JobFailure::EmptyDownload.user_message()
        );
    }

    async fn final_text_for_delivery_error(err: ChatError) -> String {
        let dir = tempdir().unwrap();
        let workspace = TempWorkspace::new(dir.path().join("work"));

        let mut chat = MockChatPort::new();
        expect_status_message(&mut chat);
        expect_fetch(&mut chat, b"source-bytes");
        chat.expect_send_video_note().times(1).returning(move |_, _| {
            let err = err.clone();
            Box::pin(async move { Err(err) })
        });
        let edits = capture_edits(&mut chat);

        let mut transcoder = MockTranscodePort::new();
        transcoder.expect_run().times(1).returning(|_, output| {
            std::fs::write(output, b"circle-bytes").unwrap();
            Box::pin(async move { Ok(ProcessOutcome::Success) })
        });

        job(chat, transcoder, workspace, media(30, 1024)).run().await;

        let edits = edits.lock().unwrap();
        edits[0].clone()
    }

    #[tokio::test]
    async fn delivery_failures_get_distinct_messages_per_category() {
        let rejected =
            final_text_for_delivery_error(ChatError::Rejected(String::from("too big"))).await;
        let server =
            final_text_for_delivery_error(ChatError::Server(String::from("502"))).await;
        let transport =
            final_text_for_delivery_error(ChatError::Transport(String::from("reset"))).await;
        assert_ne!(rejected, server);
        assert_ne!(server, transport);
        assert_ne!(rejected, transport);
    }

    #[tokio::test]
    async fn failed_status_edit_is_swallowed_and_cleanup_still_runs() {
        let dir = tempdir().unwrap();
        let work_root = dir.path().join("work");
        let workspace = TempWorkspace::new(work_root.clone());

        let mut chat = MockChatPort::new();
        expect_status_message(&mut chat);
        expect_fetch(&mut chat, b"source-bytes");
        chat.expect_send_video_note()
            .returning(|_, _| Box::pin(async move { Ok(()) }));
        chat.expect_edit_message().times(1).returning(|_, _| {
            Box::pin(async move { Err(ChatError::Rejected(String::from("message deleted"))) })
        });

        let mut transcoder = MockTranscodePort::new();
        transcoder.expect_run().times(1).returning(|_, output| {
            std::fs::write(output, b"circle-bytes").unwrap();
            Box::pin(async move { Ok(ProcessOutcome::Success) })
        });

        job(chat, transcoder, workspace, media(30, 1024)).run().await;

        let leftovers: Vec<_> = std::fs::read_dir(&work_root).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn concurrent_jobs_never_touch_each_others_files() {
        const JOBS: usize = 50;
        let dir = tempdir().unwrap();
        let work_root = dir.path().join("work");
        let workspace = TempWorkspace::new(work_root.clone());
        let delivered: Arc<Mutex<HashMap<i64, String>>> = Arc::new(Mutex::new(HashMap::new()));

        let mut chat = MockChatPort::new();
        chat.expect_send_message().returning(|chat_id, _| {
            let handle = StatusMessage {
                chat_id,
                message_id: 1,
            };
            Box::pin(async move { Ok(handle) })
        });
        chat.expect_file_ref().returning(|media_id| {
            let file = FileRef {
                remote_path: format!("videos/{media_id}"),
            };
            Box::pin(async move { Ok(file) })
        });
        chat.expect_download().returning(|file, dest| {
            std::fs::write(dest, file.remote_path.as_bytes()).unwrap();
            Box::pin(async move { Ok(()) })
        });
        let sink = delivered.clone();
        chat.expect_send_video_note().returning(move |chat_id, path| {
            let body = std::fs::read_to_string(path).unwrap();
            sink.lock().unwrap().insert(chat_id, body);
            Box::pin(async move { Ok(()) })
        });
        chat.expect_edit_message()
            .returning(|_, _| Box::pin(async move { Ok(()) }));

        let mut transcoder = MockTranscodePort::new();
        transcoder.expect_run().returning(|input, output| {
            let body = std::fs::read(input).unwrap();
            std::fs::write(output, body).unwrap();
            Box::pin(async move { Ok(ProcessOutcome::Success) })
        });

        let chat = Arc::new(chat);
        let transcoder = Arc::new(transcoder);
        let mut handles = Vec::new();
        for i in 0..JOBS {
            let media = MediaRef {
                file_id: format!("media-{i}"),
                duration_secs: Some(10),
                size_bytes: Some(1024),
                content_type: None,
            };
            let job = ConversionJob::new(
                i as i64,
                media,
                chat.clone(),
                transcoder.clone(),
                workspace.clone(),
                limits(),
            );
            handles.push(tokio::spawn(job.run()));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), JOBS);
        for i in 0..JOBS {
            assert_eq!(
                delivered[&(i as i64)],
                format!("videos/media-{i}"),
                "job {i} delivered someone else's bytes"
            );
        }
        let leftovers: Vec<_> = std::fs::read_dir(&work_root).unwrap().collect();
        assert!(leftovers.is_empty(), "temp files survived the batch");
    }
}
