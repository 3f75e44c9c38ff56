use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Handle of a status message previously posted to a chat, used to edit its
/// text in place as the job progresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub chat_id: i64,
    pub message_id: i32,
}

/// Descriptor of a file stored on the chat platform's servers, resolved from
/// an opaque media id and good for one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub remote_path: String,
}

/// Chat collaborator failures, classified once at the adapter boundary into
/// a closed set the pipeline can branch on.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("remote server fault: {0}")]
    Server(String),
    #[error("transport failure: {0}")]
    Transport(String),
}

#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait ChatPort: Send + Sync {
    /// Post a new message, returning a handle for later edits
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<StatusMessage, ChatError>;

    /// Edit a previously posted message in place
    async fn edit_message(&self, message: &StatusMessage, text: &str) -> Result<(), ChatError>;

    /// Resolve an opaque media id into a downloadable file descriptor
    async fn file_ref(&self, media_id: &str) -> Result<FileRef, ChatError>;

    /// Download the file behind `file` into `dest`
    async fn download(&self, file: &FileRef, dest: &Path) -> Result<(), ChatError>;

    /// Upload the artifact at `path` as a video note reply
    async fn send_video_note(&self, chat_id: i64, path: &Path) -> Result<(), ChatError>;
}
