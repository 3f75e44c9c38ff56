use crate::ports::chat::{ChatError, ChatPort, FileRef, StatusMessage};
use async_trait::async_trait;
use std::path::Path;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{InputFile, MessageId};
use teloxide::RequestError;
use tokio::io::AsyncWriteExt;

/// `ChatPort` over the Telegram Bot API. The rest of the crate never sees
/// teloxide types; they stop here.
pub struct TelegramChat {
    bot: Bot,
    note_length: u32,
}

impl TelegramChat {
    pub fn new(bot: Bot, note_length: u32) -> Self {
        Self { bot, note_length }
    }
}

#[async_trait]
impl ChatPort for TelegramChat {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<StatusMessage, ChatError> {
        let message = self
            .bot
            .send_message(ChatId(chat_id), text)
            .await
            .map_err(classify)?;
        Ok(StatusMessage {
            chat_id,
            message_id: message.id.0,
        })
    }

    async fn edit_message(&self, message: &StatusMessage, text: &str) -> Result<(), ChatError> {
        self.bot
            .edit_message_text(ChatId(message.chat_id), MessageId(message.message_id), text)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn file_ref(&self, media_id: &str) -> Result<FileRef, ChatError> {
        let file = self.bot.get_file(media_id.to_owned()).await.map_err(classify)?;
        Ok(FileRef {
            remote_path: file.path,
        })
    }

    async fn download(&self, file: &FileRef, dest: &Path) -> Result<(), ChatError> {
        let mut out = tokio::fs::File::create(dest)
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;
        // both download failure modes (network, local I/O) are transport-level
        self.bot
            .download_file(&file.remote_path, &mut out)
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;
        out.flush()
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;
        Ok(())
    }

    async fn send_video_note(&self, chat_id: i64, path: &Path) -> Result<(), ChatError> {
        self.bot
            .send_video_note(ChatId(chat_id), InputFile::file(path.to_path_buf()))
            .length(self.note_length)
            .await
            .map_err(classify)?;
        Ok(())
    }
}

/// Fold the Telegram client's error surface into the closed set the pipeline
/// branches on. Classification happens here and nowhere else.
fn classify(err: RequestError) -> ChatError {
    match err {
        RequestError::Api(api) => ChatError::Rejected(api.to_string()),
        RequestError::Network(net) => ChatError::Transport(net.to_string()),
        RequestError::Io(io) => ChatError::Transport(io.to_string()),
        other => ChatError::Server(other.to_string()),
    }
}
