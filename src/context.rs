//! The application context: every collaborator a handler needs, constructed
//! once at startup and injected into the dispatcher. No ambient singletons.

use crate::adapters::ffmpeg::FfmpegTranscoder;
use crate::adapters::telegram::chat::TelegramChat;
use crate::application::workspace::TempWorkspace;
use crate::config::Config;
use crate::domain::media::MediaLimits;
use std::sync::Arc;
use teloxide::Bot;

pub struct AppContext {
    pub chat: Arc<TelegramChat>,
    pub transcoder: Arc<FfmpegTranscoder>,
    pub workspace: TempWorkspace,
    pub limits: MediaLimits,
}

impl AppContext {
    pub fn new(config: &Config, bot: Bot) -> Self {
        let spec = config.transcode_spec();
        Self {
            chat: Arc::new(TelegramChat::new(bot, spec.dimension)),
            transcoder: Arc::new(FfmpegTranscoder::new(config.ffmpeg_bin.clone(), spec)),
            workspace: TempWorkspace::new(config.tmp_dir.clone()),
            limits: config.media_limits(),
        }
    }
}
