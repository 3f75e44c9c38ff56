//! The update dispatcher: commands, the video handler that spawns conversion
//! jobs, and the fallback replies.

use crate::application::job::ConversionJob;
use crate::context::AppContext;
use crate::domain::media::MediaRef;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "what this bot does.")]
    Start,
    #[command(description = "how to use the bot.")]
    Help,
    #[command(description = "check that the bot is alive.")]
    Health,
}

/// Run the long-polling dispatcher until shutdown. One spawned task per
/// incoming video; handler state comes exclusively from the injected
/// [`AppContext`].
pub async fn run(bot: Bot, ctx: Arc<AppContext>) {
    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(on_command),
        )
        .branch(dptree::filter(|msg: Message| msg.video().is_some()).endpoint(on_video))
        .branch(
            dptree::filter(|msg: Message| msg.video_note().is_some()).endpoint(on_video_note),
        )
        .branch(dptree::filter(|msg: Message| msg.text().is_some()).endpoint(on_text));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn on_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    ctx: Arc<AppContext>,
) -> ResponseResult<()> {
    let text = match cmd {
        Command::Start => start_text(ctx.limits.max_duration_secs),
        Command::Help => help_text(ctx.limits.max_duration_secs),
        Command::Health => String::from("✅ Bot is up and ready."),
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn on_video(msg: Message, ctx: Arc<AppContext>) -> ResponseResult<()> {
    let Some(video) = msg.video() else {
        return Ok(());
    };
    let media = MediaRef {
        file_id: video.file.id.clone(),
        duration_secs: Some(u64::from(video.duration)),
        size_bytes: Some(u64::from(video.file.size)),
        content_type: video.mime_type.as_ref().map(|mime| mime.to_string()),
    };
    info!(chat = msg.chat.id.0, file = %media.file_id, "incoming video");

    let job = ConversionJob::new(
        msg.chat.id.0,
        media,
        ctx.chat.clone(),
        ctx.transcoder.clone(),
        ctx.workspace.clone(),
        ctx.limits,
    );
    let task = tokio::spawn(job.run());
    tokio::spawn(async move {
        // a panicking job must never take the dispatcher down with it
        if let Err(err) = task.await {
            error!(%err, "conversion job crashed");
        }
    });
    Ok(())
}

async fn on_video_note(bot: Bot, msg: Message) -> ResponseResult<()> {
    bot.send_message(
        msg.chat.id,
        "That's already a circle 😊 Send me a regular video and I'll make one out of it.",
    )
    .await?;
    Ok(())
}

async fn on_text(bot: Bot, msg: Message) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let reply = if text.starts_with('/') {
        "I don't know that command 🤔 Try /help, or just send me a video."
    } else {
        "Send me a regular video and I'll turn it into a round video note 🟣"
    };
    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

fn start_text(max_duration_secs: u64) -> String {
    format!(
        "Hi! 👋\nI turn regular videos into round Telegram video notes.\n\n\
         Just send me a video (up to {max_duration_secs} seconds) and I'll \
         send it back as a circle 🟣"
    )
}

fn help_text(max_duration_secs: u64) -> String {
    format!(
        "How to use this bot:\n\
         1️⃣ Send a regular video (not a video note).\n\
         2️⃣ Keep it under {max_duration_secs} seconds.\n\
         3️⃣ I'll convert it and reply with a round video note.\n\n\
         If something fails, try a shorter or smaller video."
    )
}
