use circlebot::adapters::{health, telegram};
use circlebot::config::Config;
use circlebot::context::AppContext;
use dotenv::dotenv;
use std::sync::Arc;
use teloxide::Bot;
use tracing::info;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();
    let bot = Bot::new(config.bot_token.clone());
    let ctx = Arc::new(AppContext::new(&config, bot.clone()));

    tokio::spawn(health::serve(config.health_port));

    info!("starting bot polling");
    telegram::dispatch::run(bot, ctx).await;
}
