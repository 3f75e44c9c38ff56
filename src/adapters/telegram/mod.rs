//! Telegram-facing adapters: the chat port and the update dispatcher.

pub mod chat;
pub mod dispatch;
