//! Outbound chat notifications.

mod telegram;

pub use telegram::{BotMessage, Chat, TelegramClient, TelegramNotifier, Update};

use std::path::Path;

/// Best-effort delivery of a chart and optional text summary.
///
/// Implementations log failures and never return them: a run succeeds or
/// fails independently of whether its notification got through.
pub trait Notifier {
    fn notify(&self, text: Option<&str>, image: &Path);
}
