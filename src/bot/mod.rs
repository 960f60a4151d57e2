//! Telegram command bot over the channel list.

mod command;

use command::{handle_command, BotCommand, CollectionRunner};

use anyhow::Result;
use chrono::Local;
use std::time::Duration;
use tracing::{debug, info, warn};

use ytpulse_core::config::{ConfigError, Settings};
use ytpulse_core::notify::TelegramClient;
use ytpulse_core::PipelineBuilder;

const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Runs the full pipeline in process for `/run`
pub struct PipelineRunner {
    settings: Settings,
}

impl PipelineRunner {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl CollectionRunner for PipelineRunner {
    fn run_collection(&mut self) -> Result<String> {
        self.settings.require_api_key()?;

        let mut pipeline = PipelineBuilder::new(self.settings.clone()).build()?;
        let report = pipeline.run(Local::now().date_naive())?;

        let collected = report.collect.appended.len();
        let mut summary = format!(
            "Collected {} channel(s), {} failed.",
            collected,
            report.collect.failures()
        );
        match report.visual {
            Some(visual) => summary.push_str(&format!(
                "\nChart rebuilt from {} rows across {} channel(s).",
                visual.rows, visual.channels
            )),
            None => summary.push_str("\nNo results to display."),
        }
        Ok(summary)
    }
}

/// Long-poll Telegram and answer commands until the process is stopped.
///
/// When a chat id is configured, messages from other chats are ignored.
pub fn run(settings: Settings) -> Result<()> {
    let token = settings
        .telegram
        .bot_token
        .clone()
        .filter(|t| !t.trim().is_empty())
        .ok_or(ConfigError::MissingBotToken)?;
    let poll_secs = settings.telegram.poll_timeout_secs;
    let client = TelegramClient::new(
        token,
        Duration::from_secs(poll_secs + settings.telegram.timeout_secs),
    );
    let allowed_chat = settings.telegram.chat_id.clone();
    let channels_file = settings.channels_file.clone();
    let mut runner = PipelineRunner::new(settings);

    info!("Bot started, channel list at {:?}", channels_file);
    let mut offset: Option<i64> = None;

    loop {
        let updates = match client.get_updates(offset, poll_secs) {
            Ok(updates) => updates,
            Err(e) => {
                warn!("Polling failed: {:#}", e);
                std::thread::sleep(RETRY_DELAY);
                continue;
            }
        };

        for update in updates {
            offset = Some(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };
            let Some(command) = message.text.as_deref().and_then(BotCommand::parse) else {
                continue;
            };

            let chat_id = message.chat.id.to_string();
            if allowed_chat.as_deref().is_some_and(|c| c != chat_id) {
                debug!("Ignoring command from chat {}", chat_id);
                continue;
            }

            info!("Command from chat {}: {:?}", chat_id, command);
            if command == BotCommand::Run {
                reply(&client, &chat_id, "Running collection...");
            }
            let text = handle_command(&command, &channels_file, &mut runner);
            reply(&client, &chat_id, &text);
        }
    }
}

fn reply(client: &TelegramClient, chat_id: &str, text: &str) {
    if let Err(e) = client.send_message(chat_id, text) {
        warn!("Failed to reply to chat {}: {:#}", chat_id, e);
    }
}
