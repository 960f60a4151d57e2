use anyhow::Result;
use std::path::Path;

use ytpulse_core::channels::{parse_reference, ChannelList};

/// How much of a failed run's error chain is sent back
pub const ERROR_TAIL_CHARS: usize = 800;

pub const HELP: &str = "YouTube stats bot\n\
\n\
/list - show tracked channels\n\
/add <channel> - track a channel (ID, URL, @handle or username)\n\
/remove <channel> - stop tracking a channel\n\
/run - collect stats now and send the chart";

/// A parsed chat command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    List,
    Add(String),
    Remove(String),
    Run,
    Unknown(String),
}

impl BotCommand {
    /// Parse a message. Returns `None` for text that is not a `/command`.
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        let (word, rest) = match body.split_once(char::is_whitespace) {
            Some((w, r)) => (w, r.trim()),
            None => (body, ""),
        };
        let name = word.split('@').next().unwrap_or_default().to_ascii_lowercase();

        Some(match name.as_str() {
            "start" | "help" => BotCommand::Start,
            "list" => BotCommand::List,
            "add" => BotCommand::Add(rest.to_string()),
            "remove" => BotCommand::Remove(rest.to_string()),
            "run" => BotCommand::Run,
            _ => BotCommand::Unknown(name),
        })
    }
}

/// Runs one full collection on behalf of the bot
pub trait CollectionRunner {
    /// Returns a short summary for the chat on success
    fn run_collection(&mut self) -> Result<String>;
}

/// Produce the reply for one command
pub fn handle_command(
    command: &BotCommand,
    channels_file: &Path,
    runner: &mut dyn CollectionRunner,
) -> String {
    match command {
        BotCommand::Start | BotCommand::Unknown(_) => HELP.to_string(),
        BotCommand::List => match ChannelList::load(channels_file) {
            Ok(list) if list.is_empty() => "No channels tracked yet. Use /add <channel>.".to_string(),
            Ok(list) => {
                let lines: Vec<String> = list.entries().iter().map(|e| format!("- {}", e)).collect();
                format!("Tracked channels:\n{}", lines.join("\n"))
            }
            Err(e) => format!("Could not read the channel list: {:#}", e),
        },
        BotCommand::Add(reference) => edit_list(channels_file, reference, Edit::Add),
        BotCommand::Remove(reference) => edit_list(channels_file, reference, Edit::Remove),
        BotCommand::Run => match runner.run_collection() {
            Ok(summary) => format!("Collection finished.\n{}", summary),
            Err(e) => format!(
                "Collection failed:\n{}",
                error_tail(&format!("{:#}", e), ERROR_TAIL_CHARS)
            ),
        },
    }
}

#[derive(Clone, Copy)]
enum Edit {
    Add,
    Remove,
}

fn edit_list(channels_file: &Path, reference: &str, edit: Edit) -> String {
    if reference.is_empty() {
        return match edit {
            Edit::Add => "Usage: /add <channel>".to_string(),
            Edit::Remove => "Usage: /remove <channel>".to_string(),
        };
    }
    if matches!(edit, Edit::Add) && parse_reference(reference).is_none() {
        return format!("Not a channel reference: {}", reference);
    }

    let mut list = match ChannelList::load(channels_file) {
        Ok(list) => list,
        Err(e) => return format!("Could not read the channel list: {:#}", e),
    };

    let changed = match edit {
        Edit::Add => list.add(reference),
        Edit::Remove => list.remove(reference),
    };
    if !changed {
        return match edit {
            Edit::Add => format!("{} is already tracked.", reference),
            Edit::Remove => format!("{} is not tracked.", reference),
        };
    }

    if let Err(e) = list.save() {
        return format!("Could not save the channel list: {:#}", e);
    }
    match edit {
        Edit::Add => format!("Added {}.", reference),
        Edit::Remove => format!("Removed {}.", reference),
    }
}

/// Last `max_chars` characters of `text`
pub fn error_tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
