use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::config::TelegramSettings;

const API_BASE: &str = "https://api.telegram.org";
const BOUNDARY: &str = "ytpulse-form-boundary-5c1e0b9d7a";

/// Telegram refuses longer messages
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Envelope around every Bot API result
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

/// One entry from `getUpdates`
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<BotMessage>,
}

/// Incoming chat message; only the fields the bot reads
#[derive(Debug, Clone, Deserialize)]
pub struct BotMessage {
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Minimal Telegram Bot API client
pub struct TelegramClient {
    token: String,
    agent: ureq::Agent,
}

impl TelegramClient {
    /// Client whose every call is bounded by `timeout`
    pub fn new(token: impl Into<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            token: token.into(),
            agent,
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", API_BASE, self.token, method)
    }

    pub fn send_message(&self, chat_id: &str, text: &str) -> Result<()> {
        let text = truncate_message(text);
        let mut response = self
            .agent
            .post(&self.method_url("sendMessage"))
            .send_form([("chat_id", chat_id), ("text", text.as_str())])
            .context("sendMessage request failed")?;
        let body: ApiResponse<serde_json::Value> = response.body_mut().read_json()?;
        check(body).map(|_| ())
    }

    /// Upload a PNG as a photo message
    pub fn send_photo(&self, chat_id: &str, image: &Path) -> Result<()> {
        let bytes = std::fs::read(image)
            .with_context(|| format!("Failed to read image: {:?}", image))?;
        let file_name = image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("chart.png");
        let body = multipart_body(chat_id, file_name, &bytes);

        let mut response = self
            .agent
            .post(&self.method_url("sendPhoto"))
            .header("Content-Type", &format!("multipart/form-data; boundary={}", BOUNDARY))
            .send(&body[..])
            .context("sendPhoto request failed")?;
        let body: ApiResponse<serde_json::Value> = response.body_mut().read_json()?;
        check(body).map(|_| ())
    }

    /// Long-poll for updates after `offset`
    pub fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let timeout = timeout_secs.to_string();
        let mut request = self
            .agent
            .get(&self.method_url("getUpdates"))
            .query("timeout", &timeout)
            .query("allowed_updates", "[\"message\"]");
        if let Some(offset) = offset {
            request = request.query("offset", offset.to_string());
        }
        let mut response = request.call().context("getUpdates request failed")?;
        let body: ApiResponse<Vec<Update>> = response.body_mut().read_json()?;
        check(body)
    }
}

fn check<T>(response: ApiResponse<T>) -> Result<T> {
    if !response.ok {
        bail!(
            "Telegram API error: {}",
            response.description.unwrap_or_else(|| "unknown".to_string())
        );
    }
    response.result.context("Telegram API returned no result")
}

/// Cut text to the message limit on a char boundary
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    out.push('…');
    out
}

/// `multipart/form-data` body with a `chat_id` field and a `photo` file part
fn multipart_body(chat_id: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"chat_id\"\r\n\r\n{chat}\r\n",
            b = BOUNDARY,
            chat = chat_id
        )
        .as_bytes(),
    );
    body.extend_from_slice(
        format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"{f}\"\r\nContent-Type: image/png\r\n\r\n",
            b = BOUNDARY,
            f = file_name.replace('"', "")
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Sends the summary and chart to the configured chat
pub struct TelegramNotifier {
    target: Option<(TelegramClient, String)>,
}

impl TelegramNotifier {
    /// Notifier for `settings`; without a bot token and chat id it only logs
    pub fn from_settings(settings: &TelegramSettings) -> Self {
        let target = match (&settings.bot_token, &settings.chat_id) {
            (Some(token), Some(chat)) if !token.is_empty() && !chat.is_empty() => Some((
                TelegramClient::new(token.clone(), Duration::from_secs(settings.timeout_secs)),
                chat.clone(),
            )),
            _ => None,
        };
        Self { target }
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, text: Option<&str>, image: &Path) {
        let Some((client, chat_id)) = &self.target else {
            info!("Telegram: bot token or chat id not set, skipping notification");
            return;
        };

        if let Some(text) = text {
            match client.send_message(chat_id, text) {
                Ok(()) => debug!("Telegram: summary sent"),
                Err(e) => warn!("Telegram: failed to send summary: {:#}", e),
            }
        }

        match client.send_photo(chat_id, image) {
            Ok(()) => info!("Telegram: chart sent"),
            Err(e) => warn!("Telegram: failed to send chart: {:#}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_url() {
        let client = TelegramClient::new("123:abc", Duration::from_secs(1));
        assert_eq!(
            client.method_url("sendPhoto"),
            "https://api.telegram.org/bot123:abc/sendPhoto"
        );
    }

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("-100", "growth_chart.png", b"\x89PNG");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with(&format!("--{}\r\n", BOUNDARY)));
        assert!(text.contains("name=\"chat_id\"\r\n\r\n-100\r\n"));
        assert!(text.contains("name=\"photo\"; filename=\"growth_chart.png\"\r\nContent-Type: image/png\r\n\r\n"));
        assert!(body.windows(4).any(|w| w == b"\x89PNG"));
        assert!(text.ends_with(&format!("\r\n--{}--\r\n", BOUNDARY)));
    }

    #[test]
    fn test_parse_updates() {
        let json = r#"{"ok": true, "result": [
            {"update_id": 10, "message": {"message_id": 1, "chat": {"id": 42, "type": "private"}, "text": "/list"}},
            {"update_id": 11, "edited_message": {"chat": {"id": 42}}},
            {"update_id": 12, "message": {"chat": {"id": 42}, "photo": []}}
        ]}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        let updates = check(response).unwrap();

        assert_eq!(updates.len(), 3);
        let msg = updates[0].message.as_ref().unwrap();
        assert_eq!(msg.chat.id, 42);
        assert_eq!(msg.text.as_deref(), Some("/list"));
        assert!(updates[1].message.is_none());
        assert!(updates[2].message.as_ref().unwrap().text.is_none());
    }

    #[test]
    fn test_api_error_is_reported() {
        let json = r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#;
        let response: ApiResponse<Vec<Update>> = serde_json::from_str(json).unwrap();
        let err = check(response).unwrap_err();
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[test]
    fn test_truncate_message() {
        assert_eq!(truncate_message("short"), "short");
        let long = "é".repeat(MAX_MESSAGE_CHARS + 10);
        let cut = truncate_message(&long);
        assert_eq!(cut.chars().count(), MAX_MESSAGE_CHARS);
        assert!(cut.ends_with('…'));
    }

    #[test]
    fn test_unconfigured_notifier_skips() {
        let notifier = TelegramNotifier::from_settings(&TelegramSettings::default());
        assert!(!notifier.is_configured());
        // No network, no panic
        notifier.notify(Some("hello"), Path::new("/nonexistent.png"));

        let mut settings = TelegramSettings::default();
        settings.bot_token = Some("123:abc".to_string());
        assert!(!TelegramNotifier::from_settings(&settings).is_configured());
        settings.chat_id = Some("42".to_string());
        assert!(TelegramNotifier::from_settings(&settings).is_configured());
    }
}
