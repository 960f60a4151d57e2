use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration problems that abort the requested operation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("YOUTUBE_API_KEY is not set; cannot collect data")]
    MissingApiKey,

    #[error("TELEGRAM_BOT_TOKEN is not set")]
    MissingBotToken,

    #[error("GOOGLE_SHEET_ID is not set; required by the sheets store")]
    MissingSheetId,
}

/// Which store backend holds the snapshot log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Local CSV file
    #[default]
    Csv,
    /// Google Sheets spreadsheet
    Sheets,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(StoreBackend::Csv),
            "sheets" | "sheet" | "gsheets" => Ok(StoreBackend::Sheets),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Where spreadsheet credentials come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    /// Inline JSON payload
    Json(String),
    /// Path to a JSON file
    File(PathBuf),
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// YouTube Data API key
    #[serde(default)]
    pub youtube_api_key: Option<String>,

    /// Tracked channel list
    #[serde(default = "default_channels_file")]
    pub channels_file: PathBuf,

    /// Chart output, overwritten each run
    #[serde(default = "default_chart_file")]
    pub chart_file: PathBuf,

    /// Snapshot store settings
    #[serde(default)]
    pub store: StoreSettings,

    /// Telegram bot and notification settings
    #[serde(default)]
    pub telegram: TelegramSettings,

    /// Chart rendering settings
    #[serde(default)]
    pub chart: ChartSettings,
}

fn default_channels_file() -> PathBuf {
    PathBuf::from("channels.txt")
}

fn default_chart_file() -> PathBuf {
    PathBuf::from("growth_chart.png")
}

/// Snapshot store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,

    /// CSV file used by the csv backend
    #[serde(default = "default_csv_path")]
    pub csv_path: PathBuf,

    /// Spreadsheet id used by the sheets backend
    #[serde(default)]
    pub sheet_id: Option<String>,

    /// Authorized-user credential JSON (takes precedence over `token_file`)
    #[serde(default)]
    pub token_json: Option<String>,

    /// Authorized-user credential file
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("cumulative_stats.csv")
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            csv_path: default_csv_path(),
            sheet_id: None,
            token_json: None,
            token_file: default_token_file(),
        }
    }
}

impl StoreSettings {
    /// Credentials for the sheets backend
    pub fn credentials_source(&self) -> CredentialsSource {
        match &self.token_json {
            Some(json) => CredentialsSource::Json(json.clone()),
            None => CredentialsSource::File(self.token_file.clone()),
        }
    }
}

/// Telegram settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramSettings {
    /// Bot auth token
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Chat that receives charts and summaries
    #[serde(default)]
    pub chat_id: Option<String>,

    /// Per-call timeout for notification requests (seconds)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Long-poll timeout for the bot update loop (seconds)
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    10
}

fn default_poll_timeout() -> u64 {
    30
}

impl Default for TelegramSettings {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            timeout_secs: default_timeout(),
            poll_timeout_secs: default_poll_timeout(),
        }
    }
}

/// Chart rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSettings {
    /// Image width in pixels
    #[serde(default = "default_width")]
    pub width: u32,

    /// Height of each panel in pixels
    #[serde(default = "default_panel_height")]
    pub panel_height: u32,

    /// TrueType font for titles and labels
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

fn default_width() -> u32 {
    1800
}

fn default_panel_height() -> u32 {
    750
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            width: default_width(),
            panel_height: default_panel_height(),
            font_path: None,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            channels_file: default_channels_file(),
            chart_file: default_chart_file(),
            store: StoreSettings::default(),
            telegram: TelegramSettings::default(),
            chart: ChartSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a config file or use defaults, then overlay the environment
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        let mut settings = Self::load_file(path)?;
        settings.apply_env();
        Ok(settings)
    }

    fn load_file(path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must exist
        if let Some(p) = path {
            return Self::from_file(p);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("ytpulse/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/ytpulse/config.toml")),
            dirs::home_dir().map(|p| p.join(".ytpulse.toml")),
            Some(PathBuf::from("ytpulse.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Overlay credentials from environment variables (non-empty values win)
    pub fn apply_env(&mut self) {
        if let Some(v) = env_var("YOUTUBE_API_KEY") {
            self.youtube_api_key = Some(v);
        }
        if let Some(v) = env_var("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(v);
        }
        if let Some(v) = env_var("TELEGRAM_CHAT_ID") {
            self.telegram.chat_id = Some(v);
        }
        if let Some(v) = env_var("GOOGLE_SHEET_ID") {
            self.store.sheet_id = Some(v);
        }
        if let Some(v) = env_var("GOOGLE_TOKEN_JSON") {
            self.store.token_json = Some(v);
        }
    }

    /// Clamp values that would make rendering degenerate
    pub fn validate(&mut self) {
        const MIN_WIDTH: u32 = 320;
        const MIN_PANEL_HEIGHT: u32 = 200;

        if self.chart.width < MIN_WIDTH {
            self.chart.width = MIN_WIDTH;
        }
        if self.chart.panel_height < MIN_PANEL_HEIGHT {
            self.chart.panel_height = MIN_PANEL_HEIGHT;
        }
        if self.telegram.timeout_secs == 0 {
            self.telegram.timeout_secs = default_timeout();
        }
    }

    /// The API key, or the configuration error that aborts collection
    pub fn require_api_key(&self) -> std::result::Result<&str, ConfigError> {
        self.youtube_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV_VARS: [&str; 5] = [
        "YOUTUBE_API_KEY",
        "TELEGRAM_BOT_TOKEN",
        "TELEGRAM_CHAT_ID",
        "GOOGLE_SHEET_ID",
        "GOOGLE_TOKEN_JSON",
    ];

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.channels_file, PathBuf::from("channels.txt"));
        assert_eq!(settings.chart_file, PathBuf::from("growth_chart.png"));
        assert_eq!(settings.store.backend, StoreBackend::Csv);
        assert_eq!(settings.store.csv_path, PathBuf::from("cumulative_stats.csv"));
        assert_eq!(settings.telegram.timeout_secs, 10);
        assert_eq!(settings.chart.width, 1800);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            youtube_api_key = "from-file"
            channels_file = "data/channels.txt"

            [store]
            backend = "sheets"
            sheet_id = "sheet-1"

            [telegram]
            chat_id = "-100200300"
        "#;

        let settings: Settings = toml::from_str(toml).expect("Should parse TOML");
        assert_eq!(settings.youtube_api_key.as_deref(), Some("from-file"));
        assert_eq!(settings.channels_file, PathBuf::from("data/channels.txt"));
        assert_eq!(settings.store.backend, StoreBackend::Sheets);
        assert_eq!(settings.store.sheet_id.as_deref(), Some("sheet-1"));
        assert_eq!(settings.store.csv_path, PathBuf::from("cumulative_stats.csv"));
        assert_eq!(settings.telegram.chat_id.as_deref(), Some("-100200300"));
        assert_eq!(settings.telegram.poll_timeout_secs, 30);
    }

    #[test]
    fn test_env_overlay() {
        temp_env::with_vars(
            [
                ("YOUTUBE_API_KEY", Some("env-key")),
                ("TELEGRAM_BOT_TOKEN", Some("123:abc")),
                ("TELEGRAM_CHAT_ID", Some("42")),
                ("GOOGLE_SHEET_ID", Some("")),
                ("GOOGLE_TOKEN_JSON", None),
            ],
            || {
                let mut settings = Settings::default();
                settings.store.sheet_id = Some("from-file".to_string());
                settings.apply_env();

                assert_eq!(settings.youtube_api_key.as_deref(), Some("env-key"));
                assert_eq!(settings.telegram.bot_token.as_deref(), Some("123:abc"));
                assert_eq!(settings.telegram.chat_id.as_deref(), Some("42"));
                // Empty env values do not clobber file values
                assert_eq!(settings.store.sheet_id.as_deref(), Some("from-file"));
                assert!(settings.store.token_json.is_none());
            },
        );
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "chart_file = \"out/chart.png\"\n").unwrap();

        temp_env::with_vars_unset(ENV_VARS, || {
            let settings = Settings::load(Some(&path)).unwrap();
            assert_eq!(settings.chart_file, PathBuf::from("out/chart.png"));
            assert!(settings.youtube_api_key.is_none());
        });
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let path = PathBuf::from("/nonexistent/ytpulse.toml");
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_require_api_key() {
        let mut settings = Settings::default();
        assert_eq!(settings.require_api_key(), Err(ConfigError::MissingApiKey));
        settings.youtube_api_key = Some("  ".to_string());
        assert_eq!(settings.require_api_key(), Err(ConfigError::MissingApiKey));
        settings.youtube_api_key = Some("key".to_string());
        assert_eq!(settings.require_api_key(), Ok("key"));
    }

    #[test]
    fn test_validate_clamps() {
        let mut settings = Settings::default();
        settings.chart.width = 10;
        settings.chart.panel_height = 0;
        settings.telegram.timeout_secs = 0;
        settings.validate();
        assert_eq!(settings.chart.width, 320);
        assert_eq!(settings.chart.panel_height, 200);
        assert_eq!(settings.telegram.timeout_secs, 10);
    }

    #[test]
    fn test_store_backend_from_str() {
        assert_eq!("CSV".parse::<StoreBackend>(), Ok(StoreBackend::Csv));
        assert_eq!("sheets".parse::<StoreBackend>(), Ok(StoreBackend::Sheets));
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_credentials_source() {
        let mut store = StoreSettings::default();
        assert_eq!(
            store.credentials_source(),
            CredentialsSource::File(PathBuf::from("token.json"))
        );
        store.token_json = Some("{}".to_string());
        assert_eq!(store.credentials_source(), CredentialsSource::Json("{}".to_string()));
    }
}
