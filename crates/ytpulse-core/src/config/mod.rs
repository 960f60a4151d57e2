mod settings;

pub use settings::{
    ChartSettings, ConfigError, CredentialsSource, Settings, StoreBackend, StoreSettings,
    TelegramSettings,
};
