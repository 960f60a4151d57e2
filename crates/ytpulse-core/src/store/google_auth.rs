use serde::Deserialize;
use tracing::debug;

use super::StoreError;
use crate::config::CredentialsSource;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth "authorized user" credentials, as written by Google's installed-app flow
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUser {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl AuthorizedUser {
    /// Parse credentials from a JSON payload
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Credentials {
            message: format!("invalid credential JSON: {}", e),
        })
    }

    /// Load credentials from an inline payload or a file
    pub fn load(source: &CredentialsSource) -> Result<Self, StoreError> {
        match source {
            CredentialsSource::Json(json) => Self::from_json(json),
            CredentialsSource::File(path) => {
                let json =
                    std::fs::read_to_string(path).map_err(|e| StoreError::Credentials {
                        message: format!("cannot read {}: {}", path.display(), e),
                    })?;
                Self::from_json(&json)
            }
        }
    }

    /// Form fields for the refresh-token grant
    fn refresh_form(&self) -> [(&'static str, &str); 4] {
        [
            ("grant_type", "refresh_token"),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("refresh_token", &self.refresh_token),
        ]
    }

    /// Exchange the refresh token for a short-lived access token
    pub fn access_token(&self, agent: &ureq::Agent) -> Result<String, StoreError> {
        let uri = self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        debug!("Refreshing Google access token via {}", uri);

        let token: TokenResponse = agent
            .post(uri)
            .send_form(self.refresh_form())?
            .body_mut()
            .read_json()?;
        Ok(token.access_token)
    }
}
