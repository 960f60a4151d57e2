use once_cell::sync::OnceCell;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::google_auth::AuthorizedUser;
use super::{SnapshotStore, StoreError};
use crate::config::CredentialsSource;
use crate::snapshot::{is_header, Snapshot, Subscribers, HEADER};

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Column range of the first sheet holding the log
const RANGE: &str = "A:E";

/// Snapshot log kept in the first sheet of a Google spreadsheet
pub struct SheetsStore {
    sheet_id: String,
    credentials: CredentialsSource,
    agent: ureq::Agent,
    token: OnceCell<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetsStore {
    pub fn new(sheet_id: String, credentials: CredentialsSource) -> Self {
        Self {
            sheet_id,
            credentials,
            agent: ureq::Agent::new_with_defaults(),
            token: OnceCell::new(),
        }
    }

    /// Access token, fetched on first use
    fn token(&self) -> Result<&str, StoreError> {
        self.token
            .get_or_try_init(|| {
                let user = AuthorizedUser::load(&self.credentials)?;
                user.access_token(&self.agent)
            })
            .map(String::as_str)
    }

    fn values_url(&self) -> String {
        format!("{}/{}/values/{}", SHEETS_API, self.sheet_id, RANGE)
    }

    fn fetch_values(&self) -> Result<Vec<Vec<String>>, StoreError> {
        let bearer = format!("Bearer {}", self.token()?);
        let range: ValueRange = self
            .agent
            .get(&self.values_url())
            .header("Authorization", &bearer)
            .call()?
            .body_mut()
            .read_json()?;
        Ok(range.values.iter().map(|row| cells_to_text(row.as_slice())).collect())
    }
}

impl SnapshotStore for SheetsStore {
    fn append_all(&mut self, rows: &[Snapshot]) -> Result<(), StoreError> {
        if rows.is_empty() {
            return Ok(());
        }

        let empty = self.fetch_values()?.is_empty();
        if empty {
            info!("Spreadsheet {} is empty, writing header", self.sheet_id);
        }
        let body = append_body(rows, empty);

        let bearer = format!("Bearer {}", self.token()?);
        let url = format!("{}:append", self.values_url());
        self.agent
            .post(&url)
            .query("valueInputOption", "RAW")
            .query("insertDataOption", "INSERT_ROWS")
            .header("Authorization", &bearer)
            .send_json(&body)?;

        debug!("Appended {} row(s) to sheet {}", rows.len(), self.sheet_id);
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Snapshot>, StoreError> {
        Ok(rows_from_values(&self.fetch_values()?))
    }

    fn describe(&self) -> String {
        format!("spreadsheet {}", self.sheet_id)
    }
}

/// Request body for `values:append`; numbers go in as numbers
fn append_body(rows: &[Snapshot], with_header: bool) -> Value {
    let mut values: Vec<Value> = Vec::with_capacity(rows.len() + 1);
    if with_header {
        values.push(json!(HEADER));
    }
    for row in rows {
        let subscribers = match row.subscribers {
            Some(Subscribers::Count(n)) => json!(n),
            Some(Subscribers::Hidden) => json!(Subscribers::Hidden.to_string()),
            None => json!(""),
        };
        values.push(json!([
            row.date.format("%Y-%m-%d").to_string(),
            row.channel_name,
            row.views.map_or(json!(""), |v| json!(v)),
            subscribers,
            row.videos.map_or(json!(""), |v| json!(v)),
        ]));
    }
    json!({ "values": values })
}

/// Sheets hands back formatted text, but be lenient about raw JSON values
fn cells_to_text(row: &[Value]) -> Vec<String> {
    row.iter()
        .map(|cell| match cell {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        })
        .collect()
}

fn rows_from_values(values: &[Vec<String>]) -> Vec<Snapshot> {
    values
        .iter()
        .filter(|row| !is_header(row.as_slice()))
        .filter_map(|row| Snapshot::from_record(row.as_slice()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn demo() -> Snapshot {
        Snapshot {
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            channel_name: "Demo".to_string(),
            views: Some(500),
            subscribers: Some(Subscribers::Hidden),
            videos: Some(2),
        }
    }

    #[test]
    fn test_append_body_with_header() {
        let body = append_body(&[demo()], true);
        assert_eq!(
            body,
            json!({
                "values": [
                    ["Date", "ChannelName", "Views", "Subscribers", "Videos"],
                    ["2024-05-01", "Demo", 500, "Hidden", 2]
                ]
            })
        );
    }

    #[test]
    fn test_append_body_without_header() {
        let body = append_body(&[demo()], false);
        assert_eq!(body["values"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_rows_from_values_retypes_text() {
        let raw: ValueRange = serde_json::from_value(json!({
            "range": "Sheet1!A1:E4",
            "majorDimension": "ROWS",
            "values": [
                ["Date", "ChannelName", "Views", "Subscribers", "Videos"],
                ["2024-05-01", "Demo", "500", "Hidden", "2"],
                ["2024-05-02", "Demo", "1,200", "15", "garbage"],
                ["2024-05-03", "Demo", 1300]
            ]
        }))
        .unwrap();
        let text: Vec<Vec<String>> = raw.values.iter().map(|r| cells_to_text(r.as_slice())).collect();
        let rows = rows_from_values(&text);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], demo());
        assert_eq!(rows[1].views, Some(1200));
        assert_eq!(rows[1].subscribers, Some(Subscribers::Count(15)));
        assert_eq!(rows[1].videos, None);
        assert_eq!(rows[2].views, Some(1300));
        assert_eq!(rows[2].subscribers, None);
    }

    #[test]
    fn test_empty_sheet_has_no_values_key() {
        let raw: ValueRange = serde_json::from_value(json!({ "range": "Sheet1!A1:E1000" })).unwrap();
        assert!(raw.values.is_empty());
    }

    #[test]
    fn test_values_url() {
        let store = SheetsStore::new(
            "abc123".to_string(),
            CredentialsSource::Json("{}".to_string()),
        );
        assert_eq!(
            store.values_url(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/A:E"
        );
        assert_eq!(store.describe(), "spreadsheet abc123");
    }
}
