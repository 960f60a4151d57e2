use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use super::types::{ChannelItem, ChannelListResponse};
use crate::channels::EntityReference;
use crate::snapshot::{Snapshot, Subscribers};

const CHANNELS_URL: &str = "https://www.googleapis.com/youtube/v3/channels";

/// Error type for a single channel lookup
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or non-2xx status
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),
}

/// Current public statistics of one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    pub channel_id: String,
    pub name: String,
    pub views: u64,
    pub subscribers: Subscribers,
    pub videos: u64,
}

impl ChannelStats {
    /// Date-stamp these statistics
    pub fn into_snapshot(self, date: NaiveDate) -> Snapshot {
        Snapshot {
            date,
            channel_name: self.name,
            views: Some(self.views),
            subscribers: Some(self.subscribers),
            videos: Some(self.videos),
        }
    }
}

impl From<ChannelItem> for ChannelStats {
    fn from(item: ChannelItem) -> Self {
        let stats = item.statistics;
        let subscribers = if stats.hidden_subscriber_count {
            Subscribers::Hidden
        } else {
            Subscribers::Count(count(stats.subscriber_count.as_deref()))
        };
        Self {
            channel_id: item.id,
            name: item.snippet.title,
            views: count(stats.view_count.as_deref()),
            subscribers,
            videos: count(stats.video_count.as_deref()),
        }
    }
}

fn count(s: Option<&str>) -> u64 {
    s.and_then(|v| v.trim().parse().ok()).unwrap_or(0)
}

/// Source of channel statistics.
///
/// `Ok(None)` means the lookup succeeded but matched no channel.
pub trait MetricsSource {
    fn fetch(
        &self,
        api_key: &str,
        reference: &EntityReference,
    ) -> Result<Option<ChannelStats>, FetchError>;
}

/// Client for the YouTube Data API v3 `channels` endpoint.
///
/// One request per lookup, no retries and no timeout.
pub struct YoutubeClient {
    agent: ureq::Agent,
}

impl Default for YoutubeClient {
    fn default() -> Self {
        Self::new()
    }
}

impl YoutubeClient {
    pub fn new() -> Self {
        Self {
            agent: ureq::Agent::new_with_defaults(),
        }
    }

    /// Query parameters for one lookup
    fn query_params<'a>(
        api_key: &'a str,
        reference: &'a EntityReference,
    ) -> [(&'static str, &'a str); 3] {
        [
            ("part", "snippet,statistics"),
            ("key", api_key),
            (reference.kind.query_param(), reference.value.as_str()),
        ]
    }
}

impl MetricsSource for YoutubeClient {
    fn fetch(
        &self,
        api_key: &str,
        reference: &EntityReference,
    ) -> Result<Option<ChannelStats>, FetchError> {
        debug!("Looking up {} by {}", reference.value, reference.kind);

        let response: ChannelListResponse = self
            .agent
            .get(CHANNELS_URL)
            .query_pairs(Self::query_params(api_key, reference))
            .call()?
            .body_mut()
            .read_json()?;

        Ok(first_channel(response))
    }
}

/// First matching channel, if any
fn first_channel(response: ChannelListResponse) -> Option<ChannelStats> {
    response.items.into_iter().next().map(ChannelStats::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::parse_reference;
    use pretty_assertions::assert_eq;

    fn response(json: &str) -> ChannelListResponse {
        serde_json::from_str(json).expect("valid response JSON")
    }

    #[test]
    fn test_query_params_by_kind() {
        let handle = parse_reference("@demo").unwrap();
        assert_eq!(
            YoutubeClient::query_params("k", &handle),
            [("part", "snippet,statistics"), ("key", "k"), ("forHandle", "demo")]
        );

        let id = parse_reference("UC1234567890123456789012").unwrap();
        assert_eq!(
            YoutubeClient::query_params("k", &id)[2],
            ("id", "UC1234567890123456789012")
        );

        let user = parse_reference("OldName").unwrap();
        assert_eq!(YoutubeClient::query_params("k", &user)[2], ("forUsername", "OldName"));
    }

    #[test]
    fn test_parse_channel_response() {
        let resp = response(
            r#"{
                "kind": "youtube#channelListResponse",
                "pageInfo": {"totalResults": 1, "resultsPerPage": 5},
                "items": [{
                    "kind": "youtube#channel",
                    "id": "UC1234567890123456789012",
                    "snippet": {"title": "Demo", "description": "..."},
                    "statistics": {
                        "viewCount": "500",
                        "subscriberCount": "10",
                        "hiddenSubscriberCount": false,
                        "videoCount": "2"
                    }
                }]
            }"#,
        );

        assert_eq!(
            first_channel(resp),
            Some(ChannelStats {
                channel_id: "UC1234567890123456789012".to_string(),
                name: "Demo".to_string(),
                views: 500,
                subscribers: Subscribers::Count(10),
                videos: 2,
            })
        );
    }

    #[test]
    fn test_hidden_subscribers_and_missing_counts() {
        let resp = response(
            r#"{"items": [{
                "id": "UC1234567890123456789012",
                "snippet": {"title": "Quiet"},
                "statistics": {"hiddenSubscriberCount": true}
            }]}"#,
        );
        let stats = first_channel(resp).unwrap();
        assert_eq!(stats.subscribers, Subscribers::Hidden);
        assert_eq!(stats.views, 0);
        assert_eq!(stats.videos, 0);
    }

    #[test]
    fn test_no_items_is_not_found() {
        let resp = response(r#"{"kind": "youtube#channelListResponse", "pageInfo": {"totalResults": 0}}"#);
        assert_eq!(first_channel(resp), None);
    }

    #[test]
    fn test_into_snapshot() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let stats = ChannelStats {
            channel_id: "UC".to_string(),
            name: "Demo".to_string(),
            views: 500,
            subscribers: Subscribers::Count(10),
            videos: 2,
        };
        let snap = stats.into_snapshot(date);
        assert_eq!(snap.date, date);
        assert_eq!(snap.channel_name, "Demo");
        assert_eq!(snap.views, Some(500));
        assert_eq!(snap.subscribers, Some(Subscribers::Count(10)));
        assert_eq!(snap.videos, Some(2));
    }
}
