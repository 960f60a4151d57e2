//! YouTube Data API channel statistics.

mod client;
mod types;

pub use client::{ChannelStats, FetchError, MetricsSource, YoutubeClient};
pub use types::{ChannelItem, ChannelListResponse, ChannelSnippet, ChannelStatistics};
