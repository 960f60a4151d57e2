//! Human-readable summaries: day-over-day deltas and the console stats table.

use chrono::NaiveDate;
use std::fmt::Write as _;

use crate::aggregate::channel_order;
use crate::snapshot::{Snapshot, Subscribers};
use crate::youtube::ChannelStats;

/// Latest reading of one channel next to the previous day's
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelDelta {
    pub channel_name: String,
    pub latest: Snapshot,
    pub previous: Option<Snapshot>,
}

/// Day-over-day comparison across all channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaReport {
    pub latest_date: NaiveDate,
    pub previous_date: Option<NaiveDate>,
    pub channels: Vec<ChannelDelta>,
}

impl DeltaReport {
    /// Compare the two most recent dates in the history.
    ///
    /// Returns `None` for an empty history. When a channel has several rows
    /// on one date, the last one wins. Channels absent from the latest date
    /// are left out.
    pub fn build(history: &[Snapshot]) -> Option<Self> {
        let latest_date = history.iter().map(|s| s.date).max()?;
        let previous_date = history
            .iter()
            .map(|s| s.date)
            .filter(|d| *d < latest_date)
            .max();

        let on = |date: NaiveDate, name: &str| {
            history
                .iter()
                .rev()
                .find(|s| s.date == date && s.channel_name == name)
                .cloned()
        };

        let names = channel_order(
            history
                .iter()
                .filter(|s| s.date == latest_date)
                .map(|s| s.channel_name.as_str()),
        );

        let channels = names
            .into_iter()
            .filter_map(|name| {
                let latest = on(latest_date, &name)?;
                let previous = previous_date.and_then(|d| on(d, &name));
                Some(ChannelDelta {
                    channel_name: name,
                    latest,
                    previous,
                })
            })
            .collect();

        Some(Self {
            latest_date,
            previous_date,
            channels,
        })
    }

    /// Text block suitable for a chat message
    pub fn format(&self) -> String {
        let mut out = format!("YouTube stats for {}", self.latest_date.format("%Y-%m-%d"));
        if let Some(prev) = self.previous_date {
            let _ = write!(out, " vs {}", prev.format("%Y-%m-%d"));
        }
        out.push('\n');

        for ch in &self.channels {
            let prev = ch.previous.as_ref();
            let _ = write!(out, "\n{}\n", ch.channel_name);
            let _ = writeln!(
                out,
                "  Subscribers: {}",
                subscriber_line(ch.latest.subscribers, prev.and_then(|p| p.subscribers))
            );
            let _ = writeln!(
                out,
                "  Views: {}",
                count_line(ch.latest.views, prev.and_then(|p| p.views))
            );
            let _ = writeln!(
                out,
                "  Videos: {}",
                count_line(ch.latest.videos, prev.and_then(|p| p.videos))
            );
        }
        out
    }
}

fn count_line(current: Option<u64>, previous: Option<u64>) -> String {
    match (current, previous) {
        (Some(c), Some(p)) => format!("{} ({})", thousands(c), signed_delta(c, p)),
        (Some(c), None) => thousands(c),
        (None, _) => "n/a".to_string(),
    }
}

fn subscriber_line(current: Option<Subscribers>, previous: Option<Subscribers>) -> String {
    match current {
        Some(Subscribers::Hidden) => Subscribers::Hidden.to_string(),
        Some(Subscribers::Count(c)) => {
            let prev = match previous {
                Some(Subscribers::Count(p)) => Some(p),
                _ => None,
            };
            count_line(Some(c), prev)
        }
        None => "n/a".to_string(),
    }
}

/// `1234567` -> `1,234,567`
pub fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Signed, thousands-separated difference: `+100`, `-5`, `+0`
pub fn signed_delta(current: u64, previous: u64) -> String {
    if current >= previous {
        format!("+{}", thousands(current - previous))
    } else {
        format!("-{}", thousands(previous - current))
    }
}

/// Fixed-width table of freshly collected statistics
pub fn stats_table(results: &[ChannelStats]) -> String {
    let rule_heavy = "=".repeat(72);
    let rule_light = "-".repeat(72);
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule_heavy);
    let _ = writeln!(
        out,
        "{:<32} {:>14} {:>14} {:>8}",
        "Channel", "Views", "Subscribers", "Videos"
    );
    let _ = writeln!(out, "{}", rule_light);
    for r in results {
        let subs = match r.subscribers {
            Subscribers::Count(n) => thousands(n),
            Subscribers::Hidden => Subscribers::Hidden.to_string(),
        };
        let _ = writeln!(
            out,
            "{:<32} {:>14} {:>14} {:>8}",
            r.name,
            thousands(r.views),
            subs,
            thousands(r.videos)
        );
    }
    let _ = writeln!(out, "{}", rule_heavy);
    out
}
