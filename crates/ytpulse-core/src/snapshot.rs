//! Dated channel measurements and their row encoding.

use chrono::{NaiveDate, NaiveDateTime};

/// Column header shared by every store backend
pub const HEADER: [&str; 5] = ["Date", "ChannelName", "Views", "Subscribers", "Videos"];

/// Literal written for a hidden subscriber count
pub const HIDDEN: &str = "Hidden";

/// Subscriber count as published upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscribers {
    /// Public count
    Count(u64),
    /// Channel owner hides the count
    Hidden,
}

impl std::fmt::Display for Subscribers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subscribers::Count(n) => write!(f, "{}", n),
            Subscribers::Hidden => write!(f, "{}", HIDDEN),
        }
    }
}

/// One dated measurement of a channel.
///
/// Numeric fields are `None` when a stored value could not be parsed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub channel_name: String,
    pub views: Option<u64>,
    pub subscribers: Option<Subscribers>,
    pub videos: Option<u64>,
}

impl Snapshot {
    /// Encode as the five text columns of [`HEADER`]
    pub fn to_record(&self) -> [String; 5] {
        [
            self.date.format("%Y-%m-%d").to_string(),
            self.channel_name.clone(),
            opt_to_string(self.views),
            self.subscribers.map(|s| s.to_string()).unwrap_or_default(),
            opt_to_string(self.videos),
        ]
    }

    /// Decode a stored row.
    ///
    /// Returns `None` when the row is too short or its date is unreadable.
    /// Unparseable numbers become `None` fields rather than failing the row.
    pub fn from_record<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        if fields.len() < 2 {
            return None;
        }
        let cell = |i: usize| fields.get(i).map(|s| s.as_ref().trim()).unwrap_or("");

        Some(Self {
            date: parse_date(cell(0))?,
            channel_name: cell(1).to_string(),
            views: parse_count(cell(2)),
            subscribers: parse_subscribers(cell(3)),
            videos: parse_count(cell(4)),
        })
    }
}

/// Whether a row is the column header
pub fn is_header<S: AsRef<str>>(fields: &[S]) -> bool {
    fields
        .first()
        .is_some_and(|f| f.as_ref().trim().eq_ignore_ascii_case(HEADER[0]))
}

/// Calendar date of a stored date cell (`2024-05-01` or `2024-05-01 12:30:00`)
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

/// Parse a stored count, tolerating thousands separators
pub fn parse_count(s: &str) -> Option<u64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(n) = cleaned.parse::<u64>() {
        return Some(n);
    }
    // Spreadsheets may hand back "1234.0"
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
        .map(|f| f as u64)
}

fn parse_subscribers(s: &str) -> Option<Subscribers> {
    if s.trim().eq_ignore_ascii_case(HIDDEN) {
        return Some(Subscribers::Hidden);
    }
    parse_count(s).map(Subscribers::Count)
}

fn opt_to_string(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_default()
}
