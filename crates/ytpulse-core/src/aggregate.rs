//! Per-day reduction of raw snapshots and growth-from-baseline series.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::snapshot::Snapshot;

/// Highest view count seen for a channel on one day
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyAggregate {
    pub channel_name: String,
    pub date: NaiveDate,
    /// `None` when no reading that day had a usable view count
    pub max_views: Option<u64>,
}

/// Percentage change of views relative to the first observed day
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthPoint {
    pub channel_name: String,
    pub date: NaiveDate,
    pub percent: f64,
}

/// Channel names in the order they first appear
pub fn channel_order<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut order: Vec<String> = Vec::new();
    for name in names {
        if !order.iter().any(|n| n == name) {
            order.push(name.to_string());
        }
    }
    order
}

/// Collapse snapshots to one row per channel per day, keeping the maximum views.
///
/// Repeated runs on the same day do not add points. Output is grouped by
/// channel in first-seen order, dates ascending within each channel.
pub fn group_by_day(snapshots: &[Snapshot]) -> Vec<DailyAggregate> {
    let order = channel_order(snapshots.iter().map(|s| s.channel_name.as_str()));
    let rank: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();

    let mut days: HashMap<(&str, NaiveDate), Option<u64>> = HashMap::new();
    for snap in snapshots {
        let slot = days
            .entry((snap.channel_name.as_str(), snap.date))
            .or_insert(None);
        *slot = match (*slot, snap.views) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    let mut out: Vec<DailyAggregate> = days
        .into_iter()
        .map(|((name, date), max_views)| DailyAggregate {
            channel_name: name.to_string(),
            date,
            max_views,
        })
        .collect();
    out.sort_by(|a, b| {
        rank[a.channel_name.as_str()]
            .cmp(&rank[b.channel_name.as_str()])
            .then(a.date.cmp(&b.date))
    });
    out
}

/// Growth of daily views relative to each channel's first usable day.
///
/// Days without a view count are dropped. A channel whose baseline is zero, or
/// that has no usable days, is left out entirely. The baseline itself is 0%.
pub fn growth_series(daily: &[DailyAggregate]) -> Vec<GrowthPoint> {
    let order = channel_order(daily.iter().map(|d| d.channel_name.as_str()));
    let mut out = Vec::new();

    for name in &order {
        let mut points: Vec<(NaiveDate, u64)> = daily
            .iter()
            .filter(|d| &d.channel_name == name)
            .filter_map(|d| d.max_views.map(|v| (d.date, v)))
            .collect();
        points.sort_by_key(|(date, _)| *date);

        let baseline = match points.first() {
            Some((_, v)) if *v > 0 => *v as f64,
            _ => continue,
        };

        out.extend(points.into_iter().map(|(date, v)| GrowthPoint {
            channel_name: name.clone(),
            date,
            percent: (v as f64 - baseline) / baseline * 100.0,
        }));
    }
    out
}
