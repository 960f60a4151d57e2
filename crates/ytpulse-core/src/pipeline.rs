//! In-process orchestration of a collection run.
//!
//! ```ignore
//! let mut pipeline = PipelineBuilder::new(settings).build()?;
//! let report = pipeline.run(today)?;
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::aggregate::{channel_order, group_by_day};
use crate::channels::{ChannelList, EntityReference};
use crate::chart::{ChartRenderer, PlottersRenderer};
use crate::config::{ConfigError, Settings};
use crate::notify::{Notifier, TelegramNotifier};
use crate::report::DeltaReport;
use crate::snapshot::Snapshot;
use crate::store::{open_store, SnapshotStore};
use crate::youtube::{ChannelStats, MetricsSource, YoutubeClient};

/// What happened to one reference during collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched(ChannelStats),
    NotFound,
    /// Request failed; the message is kept for display
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityOutcome {
    pub reference: EntityReference,
    pub outcome: FetchOutcome,
}

/// Result of [`Pipeline::collect`]
#[derive(Debug, Clone, Default)]
pub struct CollectReport {
    pub outcomes: Vec<EntityOutcome>,
    /// Rows written to the store by this run
    pub appended: Vec<Snapshot>,
}

impl CollectReport {
    /// Statistics of every successfully fetched channel, in list order
    pub fn fetched(&self) -> Vec<ChannelStats> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.outcome {
                FetchOutcome::Fetched(stats) => Some(stats.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| !matches!(o.outcome, FetchOutcome::Fetched(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.appended.is_empty()
    }
}

/// Result of [`Pipeline::visualize`]
#[derive(Debug, Clone)]
pub struct VisualReport {
    /// Snapshot rows read from the store
    pub rows: usize,
    pub channels: usize,
    pub chart_path: PathBuf,
    pub delta: Option<DeltaReport>,
}

impl VisualReport {
    /// Summary text sent ahead of the chart
    pub fn summary(&self) -> Option<String> {
        self.delta.as_ref().map(DeltaReport::format)
    }
}

/// Result of [`Pipeline::run`]
#[derive(Debug, Clone)]
pub struct RunReport {
    pub collect: CollectReport,
    /// `None` when nothing was collected
    pub visual: Option<VisualReport>,
}

/// Collection, visualization and notification wired together
pub struct Pipeline {
    settings: Settings,
    source: Box<dyn MetricsSource>,
    store: Box<dyn SnapshotStore>,
    renderer: Box<dyn ChartRenderer>,
    notifier: Box<dyn Notifier>,
}

impl Pipeline {
    /// Location of the snapshot store, for display
    pub fn store_description(&self) -> String {
        self.store.describe()
    }

    /// Fetch every tracked channel and append today's snapshots.
    ///
    /// A missing API key aborts before any request. Per-channel failures are
    /// logged and recorded in the report; the run moves on to the next one.
    pub fn collect(&mut self, today: NaiveDate) -> Result<CollectReport> {
        let api_key = self.settings.require_api_key()?.to_string();
        let list = ChannelList::load(&self.settings.channels_file)?;
        let references = list.references();
        if references.is_empty() {
            warn!("No channels to track in {:?}", list.path());
        }

        let mut report = CollectReport::default();
        for reference in references {
            info!("Fetching {}", reference);
            let outcome = match self.source.fetch(&api_key, &reference) {
                Ok(Some(stats)) => {
                    info!(
                        "{}: {} views, {} subscribers, {} videos",
                        stats.name, stats.views, stats.subscribers, stats.videos
                    );
                    FetchOutcome::Fetched(stats)
                }
                Ok(None) => {
                    warn!("Channel not found: {}", reference);
                    FetchOutcome::NotFound
                }
                Err(e) => {
                    warn!("Failed to fetch {}: {}", reference, e);
                    FetchOutcome::Failed(e.to_string())
                }
            };
            report.outcomes.push(EntityOutcome { reference, outcome });
        }

        report.appended = report
            .fetched()
            .into_iter()
            .map(|stats| stats.into_snapshot(today))
            .collect();

        if report.appended.is_empty() {
            info!("Nothing collected, store left untouched");
            return Ok(report);
        }

        self.store
            .append_all(&report.appended)
            .with_context(|| format!("Failed to append to {}", self.store.describe()))?;
        info!(
            "Appended {} rows to {}",
            report.appended.len(),
            self.store.describe()
        );
        Ok(report)
    }

    /// Rebuild the chart and the delta summary from the full history
    pub fn visualize(&self) -> Result<VisualReport> {
        let history = self
            .store
            .read_all()
            .with_context(|| format!("Failed to read {}", self.store.describe()))?;
        let daily = group_by_day(&history);
        let chart_path = self.settings.chart_file.clone();

        self.renderer
            .render(&daily, &chart_path)
            .context("Failed to render chart")?;

        Ok(VisualReport {
            rows: history.len(),
            channels: channel_order(history.iter().map(|s| s.channel_name.as_str())).len(),
            chart_path,
            delta: DeltaReport::build(&history),
        })
    }

    /// Deliver the chart and summary; never fails
    pub fn notify(&self, report: &VisualReport) {
        let summary = report.summary();
        self.notifier.notify(summary.as_deref(), &report.chart_path);
    }

    /// Collect, then visualize and notify when anything was collected
    pub fn run(&mut self, today: NaiveDate) -> Result<RunReport> {
        let collect = self.collect(today)?;
        if collect.is_empty() {
            return Ok(RunReport {
                collect,
                visual: None,
            });
        }

        let visual = self.visualize()?;
        self.notify(&visual);
        Ok(RunReport {
            collect,
            visual: Some(visual),
        })
    }
}

/// Builder for [`Pipeline`]; unset parts are derived from settings
pub struct PipelineBuilder {
    settings: Settings,
    source: Option<Box<dyn MetricsSource>>,
    store: Option<Box<dyn SnapshotStore>>,
    renderer: Option<Box<dyn ChartRenderer>>,
    notifier: Option<Box<dyn Notifier>>,
}

impl PipelineBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            source: None,
            store: None,
            renderer: None,
            notifier: None,
        }
    }

    pub fn with_source(mut self, source: impl MetricsSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn with_store(mut self, store: impl SnapshotStore + 'static) -> Self {
        self.store = Some(Box::new(store));
        self
    }

    pub fn with_renderer(mut self, renderer: impl ChartRenderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    /// Build the pipeline.
    ///
    /// Fails only when the configured store backend lacks its settings.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigError> {
        let store = match self.store {
            Some(store) => store,
            None => open_store(&self.settings)?,
        };
        let source = self
            .source
            .unwrap_or_else(|| Box::new(YoutubeClient::new()));
        let renderer = self
            .renderer
            .unwrap_or_else(|| Box::new(PlottersRenderer::new(&self.settings.chart)));
        let notifier = self
            .notifier
            .unwrap_or_else(|| Box::new(TelegramNotifier::from_settings(&self.settings.telegram)));

        Ok(Pipeline {
            settings: self.settings,
            source,
            store,
            renderer,
            notifier,
        })
    }
}
