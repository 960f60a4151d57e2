use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ytpulse_core::config::{Settings, StoreBackend};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Track YouTube channel growth")]
pub struct Config {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Channel list file
    #[arg(long, global = true)]
    pub channels: Option<PathBuf>,

    /// Snapshot store backend (csv or sheets)
    #[arg(long, global = true)]
    pub store: Option<StoreBackend>,

    /// CSV store path
    #[arg(long, global = true)]
    pub csv: Option<PathBuf>,

    /// Chart output path
    #[arg(long, global = true)]
    pub chart: Option<PathBuf>,

    /// Subcommand (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Collect today's snapshots, then chart and notify
    Run,
    /// Collect today's snapshots only
    Collect,
    /// Rebuild the chart from stored history
    Chart {
        /// Do not send the chart to Telegram
        #[arg(long)]
        no_notify: bool,
    },
    /// Run the Telegram command bot
    Bot,
    /// Manage the tracked channel list
    Channels {
        #[command(subcommand)]
        action: ChannelsAction,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ChannelsAction {
    /// Show tracked channels
    List,
    /// Track a channel (ID, URL, @handle or username)
    Add { reference: String },
    /// Stop tracking a channel
    Remove { reference: String },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The requested command, `run` when none was given
    pub fn resolved_command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// Overlay command line overrides onto loaded settings
    pub fn merge_into(&self, settings: &mut Settings) {
        if let Some(channels) = &self.channels {
            settings.channels_file = channels.clone();
        }
        if let Some(store) = self.store {
            settings.store.backend = store;
        }
        if let Some(csv) = &self.csv {
            settings.store.csv_path = csv.clone();
        }
        if let Some(chart) = &self.chart {
            settings.chart_file = chart.clone();
        }
    }
}
