mod bot;
mod config;

use anyhow::Result;
use chrono::Local;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{ChannelsAction, Command, Config};
use ytpulse_core::channels::{parse_reference, ChannelList};
use ytpulse_core::config::Settings;
use ytpulse_core::pipeline::{CollectReport, FetchOutcome};
use ytpulse_core::report::stats_table;
use ytpulse_core::{PipelineBuilder, VisualReport};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Config) -> Result<()> {
    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    cli.merge_into(&mut settings);
    settings.validate();

    let today = Local::now().date_naive();
    match cli.resolved_command() {
        Command::Run => {
            let mut pipeline = PipelineBuilder::new(settings).build()?;
            let report = pipeline.run(today)?;
            print_collect(&report.collect, &pipeline.store_description());
            match report.visual {
                Some(visual) => print_visual(&visual),
                None => println!("No results to display."),
            }
        }
        Command::Collect => {
            let mut pipeline = PipelineBuilder::new(settings).build()?;
            let report = pipeline.collect(today)?;
            print_collect(&report, &pipeline.store_description());
            if report.is_empty() {
                println!("No results to display.");
            }
        }
        Command::Chart { no_notify } => {
            let pipeline = PipelineBuilder::new(settings).build()?;
            let visual = pipeline.visualize()?;
            print_visual(&visual);
            if !no_notify {
                pipeline.notify(&visual);
            }
        }
        Command::Bot => bot::run(settings)?,
        Command::Channels { action } => channels(&settings, action)?,
    }
    Ok(())
}

fn channels(settings: &Settings, action: ChannelsAction) -> Result<()> {
    let mut list = ChannelList::load(&settings.channels_file)?;
    match action {
        ChannelsAction::List => {
            if list.is_empty() {
                println!("No channels tracked in {:?}", list.path());
            }
            for entry in list.entries() {
                match parse_reference(entry) {
                    Some(reference) => println!("{:<40} {}", entry, reference.kind),
                    None => println!("{:<40} (ignored)", entry),
                }
            }
        }
        ChannelsAction::Add { reference } => {
            if parse_reference(&reference).is_none() {
                anyhow::bail!("not a channel reference: {:?}", reference);
            }
            if list.add(&reference) {
                list.save()?;
                println!("Added {}", reference);
            } else {
                println!("{} is already tracked", reference);
            }
        }
        ChannelsAction::Remove { reference } => {
            if list.remove(&reference) {
                list.save()?;
                println!("Removed {}", reference);
            } else {
                println!("{} is not tracked", reference);
            }
        }
    }
    Ok(())
}

fn print_collect(report: &CollectReport, store: &str) {
    for entry in &report.outcomes {
        match &entry.outcome {
            FetchOutcome::Fetched(stats) => {
                println!("  ok         {} -> {}", entry.reference, stats.name)
            }
            FetchOutcome::NotFound => println!("  not found  {}", entry.reference),
            FetchOutcome::Failed(e) => println!("  failed     {}: {}", entry.reference, e),
        }
    }

    let fetched = report.fetched();
    if !fetched.is_empty() {
        print!("{}", stats_table(&fetched));
        println!("Appended {} row(s) to {}", report.appended.len(), store);
    }
    println!(
        "Collected {} of {} channels",
        fetched.len(),
        report.outcomes.len()
    );
}

fn print_visual(report: &VisualReport) {
    if let Some(summary) = report.summary() {
        println!("{}", summary);
    }
    println!(
        "Chart saved to {} ({} rows, {} channels)",
        report.chart_path.display(),
        report.rows,
        report.channels
    );
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("ytpulse=debug,ytpulse_core=debug")
    } else {
        EnvFilter::new("ytpulse=info,ytpulse_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
