//! Growth chart: one views panel per channel plus a combined %-growth panel.

use chrono::{Days, NaiveDate};
use once_cell::sync::OnceCell;
use plotters::prelude::*;
use plotters::style::FontStyle;
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{channel_order, growth_series, DailyAggregate};
use crate::config::ChartSettings;
use crate::report::thousands;

/// Category palette, assigned to channels in first-seen order and cycled
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

const GRID: RGBColor = RGBColor(225, 225, 225);
const ZERO_LINE: RGBColor = RGBColor(128, 128, 128);
const GRID_LINES: i64 = 5;
const FONT_FAMILY: &str = "sans-serif";

/// Fonts tried when none is configured
const SYSTEM_FONTS: [&str; 7] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static FONT_READY: OnceCell<bool> = OnceCell::new();

/// Error type for chart rendering
#[derive(Debug, Error)]
pub enum ChartError {
    #[error("no data to chart")]
    Empty,

    #[error("chart rendering failed: {0}")]
    Render(String),
}

/// Turns daily aggregates into an image file
pub trait ChartRenderer {
    fn render(&self, daily: &[DailyAggregate], path: &Path) -> Result<(), ChartError>;
}

/// Plot data for one channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSeries {
    pub name: String,
    pub color: RGBColor,
    /// Daily max views, dates ascending
    pub views: Vec<(NaiveDate, u64)>,
    /// % growth from baseline; empty when the channel has no usable baseline
    pub growth: Vec<(NaiveDate, f64)>,
}

/// Split aggregates into per-channel plot series
pub fn prepare_series(daily: &[DailyAggregate]) -> Vec<ChannelSeries> {
    let growth = growth_series(daily);
    channel_order(daily.iter().map(|d| d.channel_name.as_str()))
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let mut views: Vec<(NaiveDate, u64)> = daily
                .iter()
                .filter(|d| d.channel_name == name)
                .filter_map(|d| d.max_views.map(|v| (d.date, v)))
                .collect();
            views.sort_by_key(|(date, _)| *date);
            let growth = growth
                .iter()
                .filter(|g| g.channel_name == name)
                .map(|g| (g.date, g.percent))
                .collect();
            ChannelSeries {
                name,
                color: PALETTE[i % PALETTE.len()],
                views,
                growth,
            }
        })
        .collect()
}

/// Register a font for chart text once per process. Returns whether one is available.
fn ensure_font(configured: Option<&Path>) -> bool {
    *FONT_READY.get_or_init(|| {
        let candidates: Vec<PathBuf> = configured
            .map(Path::to_path_buf)
            .into_iter()
            .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
            .collect();

        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            // plotters keeps registered fonts for the life of the process
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match plotters::style::register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
                Ok(()) => {
                    debug!("Chart font: {:?}", path);
                    return true;
                }
                Err(_) => warn!("Unusable chart font: {:?}", path),
            }
        }
        warn!("No chart font found; rendering without titles or labels");
        false
    })
}

/// Renderer backed by plotters' bitmap backend (PNG output)
pub struct PlottersRenderer {
    width: u32,
    panel_height: u32,
    labels: bool,
}

impl PlottersRenderer {
    pub fn new(settings: &ChartSettings) -> Self {
        Self {
            width: settings.width,
            panel_height: settings.panel_height,
            labels: ensure_font(settings.font_path.as_deref()),
        }
    }

    /// Force text on or off (text needs a registered font)
    pub fn with_labels(mut self, labels: bool) -> Self {
        self.labels = labels;
        self
    }

    /// Pixel size for `channels` per-channel panels plus the growth panel
    pub fn image_size(&self, channels: usize) -> (u32, u32) {
        (self.width, self.panel_height * (channels as u32 + 1))
    }

    fn draw(&self, series: &[ChannelSeries], path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let root = BitMapBackend::new(path, self.image_size(series.len())).into_drawing_area();
        root.fill(&WHITE)?;

        let first_day = series
            .iter()
            .flat_map(|s| s.views.iter().map(|(d, _)| *d))
            .min()
            .ok_or("no dated points")?;
        let offset = |d: NaiveDate| (d - first_day).num_days();
        let x_fmt = |x: &i64| {
            u64::try_from(*x)
                .ok()
                .and_then(|n| first_day.checked_add_days(Days::new(n)))
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };

        let panels = root.split_evenly((series.len() + 1, 1));
        let (growth_panel, view_panels) = panels.split_last().ok_or("no panels")?;

        for (panel, s) in view_panels.iter().zip(series) {
            let points: Vec<(i64, f64)> = s.views.iter().map(|(d, v)| (offset(*d), *v as f64)).collect();
            let x_range = padded_x(points.iter().map(|p| p.0));
            let y_range = padded_y(points.iter().map(|p| p.1), false);

            let mut builder = ChartBuilder::on(panel);
            builder
                .margin(20)
                .x_label_area_size(50)
                .y_label_area_size(110);
            if self.labels {
                builder.caption(format!("{} - Views Over Time", s.name), (FONT_FAMILY, 28));
            }
            let mut chart = builder.build_cartesian_2d(x_range.clone(), y_range.clone())?;

            let y_fmt = |y: &f64| if *y < 0.0 { String::new() } else { thousands(y.round() as u64) };
            if self.labels {
                chart
                    .configure_mesh()
                    .light_line_style(GRID)
                    .bold_line_style(GRID)
                    .x_desc("Date")
                    .y_desc("Total Views")
                    .x_label_formatter(&x_fmt)
                    .y_label_formatter(&y_fmt)
                    .draw()?;
            } else {
                chart.draw_series(plain_grid(&x_range, &y_range))?;
            }

            let color = s.color;
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))?
                .label(s.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
            chart.draw_series(points.iter().map(|p| Circle::new(*p, 5, color.filled())))?;

            if self.labels {
                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperLeft)
                    .background_style(WHITE.mix(0.8))
                    .border_style(GRID)
                    .draw()?;
            }
        }

        let growth: Vec<(&ChannelSeries, Vec<(i64, f64)>)> = series
            .iter()
            .map(|s| (s, s.growth.iter().map(|(d, p)| (offset(*d), *p)).collect()))
            .collect();
        let all = || growth.iter().flat_map(|(_, pts)| pts.iter().copied());
        let x_range = padded_x(all().map(|p| p.0).chain(std::iter::once(0)));
        let y_range = padded_y(all().map(|p| p.1).chain(std::iter::once(0.0)), true);

        let mut builder = ChartBuilder::on(growth_panel);
        builder
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(110);
        if self.labels {
            builder.caption("Views - % Growth from Start", (FONT_FAMILY, 28));
        }
        let mut chart = builder.build_cartesian_2d(x_range.clone(), y_range.clone())?;

        let pct_fmt = |y: &f64| format!("{:+.1}%", y);
        if self.labels {
            chart
                .configure_mesh()
                .light_line_style(GRID)
                .bold_line_style(GRID)
                .x_desc("Date")
                .y_desc("Growth (%)")
                .x_label_formatter(&x_fmt)
                .y_label_formatter(&pct_fmt)
                .draw()?;
        } else {
            chart.draw_series(plain_grid(&x_range, &y_range))?;
        }

        chart.draw_series(LineSeries::new(
            vec![(x_range.start, 0.0), (x_range.end, 0.0)],
            ZERO_LINE.stroke_width(1),
        ))?;

        for (s, points) in &growth {
            if points.is_empty() {
                continue;
            }
            let color = s.color;
            chart
                .draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))?
                .label(s.name.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3)));
            chart.draw_series(points.iter().map(|p| Circle::new(*p, 5, color.filled())))?;
        }

        if self.labels {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(GRID)
                .draw()?;
        }

        root.present()?;
        Ok(())
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render(&self, daily: &[DailyAggregate], path: &Path) -> Result<(), ChartError> {
        let series = prepare_series(daily);
        if series.iter().all(|s| s.views.is_empty()) {
            return Err(ChartError::Empty);
        }

        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| ChartError::Render(e.to_string()))?;
            }
        }

        self.draw(&series, path)
            .map_err(|e| ChartError::Render(e.to_string()))?;
        info!("Chart saved to {:?}", path);
        Ok(())
    }
}

/// Grid lines for a panel drawn without a mesh. The mesh computes tick
/// positions for labels, which needs a font.
fn plain_grid(x: &Range<i64>, y: &Range<f64>) -> Vec<PathElement<(i64, f64)>> {
    let step = ((x.end - x.start) / GRID_LINES).max(1) as usize;
    let mut lines: Vec<PathElement<(i64, f64)>> = (x.start..=x.end)
        .step_by(step)
        .map(|gx| PathElement::new(vec![(gx, y.start), (gx, y.end)], GRID))
        .collect();
    lines.extend((0..=GRID_LINES).map(|i| {
        let gy = y.start + (y.end - y.start) * i as f64 / GRID_LINES as f64;
        PathElement::new(vec![(x.start, gy), (x.end, gy)], GRID)
    }));
    lines
}

/// Day-offset range covering `xs`, never empty
fn padded_x(xs: impl Iterator<Item = i64>) -> Range<i64> {
    let (lo, hi) = xs.fold((i64::MAX, i64::MIN), |(lo, hi), x| (lo.min(x), hi.max(x)));
    if lo > hi {
        return 0..1;
    }
    if lo == hi {
        return (lo - 1)..(hi + 1);
    }
    lo..hi
}

/// Value range covering `ys` with 5% headroom; views stay non-negative
fn padded_y(ys: impl Iterator<Item = f64>, allow_negative: bool) -> Range<f64> {
    let (lo, hi) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| (lo.min(y), hi.max(y)));
    if lo > hi {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { hi.abs().max(1.0) * 0.05 };
    let start = if allow_negative { lo - pad } else { (lo - pad).max(0.0) };
    start..(hi + pad)
}
