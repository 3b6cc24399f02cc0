use std::io::Write;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use image::{ImageResult, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use nexus_core::{FeatureConfig, MatchResult, Region};
use nexus_fast::{DetectorBuilder, FastResult};
use nexus_scan::{load_image, ScanEvent, ScanSink, ScanSummary};

/// Outline color for annotated matches
const HIGHLIGHT: Rgba<u8> = Rgba([255, 40, 40, 255]);
const OUTLINE_WIDTH: i32 = 3;

/// Set up `env_logger` with `level` unless `RUST_LOG` says otherwise
pub fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
        .is_err()
    {
        log::debug!("logger already initialised");
    }
}

/// Named detector settings selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    /// Few pyramid levels, high threshold, at most 500 keypoints
    Fast,
    /// The default detector settings
    Balanced,
    /// Deep pyramid, low threshold, at most 2000 keypoints
    Precision,
}

impl Preset {
    /// Replace the detector settings in `detector` with this preset.
    /// The thread count is kept.
    pub fn apply(self, detector: FeatureConfig) -> FastResult<FeatureConfig> {
        let builder = DetectorBuilder::from_config(detector);
        let builder = match self {
            Preset::Fast => builder.preset_fast(),
            Preset::Balanced => builder.preset_balanced(),
            Preset::Precision => builder.preset_precision(),
        };
        log::debug!("detector preset {:?}: {}", self, builder.summary());
        builder.into_config()
    }
}

/// Prints scan events as lines of text and keeps every match for the
/// final report
pub struct ConsoleSink<W: Write> {
    out: W,
    matches: Vec<MatchResult>,
    summary: Option<ScanSummary>,
    cancelled: bool,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            matches: Vec::new(),
            summary: None,
            cancelled: false,
        }
    }

    pub fn matches(&self) -> &[MatchResult] {
        &self.matches
    }

    /// Matches sorted by percentage, best first; ties keep scan order
    pub fn ranked(&self) -> Vec<MatchResult> {
        let mut ranked = self.matches.clone();
        ranked.sort_by(|a, b| b.percentage.partial_cmp(&a.percentage).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    pub fn summary(&self) -> Option<ScanSummary> {
        self.summary
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_event(&mut self, event: &ScanEvent) -> std::io::Result<()> {
        match event {
            ScanEvent::Progress(p) => match p.percentage {
                Some(pct) => writeln!(self.out, "[{}/{}] {:<40} {:6.2}%", p.index, p.total, p.current_name, pct),
                None => writeln!(self.out, "[{}/{}] {:<40} skipped", p.index, p.total, p.current_name),
            },
            ScanEvent::Match(m) => writeln!(self.out, "  match: {} ({:.2}%)", m.path.display(), m.percentage),
            ScanEvent::Completed(s) => writeln!(
                self.out,
                "done: {} analyzed, {} skipped, {} matched",
                s.analyzed, s.skipped, s.matched
            ),
            ScanEvent::Cancelled(s) => writeln!(self.out, "cancelled after {} of {} images", s.processed(), s.total),
        }
    }
}

impl<W: Write> ScanSink for ConsoleSink<W> {
    fn emit(&mut self, event: ScanEvent) {
        if let Err(e) = self.write_event(&event) {
            log::warn!("cannot write scan output: {}", e);
        }
        match event {
            ScanEvent::Match(m) => self.matches.push(m),
            ScanEvent::Completed(s) => self.summary = Some(s),
            ScanEvent::Cancelled(s) => {
                self.summary = Some(s);
                self.cancelled = true;
            }
            ScanEvent::Progress(_) => {}
        }
    }
}

/// Rectangle covering `region`, at least one pixel wide and tall
pub fn region_rect(region: &Region) -> Rect {
    let x = region.min_x.floor() as i32;
    let y = region.min_y.floor() as i32;
    let w = (region.max_x.ceil() as i32 - x).max(1) as u32;
    let h = (region.max_y.ceil() as i32 - y).max(1) as u32;
    Rect::at(x, y).of_size(w, h)
}

/// Where the annotated copy of `candidate` goes inside `out_dir`
pub fn annotated_path(candidate: &Path, out_dir: &Path) -> PathBuf {
    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "candidate".to_string());
    out_dir.join(format!("{}_match.png", stem))
}

/// Save a copy of the matched candidate with its region outlined.
/// Returns `None` when the match carries no region.
pub fn annotate_match(result: &MatchResult, out_dir: &Path) -> ImageResult<Option<PathBuf>> {
    let Some(region) = result.region else {
        return Ok(None);
    };

    let mut canvas = load_image(&result.path)?.into_rgba8();
    let rect = region_rect(&region);
    for inset in 0..OUTLINE_WIDTH {
        let w = rect.width() as i32 + 2 * inset;
        let h = rect.height() as i32 + 2 * inset;
        let r = Rect::at(rect.left() - inset, rect.top() - inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(&mut canvas, r, HIGHLIGHT);
    }

    std::fs::create_dir_all(out_dir)?;
    let path = annotated_path(&result.path, out_dir);
    canvas.save(&path)?;
    Ok(Some(path))
}
