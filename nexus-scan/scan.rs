use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver};
use log::{debug, info, warn};
use nexus_core::{FeatureSet, MatchResult, Region, ScanProgress};
use thiserror::Error;

use crate::config::ScanConfig;
use crate::decode::load_image;
use crate::discovery::list_images;
use crate::error::{ConfigError, ExtractError, ScanError, ScanResult, ScoreError};
use crate::events::{CancelToken, ScanEvent, ScanSink, ScanSummary};
use crate::extractor::FeatureExtractor;
use crate::matcher::DescriptorMatcher;
use crate::scorer::{matched_region, score};

/// How a call to [`Scanner::scan`] ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Source or directory was not given; nothing ran and nothing was emitted
    NotStarted,
    Completed(ScanSummary),
    Cancelled(ScanSummary),
}

/// Why a single candidate was left out of the scan
#[derive(Debug, Error)]
enum SkipReason {
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("no features")]
    NoFeatures,
    #[error("{0}")]
    Score(#[from] ScoreError),
}

/// Result of one candidate evaluation
struct Evaluation {
    percentage: f64,
    region: Option<Region>,
}

/// Scores a directory of candidates against one source image.
///
/// A scanner holds only its configuration and the pipeline built from it,
/// so one scanner can run any number of scans, one after another or at the
/// same time. Cancellation belongs to a single scan: see
/// [`Scanner::scan_with_cancel`].
#[derive(Debug)]
pub struct Scanner {
    config: ScanConfig,
    extractor: FeatureExtractor,
    matcher: DescriptorMatcher,
}

impl Scanner {
    /// Validates `config` and builds the shared extractor and matcher
    pub fn new(config: ScanConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let extractor = FeatureExtractor::new(config.detector.clone())?;
        let matcher = DescriptorMatcher::new(config.ratio_test_threshold);
        Ok(Self { config, extractor, matcher })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Scan every candidate image in `dir` against `source`.
    ///
    /// Returns `NotStarted` without emitting anything when either input is
    /// missing. Errors (unreadable directory, undecodable or featureless
    /// source) are returned before the first event.
    pub fn scan<S: ScanSink + ?Sized>(
        &self,
        source: Option<&Path>,
        dir: Option<&Path>,
        sink: &mut S,
    ) -> ScanResult<ScanOutcome> {
        self.scan_with_cancel(source, dir, sink, &CancelToken::new())
    }

    /// Like [`Scanner::scan`], stopping once `cancel` is set.
    ///
    /// The token is checked before each candidate and once more before the
    /// scan completes, so a cancel that arrives while the last candidate is
    /// evaluated still ends the scan with `Cancelled`. A token that is
    /// already set cancels the scan before its first candidate.
    pub fn scan_with_cancel<S: ScanSink + ?Sized>(
        &self,
        source: Option<&Path>,
        dir: Option<&Path>,
        sink: &mut S,
        cancel: &CancelToken,
    ) -> ScanResult<ScanOutcome> {
        let (Some(source), Some(dir)) = (source, dir) else {
            debug!("scan not started: source or candidate directory missing");
            return Ok(ScanOutcome::NotStarted);
        };

        let candidates = list_images(dir, &self.config.extensions).map_err(|e| ScanError::Directory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let source_features = self.extract_source(source)?;

        let total = candidates.len();
        let mut summary = ScanSummary { total, ..ScanSummary::default() };
        let started = Instant::now();
        info!(
            "scanning {} candidates in {} against {} ({} keypoints)",
            total,
            dir.display(),
            source.display(),
            source_features.len()
        );

        for (i, path) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(Self::cancelled(summary, sink));
            }

            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());

            let evaluation = match self.evaluate(&source_features, path) {
                Ok(evaluation) => {
                    summary.analyzed += 1;
                    debug!("{}: {:.2}%", name, evaluation.percentage);
                    Some(evaluation)
                }
                Err(reason) => {
                    summary.skipped += 1;
                    warn!("skipping {}: {}", path.display(), reason);
                    None
                }
            };

            sink.emit(ScanEvent::Progress(ScanProgress {
                current_name: name,
                index: i + 1,
                total,
                percentage: evaluation.as_ref().map(|e| e.percentage),
            }));

            if let Some(evaluation) = evaluation {
                if evaluation.percentage > self.config.match_percentage_threshold {
                    summary.matched += 1;
                    sink.emit(ScanEvent::Match(MatchResult {
                        path: path.clone(),
                        percentage: evaluation.percentage,
                        region: evaluation.region,
                    }));
                }
            }
        }

        if cancel.is_cancelled() {
            return Ok(Self::cancelled(summary, sink));
        }

        info!(
            "scan finished in {:.2?}: {} analyzed, {} skipped, {} matched",
            started.elapsed(),
            summary.analyzed,
            summary.skipped,
            summary.matched
        );
        sink.emit(ScanEvent::Completed(summary));
        Ok(ScanOutcome::Completed(summary))
    }

    fn cancelled<S: ScanSink + ?Sized>(summary: ScanSummary, sink: &mut S) -> ScanOutcome {
        info!("scan cancelled after {} of {} candidates", summary.processed(), summary.total);
        sink.emit(ScanEvent::Cancelled(summary));
        ScanOutcome::Cancelled(summary)
    }

    /// Run a scan on a worker thread, streaming events over a channel. The
    /// returned handle carries the token that cancels this scan.
    pub fn spawn(self, source: PathBuf, dir: PathBuf) -> ScanHandle {
        let (tx, events) = unbounded::<ScanEvent>();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        let handle = thread::spawn(move || {
            let mut sink = tx;
            self.scan_with_cancel(Some(source.as_path()), Some(dir.as_path()), &mut sink, &worker_cancel)
        });

        ScanHandle { events, cancel, handle }
    }

    /// Decode and extract the source; zero keypoints refuses the scan
    pub fn extract_source(&self, path: &Path) -> ScanResult<FeatureSet> {
        let img = load_image(path).map_err(|source| ScanError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let features = self.extractor.extract(&img)?;
        if features.is_empty() {
            warn!("{} has no detectable features", path.display());
            return Err(ScanError::DegenerateSource(path.to_path_buf()));
        }
        Ok(features)
    }

    fn evaluate(&self, source: &FeatureSet, path: &Path) -> Result<Evaluation, SkipReason> {
        let img = load_image(path)?;
        let candidate = self.extractor.extract(&img)?;
        if candidate.is_empty() {
            return Err(SkipReason::NoFeatures);
        }

        let correspondences = self.matcher.match_features(source, &candidate);
        let percentage = score(&correspondences, source.len())?;
        let region = if self.config.highlight_region {
            matched_region(&correspondences, &candidate)
        } else {
            None
        };

        Ok(Evaluation { percentage, region })
    }
}

/// A scan running on its own thread
pub struct ScanHandle {
    events: Receiver<ScanEvent>,
    cancel: CancelToken,
    handle: JoinHandle<ScanResult<ScanOutcome>>,
}

impl ScanHandle {
    /// Events in emission order; the channel closes when the scan ends
    pub fn events(&self) -> &Receiver<ScanEvent> {
        &self.events
    }

    /// Ask the scan to stop before its next candidate
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Wait for the worker; a panic on the worker is propagated
    pub fn join(self) -> ScanResult<ScanOutcome> {
        match self.handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Similarity of one image pair, scored relative to the first image
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub percentage: f64,
    pub source_keypoints: usize,
    pub candidate_keypoints: usize,
    pub correspondences: usize,
    /// Matched keypoints in the second image
    pub region: Option<Region>,
}

/// Score `candidate` against `source` with the same pipeline a scan uses
pub fn compare_images(source: &Path, candidate: &Path, config: &ScanConfig) -> ScanResult<Comparison> {
    let scanner = Scanner::new(config.clone())?;
    let source_features = scanner.extract_source(source)?;

    let img = load_image(candidate).map_err(|e| ScanError::Decode {
        path: candidate.to_path_buf(),
        source: e,
    })?;
    let candidate_features = scanner.extractor.extract(&img)?;

    let correspondences = scanner.matcher.match_features(&source_features, &candidate_features);
    let percentage = score(&correspondences, source_features.len())?;

    Ok(Comparison {
        percentage,
        source_keypoints: source_features.len(),
        candidate_keypoints: candidate_features.len(),
        correspondences: correspondences.len(),
        region: matched_region(&correspondences, &candidate_features),
    })
}
