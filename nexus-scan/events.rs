use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;
use nexus_core::{MatchResult, ScanProgress};

/// Counters reported when a scan ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Candidates found in the directory
    pub total: usize,
    /// Candidates that were decoded, extracted and scored
    pub analyzed: usize,
    /// Candidates dropped because they could not be decoded or had no features
    pub skipped: usize,
    /// Candidates whose score passed the threshold
    pub matched: usize,
}

impl ScanSummary {
    pub fn processed(&self) -> usize {
        self.analyzed + self.skipped
    }
}

/// Everything a scan reports, in emission order.
///
/// Per candidate: one `Progress`, then `Match` if it passed the threshold.
/// Exactly one of `Completed` or `Cancelled` ends the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Progress(ScanProgress),
    Match(MatchResult),
    Completed(ScanSummary),
    Cancelled(ScanSummary),
}

impl ScanEvent {
    /// True for the event that closes a scan
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScanEvent::Completed(_) | ScanEvent::Cancelled(_))
    }
}

/// Receives scan events; how they are shown is up to the implementor
pub trait ScanSink {
    fn emit(&mut self, event: ScanEvent);
}

impl ScanSink for Vec<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        self.push(event);
    }
}

impl ScanSink for Sender<ScanEvent> {
    fn emit(&mut self, event: ScanEvent) {
        // A dropped receiver only means nobody is listening any more
        if self.send(event).is_err() {
            log::debug!("scan event receiver dropped");
        }
    }
}

impl<S: ScanSink + ?Sized> ScanSink for &mut S {
    fn emit(&mut self, event: ScanEvent) {
        (**self).emit(event);
    }
}

/// Cooperative cancellation flag shared between a scan and its controller
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the token can drive another scan
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
