// Scan orchestration: baseline, then every depth through probe -> classify -> record

use crate::error::CoreError;
use crate::persist::DepthWriter;
use crate::target::ScanTarget;
use chrono::{DateTime, Utc};
use delver_scanner::paths::{PathCandidate, PathGenerator, candidate_count, clamp_depth};
use delver_scanner::prober::DEFAULT_TIMEOUT_SECS;
use delver_scanner::{
    BaselineOracle, Classification, IdentityRotator, Prober, SimilarityThresholds, WafDetection,
    classify,
};
use futures::{StreamExt, future, stream};
use serde::{Deserialize, Serialize};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::{debug, info, warn};

pub const DEFAULT_THREADS: usize = 10;

/// Options for configuring a scan
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub target: ScanTarget,
    pub wordlist: Vec<String>,
    pub max_depth: usize,
    pub output_dir: PathBuf,
    pub proxies: Vec<String>,
    pub threads: usize,
    pub timeout_secs: u64,
    pub thresholds: SimilarityThresholds,
    /// Findings of the WAF fingerprint step, carried into the report.
    pub waf_detections: Vec<WafDetection>,
}

impl ScanOptions {
    pub fn new(target: ScanTarget, wordlist: Vec<String>, output_dir: PathBuf) -> Self {
        Self {
            target,
            wordlist,
            max_depth: 1,
            output_dir,
            proxies: Vec::new(),
            threads: DEFAULT_THREADS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            thresholds: SimilarityThresholds::default(),
            waf_detections: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    BaselineEstablished,
    Scanning,
    Completed,
    Aborted,
}

/// Cooperative interrupt flag, checked before each candidate is admitted.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Running counters. Not-found outcomes only show up in `requests`.
#[derive(Debug, Default)]
pub struct ScanStats {
    requests: AtomicUsize,
    valid: AtomicUsize,
    protected: AtomicUsize,
    redirect: AtomicUsize,
    soft_404: AtomicUsize,
    errors: AtomicUsize,
}

impl ScanStats {
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, classification: Classification) {
        let counter = match classification {
            Classification::Valid => &self.valid,
            Classification::Protected => &self.protected,
            Classification::Redirect => &self.redirect,
            Classification::Soft404 => &self.soft_404,
            Classification::Error => &self.errors,
            Classification::NotFound => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            valid: self.valid.load(Ordering::Relaxed),
            protected: self.protected.load(Ordering::Relaxed),
            redirect: self.redirect.load(Ordering::Relaxed),
            soft_404: self.soft_404.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub requests: usize,
    pub valid: usize,
    pub protected: usize,
    pub redirect: usize,
    pub soft_404: usize,
    pub errors: usize,
}

impl StatsSnapshot {
    pub fn not_found(&self) -> usize {
        self.requests.saturating_sub(
            self.valid + self.protected + self.redirect + self.soft_404 + self.errors,
        )
    }
}

/// What happened to one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub depth: usize,
    pub url: String,
    pub classification: Classification,
    /// Final status code; `None` when no response came back.
    pub status: Option<u16>,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    BaselineReady { established: bool },
    DepthStarted { depth: usize, candidates: usize },
    Probed(ProbeOutcome),
}

/// Callback for reporting scan progress as it happens
pub type ScanEventCallback = Arc<dyn Fn(&ScanEvent) + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub target: String,
    pub state: ScanState,
    pub max_depth: usize,
    pub stats: StatsSnapshot,
    pub baseline_established: bool,
    pub waf_detections: Vec<WafDetection>,
    pub output_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Owns all per-scan state: rotator, prober, baseline, counters and output files.
pub struct Orchestrator {
    target: ScanTarget,
    wordlist: Vec<String>,
    max_depth: usize,
    threads: usize,
    thresholds: SimilarityThresholds,
    waf_detections: Vec<WafDetection>,
    prober: Prober,
    oracle: BaselineOracle,
    writer: DepthWriter,
    stats: ScanStats,
    state: ScanState,
    shutdown: ShutdownSignal,
    event_callback: Option<ScanEventCallback>,
}

impl Orchestrator {
    /// Check preconditions and set up the scan. Nothing is sent yet.
    pub fn new(options: ScanOptions) -> Result<Self, CoreError> {
        let ScanOptions {
            target,
            wordlist,
            max_depth,
            output_dir,
            proxies,
            threads,
            timeout_secs,
            thresholds,
            waf_detections,
        } = options;

        if wordlist.is_empty() {
            return Err(CoreError::EmptyWordlist);
        }

        let writer = DepthWriter::create(&output_dir).map_err(|source| CoreError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

        let identity = Arc::new(IdentityRotator::with_proxies(target.as_str(), proxies));
        let prober = Prober::with_timeout(identity, timeout_secs)?;

        Ok(Self {
            target,
            wordlist,
            max_depth: clamp_depth(max_depth),
            threads: threads.max(1),
            thresholds,
            waf_detections,
            prober,
            oracle: BaselineOracle::disabled(),
            writer,
            stats: ScanStats::default(),
            state: ScanState::Idle,
            shutdown: ShutdownSignal::new(),
            event_callback: None,
        })
    }

    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn with_event_callback(mut self, callback: ScanEventCallback) -> Self {
        self.event_callback = Some(callback);
        self
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Run the scan to completion or interruption. Always yields a report.
    pub async fn run(mut self) -> ScanReport {
        let started_at = Utc::now();
        info!(
            "Scanning {} to depth {} with {} words",
            self.target,
            self.max_depth,
            self.wordlist.len()
        );

        let mut completed = false;
        if !self.shutdown.is_triggered() {
            self.oracle = BaselineOracle::establish(&self.prober, self.target.as_str())
                .await
                .with_thresholds(self.thresholds);
            self.transition(ScanState::BaselineEstablished);
            self.emit(ScanEvent::BaselineReady {
                established: self.oracle.is_established(),
            });

            self.transition(ScanState::Scanning);
            completed = true;
            for depth in 1..=self.max_depth {
                if self.shutdown.is_triggered() || !self.scan_depth(depth).await {
                    completed = false;
                    break;
                }
            }
        }

        if completed {
            self.transition(ScanState::Completed);
        } else {
            self.transition(ScanState::Aborted);
        }

        if let Err(e) = self.writer.flush() {
            warn!("Failed to flush results: {}", e);
        }

        ScanReport {
            target: self.target.to_string(),
            state: self.state,
            max_depth: self.max_depth,
            stats: self.stats.snapshot(),
            baseline_established: self.oracle.is_established(),
            waf_detections: self.waf_detections.clone(),
            output_dir: self.writer.output_dir().to_path_buf(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn transition(&mut self, next: ScanState) {
        debug!("Scan state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn emit(&self, event: ScanEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(&event);
        }
    }

    /// Returns false when an interrupt left candidates of this depth unprobed.
    async fn scan_depth(&self, depth: usize) -> bool {
        let generator = PathGenerator::new(self.target.as_str(), &self.wordlist);
        let candidates = candidate_count(self.wordlist.len(), depth);
        info!("Depth {}: {} candidates", depth, candidates);
        self.emit(ScanEvent::DepthStarted { depth, candidates });

        let mut cut = false;
        stream::iter(generator.candidates(depth))
            .take_while(|_| {
                cut = self.shutdown.is_triggered();
                future::ready(!cut)
            })
            .map(|candidate| self.process(candidate))
            .buffer_unordered(self.threads)
            .for_each(|_| future::ready(()))
            .await;
        !cut
    }

    async fn process(&self, candidate: PathCandidate) {
        let PathCandidate { depth, url } = candidate;
        self.stats.record_request();

        let Some(response) = self.prober.probe(&url).await else {
            self.stats.record(Classification::Error);
            self.emit(ScanEvent::Probed(ProbeOutcome {
                depth,
                url,
                classification: Classification::Error,
                status: None,
                note: "no response".to_string(),
            }));
            return;
        };

        let (classification, note) =
            match catch_unwind(AssertUnwindSafe(|| classify(&url, &response, &self.oracle))) {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!("Unexpected error while processing {}", url);
                    (Classification::Error, "processing failed".to_string())
                }
            };
        self.stats.record(classification);

        let status = response.status_code;
        match classification {
            Classification::Valid | Classification::Protected => {
                info!("Found {} (depth {}): {} [status {}]", classification, depth, url, status);
                if let Err(e) = self.writer.append(depth, &url, status, &note) {
                    warn!(
                        "Failed to write to {}: {}",
                        self.writer.path_for(depth).display(),
                        e
                    );
                }
            }
            Classification::Redirect => debug!("Redirected to {} from {}", note, url),
            Classification::Soft404 => debug!("Soft 404 detected: {}", url),
            Classification::NotFound | Classification::Error => {
                debug!("Not found ({}): {}", status, url)
            }
        }

        self.emit(ScanEvent::Probed(ProbeOutcome {
            depth,
            url,
            classification,
            status: Some(status),
            note,
        }));
    }
}

/// Run a scan with the given options.
///
/// Only precondition failures are returned as errors; per-candidate
/// failures are counted in the report.
pub async fn execute_scan(
    options: ScanOptions,
    shutdown: ShutdownSignal,
    event_callback: Option<ScanEventCallback>,
) -> Result<ScanReport, CoreError> {
    let mut orchestrator = Orchestrator::new(options)?.with_shutdown(shutdown);
    if let Some(callback) = event_callback {
        orchestrator = orchestrator.with_event_callback(callback);
    }
    Ok(orchestrator.run().await)
}
