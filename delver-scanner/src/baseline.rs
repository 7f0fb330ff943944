// Baseline oracle: fingerprint of a guaranteed-missing path, used to spot soft-404s

use crate::prober::Prober;
use crate::result::ProbeResponse;
use crate::similarity::{quick_ratio, sequence_ratio};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Characters of body text kept for hashing and fuzzy comparison.
pub const SAMPLE_CHARS: usize = 2000;

pub const DEFAULT_LENGTH_THRESHOLD: f64 = 0.98;
pub const DEFAULT_TEXT_THRESHOLD: f64 = 0.94;

/// Path prefix of the baseline probe.
pub const BASELINE_PROBE_PREFIX: &str = "delver-probe-";

/// Similarity cut-offs above which a page is considered the baseline page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityThresholds {
    pub length: f64,
    pub text: f64,
}

impl Default for SimilarityThresholds {
    fn default() -> Self {
        Self {
            length: DEFAULT_LENGTH_THRESHOLD,
            text: DEFAULT_TEXT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSignature {
    pub status: u16,
    pub final_url: String,
    /// Length of the whole body, in characters.
    pub length: usize,
    /// Hex SHA-1 of `sample`.
    pub content_hash: String,
    pub sample: String,
}

impl ContentSignature {
    pub fn from_response(response: &ProbeResponse) -> Self {
        let prefix: String = response.body.chars().take(SAMPLE_CHARS).collect();
        let sample = prefix.trim().to_string();

        let mut hasher = Sha1::new();
        hasher.update(sample.as_bytes());

        Self {
            status: response.status_code,
            final_url: response.final_url.trim_end_matches('/').to_string(),
            length: response.body.chars().count(),
            content_hash: hex::encode(hasher.finalize()),
            sample,
        }
    }

    /// `1 - |a - b| / max(a, b)`, with empty lengths counted as 1.
    pub fn length_similarity(&self, other: &ContentSignature) -> f64 {
        let base = self.length.max(1) as f64;
        let candidate = other.length.max(1) as f64;
        1.0 - (base - candidate).abs() / base.max(candidate)
    }
}

/// Holds the baseline signature for one scan.
///
/// With no signature, soft-404 detection is disabled and [`BaselineOracle::is_soft_404`]
/// always answers `false`.
#[derive(Debug, Clone, Default)]
pub struct BaselineOracle {
    signature: Option<ContentSignature>,
    thresholds: SimilarityThresholds,
}

impl BaselineOracle {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_signature(signature: ContentSignature) -> Self {
        Self {
            signature: Some(signature),
            thresholds: SimilarityThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: SimilarityThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Probe a random path under `target` and record its signature.
    pub async fn establish(prober: &Prober, target: &str) -> Self {
        let probe_url = format!(
            "{}/{}{}",
            target.trim_end_matches('/'),
            BASELINE_PROBE_PREFIX,
            Uuid::new_v4().simple()
        );
        debug!("Establishing baseline with {}", probe_url);

        match prober.probe(&probe_url).await {
            Some(response) => {
                let signature = ContentSignature::from_response(&response);
                info!(
                    "Baseline established: status {} length {} hash {}",
                    signature.status, signature.length, signature.content_hash
                );
                Self::from_signature(signature)
            }
            None => {
                warn!("Baseline probe failed; soft-404 detection disabled");
                Self::disabled()
            }
        }
    }

    pub fn signature(&self) -> Option<&ContentSignature> {
        self.signature.as_ref()
    }

    pub fn is_established(&self) -> bool {
        self.signature.is_some()
    }

    pub fn is_soft_404(&self, response: &ProbeResponse) -> bool {
        let Some(baseline) = self.signature.as_ref() else {
            return false;
        };
        let candidate = ContentSignature::from_response(response);
        self.matches(baseline, &candidate)
    }

    fn matches(&self, baseline: &ContentSignature, candidate: &ContentSignature) -> bool {
        if candidate.content_hash == baseline.content_hash {
            return true;
        }

        if baseline.length_similarity(candidate) > self.thresholds.length {
            return true;
        }

        quick_ratio(&baseline.sample, &candidate.sample) > self.thresholds.text
            && sequence_ratio(&baseline.sample, &candidate.sample) > self.thresholds.text
    }
}
