// Candidate path generation: Cartesian powers of the wordlist, per depth

use std::collections::BTreeMap;

/// Deepest level a scan may reach.
pub const MAX_DEPTH: usize = 4;

/// Clamp a requested depth into `1..=MAX_DEPTH`.
pub fn clamp_depth(depth: usize) -> usize {
    depth.clamp(1, MAX_DEPTH)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathCandidate {
    pub depth: usize,
    pub url: String,
}

/// Number of candidates at `depth` for a wordlist of `words` entries (`words^depth`).
pub fn candidate_count(words: usize, depth: usize) -> usize {
    u32::try_from(depth)
        .ok()
        .and_then(|d| words.checked_pow(d))
        .unwrap_or(usize::MAX)
}

/// Builds candidate URLs under an origin.
///
/// Candidates are produced lazily through [`PathGenerator::candidates`], so
/// deep scans over large wordlists never hold the whole path space in memory.
#[derive(Debug, Clone, Copy)]
pub struct PathGenerator<'a> {
    origin: &'a str,
    words: &'a [String],
}

impl<'a> PathGenerator<'a> {
    pub fn new(origin: &'a str, words: &'a [String]) -> Self {
        Self {
            origin: origin.trim_end_matches('/'),
            words,
        }
    }

    /// Every ordered `depth`-tuple of words, in wordlist order.
    pub fn candidates(&self, depth: usize) -> DepthCandidates<'a> {
        let exhausted = depth == 0 || self.words.is_empty();
        DepthCandidates {
            origin: self.origin,
            words: self.words,
            indices: vec![0; depth],
            exhausted,
        }
    }

    /// Materialize every depth from 1 to `max_depth` (clamped), grouped by depth.
    pub fn generate(&self, max_depth: usize) -> BTreeMap<usize, Vec<PathCandidate>> {
        (1..=clamp_depth(max_depth))
            .map(|depth| (depth, self.candidates(depth).collect()))
            .collect()
    }
}

/// Odometer over word indices; the last segment varies fastest.
#[derive(Debug, Clone)]
pub struct DepthCandidates<'a> {
    origin: &'a str,
    words: &'a [String],
    indices: Vec<usize>,
    exhausted: bool,
}

impl DepthCandidates<'_> {
    fn advance(&mut self) {
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.words.len() {
                return;
            }
            self.indices[pos] = 0;
        }
        self.exhausted = true;
    }
}

impl Iterator for DepthCandidates<'_> {
    type Item = PathCandidate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }

        let path = self
            .indices
            .iter()
            .map(|&i| self.words[i].trim_start_matches('/'))
            .collect::<Vec<_>>()
            .join("/");
        let candidate = PathCandidate {
            depth: self.indices.len(),
            url: format!("{}/{}", self.origin, path),
        };

        self.advance();
        Some(candidate)
    }
}
