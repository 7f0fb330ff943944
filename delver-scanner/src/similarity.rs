//! Text similarity for soft-404 detection.
//!
//! [`sequence_ratio`] is the Ratcliff/Obershelp "gestalt" ratio: find the
//! longest common block, recurse on both sides of it, and report
//! `2 * matched / (len_a + len_b)`. Inputs are compared per `char`.
//!
//! When the second string has at least [`POPULAR_MIN_LEN`] chars, any char
//! occurring more often than 1% of its length (+1) is not used to seed a
//! block, only to extend one. Template-heavy pages would otherwise match on
//! whitespace and markup alone.

use std::collections::HashMap;

/// Length from which popular chars are pruned from the block index.
pub const POPULAR_MIN_LEN: usize = 200;

/// Similarity of two strings in `[0.0, 1.0]`; two empty strings are identical.
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_of(a.len() + b.len(), matching_chars(&a, &b))
}

/// Cheap upper bound on [`sequence_ratio`] from character multisets.
pub fn quick_ratio(a: &str, b: &str) -> f64 {
    let mut available: HashMap<char, usize> = HashMap::new();
    for c in b.chars() {
        *available.entry(c).or_insert(0) += 1;
    }

    let mut matches = 0;
    let mut len_a = 0;
    for c in a.chars() {
        len_a += 1;
        if let Some(count) = available.get_mut(&c)
            && *count > 0
        {
            *count -= 1;
            matches += 1;
        }
    }

    let len_b: usize = available.values().sum::<usize>() + matches;
    ratio_of(len_a + len_b, matches)
}

fn ratio_of(total: usize, matches: usize) -> f64 {
    if total == 0 {
        return 1.0;
    }
    2.0 * matches as f64 / total as f64
}

/// Positions of every char of `b`, minus the popular ones for long inputs.
fn index_of(b: &[char]) -> HashMap<char, Vec<usize>> {
    let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, c) in b.iter().enumerate() {
        b_index.entry(*c).or_default().push(j);
    }

    if b.len() >= POPULAR_MIN_LEN {
        let limit = b.len() / 100 + 1;
        b_index.retain(|_, positions| positions.len() <= limit);
    }
    b_index
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let b_index = index_of(b);

    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_block(a, b, &b_index, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        matched += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    matched
}

/// Longest common block of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`, earliest on ties.
/// Blocks are seeded from `b_index` and then grown over any equal chars.
fn longest_block(
    a: &[char],
    b: &[char],
    b_index: &HashMap<char, Vec<usize>>,
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
    // run length of the match ending at b[j], for the previous row of a
    let mut run_ending: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(a_hi).skip(a_lo) {
        let mut next_run: HashMap<usize, usize> = HashMap::new();
        if let Some(positions) = b_index.get(c) {
            for &j in positions {
                if j < b_lo {
                    continue;
                }
                if j >= b_hi {
                    break;
                }
                let previous = if j > 0 {
                    run_ending.get(&(j - 1)).copied().unwrap_or(0)
                } else {
                    0
                };
                let size = previous + 1;
                next_run.insert(j, size);
                if size > best_size {
                    best_i = i + 1 - size;
                    best_j = j + 1 - size;
                    best_size = size;
                }
            }
        }
        run_ending = next_run;
    }

    while best_i > a_lo && best_j > b_lo && a[best_i - 1] == b[best_j - 1] {
        best_i -= 1;
        best_j -= 1;
        best_size += 1;
    }
    while best_i + best_size < a_hi
        && best_j + best_size < b_hi
        && a[best_i + best_size] == b[best_j + best_size]
    {
        best_size += 1;
    }

    (best_i, best_j, best_size)
}
