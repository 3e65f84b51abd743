//! Character-level sequence similarity.
//!
//! This is a crude proxy for answer correctness: it rewards shared
//! characters in order, not shared meaning. A verbose but correct answer
//! scores lower than a terse wrong one that happens to overlap. Swapping in
//! a semantic metric changes every reported number and must be treated as a
//! behavior change.

use std::collections::HashMap;

/// Sequences at least this long get the popular-element heuristic.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Pluggable per-case scoring.
pub trait Scorer: Send + Sync {
    /// Metric name.
    fn name(&self) -> &str;
    /// Score `completion` against `reference`, in [0, 1].
    fn score(&self, completion: &str, reference: &str) -> f64;
}

/// Case-insensitive sequence-matching ratio, see [`score`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityScorer;

impl Scorer for SimilarityScorer {
    fn name(&self) -> &str {
        "similarity"
    }

    fn score(&self, completion: &str, reference: &str) -> f64 {
        score(completion, reference)
    }
}

/// Case-insensitive similarity of two strings in [0, 1].
///
/// Both inputs are lowercased, then compared with the Ratcliff/Obershelp
/// ratio `2*M / T`, where `M` is the number of characters in matching blocks
/// and `T` the combined length. Identical strings score 1.0; strings with no
/// character in common score 0.0. The pair is ordered canonically before
/// matching so `score(a, b) == score(b, a)` exactly.
pub fn score(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a == b {
        return 1.0;
    }
    if a <= b { ratio(&a, &b) } else { ratio(&b, &a) }
}

/// Sequence-matching ratio of `a` against `b`, without normalization.
pub fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = SequenceMatcher::new(a, b).matched_len();
    (2.0 * matched as f64 / total as f64).clamp(0.0, 1.0)
}

/// Recursive longest-common-block matcher over characters.
///
/// When `b` has at least 200 characters, any character occurring in more
/// than 1% of `b` is dropped from the index ("popular"); such characters
/// can still join a match by extending a block found through other
/// characters.
pub struct SequenceMatcher<'a> {
    a: &'a [char],
    b: &'a [char],
    b2j: HashMap<char, Vec<usize>>,
}

/// A matching block: `a[a_start..a_start+len] == b[b_start..b_start+len]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Block {
    pub a_start: usize,
    pub b_start: usize,
    pub len: usize,
}

impl<'a> SequenceMatcher<'a> {
    pub fn new(a: &'a [char], b: &'a [char]) -> Self {
        let mut b2j: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            b2j.entry(c).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }
        Self { a, b, b2j }
    }

    /// Longest matching block in `a[alo..ahi]` x `b[blo..bhi]`, earliest in
    /// `a` (then `b`) on ties. `len == 0` when nothing matches.
    pub fn longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Block {
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
        // j -> length of the match ending at (i - 1, j)
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j == 0 {
                        0
                    } else {
                        j2len.get(&(j - 1)).copied().unwrap_or(0)
                    };
                    let k = prev + 1;
                    next.insert(j, k);
                    if k > best_len {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_len = k;
                    }
                }
            }
            j2len = next;
        }

        // Grow through characters the index left out.
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && self.a[best_i + best_len] == self.b[best_j + best_len]
        {
            best_len += 1;
        }

        Block {
            a_start: best_i,
            b_start: best_j,
            len: best_len,
        }
    }

    /// All matching blocks, ordered by position.
    pub fn matching_blocks(&self) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let block = self.longest_match(alo, ahi, blo, bhi);
            if block.len == 0 {
                continue;
            }
            let (i, j, k) = (block.a_start, block.b_start, block.len);
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
            blocks.push(block);
        }

        blocks.sort();
        blocks
    }

    /// Total characters covered by matching blocks.
    pub fn matched_len(&self) -> usize {
        self.matching_blocks().iter().map(|b| b.len).sum()
    }
}
