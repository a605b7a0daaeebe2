//! Candidate enumeration strategies.
//!
//! Every strategy is a finite, indexable sequence: candidate `i` can be
//! produced without producing `0..i`, which is what lets workers claim
//! disjoint index ranges and still agree on which match is lowest.
//!
//! Integers are encoded little-endian at a fixed width. Widths above 8
//! bytes zero-fill the high bytes.

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Largest accepted candidate width in bytes.
pub const MAX_WIDTH: usize = 64;

/// Default candidate width in bytes.
pub const DEFAULT_WIDTH: usize = 4;

fn default_width() -> usize {
    DEFAULT_WIDTH
}

/// How the search enumerates candidate inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateStrategy {
    /// Integers `start..end`, ascending.
    Range {
        start: u64,
        end: u64,
        #[serde(default = "default_width")]
        width: usize,
    },
    /// Explicit byte strings, in list order.
    Wordlist { words: Vec<Vec<u8>> },
    /// `count` pseudo-random integers from a ChaCha8 stream seeded with
    /// `seed`; candidate `i` is the stream's `i`-th 64-bit word.
    Sampled {
        seed: u64,
        count: u64,
        #[serde(default = "default_width")]
        width: usize,
    },
}

impl Default for CandidateStrategy {
    /// Every 4-byte little-endian integer.
    fn default() -> Self {
        CandidateStrategy::Range {
            start: 0,
            end: 1 << 32,
            width: DEFAULT_WIDTH,
        }
    }
}

impl CandidateStrategy {
    /// Checks that the strategy describes a well-formed sequence.
    ///
    /// Returns the reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            CandidateStrategy::Range { start, end, width } => {
                check_width(*width)?;
                if start > end {
                    return Err(format!("range start {start} is past its end {end}"));
                }
                if *width < 8 && *end > 0 && (end - 1) >> (8 * width) != 0 {
                    return Err(format!(
                        "range end {end} does not fit in {width} byte(s)"
                    ));
                }
                Ok(())
            }
            CandidateStrategy::Wordlist { .. } => Ok(()),
            CandidateStrategy::Sampled { width, .. } => check_width(*width),
        }
    }

    /// Number of candidates.
    pub fn len(&self) -> u64 {
        match self {
            CandidateStrategy::Range { start, end, .. } => end.saturating_sub(*start),
            CandidateStrategy::Wordlist { words } => words.len() as u64,
            CandidateStrategy::Sampled { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes candidate `index` into `buf`, replacing its contents.
    ///
    /// `index` must be below [`len`](Self::len).
    pub fn candidate_into(&self, index: u64, buf: &mut Vec<u8>) {
        buf.clear();
        match self {
            CandidateStrategy::Range { start, width, .. } => {
                encode_le(start.wrapping_add(index), *width, buf);
            }
            CandidateStrategy::Wordlist { words } => {
                if let Some(word) = usize::try_from(index).ok().and_then(|i| words.get(i)) {
                    buf.extend_from_slice(word);
                }
            }
            CandidateStrategy::Sampled { seed, width, .. } => {
                let mut rng = ChaCha8Rng::seed_from_u64(*seed);
                rng.set_word_pos(u128::from(index) * 2);
                encode_le(rng.next_u64(), *width, buf);
            }
        }
    }

    /// Candidate `index` as a fresh buffer.
    pub fn candidate(&self, index: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        self.candidate_into(index, &mut buf);
        buf
    }
}

fn check_width(width: usize) -> Result<(), String> {
    if (1..=MAX_WIDTH).contains(&width) {
        Ok(())
    } else {
        Err(format!("width {width} is outside 1..={MAX_WIDTH}"))
    }
}

fn encode_le(value: u64, width: usize, buf: &mut Vec<u8>) {
    let bytes = value.to_le_bytes();
    buf.extend_from_slice(&bytes[..width.min(bytes.len())]);
    buf.resize(width, 0);
}

/// Decodes a little-endian candidate back to an integer, if every byte
/// above the 8th is zero.
pub fn decode_le(bytes: &[u8]) -> Option<u64> {
    let (low, high) = bytes.split_at(bytes.len().min(8));
    if high.iter().any(|&b| b != 0) {
        return None;
    }
    let mut word = [0u8; 8];
    word[..low.len()].copy_from_slice(low);
    Some(u64::from_le_bytes(word))
}
