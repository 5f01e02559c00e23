//! Vocabulary loading for the tiktoken BPE format.
//!
//! Vocabulary files are newline-delimited text where each line carries a
//! base64-encoded token followed by a single ASCII space and an integer
//! rank:
//!
//! ```text
//! PHw= 0
//! aW0= 1
//! fD4= 2
//! ```
//!
//! Here `PHw=` decodes to `<|` (rank 0, highest merge priority), `aW0=`
//! to `im` (rank 1), and `fD4=` to `|>` (rank 2).
//!
//! Lower ranks are merged first during BPE encoding, and the rank doubles
//! as the token id. The ranks and the byte sequences must each be unique;
//! a file that maps two lines to the same rank or the same bytes is
//! corrupt and rejected at load time.

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

/// Errors that can occur when loading vocabulary files.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("invalid base64 token: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid vocabulary line: {0}")]
    Parse(String),
    #[error("duplicate token bytes mapped to rank {0}")]
    DuplicateToken(u32),
    #[error("duplicate rank {0}")]
    DuplicateRank(u32),
    #[error("vocabulary has no rank for bytes {0:?}")]
    Incomplete(Vec<u8>),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a tiktoken BPE vocabulary from raw bytes.
///
/// Format: `base64_token rank\n` per line. Blank lines (including the
/// empty tail after a trailing newline) are skipped. Duplicate byte
/// sequences and duplicate ranks are load errors.
pub fn load_tiktoken_bpe(data: &[u8]) -> Result<FxHashMap<Vec<u8>, u32>, VocabError> {
    let mut encoder = FxHashMap::default();
    let mut seen_ranks = FxHashSet::default();

    for line in data.split(|&b| b == b'\n') {
        if line.is_empty() {
            continue;
        }

        let space_pos = line
            .iter()
            .rposition(|&b| b == b' ')
            .ok_or_else(|| VocabError::Parse("missing space separator".to_string()))?;

        let token = STANDARD.decode(&line[..space_pos])?;

        let rank_str = std::str::from_utf8(&line[space_pos + 1..])
            .map_err(|_| VocabError::Parse("rank is not valid UTF-8".to_string()))?;
        let rank: u32 = rank_str
            .trim()
            .parse()
            .map_err(|_| VocabError::Parse(format!("invalid rank: {rank_str}")))?;

        if !seen_ranks.insert(rank) {
            return Err(VocabError::DuplicateRank(rank));
        }
        if encoder.insert(token, rank).is_some() {
            return Err(VocabError::DuplicateToken(rank));
        }
    }

    Ok(encoder)
}

/// Load a tiktoken BPE vocabulary from a file path.
pub fn load_tiktoken_bpe_file(path: &str) -> Result<FxHashMap<Vec<u8>, u32>, VocabError> {
    let data = std::fs::read(path)?;
    load_tiktoken_bpe(&data)
}

/// Build a decoder map (token id → bytes) from an encoder map (bytes → token id).
///
/// The loader guarantees the encoder is a bijection, so the inverse loses
/// nothing.
pub fn build_decoder(encoder: &FxHashMap<Vec<u8>, u32>) -> FxHashMap<u32, Vec<u8>> {
    encoder.iter().map(|(k, v)| (*v, k.clone())).collect()
}
