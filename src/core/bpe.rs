//! Ranked byte-pair merging.
//!
//! [`byte_pair_merge`] carves a byte run into the token spans the
//! vocabulary's merge ranks dictate. Candidate merges are scored by the
//! rank of the combined byte window; the lowest rank merges first, and on
//! equal ranks the leftmost pair wins. The scan uses strict `<`, which is
//! what makes the tie-break leftmost.

use std::ops::Range;

use rustc_hash::FxHashMap;

use super::vocab::VocabError;

/// Split a byte run into the spans that survive BPE merging.
///
/// Each returned range indexes into `piece` and names one output token.
/// The spans are contiguous and cover `piece` exactly.
pub fn byte_pair_merge(piece: &[u8], ranks: &FxHashMap<Vec<u8>, u32>) -> Vec<Range<usize>> {
    if piece.is_empty() {
        return Vec::new();
    }
    if piece.len() == 1 {
        return vec![0..1];
    }

    // parts[i] is (start offset, rank of merging parts[i] with parts[i+1]).
    // The last two entries are sentinels that never merge.
    let mut parts = Vec::with_capacity(piece.len() + 1);
    let mut min_rank: (u32, usize) = (u32::MAX, usize::MAX);
    for i in 0..piece.len() - 1 {
        let rank = ranks.get(&piece[i..i + 2]).copied().unwrap_or(u32::MAX);
        if rank < min_rank.0 {
            min_rank = (rank, i);
        }
        parts.push((i, rank));
    }
    parts.push((piece.len() - 1, u32::MAX));
    parts.push((piece.len(), u32::MAX));

    // Rank of merging parts[i] with its right neighbor, indexed before the
    // pending removal of parts[i + 1].
    let get_rank = |parts: &[(usize, u32)], i: usize| -> u32 {
        if i + 3 < parts.len() {
            ranks
                .get(&piece[parts[i].0..parts[i + 3].0])
                .copied()
                .unwrap_or(u32::MAX)
        } else {
            u32::MAX
        }
    };

    while min_rank.0 != u32::MAX {
        let i = min_rank.1;
        if i > 0 {
            parts[i - 1].1 = get_rank(&parts, i - 1);
        }
        parts[i].1 = get_rank(&parts, i);
        parts.remove(i + 1);

        min_rank = (u32::MAX, usize::MAX);
        for (j, &(_, rank)) in parts[..parts.len() - 1].iter().enumerate() {
            if rank < min_rank.0 {
                min_rank = (rank, j);
            }
        }
    }

    parts.windows(2).map(|w| w[0].0..w[1].0).collect()
}

/// Encode a byte run into token ids.
///
/// Runs that are a vocabulary key in their entirety short-circuit to a
/// single id. A rank lookup that misses after merging means the
/// vocabulary is missing a single-byte entry and surfaces as
/// [`VocabError::Incomplete`].
pub fn byte_pair_encode(
    piece: &[u8],
    ranks: &FxHashMap<Vec<u8>, u32>,
) -> Result<Vec<u32>, VocabError> {
    if piece.is_empty() {
        return Ok(Vec::new());
    }
    if let Some(&rank) = ranks.get(piece) {
        return Ok(vec![rank]);
    }
    byte_pair_merge(piece, ranks)
        .into_iter()
        .map(|span| lookup(ranks, &piece[span]))
        .collect()
}

/// Encode a byte run into token ids plus the source span of each id.
///
/// Spans are byte ranges into `piece`, one per emitted id, in emission
/// order. Budgeted encoding uses them to map a token cut back to a byte
/// offset in the input.
pub fn byte_pair_encode_spanned(
    piece: &[u8],
    ranks: &FxHashMap<Vec<u8>, u32>,
) -> Result<(Vec<u32>, Vec<Range<usize>>), VocabError> {
    if piece.is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }
    if let Some(&rank) = ranks.get(piece) {
        return Ok((vec![rank], vec![0..piece.len()]));
    }
    let spans = byte_pair_merge(piece, ranks);
    let mut ids = Vec::with_capacity(spans.len());
    for span in &spans {
        ids.push(lookup(ranks, &piece[span.clone()])?);
    }
    Ok((ids, spans))
}

fn lookup(ranks: &FxHashMap<Vec<u8>, u32>, bytes: &[u8]) -> Result<u32, VocabError> {
    ranks
        .get(bytes)
        .copied()
        .ok_or_else(|| VocabError::Incomplete(bytes.to_vec()))
}
