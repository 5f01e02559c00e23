//! Tokenizer façade: pre-tokenization, special-token scanning, BPE, and
//! budgeted encoding.
//!
//! Encoding runs in three stages. The input is first scanned for allowed
//! special-token literals, then the ordinary stretches between them are
//! carved into chunks by the encoder's pre-tokenization regex, and each
//! chunk is merged into token ids by ranked BPE. Decoding concatenates the
//! byte sequence of every id and interprets the result as UTF-8.
//!
//! The budgeted modes ([`Tokenizer::encode_trim_suffix`] and
//! [`Tokenizer::encode_trim_prefix`]) additionally track the source byte
//! range of every emitted id, so a token budget maps back to a byte offset
//! and the returned text is exactly the substring whose encoding equals
//! the returned ids.
//!
//! A constructed tokenizer is immutable. Every method takes `&self` with
//! no interior mutability, so one instance may serve concurrent callers
//! without locks.

use std::borrow::Cow;
use std::ops::Range;

use aho_corasick::{AhoCorasick, MatchKind};
use fancy_regex::Regex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;

use super::bpe::{byte_pair_encode, byte_pair_encode_spanned};
use super::vocab::{build_decoder, load_tiktoken_bpe, load_tiktoken_bpe_file, VocabError};

/// Pre-tokenization pattern shared by the gpt2, r50k_base, p50k_base and
/// p50k_edit encoders.
pub const R50K_BASE_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// Pre-tokenization pattern for cl100k_base (GPT-4, GPT-3.5-turbo).
pub const CL100K_BASE_PATTERN: &str = r"(?i:'s|'t|'re|'ve|'m|'ll|'d)|[^\r\n\p{L}\p{N}]?\p{L}+|\p{N}{1,3}| ?[^\s\p{L}\p{N}]+[\r\n]*|\s*[\r\n]+|\s+(?!\S)|\s+";

/// Errors surfaced by tokenizer construction, encoding, and decoding.
#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("regex error: {0}")]
    Regex(#[from] fancy_regex::Error),
    #[error("vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("decoding produced invalid UTF-8")]
    Utf8,
    #[error("special token matcher build error: {0}")]
    SpecialMatcher(#[from] aho_corasick::BuildError),
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
}

/// The outcome of a budgeted encode.
///
/// `text` borrows from the input passed to the trim call and is the exact
/// byte run whose encoding equals `token_ids`. For suffix trimming it is
/// a byte-prefix of the input; for prefix trimming, a byte-suffix. It is
/// bytes rather than `&str` because a token boundary can fall inside a
/// multi-byte character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrimmedEncoding<'a> {
    pub token_ids: Vec<u32>,
    pub text: &'a [u8],
}

impl<'a> TrimmedEncoding<'a> {
    /// The kept source as a string, when the cut landed on a character
    /// boundary.
    pub fn text_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.text).ok()
    }

    /// The kept source as a string, with the replacement character
    /// standing in for a cut inside a multi-byte character.
    pub fn text_lossy(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.text)
    }
}

/// Which special-token literals the segmenter may recognize in a call.
enum SpecialsFilter<'a> {
    /// Every literal is ordinary text.
    None,
    /// The tokenizer's whole special table is live.
    All,
    /// Only the listed literals are live; the rest are ordinary text.
    Subset(&'a FxHashSet<&'a str>),
}

/// BPE tokenizer over a tiktoken-style ranked vocabulary.
///
/// Combines the ranked byte maps, the pre-tokenization regex, and a
/// leftmost-longest literal matcher for special tokens. Special tokens
/// are matched by literal scanning only; the regex never sees an allowed
/// special, and a special that a call does not allow is split like any
/// other text.
#[derive(Clone)]
pub struct Tokenizer {
    encoder: FxHashMap<Vec<u8>, u32>,
    decoder: FxHashMap<u32, Vec<u8>>,
    special_tokens: FxHashMap<String, u32>,
    special_tokens_decoder: FxHashMap<u32, String>,
    regex: Regex,
    special_matcher: Option<AhoCorasick>,
}

/// Build a literal matcher with leftmost-longest semantics, so overlapping
/// literals starting at the same position resolve to the longest.
fn special_matcher<I, P>(literals: I) -> Result<AhoCorasick, aho_corasick::BuildError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(literals)
}

impl Tokenizer {
    /// Create a new tokenizer from an encoder map, special tokens, and a
    /// pre-tokenization pattern.
    ///
    /// # Arguments
    /// * `encoder` - Map of byte sequences to token ids
    /// * `special_tokens` - Map of special token literals to token ids
    /// * `pattern` - Pre-tokenization regex
    pub fn new(
        encoder: FxHashMap<Vec<u8>, u32>,
        special_tokens: FxHashMap<String, u32>,
        pattern: &str,
    ) -> Result<Self, TokenizerError> {
        let decoder = build_decoder(&encoder);
        let special_tokens_decoder: FxHashMap<u32, String> = special_tokens
            .iter()
            .map(|(k, v)| (*v, k.clone()))
            .collect();

        let regex = Regex::new(pattern)?;

        let matcher = if special_tokens.is_empty() {
            None
        } else {
            Some(special_matcher(special_tokens.keys())?)
        };

        Ok(Self {
            encoder,
            decoder,
            special_tokens,
            special_tokens_decoder,
            regex,
            special_matcher: matcher,
        })
    }

    /// Create a tokenizer from raw tiktoken vocabulary bytes.
    pub fn from_bytes(
        vocab_data: &[u8],
        pattern: &str,
        special_tokens: FxHashMap<String, u32>,
    ) -> Result<Self, TokenizerError> {
        let encoder = load_tiktoken_bpe(vocab_data)?;
        Self::new(encoder, special_tokens, pattern)
    }

    /// Create a tokenizer from a tiktoken vocabulary file.
    pub fn from_file(
        vocab_path: &str,
        pattern: &str,
        special_tokens: FxHashMap<String, u32>,
    ) -> Result<Self, TokenizerError> {
        let encoder = load_tiktoken_bpe_file(vocab_path)?;
        Self::new(encoder, special_tokens, pattern)
    }

    /// Encode text to token ids, treating special-token literals in the
    /// input as ordinary text.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        self.encode_filtered(text, SpecialsFilter::None)
    }

    /// Encode text to token ids with the whole special-token table live.
    ///
    /// Special literals in the input map to their reserved ids instead of
    /// passing through BPE.
    pub fn encode_with_special(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        self.encode_filtered(text, SpecialsFilter::All)
    }

    /// Encode text to token ids, recognizing only the allowed special
    /// literals.
    ///
    /// Literals in the special table but not in `allowed` are split by the
    /// pre-tokenization regex like any other text.
    pub fn encode_allowed(
        &self,
        text: &str,
        allowed: &FxHashSet<&str>,
    ) -> Result<Vec<u32>, TokenizerError> {
        self.encode_filtered(text, SpecialsFilter::Subset(allowed))
    }

    /// Encode with a token budget, discarding ids from the tail.
    ///
    /// At most `max_tokens` ids are returned, along with the input prefix
    /// whose encoding equals them. Special literals are ordinary text.
    pub fn encode_trim_suffix<'t>(
        &self,
        text: &'t str,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        self.trim_suffix_filtered(text, SpecialsFilter::None, max_tokens)
    }

    /// Encode with a token budget, discarding ids from the tail, with the
    /// whole special-token table live.
    pub fn encode_trim_suffix_with_special<'t>(
        &self,
        text: &'t str,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        self.trim_suffix_filtered(text, SpecialsFilter::All, max_tokens)
    }

    /// Encode with a token budget, discarding ids from the tail,
    /// recognizing only the allowed special literals.
    pub fn encode_trim_suffix_allowed<'t>(
        &self,
        text: &'t str,
        allowed: &FxHashSet<&str>,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        self.trim_suffix_filtered(text, SpecialsFilter::Subset(allowed), max_tokens)
    }

    /// Encode with a token budget, discarding ids from the head.
    ///
    /// At most `max_tokens` ids are returned, along with the input suffix
    /// whose encoding equals them. Special literals are ordinary text.
    pub fn encode_trim_prefix<'t>(
        &self,
        text: &'t str,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        self.trim_prefix_filtered(text, SpecialsFilter::None, max_tokens)
    }

    /// Encode with a token budget, discarding ids from the head, with the
    /// whole special-token table live.
    pub fn encode_trim_prefix_with_special<'t>(
        &self,
        text: &'t str,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        self.trim_prefix_filtered(text, SpecialsFilter::All, max_tokens)
    }

    /// Encode with a token budget, discarding ids from the head,
    /// recognizing only the allowed special literals.
    pub fn encode_trim_prefix_allowed<'t>(
        &self,
        text: &'t str,
        allowed: &FxHashSet<&str>,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        self.trim_prefix_filtered(text, SpecialsFilter::Subset(allowed), max_tokens)
    }

    fn encode_filtered(
        &self,
        text: &str,
        filter: SpecialsFilter<'_>,
    ) -> Result<Vec<u32>, TokenizerError> {
        let mut ids = Vec::new();
        self.encode_into(text, filter, &mut ids, None)?;
        Ok(ids)
    }

    fn trim_suffix_filtered<'t>(
        &self,
        text: &'t str,
        filter: SpecialsFilter<'_>,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        let mut ids = Vec::new();
        let mut spans = Vec::new();
        self.encode_into(text, filter, &mut ids, Some(&mut spans))?;

        if ids.len() <= max_tokens {
            return Ok(TrimmedEncoding {
                token_ids: ids,
                text: text.as_bytes(),
            });
        }

        // Cut where the first discarded id's source bytes begin.
        let cut = spans[max_tokens].start;
        ids.truncate(max_tokens);
        Ok(TrimmedEncoding {
            token_ids: ids,
            text: &text.as_bytes()[..cut],
        })
    }

    fn trim_prefix_filtered<'t>(
        &self,
        text: &'t str,
        filter: SpecialsFilter<'_>,
        max_tokens: usize,
    ) -> Result<TrimmedEncoding<'t>, TokenizerError> {
        let mut ids = Vec::new();
        let mut spans = Vec::new();
        self.encode_into(text, filter, &mut ids, Some(&mut spans))?;

        if ids.len() <= max_tokens {
            return Ok(TrimmedEncoding {
                token_ids: ids,
                text: text.as_bytes(),
            });
        }

        // Keep the tail; the text starts where the first kept id begins.
        let drop = ids.len() - max_tokens;
        let start = spans.get(drop).map_or(text.len(), |s| s.start);
        Ok(TrimmedEncoding {
            token_ids: ids.split_off(drop),
            text: &text.as_bytes()[start..],
        })
    }

    /// Segment `text` per the filter and append ids (and source spans,
    /// when requested) for every segment.
    fn encode_into(
        &self,
        text: &str,
        filter: SpecialsFilter<'_>,
        ids: &mut Vec<u32>,
        mut spans: Option<&mut Vec<Range<usize>>>,
    ) -> Result<(), TokenizerError> {
        let subset_matcher;
        let matcher = match filter {
            SpecialsFilter::None => None,
            SpecialsFilter::All => self.special_matcher.as_ref(),
            SpecialsFilter::Subset(allowed) => {
                let literals: Vec<&str> = self
                    .special_tokens
                    .keys()
                    .map(String::as_str)
                    .filter(|s| allowed.contains(s))
                    .collect();
                if literals.is_empty() {
                    None
                } else {
                    // The allow-list changes which literal is leftmost or
                    // longest, so the matcher is rebuilt over exactly the
                    // allowed set.
                    subset_matcher = special_matcher(&literals)?;
                    Some(&subset_matcher)
                }
            }
        };

        let mut cursor = 0;
        if let Some(matcher) = matcher {
            for m in matcher.find_iter(text.as_bytes()) {
                if m.start() > cursor {
                    self.encode_ordinary_into(
                        &text[cursor..m.start()],
                        cursor,
                        ids,
                        spans.as_deref_mut(),
                    )?;
                }
                let literal = &text[m.start()..m.end()];
                if let Some(&rank) = self.special_tokens.get(literal) {
                    ids.push(rank);
                    if let Some(spans) = spans.as_deref_mut() {
                        spans.push(m.start()..m.end());
                    }
                }
                cursor = m.end();
            }
        }
        if cursor < text.len() {
            self.encode_ordinary_into(&text[cursor..], cursor, ids, spans)?;
        }
        Ok(())
    }

    /// Regex-chunk an ordinary stretch and BPE-encode each chunk.
    ///
    /// `base` is the stretch's byte offset in the full input, applied to
    /// every recorded span.
    fn encode_ordinary_into(
        &self,
        text: &str,
        base: usize,
        ids: &mut Vec<u32>,
        mut spans: Option<&mut Vec<Range<usize>>>,
    ) -> Result<(), TokenizerError> {
        let bytes = text.as_bytes();
        for m in self.regex.find_iter(text) {
            let m = m?;
            let piece = &bytes[m.start()..m.end()];
            match spans.as_deref_mut() {
                Some(spans) => {
                    let (piece_ids, piece_spans) = byte_pair_encode_spanned(piece, &self.encoder)?;
                    let offset = base + m.start();
                    spans.extend(
                        piece_spans
                            .into_iter()
                            .map(|s| offset + s.start..offset + s.end),
                    );
                    ids.extend(piece_ids);
                }
                None => ids.extend(byte_pair_encode(piece, &self.encoder)?),
            }
        }
        Ok(())
    }

    /// Decode token ids back to bytes.
    ///
    /// This is lossless concatenation; ids absent from both maps are
    /// skipped.
    pub fn decode_bytes(&self, tokens: &[u32]) -> Vec<u8> {
        let mut result = Vec::with_capacity(tokens.len() * 4);

        for &token in tokens {
            if let Some(bytes) = self.decoder.get(&token) {
                result.extend_from_slice(bytes);
            } else if let Some(special) = self.special_tokens_decoder.get(&token) {
                result.extend_from_slice(special.as_bytes());
            }
        }

        result
    }

    /// Decode token ids to a string, failing on invalid UTF-8.
    pub fn decode(&self, tokens: &[u32]) -> Result<String, TokenizerError> {
        let bytes = self.decode_bytes(tokens);
        String::from_utf8(bytes).map_err(|_| TokenizerError::Utf8)
    }

    /// Decode token ids to a string, replacing invalid UTF-8 with the
    /// replacement character.
    pub fn decode_lossy(&self, tokens: &[u32]) -> String {
        String::from_utf8_lossy(&self.decode_bytes(tokens)).into_owned()
    }

    /// Batch encode multiple texts in parallel.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<u32>>, TokenizerError> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Batch encode multiple texts in parallel with the whole special
    /// table live.
    pub fn encode_batch_with_special(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<u32>>, TokenizerError> {
        texts
            .par_iter()
            .map(|text| self.encode_with_special(text))
            .collect()
    }

    /// Batch decode multiple token lists in parallel.
    pub fn decode_batch(&self, token_lists: &[Vec<u32>]) -> Result<Vec<String>, TokenizerError> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode(tokens))
            .collect()
    }

    /// Batch decode multiple token lists in parallel, replacing invalid
    /// UTF-8.
    pub fn decode_batch_lossy(&self, token_lists: &[Vec<u32>]) -> Vec<String> {
        token_lists
            .par_iter()
            .map(|tokens| self.decode_lossy(tokens))
            .collect()
    }

    /// Get the vocabulary size.
    ///
    /// Returns max token id + 1 across the ordinary and special maps,
    /// covering the full id range.
    pub fn vocab_size(&self) -> usize {
        let max_decoder_id = self.decoder.keys().max().copied().unwrap_or(0);
        let max_special_id = self.special_tokens.values().max().copied().unwrap_or(0);
        (max_decoder_id.max(max_special_id) + 1) as usize
    }

    /// Get the encoder map (token bytes -> id).
    pub fn encoder(&self) -> &FxHashMap<Vec<u8>, u32> {
        &self.encoder
    }

    /// Get the decoder map (token id -> bytes).
    pub fn decoder(&self) -> &FxHashMap<u32, Vec<u8>> {
        &self.decoder
    }

    /// Get the special tokens map.
    pub fn special_tokens(&self) -> &FxHashMap<String, u32> {
        &self.special_tokens
    }

    /// Get the special tokens decoder map.
    pub fn special_tokens_decoder(&self) -> &FxHashMap<u32, String> {
        &self.special_tokens_decoder
    }
}
