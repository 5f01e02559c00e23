//! byterank - tiktoken-compatible BPE tokenizer with budgeted encoding.
//!
//! A byte-pair encoding tokenizer for the vocabulary files used by the
//! GPT-2, GPT-3, and GPT-4 model lineages:
//!
//! - Pre-tokenization with the published per-encoder patterns, matched
//!   with alternation-order semantics
//! - Special tokens matched by literal scanning with per-call
//!   allow-lists
//! - Ranked BPE merging (lowest rank wins, leftmost on ties)
//! - Budgeted encoding (`encode_trim_suffix`, `encode_trim_prefix`) that
//!   caps the emitted token count and returns the exact input substring
//!   the kept ids decode to
//! - Rayon parallelism for batch encoding and decoding
//!
//! A [`Tokenizer`] is immutable once built and safe to share across
//! threads.

pub mod core;

pub use core::{
    build_decoder, byte_pair_encode, byte_pair_encode_spanned, byte_pair_merge, from_encoding,
    from_encoding_name, from_encoding_with_extra, from_model, from_model_with_extra, Encoding,
    StreamingDecoder, Tokenizer, TokenizerError, TrimmedEncoding, VocabError, CL100K_BASE_PATTERN,
    ENDOFPROMPT, ENDOFTEXT, FIM_MIDDLE, FIM_PREFIX, FIM_SUFFIX, R50K_BASE_PATTERN,
};
pub use core::{load_tiktoken_bpe, load_tiktoken_bpe_file};
