//! Core tokenization engine.
//!
//! The engine interoperates bit-exactly with the tiktoken vocabulary
//! family: given a text it produces the same token id stream as the
//! reference implementation, and decoding reproduces the original bytes.
//!
//! # Architecture
//!
//! - [`vocab`]: loading of `base64-token rank` vocabulary files into
//!   ranked byte maps
//! - [`bpe`]: the ranked pair-merge algorithm (lowest rank first,
//!   leftmost on ties)
//! - [`Tokenizer`]: pre-tokenization, special-token scanning with
//!   per-call allow-lists, encode/decode, and the budgeted
//!   `encode_trim_suffix`/`encode_trim_prefix` modes
//! - [`Encoding`]: the named encoder registry (gpt2, r50k_base,
//!   p50k_base, p50k_edit, cl100k_base) and the model-name table
//! - [`StreamingDecoder`]: UTF-8 safe token-by-token decoding

pub mod bpe;
mod encodings;
mod streaming;
mod tokenizer;
mod vocab;

pub use bpe::{byte_pair_encode, byte_pair_encode_spanned, byte_pair_merge};
pub use encodings::{
    from_encoding, from_encoding_name, from_encoding_with_extra, from_model, from_model_with_extra,
    Encoding, ENDOFPROMPT, ENDOFTEXT, FIM_MIDDLE, FIM_PREFIX, FIM_SUFFIX,
};
pub use streaming::StreamingDecoder;
pub use tokenizer::{
    Tokenizer, TokenizerError, TrimmedEncoding, CL100K_BASE_PATTERN, R50K_BASE_PATTERN,
};
pub use vocab::{build_decoder, load_tiktoken_bpe, load_tiktoken_bpe_file, VocabError};
