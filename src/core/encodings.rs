//! Named tiktoken encoders and model-name resolution.
//!
//! Each encoder name pins a pre-tokenization pattern and a default
//! special-token table:
//! - `gpt2`, `r50k_base` - the GPT-2/GPT-3 lineage
//! - `p50k_base` - code models and `text-davinci-002`/`-003`
//! - `p50k_edit` - the edit models
//! - `cl100k_base` - GPT-3.5-turbo and GPT-4
//!
//! Vocabulary bytes are supplied by the caller; fetching and caching the
//! published `.tiktoken` files is out of this crate's hands.
//!
//! # Example
//!
//! ```ignore
//! let vocab = std::fs::read("cl100k_base.tiktoken")?;
//! let tokenizer = byterank::from_model("gpt-4", &vocab)?;
//! let ids = tokenizer.encode("Hello World")?;
//! ```

use rustc_hash::FxHashMap;

use super::tokenizer::{Tokenizer, TokenizerError, CL100K_BASE_PATTERN, R50K_BASE_PATTERN};

pub const ENDOFTEXT: &str = "<|endoftext|>";
pub const FIM_PREFIX: &str = "<|fim_prefix|>";
pub const FIM_MIDDLE: &str = "<|fim_middle|>";
pub const FIM_SUFFIX: &str = "<|fim_suffix|>";
pub const ENDOFPROMPT: &str = "<|endofprompt|>";

/// The supported tiktoken encoders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// GPT-2 (identical vocabulary to r50k_base).
    Gpt2,
    /// Legacy GPT-3 models (davinci, curie, babbage, ada).
    R50kBase,
    /// Code models and text-davinci-002/003.
    P50kBase,
    /// Edit models (text-davinci-edit-001, code-davinci-edit-001).
    P50kEdit,
    /// GPT-3.5-turbo and GPT-4.
    Cl100kBase,
}

/// Models resolved by exact name.
const MODEL_TO_ENCODING: &[(&str, Encoding)] = &[
    ("gpt-4", Encoding::Cl100kBase),
    ("gpt-3.5-turbo", Encoding::Cl100kBase),
    ("text-davinci-003", Encoding::P50kBase),
    ("text-davinci-002", Encoding::P50kBase),
    ("code-davinci-002", Encoding::P50kBase),
    ("code-davinci-001", Encoding::P50kBase),
    ("code-cushman-002", Encoding::P50kBase),
    ("code-cushman-001", Encoding::P50kBase),
    ("davinci-codex", Encoding::P50kBase),
    ("cushman-codex", Encoding::P50kBase),
    ("text-davinci-edit-001", Encoding::P50kEdit),
    ("code-davinci-edit-001", Encoding::P50kEdit),
    ("davinci", Encoding::R50kBase),
    ("curie", Encoding::R50kBase),
    ("babbage", Encoding::R50kBase),
    ("ada", Encoding::R50kBase),
    ("text-davinci-001", Encoding::R50kBase),
    ("text-curie-001", Encoding::R50kBase),
    ("text-babbage-001", Encoding::R50kBase),
    ("text-ada-001", Encoding::R50kBase),
    ("gpt2", Encoding::Gpt2),
];

/// Model families resolved by name prefix (dated and sized variants).
const MODEL_PREFIX_TO_ENCODING: &[(&str, Encoding)] = &[
    ("gpt-4-", Encoding::Cl100kBase),
    ("gpt-3.5-turbo-", Encoding::Cl100kBase),
    ("text-similarity-", Encoding::R50kBase),
    ("text-search-", Encoding::R50kBase),
    ("code-search-", Encoding::R50kBase),
];

impl Encoding {
    /// Parse an encoder name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gpt2" => Some(Self::Gpt2),
            "r50k_base" => Some(Self::R50kBase),
            "p50k_base" => Some(Self::P50kBase),
            "p50k_edit" => Some(Self::P50kEdit),
            "cl100k_base" => Some(Self::Cl100kBase),
            _ => None,
        }
    }

    /// Resolve the encoder a model name uses, by exact name first and
    /// dated/sized family prefix second.
    pub fn for_model(model: &str) -> Option<Self> {
        MODEL_TO_ENCODING
            .iter()
            .find(|(name, _)| *name == model)
            .or_else(|| {
                MODEL_PREFIX_TO_ENCODING
                    .iter()
                    .find(|(prefix, _)| model.starts_with(prefix))
            })
            .map(|&(_, encoding)| encoding)
    }

    /// Get the canonical encoder name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Gpt2 => "gpt2",
            Self::R50kBase => "r50k_base",
            Self::P50kBase => "p50k_base",
            Self::P50kEdit => "p50k_edit",
            Self::Cl100kBase => "cl100k_base",
        }
    }

    /// Get all supported encoder names.
    pub fn supported_names() -> &'static [&'static str] {
        &["gpt2", "r50k_base", "p50k_base", "p50k_edit", "cl100k_base"]
    }

    /// Get the pre-tokenization pattern for this encoder.
    pub fn pattern(self) -> &'static str {
        match self {
            Self::Cl100kBase => CL100K_BASE_PATTERN,
            _ => R50K_BASE_PATTERN,
        }
    }

    /// Get the default special tokens for this encoder.
    pub fn special_tokens(self) -> FxHashMap<String, u32> {
        let mut special = FxHashMap::default();
        match self {
            Self::Cl100kBase => {
                special.insert(ENDOFTEXT.to_string(), 100257);
                special.insert(FIM_PREFIX.to_string(), 100258);
                special.insert(FIM_MIDDLE.to_string(), 100259);
                special.insert(FIM_SUFFIX.to_string(), 100260);
                special.insert(ENDOFPROMPT.to_string(), 100276);
            }
            _ => {
                special.insert(ENDOFTEXT.to_string(), 50256);
            }
        }
        special
    }
}

/// Create a tokenizer for a named encoder from raw vocabulary bytes.
pub fn from_encoding(encoding: Encoding, vocab_data: &[u8]) -> Result<Tokenizer, TokenizerError> {
    Tokenizer::from_bytes(vocab_data, encoding.pattern(), encoding.special_tokens())
}

/// Create a tokenizer for a named encoder, merging extra special tokens
/// over the encoder's defaults. On a literal collision the caller's rank
/// wins.
pub fn from_encoding_with_extra(
    encoding: Encoding,
    vocab_data: &[u8],
    extra_special_tokens: FxHashMap<String, u32>,
) -> Result<Tokenizer, TokenizerError> {
    let mut special = encoding.special_tokens();
    special.extend(extra_special_tokens);
    Tokenizer::from_bytes(vocab_data, encoding.pattern(), special)
}

/// Create a tokenizer by encoder name.
pub fn from_encoding_name(name: &str, vocab_data: &[u8]) -> Result<Tokenizer, TokenizerError> {
    let encoding = Encoding::from_name(name).ok_or_else(|| {
        TokenizerError::UnknownEncoding(format!(
            "{}. Supported: {}",
            name,
            Encoding::supported_names().join(", ")
        ))
    })?;
    from_encoding(encoding, vocab_data)
}

/// Create a tokenizer by model name.
pub fn from_model(model: &str, vocab_data: &[u8]) -> Result<Tokenizer, TokenizerError> {
    let encoding =
        Encoding::for_model(model).ok_or_else(|| TokenizerError::UnknownModel(model.to_string()))?;
    from_encoding(encoding, vocab_data)
}

/// Create a tokenizer by model name with extra special tokens merged over
/// the encoder's defaults.
pub fn from_model_with_extra(
    model: &str,
    vocab_data: &[u8],
    extra_special_tokens: FxHashMap<String, u32>,
) -> Result<Tokenizer, TokenizerError> {
    let encoding =
        Encoding::for_model(model).ok_or_else(|| TokenizerError::UnknownModel(model.to_string()))?;
    from_encoding_with_extra(encoding, vocab_data, extra_special_tokens)
}
