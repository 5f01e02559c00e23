//! Integration tests for the encoder registry, the model-name table, and
//! vocabulary loading through the builders.

use base64::{engine::general_purpose::STANDARD, Engine};
use byterank::{
    from_encoding, from_encoding_name, from_encoding_with_extra, from_model, from_model_with_extra,
    Encoding, TokenizerError, VocabError, ENDOFTEXT,
};
use rustc_hash::FxHashMap;

fn vocab_line(out: &mut String, token: &[u8], rank: u32) {
    out.push_str(&STANDARD.encode(token));
    out.push(' ');
    out.push_str(&rank.to_string());
    out.push('\n');
}

/// A tiktoken-format vocabulary: all single bytes plus digit merges that
/// tell the two pre-tokenization patterns apart.
fn vocab_data() -> Vec<u8> {
    let mut data = String::new();
    for b in 0u8..=255 {
        vocab_line(&mut data, &[b], b as u32);
    }
    vocab_line(&mut data, b"123456", 300);
    vocab_line(&mut data, b"123", 301);
    vocab_line(&mut data, b"456", 302);
    data.into_bytes()
}

#[test]
fn test_from_encoding_name() {
    let tokenizer = from_encoding_name("gpt2", &vocab_data()).unwrap();
    assert_eq!(tokenizer.encode("ab").unwrap(), vec![97, 98]);
}

#[test]
fn test_unknown_encoding_name() {
    let result = from_encoding_name("o200k_base", &vocab_data());
    assert!(matches!(result, Err(TokenizerError::UnknownEncoding(_))));
}

#[test]
fn test_unknown_model_name() {
    let result = from_model("claude-3-opus", &vocab_data());
    assert!(matches!(result, Err(TokenizerError::UnknownModel(_))));
}

#[test]
fn test_model_names_resolve_through_builder() {
    for model in ["gpt-4", "gpt-4-32k", "gpt-3.5-turbo-0301", "davinci", "gpt2"] {
        assert!(from_model(model, &vocab_data()).is_ok(), "model {model}");
    }
}

#[test]
fn test_digit_grouping_differs_between_patterns() {
    let data = vocab_data();

    // cl100k chunks digits in threes, so the six-digit merge never forms.
    let cl100k = from_encoding(Encoding::Cl100kBase, &data).unwrap();
    assert_eq!(cl100k.encode("123456").unwrap(), vec![301, 302]);

    // The 50k-family pattern takes the whole digit run as one chunk.
    let gpt2 = from_encoding(Encoding::Gpt2, &data).unwrap();
    assert_eq!(gpt2.encode("123456").unwrap(), vec![300]);
}

#[test]
fn test_default_specials_are_live() {
    let tokenizer = from_encoding(Encoding::P50kBase, &vocab_data()).unwrap();
    assert_eq!(
        tokenizer.encode_with_special("<|endoftext|>").unwrap(),
        vec![50256]
    );

    let tokenizer = from_encoding(Encoding::Cl100kBase, &vocab_data()).unwrap();
    assert_eq!(
        tokenizer.encode_with_special("<|endoftext|>").unwrap(),
        vec![100257]
    );
    assert_eq!(
        tokenizer.encode_with_special("<|fim_prefix|>").unwrap(),
        vec![100258]
    );
}

#[test]
fn test_extra_specials_merge_over_defaults() {
    let mut extra = FxHashMap::default();
    extra.insert("<|im_start|>".to_string(), 100264);
    extra.insert("<|im_end|>".to_string(), 100265);

    let tokenizer = from_model_with_extra("gpt-4", &vocab_data(), extra).unwrap();
    assert_eq!(
        tokenizer.encode_with_special("<|im_start|>").unwrap(),
        vec![100264]
    );
    // Defaults survive the merge.
    assert_eq!(
        tokenizer.encode_with_special("<|endoftext|>").unwrap(),
        vec![100257]
    );
}

#[test]
fn test_extra_specials_override_on_collision() {
    let mut extra = FxHashMap::default();
    extra.insert(ENDOFTEXT.to_string(), 999_999);

    let tokenizer = from_encoding_with_extra(Encoding::Gpt2, &vocab_data(), extra).unwrap();
    assert_eq!(tokenizer.special_tokens().get(ENDOFTEXT), Some(&999_999));
    assert_eq!(
        tokenizer.encode_with_special("<|endoftext|>").unwrap(),
        vec![999_999]
    );
}

#[test]
fn test_corrupt_vocab_duplicate_rank() {
    let mut data = String::new();
    vocab_line(&mut data, b"a", 0);
    vocab_line(&mut data, b"b", 0);
    let result = from_encoding(Encoding::Gpt2, data.as_bytes());
    assert!(matches!(
        result,
        Err(TokenizerError::Vocab(VocabError::DuplicateRank(0)))
    ));
}

#[test]
fn test_corrupt_vocab_duplicate_token() {
    let mut data = String::new();
    vocab_line(&mut data, b"a", 0);
    vocab_line(&mut data, b"a", 1);
    let result = from_encoding(Encoding::Gpt2, data.as_bytes());
    assert!(matches!(
        result,
        Err(TokenizerError::Vocab(VocabError::DuplicateToken(1)))
    ));
}

#[test]
fn test_corrupt_vocab_bad_base64() {
    let result = from_encoding(Encoding::Gpt2, b"@@invalid@@ 0\n");
    assert!(matches!(
        result,
        Err(TokenizerError::Vocab(VocabError::Base64(_)))
    ));
}

#[test]
fn test_round_trip_through_builder() {
    let tokenizer = from_model("gpt-4", &vocab_data()).unwrap();
    let text = "It's 123456 degrees outside!\n";
    let tokens = tokenizer.encode(text).unwrap();
    assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
}
