//! Integration tests for segmentation, special-token handling, and
//! encode/decode round trips.
//!
//! The vocabularies here are synthetic: every single byte maps to its own
//! value, plus a handful of multi-byte keys chosen to force specific
//! merges. That keeps expected id streams small and exact.

use byterank::{Tokenizer, R50K_BASE_PATTERN};
use rustc_hash::{FxHashMap, FxHashSet};

fn test_encoder() -> FxHashMap<Vec<u8>, u32> {
    let mut encoder = FxHashMap::default();
    for b in 0u8..=255 {
        encoder.insert(vec![b], b as u32);
    }
    encoder.insert(b"Hello".to_vec(), 500);
    encoder.insert(b" World".to_vec(), 501);
    encoder.insert(b"or".to_vec(), 502);
    encoder.insert(b"ld".to_vec(), 503);
    encoder.insert(b"<|".to_vec(), 504);
    encoder.insert(b"im".to_vec(), 505);
    encoder.insert(b"start".to_vec(), 506);
    encoder.insert(b"|>".to_vec(), 507);
    encoder.insert(b"end".to_vec(), 508);
    encoder.insert(b"  ".to_vec(), 509);
    encoder
}

fn chat_tokenizer() -> Tokenizer {
    let mut special_tokens = FxHashMap::default();
    special_tokens.insert("<|im_start|>".to_string(), 900);
    special_tokens.insert("<|im_end|>".to_string(), 901);

    Tokenizer::new(test_encoder(), special_tokens, R50K_BASE_PATTERN).unwrap()
}

#[test]
fn test_plain_text() {
    let tokenizer = chat_tokenizer();
    assert_eq!(tokenizer.encode("Hello World").unwrap(), vec![500, 501]);
}

#[test]
fn test_specials_wrap_text() {
    let tokenizer = chat_tokenizer();
    let tokens = tokenizer
        .encode_with_special("<|im_start|>Hello World<|im_end|>")
        .unwrap();
    assert_eq!(tokens, vec![900, 500, 501, 901]);
}

#[test]
fn test_specials_interleave_text() {
    let tokenizer = chat_tokenizer();
    let tokens = tokenizer
        .encode_with_special("<|im_start|>Hello<|im_end|> World")
        .unwrap();
    assert_eq!(tokens, vec![900, 500, 901, 501]);
}

#[test]
fn test_empty_input() {
    let tokenizer = chat_tokenizer();
    assert!(tokenizer.encode("").unwrap().is_empty());
    assert!(tokenizer.encode_with_special("").unwrap().is_empty());
}

#[test]
fn test_multibyte_ordinary_text() {
    let tokenizer = chat_tokenizer();
    let text = "<|im_start|>Hello ⭐ World<|im_end|>";
    let tokens = tokenizer.encode_with_special(text).unwrap();
    // " ⭐" has no merges, so the star is its three raw UTF-8 bytes.
    assert_eq!(
        tokens,
        vec![900, 500, 32, 226, 173, 144, 501, 901]
    );
    assert_eq!(tokenizer.decode(&tokens).unwrap(), text);
}

#[test]
fn test_round_trip() {
    let tokenizer = chat_tokenizer();
    let cases = [
        "Hello, world!",
        "The quick brown fox jumps over the lazy dog.",
        "1234567890",
        "Multi-line\ntext\nwith\nnewlines",
        "Unicode: こんにちは 世界 🦀",
        "trailing spaces   ",
    ];
    for text in cases {
        let tokens = tokenizer.encode(text).unwrap();
        assert_eq!(
            tokenizer.decode(&tokens).unwrap(),
            text,
            "round trip failed for {:?}",
            text
        );
    }
}

#[test]
fn test_disallowed_special_splits_as_ordinary_text() {
    let tokenizer = chat_tokenizer();
    let tokens = tokenizer.encode("<|im_start|>").unwrap();
    // "<|" , "im", "_", "start", "|>"
    assert_eq!(tokens, vec![504, 505, 95, 506, 507]);
    assert_eq!(tokenizer.decode(&tokens).unwrap(), "<|im_start|>");
}

#[test]
fn test_disabled_specials_match_a_tokenizer_without_them() {
    let bare = Tokenizer::new(test_encoder(), FxHashMap::default(), R50K_BASE_PATTERN).unwrap();
    let tokenizer = chat_tokenizer();

    let text = "a<|im_start|>b<|im_end|>c";
    let expected = bare.encode(text).unwrap();

    assert_eq!(tokenizer.encode(text).unwrap(), expected);
    assert_eq!(
        tokenizer.encode_allowed(text, &FxHashSet::default()).unwrap(),
        expected
    );
}

#[test]
fn test_allow_list_subset() {
    let tokenizer = chat_tokenizer();
    let allowed: FxHashSet<&str> = ["<|im_start|>"].into_iter().collect();

    let tokens = tokenizer
        .encode_allowed("<|im_start|>Hello<|im_end|>", &allowed)
        .unwrap();
    // im_start is recognized, im_end is ordinary text.
    assert_eq!(
        tokens,
        vec![900, 500, 504, 505, 95, 508, 507]
    );
}

#[test]
fn test_longest_literal_wins_at_equal_start() {
    let mut special_tokens = FxHashMap::default();
    special_tokens.insert("<|end|>".to_string(), 902);
    special_tokens.insert("<|end|>!".to_string(), 903);
    let tokenizer = Tokenizer::new(test_encoder(), special_tokens, R50K_BASE_PATTERN).unwrap();

    let tokens = tokenizer.encode_with_special("x<|end|>!y").unwrap();
    assert_eq!(tokens, vec![120, 903, 121]);
}

#[test]
fn test_allow_list_does_not_let_longer_literal_shadow() {
    let mut special_tokens = FxHashMap::default();
    special_tokens.insert("<|end|>".to_string(), 902);
    special_tokens.insert("<|end|>!".to_string(), 903);
    let tokenizer = Tokenizer::new(test_encoder(), special_tokens, R50K_BASE_PATTERN).unwrap();

    let allowed: FxHashSet<&str> = ["<|end|>"].into_iter().collect();
    let tokens = tokenizer.encode_allowed("x<|end|>!y", &allowed).unwrap();
    // The disallowed longer literal must not eat the match; the shorter
    // allowed one fires and "!" stays ordinary.
    assert_eq!(tokens, vec![120, 902, 33, 121]);
}

#[test]
fn test_adjacent_specials() {
    let tokenizer = chat_tokenizer();
    let tokens = tokenizer
        .encode_with_special("<|im_start|><|im_end|>")
        .unwrap();
    assert_eq!(tokens, vec![900, 901]);
}

#[test]
fn test_whitespace_run_splits_before_last_word() {
    let tokenizer = chat_tokenizer();
    // "a  b": the whitespace run yields one space on its own, and the
    // second space attaches to "b". A greedy two-space chunk would have
    // merged into token 509 instead.
    let tokens = tokenizer.encode("a  b").unwrap();
    assert_eq!(tokens, vec![97, 32, 32, 98]);
}

#[test]
fn test_trailing_whitespace_merges() {
    let tokenizer = chat_tokenizer();
    // With nothing after the run, both spaces form one chunk and merge.
    let tokens = tokenizer.encode("a  ").unwrap();
    assert_eq!(tokens, vec![97, 509]);
}

#[test]
fn test_decode_special_ids() {
    let tokenizer = chat_tokenizer();
    assert_eq!(tokenizer.decode(&[900]).unwrap(), "<|im_start|>");
    assert_eq!(tokenizer.decode(&[901]).unwrap(), "<|im_end|>");
}
