//! Incremental decoding for token-at-a-time output.
//!
//! Token boundaries do not line up with character boundaries, so decoding
//! a stream id by id can momentarily leave a dangling multi-byte sequence.
//! [`StreamingDecoder`] accumulates decoded bytes and hands out text only
//! up to the last point that parses as UTF-8.
//!
//! # Example
//!
//! ```ignore
//! let mut decoder = StreamingDecoder::new(&tokenizer);
//! for token_id in token_stream {
//!     if let Some(text) = decoder.add_token(token_id) {
//!         print!("{}", text);
//!     }
//! }
//! print!("{}", decoder.flush());
//! ```

use super::tokenizer::Tokenizer;

/// Stateful decoder that withholds a dangling multi-byte sequence until
/// its remaining bytes arrive.
pub struct StreamingDecoder<'a> {
    tokenizer: &'a Tokenizer,
    buffer: Vec<u8>,
}

impl<'a> StreamingDecoder<'a> {
    /// Create a new streaming decoder for the given tokenizer.
    pub fn new(tokenizer: &'a Tokenizer) -> Self {
        Self {
            tokenizer,
            buffer: Vec::with_capacity(16),
        }
    }

    /// Add a token and return any complete UTF-8 characters.
    ///
    /// Returns `None` while the buffered bytes are still incomplete.
    /// Ids absent from both maps are ignored.
    pub fn add_token(&mut self, token_id: u32) -> Option<String> {
        self.buffer_token(token_id);
        self.extract_complete_utf8()
    }

    /// Add multiple tokens at once and return complete UTF-8 characters.
    pub fn add_tokens(&mut self, token_ids: &[u32]) -> Option<String> {
        for &token_id in token_ids {
            self.buffer_token(token_id);
        }
        self.extract_complete_utf8()
    }

    /// Flush any remaining buffered bytes.
    ///
    /// Incomplete trailing sequences are replaced with the Unicode
    /// replacement character.
    pub fn flush(&mut self) -> String {
        if self.buffer.is_empty() {
            return String::new();
        }
        let result = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        result
    }

    /// Reset the decoder state, discarding any buffered bytes.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    /// Check if there are buffered bytes waiting for completion.
    pub fn has_pending(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Get the number of pending bytes in the buffer.
    pub fn pending_bytes(&self) -> usize {
        self.buffer.len()
    }

    fn buffer_token(&mut self, token_id: u32) {
        if let Some(bytes) = self.tokenizer.decoder().get(&token_id) {
            self.buffer.extend_from_slice(bytes);
        } else if let Some(special) = self.tokenizer.special_tokens_decoder().get(&token_id) {
            self.buffer.extend_from_slice(special.as_bytes());
        }
    }

    /// Drain the longest valid UTF-8 prefix of the buffer.
    ///
    /// `Utf8Error::valid_up_to` marks where that prefix ends, which also
    /// holds back an unfinished multi-byte sequence at the tail until its
    /// continuation bytes arrive.
    fn extract_complete_utf8(&mut self) -> Option<String> {
        let valid_len = match std::str::from_utf8(&self.buffer) {
            Ok(text) => text.len(),
            Err(err) => err.valid_up_to(),
        };
        if valid_len == 0 {
            return None;
        }

        let tail = self.buffer.split_off(valid_len);
        let head = std::mem::replace(&mut self.buffer, tail);
        String::from_utf8(head).ok()
    }
}
