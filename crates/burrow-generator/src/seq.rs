use crate::Generator;
use burrow_core::shortcode::{SHORT_CODE_ALPHABET, SHORT_CODE_LENGTH};
use burrow_core::ShortCode;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic generator that base62-encodes a counter, left-padded to
/// seven characters: `0000000`, `0000001`, ..., `000000z`, `0000010`.
///
/// Unique within one instance only; two instances started at the same
/// offset produce the same sequence, which makes collisions reproducible.
#[derive(Debug)]
pub struct SeqGenerator {
    counter: AtomicU64,
}

impl Clone for SeqGenerator {
    fn clone(&self) -> Self {
        Self {
            counter: AtomicU64::new(self.counter.load(Ordering::SeqCst)),
        }
    }
}

impl SeqGenerator {
    pub fn new() -> Self {
        Self::with_offset(0)
    }

    /// Creates a generator whose first code encodes `offset`.
    pub fn with_offset(offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
        }
    }
}

impl Default for SeqGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn encode_base62(mut value: u64) -> String {
    let base = SHORT_CODE_ALPHABET.len() as u64;
    let mut buf = [SHORT_CODE_ALPHABET[0]; SHORT_CODE_LENGTH];
    for slot in buf.iter_mut().rev() {
        *slot = SHORT_CODE_ALPHABET[(value % base) as usize];
        value /= base;
    }
    buf.iter().map(|&b| char::from(b)).collect()
}

impl Generator for SeqGenerator {
    type Output = ShortCode;

    fn generate(&self) -> ShortCode {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        ShortCode::new_unchecked(encode_base62(count))
    }
}
