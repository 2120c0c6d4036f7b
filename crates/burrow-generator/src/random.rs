use crate::Generator;
use burrow_core::shortcode::{SHORT_CODE_ALPHABET, SHORT_CODE_LENGTH};
use burrow_core::ShortCode;
use rand::Rng;

/// Draws every character independently and uniformly from the 62-symbol
/// alphanumeric alphabet, giving 62^7 (about 3.5 * 10^12) possible codes.
///
/// Codes are not derived from the target URL, so shortening the same URL
/// twice yields two different codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGenerator;

impl RandomGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Generator for RandomGenerator {
    type Output = ShortCode;

    fn generate(&self) -> Self::Output {
        let mut rng = rand::rng();
        let code: String = (0..SHORT_CODE_LENGTH)
            .map(|_| char::from(SHORT_CODE_ALPHABET[rng.random_range(0..SHORT_CODE_ALPHABET.len())]))
            .collect();
        ShortCode::new_unchecked(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn codes_are_seven_alphanumeric_chars() {
        let generator = RandomGenerator::new();
        for _ in 0..1_000 {
            let code = generator.generate();
            assert_eq!(code.as_str().len(), SHORT_CODE_LENGTH);
            assert!(code.as_str().bytes().all(|b| b.is_ascii_alphanumeric()));
            assert!(ShortCode::new(code.as_str()).is_ok());
        }
    }

    #[test]
    fn codes_do_not_repeat_in_practice() {
        let generator = RandomGenerator::new();
        let codes: HashSet<String> = (0..1_000)
            .map(|_| generator.generate().as_str().to_string())
            .collect();
        assert_eq!(codes.len(), 1_000);
    }

    #[test]
    fn generator_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RandomGenerator>();
    }
}
