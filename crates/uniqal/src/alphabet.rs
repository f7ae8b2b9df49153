use crate::{Error, RandSource, Result, Value};
use core::num::NonZeroUsize;

/// The character classes that can be combined into an [`Alphabet`].
///
/// Classes are appended in a fixed order: uppercase, lowercase, digits, then
/// ASCII punctuation. Enabling nothing is rejected by
/// [`CharClasses::alphabet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharClasses {
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub punctuation: bool,
}

impl CharClasses {
    /// Every class enabled.
    pub const ALL: Self = Self {
        uppercase: true,
        lowercase: true,
        digits: true,
        punctuation: true,
    };

    /// Combines the enabled classes into an alphabet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no class is enabled.
    pub fn alphabet(self) -> Result<Alphabet> {
        let mut chars = Vec::new();
        if self.uppercase {
            chars.extend('A'..='Z');
        }
        if self.lowercase {
            chars.extend('a'..='z');
        }
        if self.digits {
            chars.extend('0'..='9');
        }
        if self.punctuation {
            chars.extend(('!'..='~').filter(char::is_ascii_punctuation));
        }
        Alphabet::new(chars)
    }
}

impl Default for CharClasses {
    fn default() -> Self {
        Self::ALL
    }
}

/// A non-empty, duplicate-free ordered set of characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    /// Builds an alphabet from `chars`, keeping the first occurrence of each
    /// character.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `chars` yields nothing or contains
    /// `'\n'` or `'\r'`. Values are stored one per line.
    pub fn new(chars: impl IntoIterator<Item = char>) -> Result<Self> {
        let mut unique: Vec<char> = Vec::new();
        for c in chars {
            if matches!(c, '\n' | '\r') {
                return Err(Error::invalid_config(format!(
                    "alphabet must not contain line terminator {c:?}"
                )));
            }
            if !unique.contains(&c) {
                unique.push(c);
            }
        }

        if unique.is_empty() {
            return Err(Error::invalid_config("alphabet must not be empty"));
        }

        Ok(Self { chars: unique })
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    // Never true; an empty alphabet cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn as_chars(&self) -> &[char] {
        &self.chars
    }

    /// Draws one character uniformly at random.
    pub fn pick<R: RandSource>(&self, rng: &R) -> char {
        self.chars[rng.index(self.chars.len())]
    }
}

impl TryFrom<&str> for Alphabet {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value.chars())
    }
}

/// The `{length, alphabet}` pair every value of a run is drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    length: NonZeroUsize,
    alphabet: Alphabet,
}

impl GeneratorConfig {
    pub const fn new(length: NonZeroUsize, alphabet: Alphabet) -> Self {
        Self { length, alphabet }
    }

    /// Like [`GeneratorConfig::new`] but validates a raw length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `length` is zero.
    pub fn try_new(length: usize, alphabet: Alphabet) -> Result<Self> {
        let length = NonZeroUsize::new(length)
            .ok_or_else(|| Error::invalid_config("length must be greater than 0"))?;
        Ok(Self::new(length, alphabet))
    }

    pub const fn length(&self) -> usize {
        self.length.get()
    }

    pub const fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Samples one value: `length` independent uniform draws, with
    /// replacement.
    pub fn sample<R: RandSource>(&self, rng: &R) -> Value {
        (0..self.length()).map(|_| self.alphabet.pick(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Stepper {
        next: Cell<usize>,
    }

    impl RandSource for Stepper {
        fn index(&self, bound: usize) -> usize {
            let i = self.next.get();
            self.next.set(i + 1);
            i % bound
        }
    }

    #[test]
    fn all_classes_match_ascii_sets() {
        let alphabet = CharClasses::ALL.alphabet().unwrap();
        assert_eq!(alphabet.len(), 26 + 26 + 10 + 32);
        assert_eq!(alphabet.as_chars()[0], 'A');
        assert_eq!(alphabet.as_chars()[26], 'a');
        assert_eq!(alphabet.as_chars()[52], '0');
        assert!(alphabet.as_chars().contains(&'~'));
        assert!(alphabet.as_chars().contains(&'\\'));
        assert!(!alphabet.as_chars().contains(&' '));
    }

    #[test]
    fn lowercase_and_digits_only() {
        let classes = CharClasses {
            uppercase: false,
            lowercase: true,
            digits: true,
            punctuation: false,
        };
        let alphabet = classes.alphabet().unwrap();
        assert_eq!(alphabet.len(), 36);
        assert!(alphabet.as_chars().iter().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn no_classes_is_rejected() {
        let classes = CharClasses {
            uppercase: false,
            lowercase: false,
            digits: false,
            punctuation: false,
        };
        assert!(matches!(classes.alphabet(), Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn alphabet_drops_duplicates_in_order() {
        let alphabet = Alphabet::try_from("abca").unwrap();
        assert_eq!(alphabet.as_chars(), &['a', 'b', 'c']);
    }

    #[test]
    fn empty_alphabet_is_rejected() {
        assert!(Alphabet::try_from("").is_err());
    }

    #[test]
    fn line_terminators_are_rejected() {
        for chars in ["a\n", "\rb", "ab\r\n"] {
            assert!(
                matches!(Alphabet::try_from(chars), Err(Error::InvalidConfig { .. })),
                "{chars:?}"
            );
        }
    }

    #[test]
    fn zero_length_is_rejected() {
        let alphabet = Alphabet::try_from("ab").unwrap();
        assert!(GeneratorConfig::try_new(0, alphabet).is_err());
    }

    #[test]
    fn sample_draws_length_chars_from_alphabet() {
        let config = GeneratorConfig::try_new(5, Alphabet::try_from("xyz").unwrap()).unwrap();
        let rng = Stepper { next: Cell::new(0) };
        assert_eq!(config.sample(&rng), "xyzxy");
        assert_eq!(config.sample(&rng), "zxyzx");
    }
}
