// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Random value generation for managed Secret fields.
//!
//! This module is a pure library: it draws uniformly distributed characters or
//! raw bytes from the process CSPRNG. Charset synthesis from the boolean block
//! toggles lives here as well so the generation reconciler only ever deals in
//! ready-to-use charsets.

use rand::{Rng, RngExt};
use thiserror::Error;

use crate::constants::{CHARSET_DIGITS, CHARSET_LOWERCASE, CHARSET_UPPERCASE};

/// Errors produced by value generation and charset synthesis.
///
/// All of these are user-data errors in the sense of the reconciler contract:
/// they abort generation for the whole Secret and are reported through a
/// warning event rather than retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// Requested length was zero
    #[error("Generated value length must be at least 1")]
    ZeroLength,

    /// Charset synthesis ended up with no characters to draw from
    #[error("No charset blocks enabled: at least one of lowercase, uppercase, numbers, or specialChars must be on")]
    EmptyCharset,

    /// Special characters were enabled but the allowed literal is empty
    #[error("specialChars is enabled but allowedSpecialChars is empty")]
    EmptySpecialChars,
}

/// Which charset blocks to concatenate, in fixed order.
///
/// The blocks are always concatenated lowercase, uppercase, digits, specials,
/// skipping disabled blocks, so the same toggles always produce the same
/// charset literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharsetSpec {
    pub lowercase: bool,
    pub uppercase: bool,
    pub numbers: bool,
    pub special_chars: bool,
    pub allowed_special_chars: String,
}

impl CharsetSpec {
    /// Synthesize the charset literal for these toggles.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::EmptySpecialChars`] when specials are enabled
    /// with an empty literal, and [`GenerateError::EmptyCharset`] when no
    /// block is enabled.
    pub fn build(&self) -> Result<String, GenerateError> {
        if self.special_chars && self.allowed_special_chars.is_empty() {
            return Err(GenerateError::EmptySpecialChars);
        }

        let mut charset = String::new();
        if self.lowercase {
            charset.push_str(CHARSET_LOWERCASE);
        }
        if self.uppercase {
            charset.push_str(CHARSET_UPPERCASE);
        }
        if self.numbers {
            charset.push_str(CHARSET_DIGITS);
        }
        if self.special_chars {
            charset.push_str(&self.allowed_special_chars);
        }

        if charset.is_empty() {
            return Err(GenerateError::EmptyCharset);
        }

        Ok(charset)
    }
}

/// Generate a random string of `length` characters drawn from `charset`.
///
/// Characters are drawn uniformly (modulo the negligible bias of indexing a
/// short charset) from the OS-seeded CSPRNG.
///
/// # Errors
///
/// Returns an error if `length` is zero or `charset` is empty.
///
/// # Examples
///
/// ```
/// use isotope::generate::generate_string;
///
/// let value = generate_string(32, "abc123").unwrap();
/// assert_eq!(value.chars().count(), 32);
/// assert!(value.chars().all(|c| "abc123".contains(c)));
/// ```
pub fn generate_string(length: usize, charset: &str) -> Result<String, GenerateError> {
    if length == 0 {
        return Err(GenerateError::ZeroLength);
    }
    let chars: Vec<char> = charset.chars().collect();
    if chars.is_empty() {
        return Err(GenerateError::EmptyCharset);
    }

    let mut rng = rand::rng();
    let value = (0..length)
        .map(|_| chars[rng.random_range(0..chars.len())])
        .collect();
    Ok(value)
}

/// Generate `length` raw random bytes from the CSPRNG.
///
/// # Errors
///
/// Returns an error if `length` is zero.
pub fn generate_bytes(length: usize) -> Result<Vec<u8>, GenerateError> {
    if length == 0 {
        return Err(GenerateError::ZeroLength);
    }

    let mut bytes = vec![0u8; length];
    rand::rng().fill_bytes(&mut bytes);
    Ok(bytes)
}

#[cfg(test)]
#[path = "generate_tests.rs"]
mod generate_tests;
