//! Ephemeral `msToken` generation.
//!
//! Both platforms expect a long random token on every API call. It carries no
//! state; only its length and alphabet are checked remotely.

use std::fmt;

use rand::Rng;
use serde::Serialize;

pub const MS_TOKEN_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789=";

pub const DEFAULT_TOKEN_LENGTH: usize = 107;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EphemeralToken(String);

impl EphemeralToken {
    pub fn generate(length: usize) -> Self {
        let mut rng = rand::thread_rng();
        let token = (0..length)
            .map(|_| MS_TOKEN_ALPHABET[rng.gen_range(0..MS_TOKEN_ALPHABET.len())] as char)
            .collect();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EphemeralToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenGenerator {
    length: usize,
}

impl TokenGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn generate(&self) -> EphemeralToken {
        EphemeralToken::generate(self.length)
    }
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_LENGTH)
    }
}
