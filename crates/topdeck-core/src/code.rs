//! Room codes.
//!
//! A code is 6 characters from `A-Z0-9`, drawn uniformly. The space holds
//! 36^6 (about 2.2 billion) codes, so a collision with a live room is rare
//! and the expected number of resamples is close to one.

use std::fmt;

use rand::Rng;

/// Number of characters in a room code.
pub const CODE_LEN: usize = 6;

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short uppercase alphanumeric room identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode([u8; CODE_LEN]);

impl RoomCode {
    /// Draw a code uniformly at random.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut code = [0u8; CODE_LEN];
        for slot in &mut code {
            *slot = ALPHABET[rng.gen_range(0..ALPHABET.len())];
        }
        Self(code)
    }

    /// Parse participant input.
    ///
    /// Surrounding whitespace is ignored and letters are uppercased. Returns
    /// `None` if the result is not a well-formed code.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.len() != CODE_LEN {
            return None;
        }

        let mut code = [0u8; CODE_LEN];
        for (slot, byte) in code.iter_mut().zip(trimmed.bytes()) {
            let upper = byte.to_ascii_uppercase();
            if !ALPHABET.contains(&upper) {
                return None;
            }
            *slot = upper;
        }
        Some(Self(code))
    }

    /// Code as a string slice.
    pub fn as_str(&self) -> &str {
        // ALPHABET is ASCII, so every code is valid UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
