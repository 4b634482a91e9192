//! Opaque error identifiers for failed authentication.
//!
//! Callers only ever see the identifier; the real cause is logged next to it
//! on the server so operators can correlate the two.

use rand::Rng;
use std::fmt;

/// Crockford base32 alphabet: no `I`, `L`, `O` or `U`, so identifiers read
/// back over the phone without confusion.
const ALPHABET: &[u8] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Length of a minted identifier.
pub const ERROR_ID_LEN: usize = 7;

/// Short, human-transcribable correlation token.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorId(String);

impl ErrorId {
    /// Mint a fresh identifier from the thread-local RNG.
    pub fn new() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ERROR_ID_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ErrorId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn error_id_uses_unambiguous_alphabet() {
        for _ in 0..200 {
            let id = ErrorId::new();
            assert_eq!(id.as_str().len(), ERROR_ID_LEN);
            assert!(id.as_str().bytes().all(|b| ALPHABET.contains(&b)), "bad id {id}");
            assert!(!id.as_str().contains(['I', 'L', 'O', 'U']));
        }
    }

    #[test]
    fn error_ids_rarely_collide() {
        let ids: HashSet<_> = (0..1000).map(|_| ErrorId::new()).collect();
        // 32^7 possibilities; a thousand draws should never collide in practice
        assert!(ids.len() >= 999);
    }
}
