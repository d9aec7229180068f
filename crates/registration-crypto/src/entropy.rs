//! Account entropy pool: the root secret of a registered account.

use crate::error::CryptoError;
use crate::master_key::MasterKey;
use hkdf::Hkdf;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of characters in a serialized entropy pool.
pub const ENTROPY_POOL_LEN: usize = 64;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const MASTER_KEY_INFO: &[u8] = b"master key";

/// The account entropy pool (AEP): 64 characters of `[a-z0-9]` from which
/// the master key and other account secrets are derived.
///
/// Treated as secret material: the `Debug` impl is redacted and the backing
/// string is wiped on drop.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct AccountEntropyPool(String);

impl AccountEntropyPool {
    /// Generate a fresh entropy pool from the OS RNG.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let chars: String = (0..ENTROPY_POOL_LEN)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(chars)
    }

    /// The serialized form, suitable for storage or manual transcription.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive the account master key from this pool.
    pub fn derive_master_key(&self) -> MasterKey {
        let hk = Hkdf::<Sha256>::new(None, self.0.as_bytes());
        let mut okm = [0u8; MasterKey::LEN];
        hk.expand(MASTER_KEY_INFO, &mut okm)
            .expect("32 bytes is a valid HKDF-SHA256 output length");
        MasterKey::from_bytes(okm)
    }
}

impl FromStr for AccountEntropyPool {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ENTROPY_POOL_LEN || !s.bytes().all(|b| ALPHABET.contains(&b)) {
            return Err(CryptoError::InvalidEntropyPool {
                expected: ENTROPY_POOL_LEN,
                actual: s.len(),
            });
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Debug for AccountEntropyPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccountEntropyPool(REDACTED)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_pool_has_expected_shape() {
        let pool = AccountEntropyPool::generate();
        assert_eq!(pool.as_str().len(), ENTROPY_POOL_LEN);
        assert!(pool
            .as_str()
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
    }

    #[test]
    fn generated_pools_are_unique() {
        assert_ne!(AccountEntropyPool::generate(), AccountEntropyPool::generate());
    }

    #[test]
    fn master_key_derivation_is_deterministic() {
        let pool = AccountEntropyPool::generate();
        assert_eq!(pool.derive_master_key(), pool.derive_master_key());

        let other = AccountEntropyPool::generate();
        assert_ne!(pool.derive_master_key(), other.derive_master_key());
    }

    #[test]
    fn round_trips_through_from_str() {
        let pool = AccountEntropyPool::generate();
        let parsed: AccountEntropyPool = pool.as_str().parse().unwrap();
        assert_eq!(pool, parsed);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("too-short".parse::<AccountEntropyPool>().is_err());
        assert!("A".repeat(ENTROPY_POOL_LEN).parse::<AccountEntropyPool>().is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let pool = AccountEntropyPool::generate();
        let rendered = format!("{:?}", pool);
        assert!(!rendered.contains(pool.as_str()));
    }
}
