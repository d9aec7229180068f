//! Account master key and its registration-related derivations.

use crate::error::CryptoError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

const REGISTRATION_RECOVERY_INFO: &[u8] = b"Registration Recovery";
const REGISTRATION_LOCK_INFO: &[u8] = b"Registration Lock";

/// The 32-byte account master key.
///
/// Normally derived from the [`AccountEntropyPool`](crate::AccountEntropyPool),
/// but also restored directly from SVR during re-registration, in which case
/// it only lives long enough to unlock the initial storage restore.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; MasterKey::LEN]);

impl MasterKey {
    /// Key length in bytes.
    pub const LEN: usize = 32;

    /// Generate a random master key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; Self::LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidMasterKey {
                    expected: Self::LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }

    /// Derive the registration recovery password: lets the account re-register
    /// without SMS verification.
    pub fn derive_registration_recovery_password(&self) -> String {
        STANDARD.encode(self.derive(REGISTRATION_RECOVERY_INFO))
    }

    /// Derive the registration lock token: required to register over an
    /// account that has registration lock enabled.
    pub fn derive_registration_lock_token(&self) -> String {
        hex::encode(self.derive(REGISTRATION_LOCK_INFO))
    }

    fn derive(&self, info: &[u8]) -> [u8; 32] {
        let mut mac =
            HmacSha256::new_from_slice(&self.0).expect("HMAC accepts keys of any length");
        mac.update(info);
        mac.finalize().into_bytes().into()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(REDACTED)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivations_are_deterministic_and_distinct() {
        let key = MasterKey::generate();

        assert_eq!(
            key.derive_registration_recovery_password(),
            key.derive_registration_recovery_password()
        );
        assert_eq!(
            key.derive_registration_lock_token(),
            key.derive_registration_lock_token()
        );
        assert_ne!(
            STANDARD.encode(key.derive(REGISTRATION_RECOVERY_INFO)),
            STANDARD.encode(key.derive(REGISTRATION_LOCK_INFO))
        );
    }

    #[test]
    fn different_keys_produce_different_passwords() {
        let a = MasterKey::generate();
        let b = MasterKey::generate();
        assert_ne!(
            a.derive_registration_recovery_password(),
            b.derive_registration_recovery_password()
        );
    }

    #[test]
    fn try_from_slice_validates_length() {
        assert!(MasterKey::try_from_slice(&[0u8; 32]).is_ok());
        assert!(MasterKey::try_from_slice(&[0u8; 16]).is_err());
    }

    #[test]
    fn lock_token_is_hex() {
        let token = MasterKey::generate().derive_registration_lock_token();
        assert_eq!(token.len(), 64);
        assert!(token.bytes().all(|b| b.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_is_redacted() {
        let rendered = format!("{:?}", MasterKey::generate());
        assert_eq!(rendered, "MasterKey(REDACTED)");
    }
}
