//! Identity key pairs and the pre-keys published at registration.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// Serialized length of a Kyber-1024 public key.
const KYBER_PUBLIC_KEY_LEN: usize = 1568;

/// A long-term identity key pair. Each account holds two: one for the
/// account identity (ACI) and one for the phone-number identity (PNI).
#[derive(Clone)]
pub struct IdentityKeyPair {
    signing_key: SigningKey,
}

impl IdentityKeyPair {
    /// Generate a fresh identity key pair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Sign arbitrary material (pre-key publics) with the identity key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }
}

impl PartialEq for IdentityKeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.signing_key.to_bytes() == other.signing_key.to_bytes()
    }
}

impl Eq for IdentityKeyPair {}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public_key", &hex::encode(self.public_key_bytes()))
            .finish_non_exhaustive()
    }
}

/// A signed pre-key: an ephemeral public key vouched for by the identity key.
#[derive(Clone)]
pub struct SignedPreKey {
    pub id: u32,
    key_pair: SigningKey,
    pub signature: Signature,
}

impl fmt::Debug for SignedPreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedPreKey")
            .field("id", &self.id)
            .field("public_key", &hex::encode(self.key_pair.verifying_key().as_bytes()))
            .finish_non_exhaustive()
    }
}

impl SignedPreKey {
    /// Generate a pre-key and sign its public half with `identity`.
    pub fn generate(id: u32, identity: &IdentityKeyPair) -> Self {
        let key_pair = SigningKey::generate(&mut OsRng);
        let signature = identity.sign(key_pair.verifying_key().as_bytes());
        Self {
            id,
            key_pair,
            signature,
        }
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.key_pair.verifying_key()
    }

    /// Check the signature against the owning identity key.
    pub fn verify(&self, identity_public: &VerifyingKey) -> bool {
        identity_public
            .verify(self.key_pair.verifying_key().as_bytes(), &self.signature)
            .is_ok()
    }
}

/// A last-resort post-quantum pre-key. The key material itself comes from the
/// lower-level KEM implementation; here it is carried as opaque bytes plus
/// the identity signature over them.
#[derive(Clone)]
pub struct KyberPreKey {
    pub id: u32,
    pub public_key: Vec<u8>,
    pub signature: Signature,
}

impl KyberPreKey {
    pub fn generate(id: u32, identity: &IdentityKeyPair) -> Self {
        let mut public_key = vec![0u8; KYBER_PUBLIC_KEY_LEN];
        rand::thread_rng().fill_bytes(&mut public_key);
        let signature = identity.sign(&public_key);
        Self {
            id,
            public_key,
            signature,
        }
    }

    pub fn verify(&self, identity_public: &VerifyingKey) -> bool {
        identity_public.verify(&self.public_key, &self.signature).is_ok()
    }
}

impl fmt::Debug for KyberPreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KyberPreKey")
            .field("id", &self.id)
            .field("public_key_len", &self.public_key.len())
            .finish_non_exhaustive()
    }
}
