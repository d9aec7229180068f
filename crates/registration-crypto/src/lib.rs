//! Cryptographic value types used by the registration engine.
//!
//! Everything here is deliberately small and network-free: entropy pools,
//! master keys and their derivations, identity key pairs and pre-keys, and
//! the two service identifiers an account holds. The registration engine
//! sequences these values; it never inspects their internals.

mod entropy;
mod error;
mod identity;
mod master_key;
mod service_id;

pub use entropy::AccountEntropyPool;
pub use error::CryptoError;
pub use identity::{IdentityKeyPair, KyberPreKey, SignedPreKey};
pub use master_key::MasterKey;
pub use service_id::{Aci, Pni};
