//! Key material provisioning.

use crate::storage::PreExistingRegistrationData;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rand::{Rng, RngCore};
use registration_crypto::{AccountEntropyPool, IdentityKeyPair, KyberPreKey, SignedPreKey};
use secrecy::SecretString;

/// Registration IDs are 14-bit values, zero excluded.
const MAX_REGISTRATION_ID: u32 = 0x3FFF;

/// Service passwords are 18 random bytes, base64 encoded.
const SERVICE_PASSWORD_LEN: usize = 18;

/// All cryptographic material required to stand up an account: identity key
/// pairs and pre-keys for both identities, registration IDs, the
/// unidentified-access key, the basic-auth service password, and the account
/// entropy pool.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub aci_identity_key_pair: IdentityKeyPair,
    pub aci_signed_pre_key: SignedPreKey,
    pub aci_last_resort_kyber_pre_key: KyberPreKey,
    pub pni_identity_key_pair: IdentityKeyPair,
    pub pni_signed_pre_key: SignedPreKey,
    pub pni_last_resort_kyber_pre_key: KyberPreKey,
    pub aci_registration_id: u32,
    pub pni_registration_id: u32,
    pub unidentified_access_key: [u8; 16],
    pub service_password: SecretString,
    pub account_entropy_pool: AccountEntropyPool,
}

/// Generates (or partially reuses) all key material for a registration
/// attempt. Pure and infallible; persistence belongs to the storage
/// collaborator.
pub struct KeyMaterialProvisioner;

impl KeyMaterialProvisioner {
    /// Provision key material for one registration attempt.
    ///
    /// When `existing` is supplied (a device-local re-registration), the
    /// entropy pool and both identity key pairs are reused verbatim;
    /// everything else is freshly generated either way.
    pub fn provision(existing: Option<&PreExistingRegistrationData>) -> KeyMaterial {
        let (account_entropy_pool, aci_identity_key_pair, pni_identity_key_pair) = match existing {
            Some(prior) => (
                prior.aep.clone(),
                prior.aci_identity_key_pair.clone(),
                prior.pni_identity_key_pair.clone(),
            ),
            None => (
                AccountEntropyPool::generate(),
                IdentityKeyPair::generate(),
                IdentityKeyPair::generate(),
            ),
        };

        let mut rng = rand::thread_rng();

        let aci_signed_pre_key = SignedPreKey::generate(rng.gen(), &aci_identity_key_pair);
        let aci_last_resort_kyber_pre_key =
            KyberPreKey::generate(rng.gen(), &aci_identity_key_pair);
        let pni_signed_pre_key = SignedPreKey::generate(rng.gen(), &pni_identity_key_pair);
        let pni_last_resort_kyber_pre_key =
            KyberPreKey::generate(rng.gen(), &pni_identity_key_pair);

        let mut unidentified_access_key = [0u8; 16];
        rng.fill_bytes(&mut unidentified_access_key);

        let mut password_bytes = [0u8; SERVICE_PASSWORD_LEN];
        rng.fill_bytes(&mut password_bytes);

        KeyMaterial {
            aci_identity_key_pair,
            aci_signed_pre_key,
            aci_last_resort_kyber_pre_key,
            pni_identity_key_pair,
            pni_signed_pre_key,
            pni_last_resort_kyber_pre_key,
            aci_registration_id: rng.gen_range(1..=MAX_REGISTRATION_ID),
            pni_registration_id: rng.gen_range(1..=MAX_REGISTRATION_ID),
            unidentified_access_key,
            service_password: SecretString::new(STANDARD.encode(password_bytes)),
            account_entropy_pool,
        }
    }
}
