//! Value types shared between the engine and its collaborators.

use chrono::{DateTime, Utc};
use registration_crypto::{KyberPreKey, SignedPreKey};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Additional information the server may demand before it will send a
/// verification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestedInformation {
    #[serde(rename = "captcha")]
    Captcha,
    #[serde(rename = "pushChallenge")]
    PushChallenge,
}

/// Immutable snapshot of a verification session. Every session-mutating call
/// returns a fresh snapshot which supersedes the previous one wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub id: String,
    pub next_sms: Option<DateTime<Utc>>,
    pub next_call: Option<DateTime<Utc>>,
    pub next_verification_attempt: Option<DateTime<Utc>>,
    pub allowed_to_request_code: bool,
    pub requested_information: Vec<RequestedInformation>,
    pub verified: bool,
}

impl SessionMetadata {
    pub fn requires_captcha(&self) -> bool {
        self.requested_information
            .contains(&RequestedInformation::Captcha)
    }

    pub fn requires_push_challenge(&self) -> bool {
        self.requested_information
            .contains(&RequestedInformation::PushChallenge)
    }
}

/// Opaque username/password pair identifying an SVR account slot.
///
/// Multiple may be held locally, one per device that ever registered the
/// number; the local store is append-only and bounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvrCredentials {
    pub username: String,
    pub password: String,
}

impl SvrCredentials {
    /// Stable key used to index the verdicts of a credential check.
    pub fn credential_key(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

/// Per-credential verdict from a credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialVerdict {
    #[serde(rename = "match")]
    Match,
    #[serde(rename = "no-match")]
    NoMatch,
    #[serde(rename = "invalid")]
    Invalid,
}

/// Response to a bulk SVR credential check, keyed by
/// [`SvrCredentials::credential_key`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSvrCredentialsResponse {
    pub matches: HashMap<String, CredentialVerdict>,
}

/// Payload of a registration-lock rejection: how long the lock remains in
/// force and which SVR slot can unlock it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationLockData {
    #[serde(with = "humantime_serde")]
    pub time_remaining: Duration,
    pub svr_credentials: SvrCredentials,
}

/// Transport to deliver a verification code over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationCodeTransport {
    Sms,
    Voice,
}

/// Exactly one proof drives a registration attempt: either a verified
/// session or a recovery password. The enum makes "both" and "neither"
/// unrepresentable.
#[derive(Debug, Clone)]
pub enum RegistrationProof {
    Session { session_id: String },
    RecoveryPassword { recovery_password: SecretString },
}

/// Account capabilities advertised at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCapabilities {
    pub storage: bool,
    pub versioned_expiration_timer: bool,
    pub attachment_backfill: bool,
    pub spqr: bool,
}

impl Default for AccountCapabilities {
    fn default() -> Self {
        // All on initially; users can opt out of storage later.
        Self {
            storage: true,
            versioned_expiration_timer: true,
            attachment_backfill: true,
            spqr: true,
        }
    }
}

/// Attributes registered alongside the account.
#[derive(Debug, Clone)]
pub struct AccountAttributes {
    pub registration_id: u32,
    pub pni_registration_id: u32,
    /// True when no push token is available and the client will poll.
    pub fetches_messages: bool,
    pub registration_lock: Option<String>,
    pub unidentified_access_key: [u8; 16],
    pub unrestricted_unidentified_access: bool,
    /// Always false at registration; discoverability is an explicit opt-in
    /// the user makes later.
    pub discoverable_by_phone_number: bool,
    pub capabilities: AccountCapabilities,
    /// Freshly derived from the new master key so the server can accept the
    /// next silent re-registration.
    pub recovery_password: SecretString,
}

/// Pre-keys published for one identity at registration.
#[derive(Debug, Clone)]
pub struct PreKeyCollection {
    pub identity_key: [u8; 32],
    pub signed_pre_key: SignedPreKey,
    pub last_resort_kyber_pre_key: KyberPreKey,
}

/// Everything the registration endpoint needs for one attempt.
#[derive(Debug, Clone)]
pub struct RegisterAccountRequest {
    pub e164: String,
    pub service_password: SecretString,
    pub proof: RegistrationProof,
    pub attributes: AccountAttributes,
    pub aci_pre_keys: PreKeyCollection,
    pub pni_pre_keys: PreKeyCollection,
    pub push_token: Option<String>,
    pub skip_device_transfer: bool,
}

/// Successful registration response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAccountResponse {
    pub aci: registration_crypto::Aci,
    pub pni: registration_crypto::Pni,
    pub e164: String,
    pub username_hash: Option<String>,
    /// Whether the account can use the storage service, and thus whether a
    /// PIN-based storage restore should be offered right away.
    pub storage_capable: bool,
    pub reregistration: bool,
}
