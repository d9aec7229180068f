//! Account registration orchestration engine.
//!
//! Establishes a verified identity for a messaging account, provisions its
//! cryptographic key material, and reconciles the mutually-exclusive
//! recovery paths: fresh phone-number verification, recovery-password silent
//! re-registration, SVR-backed PIN restore, and the registration-lock
//! challenge.
//!
//! The engine is transport- and storage-agnostic: hosts implement
//! [`NetworkController`] and [`StorageController`] and feed UI intents into
//! the per-screen flows in [`screens`]. Screen flows emit
//! [`RegistrationFlowEvent`]s, which the host applies one at a time through
//! [`RegistrationFlowStateMachine`] — a pure reducer over
//! [`RegistrationFlowState`] — keeping all state mutation single-writer even
//! though the underlying network calls suspend.

pub mod config;
pub mod error;
pub mod event;
pub mod keys;
pub mod machine;
pub mod network;
pub mod phone;
pub mod recovery;
pub mod screens;
pub mod session;
pub mod state;
pub mod storage;
pub mod svr;
pub mod types;

pub use config::FlowConfig;
pub use error::RegistrationNetworkResult;
pub use event::RegistrationFlowEvent;
pub use keys::{KeyMaterial, KeyMaterialProvisioner};
pub use machine::{Applied, RegistrationFlowStateMachine};
pub use network::NetworkController;
pub use recovery::{MasterKeyRegistrationOutcome, RecoveryPasswordRegistrar};
pub use session::SessionController;
pub use state::{RegistrationFlowState, RegistrationRoute};
pub use storage::{NewRegistrationData, PreExistingRegistrationData, StorageController};
pub use svr::{MasterKeyRecoveryOrchestrator, SvrCredentialChecker};
pub use types::{
    RegisterAccountResponse, RegistrationProof, SessionMetadata, SvrCredentials,
    VerificationCodeTransport,
};

use screens::phone_number::PhoneNumberEntryFlow;
use screens::pin_create::PinCreationFlow;
use screens::pin_entry::{PinEntryFlow, PinEntryMode};
use screens::verification_code::VerificationCodeEntryFlow;
use std::sync::Arc;

/// Everything the engine needs, injected by the host. No globals: every
/// orchestrator and screen flow is built from this bundle.
#[derive(Clone)]
pub struct RegistrationDependencies {
    pub network: Arc<dyn NetworkController>,
    pub storage: Arc<dyn StorageController>,
    pub config: FlowConfig,
}

impl RegistrationDependencies {
    pub fn new(
        network: Arc<dyn NetworkController>,
        storage: Arc<dyn StorageController>,
        config: FlowConfig,
    ) -> Self {
        Self {
            network,
            storage,
            config,
        }
    }

    pub fn phone_number_entry_flow(&self) -> PhoneNumberEntryFlow {
        PhoneNumberEntryFlow::new(self.network.clone(), self.storage.clone(), &self.config)
    }

    pub fn verification_code_flow(&self) -> VerificationCodeEntryFlow {
        VerificationCodeEntryFlow::new(self.network.clone(), self.storage.clone(), &self.config)
    }

    pub fn pin_entry_flow(&self, mode: PinEntryMode) -> PinEntryFlow {
        PinEntryFlow::new(
            self.network.clone(),
            self.storage.clone(),
            &self.config,
            mode,
        )
    }

    pub fn pin_creation_flow(&self) -> PinCreationFlow {
        PinCreationFlow::new(self.network.clone(), self.storage.clone(), &self.config)
    }
}
