//! Verification session orchestration.

use crate::config::SessionConfig;
use crate::error::{
    CreateSessionError, RegistrationNetworkResult, RequestVerificationCodeError,
    SubmitVerificationCodeError, UpdateSessionError,
};
use crate::network::NetworkController;
use crate::types::{SessionMetadata, VerificationCodeTransport};
use std::sync::Arc;
use tracing::{debug, warn};

/// Owns creation and mutation of a verification session. The server is the
/// source of truth; every mutation returns a fresh session snapshot.
#[derive(Clone)]
pub struct SessionController {
    network: Arc<dyn NetworkController>,
    config: SessionConfig,
}

impl SessionController {
    pub fn new(network: Arc<dyn NetworkController>, config: SessionConfig) -> Self {
        Self { network, config }
    }

    /// Create a session for a phone number, attaching the push token when one
    /// is available so the server can offer a push challenge.
    pub async fn create_session(
        &self,
        e164: &str,
    ) -> RegistrationNetworkResult<SessionMetadata, CreateSessionError> {
        let push_token = self.network.get_push_token().await;
        debug!(has_push_token = push_token.is_some(), "Creating verification session");
        self.network.create_session(e164, push_token.as_deref()).await
    }

    pub async fn request_verification_code(
        &self,
        session_id: &str,
        transport: VerificationCodeTransport,
    ) -> RegistrationNetworkResult<SessionMetadata, RequestVerificationCodeError> {
        self.network
            .request_verification_code(
                session_id,
                transport,
                &self.config.locale,
                self.config.sms_retriever_supported,
            )
            .await
    }

    pub async fn submit_captcha_token(
        &self,
        session_id: &str,
        captcha_token: &str,
    ) -> RegistrationNetworkResult<SessionMetadata, UpdateSessionError> {
        self.network
            .update_session(session_id, None, Some(captcha_token))
            .await
    }

    pub async fn submit_push_challenge_token(
        &self,
        session_id: &str,
        push_challenge_token: &str,
    ) -> RegistrationNetworkResult<SessionMetadata, UpdateSessionError> {
        self.network
            .update_session(session_id, Some(push_challenge_token), None)
            .await
    }

    pub async fn submit_verification_code(
        &self,
        session_id: &str,
        code: &str,
    ) -> RegistrationNetworkResult<SessionMetadata, SubmitVerificationCodeError> {
        self.network.submit_verification_code(session_id, code).await
    }

    pub fn captcha_url(&self) -> String {
        self.network.captcha_url()
    }

    /// Wait for a push-delivered challenge token, bounded by the configured
    /// timeout. Resolves to `None` on timeout rather than an error.
    pub async fn await_push_challenge_token(&self) -> Option<String> {
        match tokio::time::timeout(
            self.config.push_challenge_timeout,
            self.network.await_push_challenge_token(),
        )
        .await
        {
            Ok(token) => token,
            Err(_) => {
                debug!(
                    timeout = ?self.config.push_challenge_timeout,
                    "Timed out waiting for push challenge token"
                );
                None
            }
        }
    }

    /// Run the push-challenge dance against a session: await a token, submit
    /// it if one arrives, and return the freshest session snapshot we have.
    ///
    /// This path degrades gracefully by design: a missing token or a failed
    /// submission leaves the session as-is so the flow can satisfy whatever
    /// challenges remain.
    pub async fn handle_push_challenge(&self, session: SessionMetadata) -> SessionMetadata {
        let Some(token) = self.await_push_challenge_token().await else {
            debug!("No push challenge token received, proceeding without one");
            return session;
        };

        match self.submit_push_challenge_token(&session.id, &token).await {
            RegistrationNetworkResult::Success(updated) => updated,
            RegistrationNetworkResult::Failure(e) => {
                warn!(error = %e, "Push challenge submission rejected, proceeding anyway");
                session
            }
            RegistrationNetworkResult::NetworkError(e) => {
                warn!(error = %e, "Network error submitting push challenge, proceeding anyway");
                session
            }
            RegistrationNetworkResult::ApplicationError(e) => {
                warn!(error = %e, "Application error submitting push challenge, proceeding anyway");
                session
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::MockNetworkController;
    use crate::types::RequestedInformation;

    fn session(requested: Vec<RequestedInformation>) -> SessionMetadata {
        SessionMetadata {
            id: "session-id".into(),
            next_sms: None,
            next_call: None,
            next_verification_attempt: None,
            allowed_to_request_code: true,
            requested_information: requested,
            verified: false,
        }
    }

    #[tokio::test]
    async fn create_session_passes_push_token_through() {
        let mut network = MockNetworkController::new();
        network
            .expect_get_push_token()
            .return_once(|| Some("push-token".to_string()));
        network
            .expect_create_session()
            .withf(|e164, token| e164 == "+15551234567" && token == &Some("push-token"))
            .return_once(|_, _| RegistrationNetworkResult::Success(session(vec![])));

        let controller = SessionController::new(Arc::new(network), SessionConfig::default());
        let result = controller.create_session("+15551234567").await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn push_challenge_submission_failure_degrades_to_original_session() {
        let original = session(vec![RequestedInformation::PushChallenge]);

        let mut network = MockNetworkController::new();
        network
            .expect_await_push_challenge_token()
            .return_once(|| Some("token".to_string()));
        network.expect_update_session().return_once(|_, _, _| {
            RegistrationNetworkResult::Failure(UpdateSessionError::RejectedUpdate(
                "Invalid token".into(),
            ))
        });

        let controller = SessionController::new(Arc::new(network), SessionConfig::default());
        let result = controller.handle_push_challenge(original.clone()).await;
        assert_eq!(result, original);
    }

    #[tokio::test]
    async fn push_challenge_success_adopts_updated_session() {
        let original = session(vec![RequestedInformation::PushChallenge]);
        let updated = session(vec![]);

        let mut network = MockNetworkController::new();
        network
            .expect_await_push_challenge_token()
            .return_once(|| Some("token".to_string()));
        let expected = updated.clone();
        network
            .expect_update_session()
            .withf(|id, push, captcha| {
                id == "session-id" && push == &Some("token") && captcha.is_none()
            })
            .return_once(move |_, _, _| RegistrationNetworkResult::Success(expected));

        let controller = SessionController::new(Arc::new(network), SessionConfig::default());
        let result = controller.handle_push_challenge(original).await;
        assert_eq!(result, updated);
    }

    #[tokio::test]
    async fn missing_token_skips_submission() {
        let original = session(vec![RequestedInformation::PushChallenge]);

        let mut network = MockNetworkController::new();
        network.expect_await_push_challenge_token().return_once(|| None);
        // No expect_update_session: a call would panic the mock.

        let controller = SessionController::new(Arc::new(network), SessionConfig::default());
        let result = controller.handle_push_challenge(original.clone()).await;
        assert_eq!(result, original);
    }
}
