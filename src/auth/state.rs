//! Shared state wired into the router.

use std::sync::Arc;

use crate::account::store::AccountStore;

use super::config::AuthConfig;
use super::mailer::RecoveryMailer;
use super::secret::SecretStore;
use super::token::SessionSigner;

/// Everything the handlers and the session middleware need, behind one
/// `Arc` extension.
pub struct AuthState {
    config: AuthConfig,
    secrets: SecretStore,
    signer: SessionSigner,
    store: Arc<dyn AccountStore>,
    mailer: Arc<dyn RecoveryMailer>,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        secrets: SecretStore,
        signer: SessionSigner,
        store: Arc<dyn AccountStore>,
        mailer: Arc<dyn RecoveryMailer>,
    ) -> Self {
        Self {
            config,
            secrets,
            signer,
            store,
            mailer,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    #[must_use]
    pub fn store(&self) -> &dyn AccountStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn RecoveryMailer {
        self.mailer.as_ref()
    }
}
