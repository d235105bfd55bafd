//! Tunable knobs for the credential and session subsystem.

/// Forward tolerance, in seconds, applied to a session token's issuance
/// instant before comparing it against the account's credential-change
/// timestamp.
///
/// Minting a token and persisting the change timestamp are not
/// simultaneous: the stamp can land after the mint by clock skew plus
/// persistence lag, and a token minted inside that window is legitimate.
/// Too small and fresh post-change sessions get rejected; too large and a
/// stolen token survives a secret change by the same margin. Tune against
/// the deployment's measured skew.
pub const DEFAULT_CREDENTIAL_GRACE_SKEW_SECONDS: i64 = 75;

/// Lifetime of a recovery token from issuance to expiry.
pub const DEFAULT_RECOVERY_TOKEN_TTL_SECONDS: i64 = 20 * 60;

/// Lifetime of a signed session token. A credential change can invalidate
/// a token well before this expiry.
pub const DEFAULT_SESSION_TOKEN_TTL_SECONDS: i64 = 90 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    credential_grace_skew_seconds: i64,
    recovery_token_ttl_seconds: i64,
    session_token_ttl_seconds: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            credential_grace_skew_seconds: DEFAULT_CREDENTIAL_GRACE_SKEW_SECONDS,
            recovery_token_ttl_seconds: DEFAULT_RECOVERY_TOKEN_TTL_SECONDS,
            session_token_ttl_seconds: DEFAULT_SESSION_TOKEN_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_credential_grace_skew_seconds(mut self, seconds: i64) -> Self {
        self.credential_grace_skew_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_recovery_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.recovery_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_token_ttl_seconds = seconds;
        self
    }

    /// Base URL of the frontend, used for CORS and recovery links.
    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn credential_grace_skew_seconds(&self) -> i64 {
        self.credential_grace_skew_seconds
    }

    #[must_use]
    pub fn recovery_token_ttl_seconds(&self) -> i64 {
        self.recovery_token_ttl_seconds
    }

    #[must_use]
    pub fn session_token_ttl_seconds(&self) -> i64 {
        self.session_token_ttl_seconds
    }
}
