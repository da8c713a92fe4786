//! Identity provider port.
//!
//! Credential storage and verification live entirely in the provider; the
//! core consumes the returned identity fields as canonical.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracklet_core::{AppResult, UserIdentity};
use tracklet_domain::GlobalRole;

/// Identity and routing role returned by a successful sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInUser {
    /// Canonical identity fields from the provider.
    pub identity: UserIdentity,
    /// Global role recorded at signup; drives post-login routing only.
    pub global_role: GlobalRole,
}

/// Port for the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Registers a new account with email and password.
    ///
    /// The global role is recorded alongside the identity record; it never
    /// feeds the per-project authorization gate.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        global_role: GlobalRole,
    ) -> AppResult<SignedInUser>;

    /// Signs in with email and password.
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<SignedInUser>;

    /// Signs in through a federated provider, creating the account on first
    /// use.
    async fn sign_in_with_provider(
        &self,
        provider: &str,
        email: &str,
        display_name: &str,
    ) -> AppResult<SignedInUser>;

    /// Signs the current user out.
    async fn sign_out(&self) -> AppResult<()>;

    /// Watches the authenticated identity, `None` when signed out.
    fn watch_auth_state(&self) -> watch::Receiver<Option<UserIdentity>>;
}
