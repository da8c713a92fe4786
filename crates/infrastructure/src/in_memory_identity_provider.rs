use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{RwLock, watch};
use tracklet_application::{IdentityProvider, SignedInUser};
use tracklet_core::{AppError, AppResult, UserIdentity};
use tracklet_domain::{EmailAddress, GlobalRole};
use uuid::Uuid;

/// In-memory identity provider implementation.
///
/// Accounts are keyed by normalized email and credentials are held as plain
/// strings; this adapter exists for local development and tests only.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    auth_state: watch::Sender<Option<UserIdentity>>,
}

#[derive(Debug, Clone)]
struct Account {
    identity: UserIdentity,
    password: Option<String>,
    global_role: GlobalRole,
}

impl InMemoryIdentityProvider {
    /// Creates an empty in-memory identity provider.
    #[must_use]
    pub fn new() -> Self {
        let (auth_state, _) = watch::channel(None);
        Self {
            accounts: RwLock::new(HashMap::new()),
            auth_state,
        }
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        global_role: GlobalRole,
    ) -> AppResult<SignedInUser> {
        let email = EmailAddress::new(email)?;
        if password.len() < 8 {
            return Err(AppError::Validation(
                "password must be at least 8 characters".to_owned(),
            ));
        }

        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email.as_str()) {
            return Err(AppError::Conflict(format!(
                "account '{email}' already exists"
            )));
        }

        let identity = UserIdentity::new(
            Uuid::new_v4().to_string(),
            email.as_str(),
            display_name,
            None,
            "password",
        );
        accounts.insert(
            email.as_str().to_owned(),
            Account {
                identity: identity.clone(),
                password: Some(password.to_owned()),
                global_role,
            },
        );
        drop(accounts);

        let _ = self.auth_state.send(Some(identity.clone()));
        tracing::info!(user = identity.email(), "account registered");
        Ok(SignedInUser {
            identity,
            global_role,
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<SignedInUser> {
        let email = EmailAddress::new(email)?;

        let accounts = self.accounts.read().await;
        let account = accounts
            .get(email.as_str())
            .filter(|account| account.password.as_deref() == Some(password))
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("unknown email or wrong password".to_owned()))?;
        drop(accounts);

        let _ = self.auth_state.send(Some(account.identity.clone()));
        Ok(SignedInUser {
            identity: account.identity,
            global_role: account.global_role,
        })
    }

    async fn sign_in_with_provider(
        &self,
        provider: &str,
        email: &str,
        display_name: &str,
    ) -> AppResult<SignedInUser> {
        let email = EmailAddress::new(email)?;

        let mut accounts = self.accounts.write().await;
        let account = accounts
            .entry(email.as_str().to_owned())
            .or_insert_with(|| Account {
                identity: UserIdentity::new(
                    Uuid::new_v4().to_string(),
                    email.as_str(),
                    display_name,
                    None,
                    provider,
                ),
                password: None,
                global_role: GlobalRole::User,
            })
            .clone();
        drop(accounts);

        let _ = self.auth_state.send(Some(account.identity.clone()));
        Ok(SignedInUser {
            identity: account.identity,
            global_role: account.global_role,
        })
    }

    async fn sign_out(&self) -> AppResult<()> {
        let _ = self.auth_state.send(None);
        Ok(())
    }

    fn watch_auth_state(&self) -> watch::Receiver<Option<UserIdentity>> {
        self.auth_state.subscribe()
    }
}
