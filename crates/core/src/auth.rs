use serde::{Deserialize, Serialize};

/// User information returned by the external identity provider.
///
/// Tracklet never verifies credentials itself; it treats the provider's
/// subject, email and profile fields as canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    subject: String,
    email: String,
    display_name: String,
    photo_url: Option<String>,
    provider: String,
}

impl UserIdentity {
    /// Creates a user identity from identity-provider data.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        photo_url: Option<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            email: email.into(),
            display_name: display_name.into(),
            photo_url,
            provider: provider.into(),
        }
    }

    /// Returns the stable subject claim from the identity provider.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.subject.as_str()
    }

    /// Returns the email address the provider verified.
    ///
    /// Project membership and all audit stamps are keyed by this value.
    #[must_use]
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Returns the display name for the current user.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.display_name.as_str()
    }

    /// Returns the profile photo URL, if the provider returned one.
    #[must_use]
    pub fn photo_url(&self) -> Option<&str> {
        self.photo_url.as_deref()
    }

    /// Returns the provider that authenticated this user.
    #[must_use]
    pub fn provider(&self) -> &str {
        self.provider.as_str()
    }
}
