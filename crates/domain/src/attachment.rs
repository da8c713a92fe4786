//! Attachment content-type allow-list.

use serde::{Deserialize, Serialize};
use tracklet_core::{AppError, AppResult};

/// Content types accepted for bug attachments.
///
/// The realtime store enforces nothing, so this check is part of the
/// contract: it must pass before any blob or store call is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentContentType {
    /// `image/png`
    Png,
    /// `image/jpeg`
    Jpeg,
    /// `application/pdf`
    Pdf,
}

impl AttachmentContentType {
    /// Returns the MIME string for this content type.
    #[must_use]
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Pdf => "application/pdf",
        }
    }

    /// Parses a MIME string against the allow-list.
    pub fn from_mime(value: &str) -> AppResult<Self> {
        match value {
            "image/png" => Ok(Self::Png),
            "image/jpeg" => Ok(Self::Jpeg),
            "application/pdf" => Ok(Self::Pdf),
            other => Err(AppError::Validation(format!(
                "only image/png, image/jpeg or application/pdf attachments are allowed, got '{other}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AttachmentContentType;

    #[test]
    fn allow_listed_types_are_accepted() {
        assert!(AttachmentContentType::from_mime("image/png").is_ok());
        assert!(AttachmentContentType::from_mime("image/jpeg").is_ok());
        assert!(AttachmentContentType::from_mime("application/pdf").is_ok());
    }

    #[test]
    fn plain_text_is_rejected_with_descriptive_error() {
        let rejected = AttachmentContentType::from_mime("text/plain");
        assert!(rejected.is_err());
        let message = rejected.err().map(|error| error.to_string()).unwrap_or_default();
        assert!(message.contains("text/plain"));
    }

    #[test]
    fn gif_is_rejected() {
        assert!(AttachmentContentType::from_mime("image/gif").is_err());
    }
}
