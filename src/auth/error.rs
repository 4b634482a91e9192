//! Authentication failure kinds.

use std::fmt;

use crate::auth::ErrorId;

/// Why a credential could not be turned into a principal.
///
/// Never shown to callers. It is logged next to an [`ErrorId`] and only the
/// id leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token not present in the configured token map.
    #[error("invalid credential")]
    InvalidCredential,

    /// Neither the CN nor any SAN of the leaf certificate is allow-listed.
    #[error("no certificate match - CN: {common_name}")]
    NoCertificateMatch { common_name: String },

    /// The declared scheme differs from the one the token layer accepts.
    #[error("unsupported authorization scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    /// Authorization value was not `<scheme> <credential>`.
    #[error("malformed authorization value")]
    MalformedCredential,

    /// No layer had anything to work with.
    #[error("no credentials presented")]
    MissingCredentials,

    /// Every applicable layer failed.
    #[error("permission denied: {}", Causes(.causes))]
    PermissionDenied { causes: Vec<AuthError> },
}

struct Causes<'a>(&'a [AuthError]);

impl fmt::Display for Causes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, cause) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{cause}")?;
        }
        Ok(())
    }
}

/// The caller-facing side of a failed authentication.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("permission denied ({error_id})")]
pub struct AuthDenied {
    pub error_id: ErrorId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_denied_lists_every_cause() {
        let err = AuthError::PermissionDenied {
            causes: vec![
                AuthError::NoCertificateMatch {
                    common_name: "evil.example.com".into(),
                },
                AuthError::InvalidCredential,
            ],
        };
        assert_eq!(
            err.to_string(),
            "permission denied: no certificate match - CN: evil.example.com; invalid credential"
        );
    }

    #[test]
    fn denied_display_only_carries_the_id() {
        let denied = AuthDenied {
            error_id: ErrorId::new(),
        };
        let text = denied.to_string();
        assert!(text.contains(denied.error_id.as_str()));
        assert!(!text.contains("credential"));
    }
}
