//! Classification of CloudWatch Logs failures.

use std::fmt::Debug;

use aws_sdk_cloudwatchlogs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Error codes meaning the credentials themselves were refused.
const AUTH_CODES: &[&str] = &[
    "UnrecognizedClientException",
    "InvalidSignatureException",
    "IncompleteSignature",
    "InvalidClientTokenId",
    "ExpiredTokenException",
    "SignatureDoesNotMatch",
];

pub const ALREADY_EXISTS: &str = "ResourceAlreadyExistsException";
pub const ACCESS_DENIED: &str = "AccessDeniedException";

/// A failed call, reduced to what the sink needs to decide on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The service answered with an error code.
    Service { code: String, message: String },
    /// The request never got a service answer.
    Transport(String),
}

impl Failure {
    pub fn from_sdk<E, R>(err: &SdkError<E, R>) -> Self
    where
        E: ProvideErrorMetadata + std::error::Error + 'static,
        R: Debug,
    {
        match err.as_service_error() {
            Some(service) => Self::Service {
                code: service.code().unwrap_or("Unknown").to_string(),
                message: service.message().unwrap_or_default().to_string(),
            },
            None => Self::Transport(DisplayErrorContext(err).to_string()),
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            Self::Transport(_) => None,
        }
    }

    /// Whether the service refused the credentials themselves.
    #[must_use]
    pub fn is_auth(&self) -> bool {
        self.code().is_some_and(is_auth_code)
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Service { code, message } => write!(f, "{code}: {message}"),
            Self::Transport(reason) => f.write_str(reason),
        }
    }
}

#[must_use]
pub fn is_auth_code(code: &str) -> bool {
    AUTH_CODES.contains(&code)
}
