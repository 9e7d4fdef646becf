use crate::shadow::ShadowError;

/// Why a directive could not be carried out.
///
/// The first three are detected before anything is written to the shadow
/// store; the dependency variants abort translation with nothing written.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("no such endpoint: {0}")]
    NoSuchEndpoint(String),

    #[error("invalid directive: {0}")]
    InvalidDirective(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("dependency timed out: {0}")]
    DependencyTimeout(String),

    #[error("dependency failed: {0}")]
    DependencyFailure(String),
}

impl DirectiveError {
    /// `payload.type` of the `ErrorResponse` event
    pub fn error_type(&self) -> &'static str {
        match self {
            DirectiveError::NoSuchEndpoint(_) => "NO_SUCH_ENDPOINT",
            DirectiveError::InvalidDirective(_) => "INVALID_DIRECTIVE",
            DirectiveError::InvalidValue(_) => "INVALID_VALUE",
            DirectiveError::DependencyTimeout(_) => "ENDPOINT_UNREACHABLE",
            DirectiveError::DependencyFailure(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<ShadowError> for DirectiveError {
    fn from(e: ShadowError) -> Self {
        match e {
            ShadowError::Timeout { .. } => DirectiveError::DependencyTimeout(e.to_string()),
            _ => DirectiveError::DependencyFailure(e.to_string()),
        }
    }
}
