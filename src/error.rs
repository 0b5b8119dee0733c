use thiserror::Error;

/// Failure kinds surfaced by the contract gateway.
///
/// `Rpc` is transient (the node could not be reached or misbehaved) and safe to
/// retry by hand. `Contract` means the remote method rejected the call and will
/// keep doing so until the inputs change. `NotAuthorized` is returned for any
/// mutating call made without an active wallet session.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GatewayError {
    #[error("rpc failure: {0}")]
    Rpc(String),
    #[error("contract rejected `{method}`: {message}")]
    Contract { method: String, message: String },
    #[error("`{method}` requires a signed-in wallet session")]
    NotAuthorized { method: String },
}

impl GatewayError {
    pub fn rpc(message: impl Into<String>) -> Self {
        Self::Rpc(message.into())
    }

    pub fn contract(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Contract {
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn not_authorized(method: impl Into<String>) -> Self {
        Self::NotAuthorized {
            method: method.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Rpc(_))
    }
}
