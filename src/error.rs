//! Error taxonomy for the footprint client.
//!
//! Every failure a component can report is one of three kinds:
//!
//! - [`ClientError::Validation`]: a required field is missing or malformed.
//!   Detected before any network call; the request is never sent.
//! - [`ClientError::Transport`]: the service was unreachable, timed out,
//!   answered with a non-success status, or rejected the request.
//! - [`ClientError::EmptyResult`]: the service answered but had nothing usable.

/// Errors surfaced by client components.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),

    #[error("{endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{0} returned no data")]
    EmptyResult(String),
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        ClientError::Validation(message.into())
    }

    pub fn transport(endpoint: impl Into<String>, message: impl ToString) -> Self {
        ClientError::Transport {
            endpoint: endpoint.into(),
            message: message.to_string(),
        }
    }

    pub fn empty(endpoint: impl Into<String>) -> Self {
        ClientError::EmptyResult(endpoint.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport { .. })
    }

    pub fn is_empty_result(&self) -> bool {
        matches!(self, ClientError::EmptyResult(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ClientError::validation("Please enter all required fields.").to_string(),
            "Please enter all required fields."
        );
        assert_eq!(
            ClientError::transport("get-trips", "status 500").to_string(),
            "get-trips failed: status 500"
        );
        assert_eq!(
            ClientError::empty("eco-routes").to_string(),
            "eco-routes returned no data"
        );
    }
}
