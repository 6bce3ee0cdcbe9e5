//! Error types for the threeds-init library.
//!
//! Every failure of a 3-D Secure initiation surfaces as one [`ThreeDsError`] value.
//! Error values carry no credentials and no full card numbers.

use thiserror::Error;

/// Main error type for 3-D Secure initiation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ThreeDsError {
    /// The request was malformed before anything was sent to the gateway
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Network, TLS or timeout failure while talking to the gateway
    #[error("Transport error: {message}")]
    TransportError {
        /// Human-readable cause
        message: String,
        /// Whether the gateway may have received the request
        indeterminate: bool,
    },

    /// The gateway answered with a structured fault envelope
    #[error("Gateway fault {code}: {message}")]
    GatewayFault {
        /// Fault code as reported by the gateway
        code: String,
        /// Fault message as reported by the gateway
        message: String,
    },

    /// The gateway response could not be understood
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// `RedirectShopper` was returned without its continuation fields
    #[error("Malformed redirect: missing {}", .missing.join(", "))]
    MalformedRedirect {
        /// Names of the missing or empty fields
        missing: Vec<&'static str>,
    },

    /// The call was cancelled or its deadline elapsed
    #[error("Cancelled")]
    Cancelled {
        /// Whether the request had already been handed to the gateway
        indeterminate: bool,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ThreeDsError {
    /// Returns `true` when the gateway may have recorded the authorization.
    ///
    /// The caller owns reconciliation for these failures and must not blindly
    /// retry with the same payment.
    pub fn is_indeterminate(&self) -> bool {
        match self {
            ThreeDsError::TransportError { indeterminate, .. }
            | ThreeDsError::Cancelled { indeterminate } => *indeterminate,
            _ => false,
        }
    }
}

/// Result type alias for 3-D Secure operations.
pub type Result<T> = std::result::Result<T, ThreeDsError>;

impl From<reqwest::Error> for ThreeDsError {
    fn from(err: reqwest::Error) -> Self {
        // Connect failures never reach the gateway.
        let indeterminate = !err.is_connect();
        let cause = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_body() || err.is_decode() {
            "failed to read response body"
        } else {
            "request failed"
        };
        ThreeDsError::TransportError {
            message: format!("{}: {}", cause, err.without_url()),
            indeterminate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ThreeDsError::InvalidInput("amount.value must not be negative".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid input: amount.value must not be negative"
        );

        let err = ThreeDsError::GatewayFault {
            code: "soap:Server".to_string(),
            message: "validation 101 Invalid card number".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Gateway fault soap:Server: validation 101 Invalid card number"
        );
    }

    #[test]
    fn test_malformed_redirect_lists_fields() {
        let err = ThreeDsError::MalformedRedirect {
            missing: vec!["paRequest", "md"],
        };
        assert_eq!(err.to_string(), "Malformed redirect: missing paRequest, md");
    }

    #[test]
    fn test_indeterminate() {
        assert!(ThreeDsError::Cancelled { indeterminate: true }.is_indeterminate());
        assert!(!ThreeDsError::Cancelled { indeterminate: false }.is_indeterminate());
        assert!(ThreeDsError::TransportError {
            message: "request timed out".to_string(),
            indeterminate: true,
        }
        .is_indeterminate());
        assert!(!ThreeDsError::ProtocolError("bad".to_string()).is_indeterminate());
    }
}
