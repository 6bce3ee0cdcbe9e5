//! Payment gateway abstraction.
//!
//! The orchestrator only depends on [`PaymentGateway`], so the SOAP client and an
//! in-memory fake used in tests are interchangeable.

pub mod soap_http;

use crate::errors::Result;
use crate::types::{PaymentRequest, PaymentResult};
use async_trait::async_trait;

/// A gateway able to run the `authorise` operation.
///
/// Implementations must be safe to share between concurrent initiations and must
/// never retry an authorization on their own.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Returns a short name for logging (e.g. "soap").
    fn name(&self) -> &str;

    /// Sends an authorization request and returns the gateway's result.
    ///
    /// # Errors
    ///
    /// * [`ThreeDsError::TransportError`](crate::ThreeDsError::TransportError) on network failure
    /// * [`ThreeDsError::GatewayFault`](crate::ThreeDsError::GatewayFault) on a fault envelope
    /// * [`ThreeDsError::ProtocolError`](crate::ThreeDsError::ProtocolError) on an unreadable
    ///   response
    async fn authorise(&self, request: &PaymentRequest) -> Result<PaymentResult>;
}
