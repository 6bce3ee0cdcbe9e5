//! SOAP-over-HTTPS implementation of [`PaymentGateway`].
//!
//! One client is built per process. The underlying connection pool is shared by
//! every call and the Basic credentials are fixed at construction.

use crate::config::MerchantConfig;
use crate::errors::{Result, ThreeDsError};
use crate::gateway::PaymentGateway;
use crate::soap::{self, SoapReply};
use crate::types::{PaymentRequest, PaymentResult};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::fmt;
use tracing::{debug, info, instrument, warn};
use url::Url;

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Gateway client speaking the SOAP `authorise` operation.
#[derive(Clone)]
pub struct SoapHttpGateway {
    endpoint: Url,
    authorization: HeaderValue,
    http_client: Client,
}

impl SoapHttpGateway {
    /// Creates a client with the configured connect and read timeouts.
    ///
    /// The read timeout bounds each wait for response bytes, not the whole call.
    /// Use [`CallControl`](crate::CallControl) for an overall deadline.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_init::config::{Credentials, GatewayEnvironment, MerchantConfig};
    /// use threeds_init::gateway::soap_http::SoapHttpGateway;
    ///
    /// let config = MerchantConfig::new(
    ///     "YourMerchantAccount",
    ///     GatewayEnvironment::Test.endpoint(),
    ///     Credentials::new("YourWSUser", "YourWSUserPassword"),
    ///     "https://shop.example/Authorise3dSecurePayment",
    /// )
    /// .unwrap();
    ///
    /// let gateway = SoapHttpGateway::new(&config).unwrap();
    /// assert_eq!(gateway.endpoint().host_str(), Some("pal-test.adyen.com"));
    /// ```
    pub fn new(config: &MerchantConfig) -> Result<Self> {
        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(|e| {
                ThreeDsError::ConfigError(format!("failed to build HTTP client: {}", e))
            })?;
        Self::with_client(config, http_client)
    }

    /// Creates a client on top of an existing HTTP client.
    pub fn with_client(config: &MerchantConfig, http_client: Client) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            authorization: basic_authorization(
                config.credentials.ws_user(),
                config.credentials.ws_password(),
            )?,
            http_client,
        })
    }

    /// The SOAP endpoint this client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl fmt::Debug for SoapHttpGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoapHttpGateway")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PaymentGateway for SoapHttpGateway {
    fn name(&self) -> &str {
        "soap"
    }

    #[instrument(
        skip_all,
        fields(
            gateway = "soap",
            merchant_account = %request.merchant_account,
            reference = %request.reference
        )
    )]
    async fn authorise(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        let body = soap::encode_authorise(request)?;

        debug!(
            card = %request.card.number.masked(),
            currency = %request.amount.currency,
            value = request.amount.value,
            "sending authorise request"
        );

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header("SOAPAction", soap::AUTHORISE_ACTION)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "authorise response received");

        match soap::decode_response(&text) {
            Ok(SoapReply::Result(result)) if status.is_success() => {
                info!(
                    result_code = %result.result_code,
                    psp_reference = %result.psp_reference,
                    "authorise completed"
                );
                Ok(result)
            }
            Ok(SoapReply::Result(_)) => Err(ThreeDsError::ProtocolError(format!(
                "HTTP {} carried a payment result",
                status.as_u16()
            ))),
            Ok(SoapReply::Fault { code, message }) => {
                warn!(status = status.as_u16(), fault_code = %code, "gateway returned a fault");
                Err(ThreeDsError::GatewayFault { code, message })
            }
            Err(err) if status.is_success() => Err(err),
            Err(_) => Err(ThreeDsError::ProtocolError(format!(
                "HTTP {} without a fault envelope",
                status.as_u16()
            ))),
        }
    }
}

/// Builds a `Basic` authorization header value marked as sensitive.
fn basic_authorization(user: &str, password: &str) -> Result<HeaderValue> {
    let token = BASE64.encode(format!("{}:{}", user, password));
    let mut value = HeaderValue::from_str(&format!("Basic {}", token)).map_err(|_| {
        ThreeDsError::ConfigError("credentials cannot be sent as a header".to_string())
    })?;
    value.set_sensitive(true);
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Credentials, GatewayEnvironment};

    fn config() -> MerchantConfig {
        MerchantConfig::new(
            "YourMerchantAccount",
            GatewayEnvironment::Test.endpoint(),
            Credentials::new("ws@Company.Example", "s3cret-pass"),
            "https://shop.example/Authorise3dSecurePayment",
        )
        .unwrap()
    }

    #[test]
    fn test_basic_authorization() {
        let value = basic_authorization("Aladdin", "open sesame").unwrap();
        assert_eq!(value.to_str().unwrap(), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
        assert!(value.is_sensitive());
    }

    #[test]
    fn test_gateway_debug_hides_credentials() {
        let gateway = SoapHttpGateway::new(&config()).unwrap();
        let debug = format!("{:?}", gateway);
        assert!(debug.contains("pal-test.adyen.com"));
        assert!(!debug.contains("s3cret-pass"));
        assert!(!debug.contains("Basic"));
        assert_eq!(gateway.name(), "soap");
    }
}
