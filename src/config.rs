//! Merchant and gateway configuration.
//!
//! A [`MerchantConfig`] is built once per process and shared by every initiation.
//! Credentials are immutable after construction and never printed.

use crate::errors::{Result, ThreeDsError};
use crate::utils::is_absolute_url;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Default connect timeout for gateway calls.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read timeout for gateway calls.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway environment with its canonical endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEnvironment {
    /// Test platform
    Test,
    /// Live platform
    Live,
}

impl GatewayEnvironment {
    /// SOAP endpoint of the payment service.
    pub fn endpoint(&self) -> &'static str {
        match self {
            GatewayEnvironment::Test => "https://pal-test.adyen.com/pal/servlet/soap/Payment",
            GatewayEnvironment::Live => "https://pal-live.adyen.com/pal/servlet/soap/Payment",
        }
    }

    /// Location of the WSDL interface descriptor.
    pub fn wsdl(&self) -> &'static str {
        match self {
            GatewayEnvironment::Test => "https://pal-test.adyen.com/pal/Payment.wsdl",
            GatewayEnvironment::Live => "https://pal-live.adyen.com/pal/Payment.wsdl",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "test" => Ok(GatewayEnvironment::Test),
            "live" => Ok(GatewayEnvironment::Live),
            other => Err(ThreeDsError::ConfigError(format!(
                "unknown gateway environment '{}'",
                other
            ))),
        }
    }
}

/// Time zone used when generating default merchant references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReferenceClock {
    /// Coordinated Universal Time
    #[default]
    Utc,
    /// The process's local time zone
    Local,
}

impl ReferenceClock {
    fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "utc" => Ok(ReferenceClock::Utc),
            "local" => Ok(ReferenceClock::Local),
            other => Err(ThreeDsError::ConfigError(format!(
                "unknown reference clock '{}'",
                other
            ))),
        }
    }
}

/// Web-service credentials for HTTP Basic authentication.
#[derive(Clone)]
pub struct Credentials {
    ws_user: String,
    ws_password: SecretString,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(ws_user: impl Into<String>, ws_password: impl Into<String>) -> Self {
        Self {
            ws_user: ws_user.into(),
            ws_password: SecretString::from(ws_password.into()),
        }
    }

    /// The web-service user name.
    pub fn ws_user(&self) -> &str {
        &self.ws_user
    }

    pub(crate) fn ws_password(&self) -> &str {
        self.ws_password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ws_user", &self.ws_user)
            .field("ws_password", &"[REDACTED]")
            .finish()
    }
}

/// Per-process configuration for 3-D Secure initiation.
#[derive(Debug, Clone)]
pub struct MerchantConfig {
    /// Merchant account the payments are booked on
    pub merchant_account: String,

    /// Gateway SOAP endpoint
    pub endpoint: Url,

    /// Web-service credentials
    pub credentials: Credentials,

    /// Absolute URL the issuer posts the shopper back to
    pub term_url: String,

    /// Connect timeout for gateway calls
    pub connect_timeout: Duration,

    /// Maximum wait for each read of the gateway response
    pub read_timeout: Duration,

    /// Time zone of generated merchant references
    pub reference_clock: ReferenceClock,
}

impl MerchantConfig {
    /// Creates a new merchant configuration.
    ///
    /// Fails with [`ThreeDsError::ConfigError`] when the merchant account is empty or
    /// either URL is not absolute.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_init::config::{Credentials, GatewayEnvironment, MerchantConfig};
    ///
    /// let config = MerchantConfig::new(
    ///     "YourMerchantAccount",
    ///     GatewayEnvironment::Test.endpoint(),
    ///     Credentials::new("YourWSUser", "YourWSUserPassword"),
    ///     "https://shop.example/Authorise3dSecurePayment",
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(config.merchant_account, "YourMerchantAccount");
    /// ```
    pub fn new(
        merchant_account: impl Into<String>,
        endpoint: &str,
        credentials: Credentials,
        term_url: impl Into<String>,
    ) -> Result<Self> {
        let merchant_account = merchant_account.into();
        if merchant_account.trim().is_empty() {
            return Err(ThreeDsError::ConfigError(
                "merchant account must not be empty".to_string(),
            ));
        }

        let endpoint = parse_absolute("endpoint", endpoint)?;
        let term_url = term_url.into();
        parse_absolute("term URL", &term_url)?;

        Ok(Self {
            merchant_account,
            endpoint,
            credentials,
            term_url,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            reference_clock: ReferenceClock::default(),
        })
    }

    /// Sets the connect and read timeouts.
    pub fn with_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.connect_timeout = connect;
        self.read_timeout = read;
        self
    }

    /// Sets the time zone of generated merchant references.
    pub fn with_reference_clock(mut self, clock: ReferenceClock) -> Self {
        self.reference_clock = clock;
        self
    }

    /// Loads the configuration from `THREEDS_*` environment variables.
    ///
    /// `THREEDS_ENDPOINT_URL` wins over `THREEDS_ENVIRONMENT` (`test` or `live`,
    /// defaulting to `test`).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| ThreeDsError::ConfigError(format!("{} is not set", key)))
        };

        let endpoint = match lookup("THREEDS_ENDPOINT_URL") {
            Some(url) => url,
            None => {
                let env = lookup("THREEDS_ENVIRONMENT").unwrap_or_else(|| "test".to_string());
                GatewayEnvironment::parse(&env)?.endpoint().to_string()
            }
        };

        let credentials = Credentials::new(
            required("THREEDS_WS_USER")?,
            required("THREEDS_WS_PASSWORD")?,
        );

        let mut config = Self::new(
            required("THREEDS_MERCHANT_ACCOUNT")?,
            &endpoint,
            credentials,
            required("THREEDS_TERM_URL")?,
        )?;

        if let Some(secs) = lookup("THREEDS_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = parse_secs("THREEDS_CONNECT_TIMEOUT_SECS", &secs)?;
        }
        if let Some(secs) = lookup("THREEDS_READ_TIMEOUT_SECS") {
            config.read_timeout = parse_secs("THREEDS_READ_TIMEOUT_SECS", &secs)?;
        }
        if let Some(clock) = lookup("THREEDS_REFERENCE_CLOCK") {
            config.reference_clock = ReferenceClock::parse(&clock)?;
        }

        Ok(config)
    }
}

fn parse_absolute(what: &str, value: &str) -> Result<Url> {
    let url = Url::parse(value).map_err(|e| {
        ThreeDsError::ConfigError(format!("{} '{}' is invalid: {}", what, value, e))
    })?;
    if !is_absolute_url(&url) {
        return Err(ThreeDsError::ConfigError(format!(
            "{} '{}' must be an absolute URL",
            what, value
        )));
    }
    Ok(url)
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| {
            ThreeDsError::ConfigError(format!("{} must be a whole number of seconds", key))
        })
}
