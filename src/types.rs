//! Core type definitions for 3-D Secure initiation.
//!
//! This module contains the request-scoped values that flow through one initiation:
//! the payment input, the assembled request, the gateway result and the two
//! dispatch products (redirect instruction and terminal result).

use crate::browser::BrowserInfo;
use crate::card::Card;
use crate::errors::{Result, ThreeDsError};
use crate::utils::is_upper_alpha;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Amount in the minor units of an ISO-4217 currency.
///
/// EUR 1.99 is `Amount { currency: "EUR", value: 199 }`. Converting from a decimal
/// amount is the caller's job.
///
/// # Examples
///
/// ```
/// use threeds_init::types::Amount;
///
/// let amount = Amount::new("EUR", 199).unwrap();
/// assert_eq!(amount.value, 199);
///
/// assert!(Amount::new("EUR", -1).is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    /// Three-letter ISO-4217 currency code
    pub currency: String,

    /// Value in minor units
    pub value: i64,
}

impl Amount {
    /// Creates a validated amount.
    pub fn new(currency: impl Into<String>, value: i64) -> Result<Self> {
        let amount = Self {
            currency: currency.into(),
            value,
        };
        amount.validate()?;
        Ok(amount)
    }

    /// Currency must match `^[A-Z]{3}$` and value must not be negative.
    pub fn validate(&self) -> Result<()> {
        if !is_upper_alpha(&self.currency, 3) {
            return Err(ThreeDsError::InvalidInput(format!(
                "amount.currency '{}' must be a three-letter ISO-4217 code",
                self.currency
            )));
        }
        if self.value < 0 {
            return Err(ThreeDsError::InvalidInput(format!(
                "amount.value {} must not be negative",
                self.value
            )));
        }
        Ok(())
    }
}

/// Optional shopper metadata.
///
/// Unset fields are left out of the gateway payload entirely.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShopperContext {
    /// The shopper's IP address (recommended)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// The shopper's email address (recommended)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Stable shopper identifier such as a customer id (recommended)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Added to the gateway's fraud score
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fraud_offset: Option<i32>,
}

/// Everything the caller supplies for one payment attempt.
#[derive(Debug, Clone)]
pub struct PaymentInput {
    /// Merchant reference; generated from the clock when `None`
    pub reference: Option<String>,

    /// Amount to authorise
    pub amount: Amount,

    /// Card to charge
    pub card: Card,

    /// Shopper metadata
    pub shopper: ShopperContext,
}

impl PaymentInput {
    /// Creates a payment input with a generated reference and no shopper metadata.
    pub fn new(amount: Amount, card: Card) -> Self {
        Self {
            reference: None,
            amount,
            card,
            shopper: ShopperContext::default(),
        }
    }

    /// Sets an explicit merchant reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the shopper metadata.
    pub fn with_shopper(mut self, shopper: ShopperContext) -> Self {
        self.shopper = shopper;
        self
    }
}

/// A fully assembled authorization request, ready for the gateway.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// Merchant account the payment is booked on
    pub merchant_account: String,

    /// Merchant reference, unique per attempt
    pub reference: String,

    /// The shopper's IP address
    pub shopper_ip: Option<String>,

    /// The shopper's email address
    pub shopper_email: Option<String>,

    /// Stable shopper identifier
    pub shopper_reference: Option<String>,

    /// Fraud score offset
    pub fraud_offset: Option<i32>,

    /// Amount to authorise
    pub amount: Amount,

    /// Card details
    pub card: Card,

    /// Shopper browser context
    pub browser_info: BrowserInfo,
}

/// Gateway result code.
///
/// Unknown codes are kept verbatim in [`ResultCode::Other`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ResultCode {
    /// Payment authorised (not enrolled or frictionless)
    Authorised,
    /// Payment declined
    Refused,
    /// Gateway-level error on this request
    Error,
    /// Payment cancelled
    Cancelled,
    /// Payment received, outcome pending
    Received,
    /// Card enrolled; the shopper must authenticate with the issuer
    RedirectShopper,
    /// Any other code, passed through unchanged
    Other(String),
}

impl ResultCode {
    /// The gateway's spelling of the code.
    pub fn as_str(&self) -> &str {
        match self {
            ResultCode::Authorised => "Authorised",
            ResultCode::Refused => "Refused",
            ResultCode::Error => "Error",
            ResultCode::Cancelled => "Cancelled",
            ResultCode::Received => "Received",
            ResultCode::RedirectShopper => "RedirectShopper",
            ResultCode::Other(code) => code,
        }
    }
}

impl FromStr for ResultCode {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "Authorised" => ResultCode::Authorised,
            "Refused" => ResultCode::Refused,
            "Error" => ResultCode::Error,
            "Cancelled" => ResultCode::Cancelled,
            "Received" => ResultCode::Received,
            "RedirectShopper" => ResultCode::RedirectShopper,
            other => ResultCode::Other(other.to_string()),
        })
    }
}

impl From<String> for ResultCode {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(code) => code,
            Err(never) => match never {},
        }
    }
}

impl From<ResultCode> for String {
    fn from(code: ResultCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of the gateway's `authorise` operation.
///
/// `issuer_url`, `pa_request` and `md` are only populated for
/// [`ResultCode::RedirectShopper`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResult {
    /// Gateway-assigned identifier of the attempt (may be empty)
    #[serde(default)]
    pub psp_reference: String,

    /// Outcome or redirect indicator
    pub result_code: ResultCode,

    /// Authorisation code of an authorised payment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,

    /// Reason of a refusal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal_reason: Option<String>,

    /// Issuer authentication page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_url: Option<String>,

    /// Opaque 3-D Secure request payload for the issuer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pa_request: Option<String>,

    /// Opaque session token bridging both legs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub md: Option<String>,
}

/// Instruction for the web layer to send the shopper to the issuer.
///
/// The web layer renders a self-submitting POST form to `issuer_url` carrying
/// [`RedirectInstruction::form_fields`]. `md` and `pa_request` are opaque and must be
/// forwarded byte-for-byte.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectInstruction {
    /// Issuer authentication page
    pub issuer_url: String,

    /// Opaque 3-D Secure request payload
    pub pa_request: String,

    /// Opaque session token
    pub md: String,

    /// Merchant URL the issuer posts the shopper back to
    pub term_url: String,
}

impl RedirectInstruction {
    /// Form fields to POST to the issuer, in submission order.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_init::types::RedirectInstruction;
    ///
    /// let redirect = RedirectInstruction {
    ///     issuer_url: "https://issuer.example/3ds".to_string(),
    ///     pa_request: "PAREQ_BLOB".to_string(),
    ///     md: "MD_BLOB".to_string(),
    ///     term_url: "https://shop.example/return".to_string(),
    /// };
    ///
    /// let fields = redirect.form_fields();
    /// assert_eq!(fields[0], ("PaReq", "PAREQ_BLOB"));
    /// assert_eq!(fields[1], ("MD", "MD_BLOB"));
    /// ```
    pub fn form_fields(&self) -> [(&'static str, &str); 3] {
        [
            ("PaReq", self.pa_request.as_str()),
            ("MD", self.md.as_str()),
            ("TermUrl", self.term_url.as_str()),
        ]
    }
}

/// Final authorization outcome that needs no shopper redirect.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TerminalResult {
    /// Gateway-assigned identifier of the attempt
    pub psp_reference: String,

    /// Outcome code, never `RedirectShopper`
    pub result_code: ResultCode,

    /// Authorisation code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_code: Option<String>,

    /// Reason of a refusal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal_reason: Option<String>,
}

impl TerminalResult {
    /// The payment was authorised.
    pub fn is_authorised(&self) -> bool {
        self.result_code == ResultCode::Authorised
    }

    /// The gateway declined the payment.
    pub fn is_refused(&self) -> bool {
        self.result_code == ResultCode::Refused
    }

    /// The gateway reported an error for this request.
    pub fn is_error(&self) -> bool {
        self.result_code == ResultCode::Error
    }
}
