//! Card and billing address model.
//!
//! The card is a plain data holder. Only shape checks happen here; BIN routing and
//! 3-D Secure enrollment are decided by the gateway.

use crate::errors::{Result, ThreeDsError};
use crate::utils::{is_digits, is_upper_alpha, luhn_valid, mask_pan};
use chrono::{Datelike, NaiveDate};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Billing address attached to a card.
///
/// Every field is sent to the gateway, including empty ones.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Street name
    pub street: String,

    /// House number or name
    pub house_number_or_name: String,

    /// City
    pub city: String,

    /// Postal or zip code
    pub postal_code: String,

    /// State or province, may be empty
    pub state_or_province: String,

    /// Country in ISO 3166-1 alpha-2 format (e.g. "NL")
    pub country: String,
}

impl Address {
    /// Checks the country code shape.
    pub fn validate(&self) -> Result<()> {
        if !is_upper_alpha(&self.country, 2) {
            return Err(ThreeDsError::InvalidInput(format!(
                "billingAddress.country '{}' must be an ISO 3166-1 alpha-2 code",
                self.country
            )));
        }
        Ok(())
    }
}

/// Primary account number, kept out of `Debug` output.
#[derive(Clone)]
pub struct CardNumber(SecretString);

impl CardNumber {
    /// Wraps a card number. No validation happens here.
    pub fn new(number: impl Into<String>) -> Self {
        Self(SecretString::from(number.into()))
    }

    /// Last four digits of the number.
    pub fn last4(&self) -> String {
        let number = self.0.expose_secret();
        let len = number.chars().count();
        number.chars().skip(len.saturating_sub(4)).collect()
    }

    /// Number with everything but the last four digits masked.
    pub fn masked(&self) -> String {
        mask_pan(self.0.expose_secret())
    }

    /// Advisory Luhn check; the gateway stays authoritative.
    pub fn passes_luhn(&self) -> bool {
        luhn_valid(self.0.expose_secret())
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for CardNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardNumber({})", self.masked())
    }
}

impl From<&str> for CardNumber {
    fn from(number: &str) -> Self {
        Self::new(number)
    }
}

/// Payment card details for a single authorization.
#[derive(Clone)]
pub struct Card {
    /// Card number, digits only
    pub number: CardNumber,

    /// Expiry month as a 2-digit string ("01" to "12")
    pub expiry_month: String,

    /// Expiry year written in full (e.g. "2016")
    pub expiry_year: String,

    /// Card holder name as embossed on the card
    pub holder_name: String,

    /// CVC2 / CVV2 / CID
    pub cvc: SecretString,

    /// Optional billing address
    pub billing_address: Option<Address>,
}

impl Card {
    /// Creates a card without a billing address.
    ///
    /// # Examples
    ///
    /// ```
    /// use threeds_init::card::Card;
    ///
    /// let card = Card::new("5212345678901234", "06", "2016", "John Doe", "737");
    /// assert_eq!(card.number.last4(), "1234");
    /// assert!(card.validate().is_ok());
    /// ```
    pub fn new(
        number: impl Into<String>,
        expiry_month: impl Into<String>,
        expiry_year: impl Into<String>,
        holder_name: impl Into<String>,
        cvc: impl Into<String>,
    ) -> Self {
        Self {
            number: CardNumber::new(number),
            expiry_month: expiry_month.into(),
            expiry_year: expiry_year.into(),
            holder_name: holder_name.into(),
            cvc: SecretString::from(cvc.into()),
            billing_address: None,
        }
    }

    /// Attaches a billing address.
    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    /// Shape checks: digits-only number, "01"-"12" month, 4-digit year,
    /// non-empty holder name, 3-4 digit CVC and a valid billing address.
    pub fn validate(&self) -> Result<()> {
        if !is_digits(self.number.expose()) {
            return Err(ThreeDsError::InvalidInput(format!(
                "card.number {} must contain digits only",
                self.number.masked()
            )));
        }

        let month_ok = self.expiry_month.len() == 2
            && is_digits(&self.expiry_month)
            && matches!(self.expiry_month.parse::<u8>(), Ok(1..=12));
        if !month_ok {
            return Err(ThreeDsError::InvalidInput(format!(
                "card.expiryMonth '{}' must be between \"01\" and \"12\"",
                self.expiry_month
            )));
        }

        if self.expiry_year.len() != 4 || !is_digits(&self.expiry_year) {
            return Err(ThreeDsError::InvalidInput(format!(
                "card.expiryYear '{}' must be a 4-digit year",
                self.expiry_year
            )));
        }

        if self.holder_name.trim().is_empty() {
            return Err(ThreeDsError::InvalidInput(
                "card.holderName must not be empty".to_string(),
            ));
        }

        let cvc = self.cvc.expose_secret();
        if !(3..=4).contains(&cvc.len()) || !is_digits(cvc) {
            return Err(ThreeDsError::InvalidInput(
                "card.cvc must be 3 or 4 digits".to_string(),
            ));
        }

        if let Some(address) = &self.billing_address {
            address.validate()?;
        }

        Ok(())
    }

    /// Advisory expiry check: `true` once the expiry month has fully passed.
    ///
    /// Assumes [`Card::validate`] succeeded; unparseable dates count as not expired.
    pub fn is_expired_at(&self, today: NaiveDate) -> bool {
        let (Ok(year), Ok(month)) = (
            self.expiry_year.parse::<i32>(),
            self.expiry_month.parse::<u32>(),
        ) else {
            return false;
        };
        (year, month) < (today.year(), today.month())
    }
}

impl fmt::Debug for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Card")
            .field("number", &self.number)
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("holder_name", &self.holder_name)
            .field("cvc", &"***")
            .field("billing_address", &self.billing_address)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amsterdam() -> Address {
        Address {
            street: "Simon Carmiggeltstraat".to_string(),
            house_number_or_name: "6-50".to_string(),
            city: "Amsterdam".to_string(),
            postal_code: "1011 DJ".to_string(),
            state_or_province: String::new(),
            country: "NL".to_string(),
        }
    }

    fn test_card() -> Card {
        Card::new("5212345678901234", "06", "2016", "John Doe", "737")
            .with_billing_address(amsterdam())
    }

    #[test]
    fn test_valid_card() {
        assert!(test_card().validate().is_ok());
        assert!(test_card().number.passes_luhn());
    }

    #[test]
    fn test_debug_hides_pan_and_cvc() {
        let debug = format!("{:?}", test_card());
        assert!(!debug.contains("5212345678901234"));
        assert!(!debug.contains("737"));
        assert!(debug.contains("************1234"));
    }

    #[test]
    fn test_invalid_number() {
        let card = Card::new("5212 3456 7890 1234", "06", "2016", "John Doe", "737");
        let err = card.validate().unwrap_err();
        assert!(matches!(err, ThreeDsError::InvalidInput(_)));
        assert!(!err.to_string().contains("5212 3456"));
    }

    #[test]
    fn test_invalid_expiry() {
        for month in ["00", "13", "6", "ab"] {
            let card = Card::new("5212345678901234", month, "2016", "John Doe", "737");
            assert!(card.validate().is_err(), "month {month} should fail");
        }
        let card = Card::new("5212345678901234", "06", "16", "John Doe", "737");
        assert!(card.validate().is_err());
    }

    #[test]
    fn test_invalid_holder_and_cvc() {
        let card = Card::new("5212345678901234", "06", "2016", " ", "737");
        assert!(card.validate().is_err());

        for cvc in ["73", "73777", "7a7"] {
            let card = Card::new("5212345678901234", "06", "2016", "John Doe", cvc);
            assert!(card.validate().is_err(), "cvc {cvc} should fail");
        }
        let card = Card::new("378282246310005", "06", "2016", "John Doe", "7373");
        assert!(card.validate().is_ok());
    }

    #[test]
    fn test_invalid_country() {
        let mut address = amsterdam();
        address.country = "NLD".to_string();
        let card = test_card().with_billing_address(address);
        assert!(card.validate().is_err());
    }

    #[test]
    fn test_is_expired_at() {
        let card = test_card();
        let june = NaiveDate::from_ymd_opt(2016, 6, 30).unwrap();
        let july = NaiveDate::from_ymd_opt(2016, 7, 1).unwrap();
        assert!(!card.is_expired_at(june));
        assert!(card.is_expired_at(july));
    }
}
