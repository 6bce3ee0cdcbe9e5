//! Authorization request assembly.
//!
//! Turns a caller's [`PaymentInput`] into a [`PaymentRequest`] after running every
//! shape check. Nothing leaves the process when assembly fails.

use crate::browser::BrowserInfo;
use crate::config::MerchantConfig;
use crate::errors::{Result, ThreeDsError};
use crate::types::{PaymentInput, PaymentRequest};
use crate::utils::generate_reference;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Builds a payment request using the current time for a generated reference.
pub fn build(
    config: &MerchantConfig,
    payment: PaymentInput,
    browser_info: BrowserInfo,
) -> Result<PaymentRequest> {
    build_at(config, payment, browser_info, Utc::now())
}

/// Builds a payment request, generating the reference from `now` when none is set.
///
/// # Errors
///
/// [`ThreeDsError::InvalidInput`] when a required field is missing or malformed.
pub fn build_at(
    config: &MerchantConfig,
    payment: PaymentInput,
    browser_info: BrowserInfo,
    now: DateTime<Utc>,
) -> Result<PaymentRequest> {
    let PaymentInput {
        reference,
        amount,
        card,
        shopper,
    } = payment;

    if config.merchant_account.trim().is_empty() {
        return Err(ThreeDsError::InvalidInput(
            "merchantAccount must not be empty".to_string(),
        ));
    }

    let reference = match reference {
        Some(reference) if reference.trim().is_empty() => {
            return Err(ThreeDsError::InvalidInput(
                "reference must not be empty".to_string(),
            ));
        }
        Some(reference) => reference,
        None => generate_reference(config.reference_clock, now),
    };

    amount.validate()?;
    card.validate()?;
    browser_info.validate()?;

    if let Some(ip) = &shopper.ip {
        ip.parse::<IpAddr>().map_err(|_| {
            ThreeDsError::InvalidInput(format!("shopperIP '{}' is not an IP address", ip))
        })?;
    }

    if !card.number.passes_luhn() {
        tracing::warn!(
            card = %card.number.masked(),
            reference = %reference,
            "card number fails the Luhn check; leaving the decision to the gateway"
        );
    }
    if card.is_expired_at(now.date_naive()) {
        tracing::warn!(
            card = %card.number.masked(),
            expiry_month = %card.expiry_month,
            expiry_year = %card.expiry_year,
            "card looks expired; leaving the decision to the gateway"
        );
    }

    Ok(PaymentRequest {
        merchant_account: config.merchant_account.clone(),
        reference,
        shopper_ip: shopper.ip,
        shopper_email: shopper.email,
        shopper_reference: shopper.reference,
        fraud_offset: shopper.fraud_offset,
        amount,
        card,
        browser_info,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;
    use crate::config::{Credentials, GatewayEnvironment, ReferenceClock};
    use crate::types::{Amount, ShopperContext};
    use chrono::TimeZone;

    fn config() -> MerchantConfig {
        MerchantConfig::new(
            "YourMerchantAccount",
            GatewayEnvironment::Test.endpoint(),
            Credentials::new("user", "pass"),
            "https://shop.example/Authorise3dSecurePayment",
        )
        .unwrap()
    }

    fn payment() -> PaymentInput {
        PaymentInput::new(
            Amount::new("EUR", 199).unwrap(),
            Card::new("5212345678901234", "06", "2016", "John Doe", "737"),
        )
    }

    fn browser() -> BrowserInfo {
        BrowserInfo::new("Mozilla/5.0", "text/html")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2016, 5, 20, 14, 3, 9).unwrap()
    }

    #[test]
    fn test_build_generates_reference() {
        let request = build_at(&config(), payment(), browser(), now()).unwrap();
        assert_eq!(request.reference, "TEST-3D-SECURE-PAYMENT-2016-05-20-14:03:09");
        assert_eq!(request.merchant_account, "YourMerchantAccount");
        assert_eq!(request.fraud_offset, None);
        assert_eq!(request.shopper_ip, None);
    }

    #[test]
    fn test_build_keeps_explicit_reference_and_shopper() {
        let shopper = ShopperContext {
            ip: Some("123.123.123.123".to_string()),
            email: Some("test@example.com".to_string()),
            reference: Some("YourReference".to_string()),
            fraud_offset: Some(0),
        };
        let input = payment().with_reference("order-42").with_shopper(shopper);

        let request = build_at(&config(), input, browser(), now()).unwrap();
        assert_eq!(request.reference, "order-42");
        assert_eq!(request.shopper_ip.as_deref(), Some("123.123.123.123"));
        assert_eq!(request.shopper_email.as_deref(), Some("test@example.com"));
        assert_eq!(request.shopper_reference.as_deref(), Some("YourReference"));
        assert_eq!(request.fraud_offset, Some(0));
    }

    #[test]
    fn test_build_uses_configured_clock() {
        let config = config().with_reference_clock(ReferenceClock::Utc);
        let request = build_at(&config, payment(), browser(), now()).unwrap();
        assert!(request.reference.ends_with("2016-05-20-14:03:09"));
    }

    #[test]
    fn test_build_rejects_negative_amount() {
        let mut input = payment();
        input.amount = Amount {
            currency: "EUR".to_string(),
            value: -1,
        };
        let err = build_at(&config(), input, browser(), now()).unwrap_err();
        assert!(matches!(err, ThreeDsError::InvalidInput(_)));
    }

    #[test]
    fn test_build_rejects_empty_reference() {
        let input = payment().with_reference("   ");
        assert!(build_at(&config(), input, browser(), now()).is_err());
    }

    #[test]
    fn test_build_rejects_missing_browser_info() {
        let err = build_at(&config(), payment(), BrowserInfo::new("Mozilla/5.0", ""), now())
            .unwrap_err();
        assert!(err.to_string().contains("acceptHeader"));
    }

    #[test]
    fn test_build_rejects_bad_shopper_ip() {
        let input = payment().with_shopper(ShopperContext {
            ip: Some("not-an-ip".to_string()),
            ..Default::default()
        });
        assert!(build_at(&config(), input, browser(), now()).is_err());
    }

    #[test]
    fn test_build_accepts_expired_card() {
        let later = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert!(build_at(&config(), payment(), browser(), later).is_ok());
    }
}
