//! Utility functions for 3-D Secure initiation.
//!
//! Shape checks, card number helpers and merchant reference generation shared by
//! the data model and the request assembler.

use crate::config::ReferenceClock;
use chrono::{DateTime, Local, Utc};
use url::Url;

/// Prefix of generated merchant references.
pub const REFERENCE_PREFIX: &str = "TEST-3D-SECURE-PAYMENT-";

const REFERENCE_TIME_FORMAT: &str = "%Y-%m-%d-%H:%M:%S";

/// Generates a default merchant reference for the given instant.
///
/// The timestamp is rendered as `YYYY-MM-DD-HH:mm:ss` in the zone selected by `clock`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use threeds_init::config::ReferenceClock;
/// use threeds_init::utils::generate_reference;
///
/// let now = Utc.with_ymd_and_hms(2016, 6, 1, 9, 30, 5).unwrap();
/// assert_eq!(
///     generate_reference(ReferenceClock::Utc, now),
///     "TEST-3D-SECURE-PAYMENT-2016-06-01-09:30:05"
/// );
/// ```
pub fn generate_reference(clock: ReferenceClock, now: DateTime<Utc>) -> String {
    let stamp = match clock {
        ReferenceClock::Utc => now.format(REFERENCE_TIME_FORMAT).to_string(),
        ReferenceClock::Local => now
            .with_timezone(&Local)
            .format(REFERENCE_TIME_FORMAT)
            .to_string(),
    };
    format!("{}{}", REFERENCE_PREFIX, stamp)
}

/// Masks a card number down to its last four digits.
///
/// # Examples
///
/// ```
/// use threeds_init::utils::mask_pan;
///
/// assert_eq!(mask_pan("5212345678901234"), "************1234");
/// assert_eq!(mask_pan("123"), "***");
/// ```
pub fn mask_pan(number: &str) -> String {
    let len = number.chars().count();
    if len <= 4 {
        return "*".repeat(len);
    }
    let last4: String = number.chars().skip(len - 4).collect();
    format!("{}{}", "*".repeat(len - 4), last4)
}

/// Checks a digit string against the Luhn mod-10 algorithm.
///
/// Returns `false` for empty input or any non-digit character.
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    let mut sum = 0u32;
    for (i, c) in number.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

/// Returns `true` if `s` is exactly `len` ASCII uppercase letters.
pub fn is_upper_alpha(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_uppercase())
}

/// Returns `true` if `s` is non-empty and made only of ASCII digits.
pub fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Returns `true` if `url` is hierarchical and names a host.
///
/// `https://issuer.example/3ds` qualifies; `mailto:a@b`, `file:///x` and
/// `data:,x` do not.
pub fn is_absolute_url(url: &Url) -> bool {
    !url.cannot_be_a_base() && url.host_str().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_generate_reference_utc() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 1).unwrap();
        let reference = generate_reference(ReferenceClock::Utc, now);
        assert_eq!(reference, "TEST-3D-SECURE-PAYMENT-2024-12-31-23:59:01");
    }

    #[test]
    fn test_generate_reference_local_shape() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let reference = generate_reference(ReferenceClock::Local, now);
        let stamp = reference.strip_prefix(REFERENCE_PREFIX).unwrap();
        // YYYY-MM-DD-HH:mm:ss
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[13..14], ":");
    }

    #[test]
    fn test_mask_pan() {
        assert_eq!(mask_pan("5212345678901234"), "************1234");
        assert_eq!(mask_pan("1234"), "****");
        assert_eq!(mask_pan(""), "");
    }

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("5212345678901234"));
        assert!(luhn_valid("4111111111111111"));
        assert!(luhn_valid("371449635398431"));
        assert!(!luhn_valid("4111111111111112"));
        assert!(!luhn_valid("4111 1111 1111 1111"));
        assert!(!luhn_valid(""));
    }

    #[test]
    fn test_is_absolute_url() {
        let absolute = |s: &str| is_absolute_url(&Url::parse(s).unwrap());
        assert!(absolute("https://issuer.example/3ds?session=1"));
        assert!(absolute("http://localhost:8080/return"));
        assert!(!absolute("file:///x"));
        assert!(!absolute("mailto:shopper@example.com"));
        assert!(!absolute("data:,x"));
    }

    #[test]
    fn test_shape_helpers() {
        assert!(is_upper_alpha("EUR", 3));
        assert!(!is_upper_alpha("eur", 3));
        assert!(!is_upper_alpha("EURO", 3));
        assert!(is_upper_alpha("NL", 2));
        assert!(is_digits("0737"));
        assert!(!is_digits("07a"));
        assert!(!is_digits(""));
    }
}
