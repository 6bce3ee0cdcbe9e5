//! Shopper browser context required for the 3-D Secure directory inquiry.

use crate::errors::{Result, ThreeDsError};
use reqwest::header::{HeaderMap, ACCEPT, USER_AGENT};
use serde::{Deserialize, Serialize};

/// `User-Agent` and `Accept` headers of the shopper's browser.
///
/// Without both the gateway silently falls back to a non-3-D Secure flow, so a
/// missing value is a hard error.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BrowserInfo {
    /// The shopper's `User-Agent` header
    pub user_agent: String,

    /// The shopper's `Accept` header
    pub accept_header: String,
}

impl BrowserInfo {
    /// Creates browser context from raw header values.
    pub fn new(user_agent: impl Into<String>, accept_header: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            accept_header: accept_header.into(),
        }
    }

    /// Reads the context from the inbound request headers of the shopper.
    ///
    /// # Examples
    ///
    /// ```
    /// use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
    /// use threeds_init::browser::BrowserInfo;
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
    /// headers.insert(ACCEPT, HeaderValue::from_static("text/html"));
    ///
    /// let info = BrowserInfo::from_headers(&headers).unwrap();
    /// assert_eq!(info.user_agent, "Mozilla/5.0");
    /// ```
    pub fn from_headers(headers: &HeaderMap) -> Result<Self> {
        let read = |name: &reqwest::header::HeaderName, field: &str| -> Result<String> {
            let value = headers.get(name).ok_or_else(|| {
                ThreeDsError::InvalidInput(format!(
                    "browserInfo.{}: header {} is missing",
                    field, name
                ))
            })?;
            let value = value.to_str().map_err(|_| {
                ThreeDsError::InvalidInput(format!(
                    "browserInfo.{}: header {} is not valid text",
                    field, name
                ))
            })?;
            Ok(value.to_string())
        };

        let info = Self {
            user_agent: read(&USER_AGENT, "userAgent")?,
            accept_header: read(&ACCEPT, "acceptHeader")?,
        };
        info.validate()?;
        Ok(info)
    }

    /// Both values must be non-empty.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(ThreeDsError::InvalidInput(
                "browserInfo.userAgent must not be empty".to_string(),
            ));
        }
        if self.accept_header.trim().is_empty() {
            return Err(ThreeDsError::InvalidInput(
                "browserInfo.acceptHeader must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (X11)"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml"),
        );

        let info = BrowserInfo::from_headers(&headers).unwrap();
        assert_eq!(info.user_agent, "Mozilla/5.0 (X11)");
        assert_eq!(info.accept_header, "text/html,application/xhtml+xml");
    }

    #[test]
    fn test_missing_accept_header() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));

        let err = BrowserInfo::from_headers(&headers).unwrap_err();
        assert!(matches!(err, ThreeDsError::InvalidInput(_)));
        assert!(err.to_string().contains("acceptHeader"));
    }

    #[test]
    fn test_empty_user_agent() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(""));
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        assert!(BrowserInfo::from_headers(&headers).is_err());
        assert!(BrowserInfo::new("", "*/*").validate().is_err());
    }

    #[test]
    fn test_serialization_field_names() {
        let json = serde_json::to_string(&BrowserInfo::new("ua", "*/*")).unwrap();
        assert_eq!(json, r#"{"userAgent":"ua","acceptHeader":"*/*"}"#);
    }
}
