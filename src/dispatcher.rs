//! Result dispatch: the `resultCode` state machine.
//!
//! | resultCode        | Output                                  |
//! |-------------------|-----------------------------------------|
//! | `RedirectShopper` | [`Dispatch::Redirect`] with the term URL |
//! | anything else     | [`Dispatch::Terminal`], passed through   |
//!
//! `md` and `paRequest` are copied as-is; they are never trimmed, decoded or compared.

use crate::errors::{Result, ThreeDsError};
use crate::types::{PaymentResult, RedirectInstruction, ResultCode, TerminalResult};
use crate::utils::is_absolute_url;
use url::Url;

/// What the gateway's result asks the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Send the shopper to the issuer
    Redirect(RedirectInstruction),
    /// The authorization is finished
    Terminal(TerminalResult),
}

/// Maps a gateway result onto a redirect instruction or a terminal result.
///
/// `term_url` is the caller's configured return URL; the gateway never supplies it.
///
/// # Errors
///
/// [`ThreeDsError::MalformedRedirect`] when `RedirectShopper` arrives with an empty or
/// missing `issuerUrl`, `paRequest` or `md`, or with an `issuerUrl` that is not an
/// absolute URL.
///
/// # Examples
///
/// ```
/// use threeds_init::dispatcher::{dispatch, Dispatch};
/// use threeds_init::types::{PaymentResult, ResultCode};
///
/// let result = PaymentResult {
///     psp_reference: "8814689190961342".to_string(),
///     result_code: ResultCode::Authorised,
///     auth_code: Some("12345".to_string()),
///     refusal_reason: None,
///     issuer_url: None,
///     pa_request: None,
///     md: None,
/// };
///
/// let dispatched = dispatch(result, "https://shop.example/return").unwrap();
/// let Dispatch::Terminal(terminal) = dispatched else {
///     panic!("expected a terminal result");
/// };
/// assert!(terminal.is_authorised());
/// ```
pub fn dispatch(result: PaymentResult, term_url: &str) -> Result<Dispatch> {
    match result.result_code {
        ResultCode::RedirectShopper => redirect(result, term_url).map(Dispatch::Redirect),
        result_code => Ok(Dispatch::Terminal(TerminalResult {
            psp_reference: result.psp_reference,
            result_code,
            auth_code: result.auth_code,
            refusal_reason: result.refusal_reason,
        })),
    }
}

fn redirect(result: PaymentResult, term_url: &str) -> Result<RedirectInstruction> {
    let mut missing = Vec::new();
    let issuer_url = present(result.issuer_url, "issuerUrl", &mut missing);
    let pa_request = present(result.pa_request, "paRequest", &mut missing);
    let md = present(result.md, "md", &mut missing);
    if term_url.is_empty() {
        missing.push("termUrl");
    }

    match (issuer_url, pa_request, md) {
        (Some(issuer_url), Some(pa_request), Some(md)) if missing.is_empty() => {
            let absolute = Url::parse(&issuer_url)
                .map(|url| is_absolute_url(&url))
                .unwrap_or(false);
            if !absolute {
                return Err(ThreeDsError::MalformedRedirect {
                    missing: vec!["issuerUrl"],
                });
            }

            tracing::debug!(
                issuer_url = %issuer_url,
                pa_request_len = pa_request.len(),
                md_len = md.len(),
                "card enrolled, redirecting shopper to issuer"
            );

            Ok(RedirectInstruction {
                issuer_url,
                pa_request,
                md,
                term_url: term_url.to_string(),
            })
        }
        _ => Err(ThreeDsError::MalformedRedirect { missing }),
    }
}

fn present(
    value: Option<String>,
    field: &'static str,
    missing: &mut Vec<&'static str>,
) -> Option<String> {
    match value {
        Some(value) if !value.is_empty() => Some(value),
        _ => {
            missing.push(field);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TERM_URL: &str = "https://shop.example/Authorise3dSecurePayment";

    fn redirect_result() -> PaymentResult {
        PaymentResult {
            psp_reference: String::new(),
            result_code: ResultCode::RedirectShopper,
            auth_code: None,
            refusal_reason: None,
            issuer_url: Some("https://issuer.example/3ds".to_string()),
            pa_request: Some("PAREQ_BLOB".to_string()),
            md: Some("MD_BLOB".to_string()),
        }
    }

    fn terminal_result(code: ResultCode) -> PaymentResult {
        PaymentResult {
            psp_reference: "8814689190961342".to_string(),
            result_code: code,
            auth_code: None,
            refusal_reason: None,
            issuer_url: None,
            pa_request: None,
            md: None,
        }
    }

    #[test]
    fn test_redirect_shopper() {
        let dispatched = dispatch(redirect_result(), TERM_URL).unwrap();
        assert_eq!(
            dispatched,
            Dispatch::Redirect(RedirectInstruction {
                issuer_url: "https://issuer.example/3ds".to_string(),
                pa_request: "PAREQ_BLOB".to_string(),
                md: "MD_BLOB".to_string(),
                term_url: TERM_URL.to_string(),
            })
        );
    }

    #[test]
    fn test_tokens_pass_through_untouched() {
        let mut result = redirect_result();
        result.md = Some("  bWQ=\r\n+/ ".to_string());
        result.pa_request = Some("eJzVWFmT\nqjgU/".to_string());

        let Dispatch::Redirect(redirect) = dispatch(result, TERM_URL).unwrap() else {
            panic!("expected a redirect");
        };
        assert_eq!(redirect.md, "  bWQ=\r\n+/ ");
        assert_eq!(redirect.pa_request, "eJzVWFmT\nqjgU/");
    }

    #[test]
    fn test_redirect_with_empty_md() {
        let mut result = redirect_result();
        result.md = Some(String::new());
        assert_eq!(
            dispatch(result, TERM_URL).unwrap_err(),
            ThreeDsError::MalformedRedirect { missing: vec!["md"] }
        );
    }

    #[test]
    fn test_redirect_with_missing_fields() {
        let mut result = redirect_result();
        result.issuer_url = None;
        result.pa_request = None;
        assert_eq!(
            dispatch(result, TERM_URL).unwrap_err(),
            ThreeDsError::MalformedRedirect {
                missing: vec!["issuerUrl", "paRequest"]
            }
        );
    }

    #[test]
    fn test_redirect_with_relative_issuer_url() {
        let mut result = redirect_result();
        result.issuer_url = Some("/3ds/start".to_string());
        assert!(matches!(
            dispatch(result, TERM_URL),
            Err(ThreeDsError::MalformedRedirect { .. })
        ));
    }

    #[test]
    fn test_redirect_with_hostless_issuer_url() {
        for issuer_url in ["file:///x", "mailto:issuer@example.com", "data:,x"] {
            let mut result = redirect_result();
            result.issuer_url = Some(issuer_url.to_string());
            assert_eq!(
                dispatch(result, TERM_URL),
                Err(ThreeDsError::MalformedRedirect {
                    missing: vec!["issuerUrl"],
                }),
                "{}",
                issuer_url
            );
        }
    }

    #[test]
    fn test_authorised_is_terminal() {
        let mut result = terminal_result(ResultCode::Authorised);
        result.auth_code = Some("12345".to_string());

        let Dispatch::Terminal(terminal) = dispatch(result, TERM_URL).unwrap() else {
            panic!("expected a terminal result");
        };
        assert_eq!(terminal.psp_reference, "8814689190961342");
        assert_eq!(terminal.auth_code.as_deref(), Some("12345"));
        assert!(terminal.is_authorised());
    }

    #[test]
    fn test_refused_and_error_are_terminal() {
        let mut refused = terminal_result(ResultCode::Refused);
        refused.refusal_reason = Some("Expired Card".to_string());
        let Dispatch::Terminal(terminal) = dispatch(refused, TERM_URL).unwrap() else {
            panic!("expected a terminal result");
        };
        assert_eq!(terminal.refusal_reason.as_deref(), Some("Expired Card"));

        let Dispatch::Terminal(terminal) =
            dispatch(terminal_result(ResultCode::Error), TERM_URL).unwrap()
        else {
            panic!("expected a terminal result");
        };
        assert!(terminal.is_error());
    }

    #[test]
    fn test_unknown_code_passes_through() {
        let code = ResultCode::Other("IdentifyShopper".to_string());
        let Dispatch::Terminal(terminal) =
            dispatch(terminal_result(code.clone()), TERM_URL).unwrap()
        else {
            panic!("expected a terminal result");
        };
        assert_eq!(terminal.result_code, code);
    }

    #[test]
    fn test_terminal_ignores_stray_redirect_fields() {
        let mut result = terminal_result(ResultCode::Authorised);
        result.md = Some("MD_BLOB".to_string());
        assert!(matches!(
            dispatch(result, TERM_URL).unwrap(),
            Dispatch::Terminal(_)
        ));
    }
}
