//! SOAP wire codec for the gateway's `authorise` operation.
//!
//! Requests are serialized with quick-xml's serde serializer. Responses are read with
//! the pull parser and matched on local names, so the gateway may use any namespace
//! prefixes it likes.

use crate::errors::{Result, ThreeDsError};
use crate::types::{PaymentRequest, PaymentResult, ResultCode};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::HashMap;

/// SOAP 1.1 envelope namespace.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Namespace of the payment service types.
pub const PAYMENT_NS: &str = "http://payment.services.adyen.com";

/// Namespace of the shared types (amount, address, browser info).
pub const COMMON_NS: &str = "http://common.services.adyen.com";

/// `SOAPAction` header value of the authorise operation.
pub const AUTHORISE_ACTION: &str = "\"authorise\"";

// ============================================================================
// Request serialization structures
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename = "soap:Envelope")]
struct EnvelopeXml<'a> {
    #[serde(rename = "@xmlns:soap")]
    soap_ns: &'static str,
    #[serde(rename = "@xmlns:pay")]
    payment_ns: &'static str,
    #[serde(rename = "@xmlns:com")]
    common_ns: &'static str,
    #[serde(rename = "soap:Body")]
    body: BodyXml<'a>,
}

#[derive(Debug, Serialize)]
struct BodyXml<'a> {
    #[serde(rename = "pay:authorise")]
    authorise: AuthoriseXml<'a>,
}

#[derive(Debug, Serialize)]
struct AuthoriseXml<'a> {
    #[serde(rename = "pay:paymentRequest")]
    payment_request: PaymentRequestXml<'a>,
}

// Children follow schema order.
#[derive(Debug, Serialize)]
struct PaymentRequestXml<'a> {
    #[serde(rename = "pay:amount")]
    amount: AmountXml<'a>,
    #[serde(rename = "pay:browserInfo")]
    browser_info: BrowserInfoXml<'a>,
    #[serde(rename = "pay:card")]
    card: CardXml<'a>,
    #[serde(rename = "pay:fraudOffset", skip_serializing_if = "Option::is_none")]
    fraud_offset: Option<i32>,
    #[serde(rename = "pay:merchantAccount")]
    merchant_account: &'a str,
    #[serde(rename = "pay:reference")]
    reference: &'a str,
    #[serde(rename = "pay:shopperEmail", skip_serializing_if = "Option::is_none")]
    shopper_email: Option<&'a str>,
    #[serde(rename = "pay:shopperIP", skip_serializing_if = "Option::is_none")]
    shopper_ip: Option<&'a str>,
    #[serde(rename = "pay:shopperReference", skip_serializing_if = "Option::is_none")]
    shopper_reference: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct AmountXml<'a> {
    #[serde(rename = "com:currency")]
    currency: &'a str,
    #[serde(rename = "com:value")]
    value: i64,
}

#[derive(Debug, Serialize)]
struct BrowserInfoXml<'a> {
    #[serde(rename = "com:acceptHeader")]
    accept_header: &'a str,
    #[serde(rename = "com:userAgent")]
    user_agent: &'a str,
}

#[derive(Debug, Serialize)]
struct CardXml<'a> {
    #[serde(rename = "pay:billingAddress", skip_serializing_if = "Option::is_none")]
    billing_address: Option<AddressXml<'a>>,
    #[serde(rename = "pay:cvc")]
    cvc: &'a str,
    #[serde(rename = "pay:expiryMonth")]
    expiry_month: &'a str,
    #[serde(rename = "pay:expiryYear")]
    expiry_year: &'a str,
    #[serde(rename = "pay:holderName")]
    holder_name: &'a str,
    #[serde(rename = "pay:number")]
    number: &'a str,
}

#[derive(Debug, Serialize)]
struct AddressXml<'a> {
    #[serde(rename = "com:city")]
    city: &'a str,
    #[serde(rename = "com:country")]
    country: &'a str,
    #[serde(rename = "com:houseNumberOrName")]
    house_number_or_name: &'a str,
    #[serde(rename = "com:postalCode")]
    postal_code: &'a str,
    #[serde(rename = "com:stateOrProvince")]
    state_or_province: &'a str,
    #[serde(rename = "com:street")]
    street: &'a str,
}

/// Encodes a payment request as a SOAP `authorise` envelope.
pub fn encode_authorise(request: &PaymentRequest) -> Result<String> {
    use secrecy::ExposeSecret;

    let card = &request.card;
    let envelope = EnvelopeXml {
        soap_ns: SOAP_ENVELOPE_NS,
        payment_ns: PAYMENT_NS,
        common_ns: COMMON_NS,
        body: BodyXml {
            authorise: AuthoriseXml {
                payment_request: PaymentRequestXml {
                    amount: AmountXml {
                        currency: &request.amount.currency,
                        value: request.amount.value,
                    },
                    browser_info: BrowserInfoXml {
                        accept_header: &request.browser_info.accept_header,
                        user_agent: &request.browser_info.user_agent,
                    },
                    card: CardXml {
                        billing_address: card.billing_address.as_ref().map(|a| AddressXml {
                            city: &a.city,
                            country: &a.country,
                            house_number_or_name: &a.house_number_or_name,
                            postal_code: &a.postal_code,
                            state_or_province: &a.state_or_province,
                            street: &a.street,
                        }),
                        cvc: card.cvc.expose_secret(),
                        expiry_month: &card.expiry_month,
                        expiry_year: &card.expiry_year,
                        holder_name: &card.holder_name,
                        number: card.number.expose(),
                    },
                    fraud_offset: request.fraud_offset,
                    merchant_account: &request.merchant_account,
                    reference: &request.reference,
                    shopper_email: request.shopper_email.as_deref(),
                    shopper_ip: request.shopper_ip.as_deref(),
                    shopper_reference: request.shopper_reference.as_deref(),
                },
            },
        },
    };

    let xml = quick_xml::se::to_string(&envelope).map_err(|e| {
        ThreeDsError::InvalidInput(format!("failed to encode authorise request: {}", e))
    })?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>{}", xml))
}

// ============================================================================
// Response parsing
// ============================================================================

/// A decoded SOAP response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapReply {
    /// `authoriseResponse/paymentResult`
    Result(PaymentResult),
    /// `soap:Fault`
    Fault {
        /// `faultcode`
        code: String,
        /// `faultstring`
        message: String,
    },
}

/// Decodes an `authorise` response or a SOAP fault.
///
/// # Errors
///
/// [`ThreeDsError::ProtocolError`] when the body is not XML, carries neither a
/// payment result nor a fault, or the payment result has no `resultCode`.
pub fn decode_response(body: &str) -> Result<SoapReply> {
    let mut reader = Reader::from_str(body);
    // Opaque tokens must survive byte-for-byte.
    reader.config_mut().trim_text(false);

    let mut stack: Vec<(String, bool)> = Vec::new();
    let mut text = String::new();
    let mut result_depth: Option<usize> = None;
    let mut fault_depth: Option<usize> = None;
    let mut result_fields: HashMap<String, String> = HashMap::new();
    let mut fault_fields: HashMap<String, String> = HashMap::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            ThreeDsError::ProtocolError(format!(
                "malformed XML at byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                let name = local_name(&e);
                let nil = is_nil(&e);
                stack.push((name, nil));
                text.clear();

                let depth = stack.len();
                match stack[depth - 1].0.as_str() {
                    "paymentResult" if result_depth.is_none() => result_depth = Some(depth),
                    "Fault" if fault_depth.is_none() => fault_depth = Some(depth),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                let depth = stack.len();
                if name == "paymentResult" && result_depth.is_none() {
                    result_depth = Some(depth + 1);
                } else if !is_nil(&e) {
                    if result_depth == Some(depth) {
                        result_fields.insert(name, String::new());
                    } else if fault_depth == Some(depth) {
                        fault_fields.insert(name, String::new());
                    }
                }
            }
            Event::Text(t) => {
                let unescaped = t.unescape().map_err(|e| {
                    ThreeDsError::ProtocolError(format!("invalid XML text: {}", e))
                })?;
                text.push_str(&unescaped);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                let depth = stack.len();
                if let Some((name, nil)) = stack.pop() {
                    if !nil {
                        if result_depth.map(|d| depth == d + 1).unwrap_or(false) {
                            result_fields.insert(name, std::mem::take(&mut text));
                        } else if fault_depth.map(|d| depth == d + 1).unwrap_or(false) {
                            fault_fields.insert(name, std::mem::take(&mut text));
                        }
                    }
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if fault_depth.is_some() {
        return Ok(SoapReply::Fault {
            code: fault_fields.remove("faultcode").unwrap_or_default(),
            message: fault_fields.remove("faultstring").unwrap_or_default(),
        });
    }

    if result_depth.is_none() {
        return Err(ThreeDsError::ProtocolError(
            "response contains neither paymentResult nor Fault".to_string(),
        ));
    }

    let result_code = result_fields
        .remove("resultCode")
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ThreeDsError::ProtocolError("paymentResult has no resultCode".to_string()))?;

    Ok(SoapReply::Result(PaymentResult {
        psp_reference: result_fields.remove("pspReference").unwrap_or_default(),
        result_code: ResultCode::from(result_code),
        auth_code: result_fields.remove("authCode"),
        refusal_reason: result_fields.remove("refusalReason"),
        issuer_url: result_fields.remove("issuerUrl"),
        pa_request: result_fields.remove("paRequest"),
        md: result_fields.remove("md"),
    }))
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn is_nil(e: &BytesStart<'_>) -> bool {
    e.attributes()
        .flatten()
        .any(|attr| attr.key.local_name().as_ref() == b"nil" && attr.value.as_ref() == b"true")
}
