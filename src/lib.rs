//! # threeds-init
//!
//! 3-D Secure payment initiation against a SOAP card payment gateway.
//!
//! A card authorization is sent to the gateway's `authorise` operation. When the
//! card is enrolled in 3-D Secure, the gateway answers `RedirectShopper` and the
//! shopper has to authenticate on an issuer-hosted page before a second call
//! finalizes the payment. This crate covers the first leg: it builds the request,
//! calls the gateway once, and tells the caller whether to redirect the shopper or
//! report a terminal result.
//!
//! ## Features
//!
//! - **Request assembly**: shape checks on amount, card, browser and shopper data
//! - **SOAP client**: HTTP Basic credentials, connect/read timeouts, fault mapping
//! - **Dispatch**: `resultCode` state machine producing a redirect or a terminal result
//! - **Cancellation**: caller-supplied deadline and cancellation token
//! - **Pluggable gateway**: anything implementing [`PaymentGateway`] can stand in
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use threeds_init::{
//!     initiate_three_d_secure, Amount, BrowserInfo, CallControl, Card, Credentials,
//!     GatewayEnvironment, MerchantConfig, Outcome, PaymentInput, SoapHttpGateway,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MerchantConfig::new(
//!     "YourMerchantAccount",
//!     GatewayEnvironment::Test.endpoint(),
//!     Credentials::new("YourWSUser", "YourWSUserPassword"),
//!     "https://shop.example/Authorise3dSecurePayment",
//! )?;
//! let gateway = SoapHttpGateway::new(&config)?;
//!
//! let payment = PaymentInput::new(
//!     Amount::new("EUR", 199)?, // EUR 1.99 in minor units
//!     Card::new("5212345678901234", "06", "2016", "John Doe", "737"),
//! );
//! let browser = BrowserInfo::new("Mozilla/5.0", "text/html;q=0.9,*/*");
//!
//! match initiate_three_d_secure(&gateway, &config, payment, browser, &CallControl::new()).await {
//!     Outcome::Redirect(redirect) => {
//!         // POST PaReq, MD and TermUrl to the issuer
//!         for (name, value) in redirect.form_fields() {
//!             println!("{} = {}", name, value);
//!         }
//!     }
//!     Outcome::Terminal(terminal) => println!("{}", terminal.result_code),
//!     Outcome::Failure(err) => eprintln!("{}", err),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Flow
//!
//! 1. **Assemble**: [`assembler::build`] validates the input and generates a reference
//! 2. **Authorise**: [`PaymentGateway::authorise`] posts the SOAP envelope
//! 3. **Dispatch**: [`dispatcher::dispatch`] maps `resultCode` onto the next step
//! 4. **Redirect**: the web layer posts `PaReq`, `MD` and `TermUrl` to the issuer
//! 5. **Complete**: the issuer posts `MD` and `PaRes` back to `TermUrl` (second leg)
//!
//! ## Failures
//!
//! Every failure is a [`ThreeDsError`]. Nothing is retried: an authorization is not
//! idempotent. [`ThreeDsError::is_indeterminate`] tells the caller when the gateway
//! may have recorded the payment and reconciliation is needed.
//!
//! ## Security
//!
//! - **Credentials**: held in [`secrecy::SecretString`], sent only as a sensitive header
//! - **Card data**: PAN and CVC are never logged; only the last four digits appear
//! - **Opaque tokens**: `md` and `paRequest` are forwarded byte-for-byte, never logged

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod assembler;
pub mod browser;
pub mod card;
pub mod config;
pub mod dispatcher;
pub mod errors;
pub mod gateway;
pub mod orchestrator;
pub mod soap;
pub mod types;
pub mod utils;

// Re-export commonly used items
pub use browser::BrowserInfo;
pub use card::{Address, Card, CardNumber};
pub use config::{Credentials, GatewayEnvironment, MerchantConfig, ReferenceClock};
pub use dispatcher::Dispatch;
pub use errors::{Result, ThreeDsError};
pub use gateway::soap_http::SoapHttpGateway;
pub use gateway::PaymentGateway;
pub use orchestrator::{initiate_three_d_secure, CallControl, Outcome};
pub use types::{
    Amount, PaymentInput, PaymentRequest, PaymentResult, RedirectInstruction, ResultCode,
    ShopperContext, TerminalResult,
};
