//! The single entry point composing assembly, the gateway call and dispatch.
//!
//! ```text
//! PaymentInput ──build──▶ PaymentRequest ──authorise──▶ PaymentResult ──dispatch──▶ Outcome
//! ```
//!
//! The gateway call is the only suspension point. It races the caller's
//! cancellation token and deadline; whichever fires first wins.

use crate::assembler;
use crate::browser::BrowserInfo;
use crate::config::MerchantConfig;
use crate::dispatcher::{self, Dispatch};
use crate::errors::{Result, ThreeDsError};
use crate::gateway::PaymentGateway;
use crate::types::{PaymentInput, RedirectInstruction, TerminalResult};
use std::future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Result of one 3-D Secure initiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The card is enrolled; send the shopper to the issuer
    Redirect(RedirectInstruction),
    /// The authorization finished without a redirect
    Terminal(TerminalResult),
    /// The initiation failed
    Failure(ThreeDsError),
}

impl Outcome {
    /// Folds a dispatch result into an outcome.
    pub fn from_dispatch(dispatched: Result<Dispatch>) -> Self {
        match dispatched {
            Ok(Dispatch::Redirect(redirect)) => Outcome::Redirect(redirect),
            Ok(Dispatch::Terminal(terminal)) => Outcome::Terminal(terminal),
            Err(err) => Outcome::Failure(err),
        }
    }

    /// Returns `true` for [`Outcome::Redirect`].
    pub fn is_redirect(&self) -> bool {
        matches!(self, Outcome::Redirect(_))
    }

    /// Converts the outcome into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<Dispatch> {
        match self {
            Outcome::Redirect(redirect) => Ok(Dispatch::Redirect(redirect)),
            Outcome::Terminal(terminal) => Ok(Dispatch::Terminal(terminal)),
            Outcome::Failure(err) => Err(err),
        }
    }
}

impl From<ThreeDsError> for Outcome {
    fn from(err: ThreeDsError) -> Self {
        Outcome::Failure(err)
    }
}

/// Caller-supplied cancellation signal and deadline for one initiation.
///
/// The default places no bound on the call beyond the client's own timeouts.
#[derive(Debug, Clone, Default)]
pub struct CallControl {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl CallControl {
    /// No deadline and no cancellation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives up at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Gives up `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Gives up as soon as `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn is_stopped(&self) -> bool {
        let cancelled = self
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled);
        let expired = self.deadline.is_some_and(|d| Instant::now() >= d);
        cancelled || expired
    }

    async fn cancelled(&self) {
        match &self.cancellation {
            Some(token) => token.cancelled().await,
            None => future::pending::<()>().await,
        }
    }

    async fn expired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => future::pending::<()>().await,
        }
    }
}

/// Initiates a 3-D Secure payment.
///
/// Assembles the request, calls the gateway once and dispatches on the result.
/// Every failure is returned as [`Outcome::Failure`]; nothing is retried.
///
/// Cancellation before the request is handed to the gateway yields
/// `Cancelled { indeterminate: false }`. Cancellation while the call is in flight
/// yields `Cancelled { indeterminate: true }`, and the caller must reconcile.
///
/// # Examples
///
/// ```rust,no_run
/// use threeds_init::{
///     initiate_three_d_secure, Amount, BrowserInfo, CallControl, Card, MerchantConfig,
///     Outcome, PaymentInput, SoapHttpGateway,
/// };
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = MerchantConfig::from_env()?;
/// let gateway = SoapHttpGateway::new(&config)?;
///
/// let payment = PaymentInput::new(
///     Amount::new("EUR", 199)?,
///     Card::new("5212345678901234", "06", "2016", "John Doe", "737"),
/// );
/// let browser = BrowserInfo::new("Mozilla/5.0", "text/html");
///
/// match initiate_three_d_secure(&gateway, &config, payment, browser, &CallControl::new()).await {
///     Outcome::Redirect(redirect) => println!("redirect to {}", redirect.issuer_url),
///     Outcome::Terminal(terminal) => println!("{}", terminal.result_code),
///     Outcome::Failure(err) => eprintln!("{}", err),
/// }
/// # Ok(())
/// # }
/// ```
#[instrument(
    skip_all,
    fields(gateway = gateway.name(), merchant_account = %config.merchant_account)
)]
pub async fn initiate_three_d_secure<G>(
    gateway: &G,
    config: &MerchantConfig,
    payment: PaymentInput,
    browser_info: BrowserInfo,
    control: &CallControl,
) -> Outcome
where
    G: PaymentGateway + ?Sized,
{
    let request = match assembler::build(config, payment, browser_info) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "payment request rejected before sending");
            return Outcome::Failure(err);
        }
    };

    if control.is_stopped() {
        info!(reference = %request.reference, "cancelled before contacting the gateway");
        return Outcome::Failure(ThreeDsError::Cancelled {
            indeterminate: false,
        });
    }

    let result = tokio::select! {
        biased;
        _ = control.cancelled() => Err(ThreeDsError::Cancelled { indeterminate: true }),
        _ = control.expired() => Err(ThreeDsError::Cancelled { indeterminate: true }),
        result = gateway.authorise(&request) => result,
    };

    let outcome = Outcome::from_dispatch(
        result.and_then(|result| dispatcher::dispatch(result, &config.term_url)),
    );

    match &outcome {
        Outcome::Redirect(_) => info!(reference = %request.reference, "shopper redirect issued"),
        Outcome::Terminal(terminal) => info!(
            reference = %request.reference,
            result_code = %terminal.result_code,
            psp_reference = %terminal.psp_reference,
            "authorization finished without redirect"
        ),
        Outcome::Failure(err) => warn!(
            reference = %request.reference,
            indeterminate = err.is_indeterminate(),
            error = %err,
            "3-D Secure initiation failed"
        ),
    }

    outcome
}
