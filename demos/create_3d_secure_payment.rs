//! Example web layer for a 3-D Secure payment using Axum.
//!
//! `GET /create-3d-secure-payment` authorises the test card. An enrolled card gets a
//! self-submitting form that posts the shopper to the issuer; anything else is
//! printed as plain text.
//!
//! Run with:
//! ```bash
//! cargo run --example create_3d_secure_payment
//! ```
//!
//! Environment variables (a `.env` file is loaded first):
//! - THREEDS_MERCHANT_ACCOUNT: merchant account the payment is booked on
//! - THREEDS_WS_USER / THREEDS_WS_PASSWORD: web service credentials
//! - THREEDS_TERM_URL: where the issuer returns the shopper
//! - THREEDS_ENVIRONMENT: `test` (default) or `live`
//! - PORT: Server port (default: 3000)

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use maud::{html, Markup, DOCTYPE};
use std::sync::Arc;
use std::time::Duration;
use threeds_init::{
    initiate_three_d_secure, Address, Amount, BrowserInfo, CallControl, Card, MerchantConfig,
    Outcome, PaymentInput, RedirectInstruction, ShopperContext, SoapHttpGateway,
    TerminalResult, ThreeDsError,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct AppState {
    config: MerchantConfig,
    gateway: SoapHttpGateway,
}

/// Starts a 3-D Secure payment for the test card.
async fn create_payment_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let browser_info = BrowserInfo::from_headers(&headers)?;

    let control = CallControl::new().with_timeout(Duration::from_secs(60));
    let outcome = initiate_three_d_secure(
        &state.gateway,
        &state.config,
        test_payment()?,
        browser_info,
        &control,
    )
    .await;

    match outcome {
        Outcome::Redirect(redirect) => {
            Ok(Html(redirect_form(&redirect).into_string()).into_response())
        }
        Outcome::Terminal(terminal) => Ok(terminal_text(&terminal).into_response()),
        Outcome::Failure(err) => Err(err.into()),
    }
}

/// The canonical test payment: EUR 1.99 on a 3-D Secure test card.
fn test_payment() -> Result<PaymentInput, AppError> {
    let card = Card::new("5212345678901234", "06", "2016", "John Doe", "737").with_billing_address(
        Address {
            street: "Simon Carmiggeltstraat".to_string(),
            house_number_or_name: "6-50".to_string(),
            city: "Amsterdam".to_string(),
            postal_code: "1011 DJ".to_string(),
            state_or_province: String::new(),
            country: "NL".to_string(),
        },
    );

    Ok(PaymentInput::new(Amount::new("EUR", 199)?, card).with_shopper(ShopperContext {
        ip: Some("123.123.123.123".to_string()),
        email: Some("test@example.com".to_string()),
        reference: Some("YourReference".to_string()),
        fraud_offset: None,
    }))
}

/// Self-submitting POST form to the issuer with a no-script fallback button.
fn redirect_form(redirect: &RedirectInstruction) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="UTF-8";
                title { "3-D Secure authentication" }
            }
            body onload="document.getElementById('3dform').submit();" {
                form method="POST" action=(redirect.issuer_url) id="3dform" {
                    @for (name, value) in redirect.form_fields() {
                        input type="hidden" name=(name) value=(value);
                    }
                    noscript {
                        p {
                            "Your browser does not support JavaScript. "
                            "Press the button to continue."
                        }
                        input type="submit" value="Continue to 3-D Secure";
                    }
                }
            }
        }
    }
}

fn terminal_text(terminal: &TerminalResult) -> String {
    format!(
        "Payment Result:\n- pspReference: {}\n- resultCode: {}\n- authCode: {}\n- refusalReason: {}\n",
        terminal.psp_reference,
        terminal.result_code,
        terminal.auth_code.as_deref().unwrap_or("null"),
        terminal.refusal_reason.as_deref().unwrap_or("null"),
    )
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threeds_init=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = MerchantConfig::from_env()?;
    let gateway = SoapHttpGateway::new(&config)?;
    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()?;

    tracing::info!(
        merchant_account = %config.merchant_account,
        endpoint = %gateway.endpoint(),
        "starting 3-D Secure demo"
    );

    let state = Arc::new(AppState { config, gateway });

    let app = Router::new()
        .route("/create-3d-secure-payment", get(create_payment_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("Server listening on http://{}", addr);
    println!("Open http://localhost:{}/create-3d-secure-payment in a browser", port);

    axum::serve(listener, app).await?;

    Ok(())
}

// Error handling
struct AppError(ThreeDsError);

impl From<ThreeDsError> for AppError {
    fn from(err: ThreeDsError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            ThreeDsError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ThreeDsError::TransportError { .. } | ThreeDsError::Cancelled { .. } => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ThreeDsError::GatewayFault { .. }
            | ThreeDsError::ProtocolError(_)
            | ThreeDsError::MalformedRedirect { .. } => StatusCode::BAD_GATEWAY,
            ThreeDsError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let mut body = format!("Payment failed: {}\n", self.0);
        if self.0.is_indeterminate() {
            body.push_str("The payment may have been recorded; check before retrying.\n");
        }

        (status, body).into_response()
    }
}
