//! Wave / PayDunya payment flow.
//!
//! A payment starts when the server answers a subscribe or create-room call
//! with a [`PaymentDescriptor`]. The user pays outside the app, comes back,
//! types four receipt fields, and the client polls the status endpoint until
//! the server marks the payment `completed`.
//!
//! ## Modal states
//! ```text
//! Payment ──already_paid──▶ Confirmation ──submit (valid + 2xx)──▶ Waiting ──completed──▶ Verified
//!    ╰──────────────────────────── cancel ───────────────────────────────────────────▶ Closed
//! TestMode ──grant_test_access──▶ Verified
//! ```

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::api::ApiClient;
use crate::error::{AnosunuError, Result, ValidationError};
use crate::poll::{poll_until, PollConfig, PollStep};

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Wave,
    PayDunya,
    /// Server-signalled bypass: no money is collected.
    TestMode,
}

impl std::fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::Wave => write!(f, "Wave"),
            PaymentProvider::PayDunya => write!(f, "PayDunya"),
            PaymentProvider::TestMode => write!(f, "test"),
        }
    }
}

/// The server sends amounts either as numbers or as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AmountRepr {
    Number(f64),
    Text(String),
}

impl AmountRepr {
    fn value(&self) -> Option<f64> {
        match self {
            AmountRepr::Number(n) => Some(*n),
            AmountRepr::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Deserialize a money amount sent as a number or a decimal string.
pub(crate) fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    AmountRepr::deserialize(deserializer)?
        .value()
        .filter(|a| a.is_finite())
        .ok_or_else(|| serde::de::Error::custom("amount is not a number"))
}

#[derive(Debug, Deserialize)]
struct RawPayment {
    payment_code: String,
    #[serde(default)]
    wave_url: Option<String>,
    #[serde(default)]
    invoice_url: Option<String>,
    #[serde(default)]
    external_url: Option<String>,
    amount: AmountRepr,
    #[serde(default, alias = "test_mode")]
    is_test_mode: bool,
}

/// Payment the server asks for before granting access.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPayment")]
pub struct PaymentDescriptor {
    pub payment_code: String,
    /// Where the user pays. Always `None` in test mode.
    pub external_url: Option<String>,
    pub amount: f64,
    pub is_test_mode: bool,
    pub provider: PaymentProvider,
}

impl TryFrom<RawPayment> for PaymentDescriptor {
    type Error = String;

    fn try_from(raw: RawPayment) -> std::result::Result<Self, Self::Error> {
        let amount = raw
            .amount
            .value()
            .filter(|a| a.is_finite())
            .ok_or_else(|| "amount is not a number".to_string())?;

        let non_empty = |u: Option<String>| u.filter(|s| !s.trim().is_empty());
        let (provider, external_url) = if raw.is_test_mode {
            (PaymentProvider::TestMode, None)
        } else if let Some(url) = non_empty(raw.wave_url) {
            (PaymentProvider::Wave, Some(url))
        } else if let Some(url) = non_empty(raw.invoice_url) {
            (PaymentProvider::PayDunya, Some(url))
        } else if let Some(url) = non_empty(raw.external_url) {
            (PaymentProvider::Wave, Some(url))
        } else {
            return Err("payment has neither a payment link nor the test-mode flag".to_string());
        };

        Ok(PaymentDescriptor {
            payment_code: raw.payment_code,
            external_url,
            amount,
            is_test_mode: raw.is_test_mode,
            provider,
        })
    }
}

/// Amount formatted for display, e.g. `2 500 FCFA`.
pub fn format_amount(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();
    let mut out = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    if whole < 0 {
        out.insert(0, '-');
    }
    format!("{out} FCFA")
}

// ---------------------------------------------------------------------------
// Confirmation fields
// ---------------------------------------------------------------------------

/// Receipt details as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmationFields {
    pub phone_prefix: String,
    pub phone_last2: String,
    pub transaction_last4: String,
    pub actual_amount_paid: String,
}

/// Receipt details that passed every format check. Only this can be sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidatedConfirmation {
    pub phone_prefix: String,
    pub phone_last2: String,
    pub transaction_last4: String,
    pub actual_amount_paid: f64,
}

pub fn validate_phone_prefix(raw: &str) -> std::result::Result<String, ValidationError> {
    let s = raw.trim();
    if (2..=3).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err(ValidationError::PhonePrefix(raw.to_string()))
    }
}

/// `^\d{2}$`
pub fn validate_phone_last2(raw: &str) -> std::result::Result<String, ValidationError> {
    let s = raw.trim();
    if s.len() == 2 && s.chars().all(|c| c.is_ascii_digit()) {
        Ok(s.to_string())
    } else {
        Err(ValidationError::PhoneSuffix(raw.to_string()))
    }
}

/// `^[A-Za-z0-9]{4}$`, returned upper-cased.
pub fn validate_transaction_last4(raw: &str) -> std::result::Result<String, ValidationError> {
    let s = raw.trim();
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(s.to_ascii_uppercase())
    } else {
        Err(ValidationError::TransactionSuffix(raw.to_string()))
    }
}

/// Finite and strictly positive. A comma is accepted as decimal separator.
pub fn validate_amount(raw: &str) -> std::result::Result<f64, ValidationError> {
    let normalized = raw.trim().replace(' ', "").replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
        _ => Err(ValidationError::Amount(raw.to_string())),
    }
}

impl ConfirmationFields {
    /// Check all four fields; the first failing one is reported.
    pub fn validate(&self) -> std::result::Result<ValidatedConfirmation, ValidationError> {
        Ok(ValidatedConfirmation {
            phone_prefix: validate_phone_prefix(&self.phone_prefix)?,
            phone_last2: validate_phone_last2(&self.phone_last2)?,
            transaction_last4: validate_transaction_last4(&self.transaction_last4)?,
            actual_amount_paid: validate_amount(&self.actual_amount_paid)?,
        })
    }
}

#[derive(Debug, Serialize)]
struct ConfirmRequest<'a> {
    payment_code: &'a str,
    #[serde(flatten)]
    fields: &'a ValidatedConfirmation,
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Expired,
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Terminal but unsuccessful.
    pub fn is_failure(&self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Expired)
    }
}

/// Body of `GET /payments/wave/status/{code}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStatusPayload {
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_room_slug: Option<String>,
    /// Anything else the server attached (subscription, activation, …).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PaymentStatusPayload {
    pub fn completed(payment_code: &str) -> Self {
        Self {
            status: PaymentStatus::Completed,
            payment_code: Some(payment_code.to_string()),
            black_room_slug: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// The two payment endpoints the modal needs.
pub trait PaymentGateway: Sync {
    fn confirm_wave(
        &self,
        payment_code: &str,
        fields: &ValidatedConfirmation,
    ) -> impl Future<Output = Result<()>> + Send;

    fn wave_status(&self, payment_code: &str) -> impl Future<Output = Result<PaymentStatusPayload>> + Send;
}

impl PaymentGateway for ApiClient {
    async fn confirm_wave(&self, payment_code: &str, fields: &ValidatedConfirmation) -> Result<()> {
        self.post_ack(
            "/payments/wave/confirm",
            &ConfirmRequest {
                payment_code,
                fields,
            },
        )
        .await
    }

    async fn wave_status(&self, payment_code: &str) -> Result<PaymentStatusPayload> {
        self.get(&format!("/payments/wave/status/{payment_code}")).await
    }
}

// ---------------------------------------------------------------------------
// Modal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalState {
    /// Instructions and the external payment link.
    Payment,
    /// Receipt form.
    Confirmation,
    /// Confirmation sent, polling the status endpoint.
    Waiting,
    /// Test-mode descriptor: one action grants access.
    TestMode,
    Verified,
    Closed,
}

/// Result of closing the modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CloseOutcome {
    /// `false` means the caller should navigate away from the unpaid room.
    pub room_activated: bool,
}

#[derive(Debug)]
pub struct PaymentModal {
    descriptor: PaymentDescriptor,
    state: ModalState,
    poll: PollConfig,
    flow_id: Uuid,
}

impl PaymentModal {
    pub fn new(descriptor: PaymentDescriptor, poll: PollConfig) -> Self {
        let state = if descriptor.is_test_mode {
            ModalState::TestMode
        } else {
            ModalState::Payment
        };
        Self {
            descriptor,
            state,
            poll,
            flow_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn descriptor(&self) -> &PaymentDescriptor {
        &self.descriptor
    }

    /// Link to show on the instructions screen. Hidden in test mode.
    pub fn external_link(&self) -> Option<&str> {
        match self.state {
            ModalState::TestMode => None,
            _ => self.descriptor.external_url.as_deref(),
        }
    }

    /// "I already paid": no validation, just show the form.
    pub fn already_paid(&mut self) -> Result<()> {
        match self.state {
            ModalState::Payment => {
                self.state = ModalState::Confirmation;
                Ok(())
            }
            _ => Err(AnosunuError::InvalidState("already_paid outside the payment screen")),
        }
    }

    /// Validate the receipt, send it, and move to `Waiting` on success.
    ///
    /// Invalid fields never reach the network. On any error the modal stays
    /// on the form so the user can fix and resubmit.
    pub async fn submit_confirmation<G: PaymentGateway>(
        &mut self,
        gateway: &G,
        fields: &ConfirmationFields,
    ) -> Result<()> {
        if self.state != ModalState::Confirmation {
            return Err(AnosunuError::InvalidState("confirmation submitted outside the form"));
        }
        let validated = fields.validate()?;
        gateway
            .confirm_wave(&self.descriptor.payment_code, &validated)
            .instrument(info_span!("confirm_payment", flow = %self.flow_id))
            .await?;
        info!(flow = %self.flow_id, code = %self.descriptor.payment_code, "payment confirmation sent");
        self.state = ModalState::Waiting;
        Ok(())
    }

    /// Poll until the server reports `completed`, then call `on_verified`
    /// once with the server payload.
    ///
    /// Dropping the returned future stops polling and the callback never
    /// runs. A `failed`/`expired` status ends the wait with
    /// [`AnosunuError::PaymentNotCompleted`] and returns to the instructions.
    pub async fn wait_for_verification<G, F>(&mut self, gateway: &G, on_verified: F) -> Result<()>
    where
        G: PaymentGateway,
        F: FnOnce(PaymentStatusPayload),
    {
        if self.state != ModalState::Waiting {
            return Err(AnosunuError::InvalidState("verification awaited before confirmation"));
        }
        let code = self.descriptor.payment_code.clone();
        let outcome = poll_until("payment_status", self.poll, |_| {
            let code = code.clone();
            async move {
                let payload = gateway.wave_status(&code).await?;
                let terminal =
                    payload.status == PaymentStatus::Completed || payload.status.is_failure();
                Ok(if terminal {
                    PollStep::Done(payload)
                } else {
                    PollStep::Pending
                })
            }
        })
        .instrument(info_span!("payment_poll", flow = %self.flow_id))
        .await?;

        if outcome.status.is_failure() {
            warn!(flow = %self.flow_id, status = ?outcome.status, "payment was not completed");
            self.state = ModalState::Payment;
            return Err(AnosunuError::PaymentNotCompleted {
                status: format!("{:?}", outcome.status).to_lowercase(),
            });
        }

        info!(flow = %self.flow_id, "payment verified");
        self.state = ModalState::Verified;
        on_verified(outcome);
        Ok(())
    }

    /// Test-mode single action: grant access without collecting money.
    pub fn grant_test_access<F: FnOnce(PaymentStatusPayload)>(&mut self, on_verified: F) -> Result<()> {
        if self.state != ModalState::TestMode {
            return Err(AnosunuError::InvalidState("test access requested for a paid descriptor"));
        }
        self.state = ModalState::Verified;
        on_verified(PaymentStatusPayload::completed(&self.descriptor.payment_code));
        Ok(())
    }

    /// Close from any state.
    pub fn cancel(&mut self) -> CloseOutcome {
        let room_activated = self.state == ModalState::Verified;
        self.state = ModalState::Closed;
        CloseOutcome { room_activated }
    }
}
