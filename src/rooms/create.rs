//! Private room creation, with the payment step the server may insert.
//!
//! The success screen is only ever built from a real activation: an outcome
//! without both an access code and an invite link never produces one.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ApiClient;
use crate::error::{AnosunuError, Result, ValidationError};
use crate::payment::{ModalState, PaymentDescriptor, PaymentModal};
use crate::poll::PollConfig;

pub const MIN_PARTICIPANTS_FLOOR: u32 = 2;
pub const MAX_PARTICIPANTS_CEILING: u32 = 50;
pub const MAX_DURATION_MINUTES: u32 = 180;
pub const MAX_ROOM_NAME_CHARS: usize = 80;

/// Room parameters as entered by the user. Sent once, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub min_participants: u32,
    pub max_participants: u32,
    pub duration_minutes: u32,
}

impl RoomDraft {
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::RoomNameEmpty);
        }
        let chars = name.chars().count();
        if chars > MAX_ROOM_NAME_CHARS {
            return Err(ValidationError::RoomNameTooLong {
                max: MAX_ROOM_NAME_CHARS,
                actual: chars,
            });
        }
        if self.min_participants < MIN_PARTICIPANTS_FLOOR
            || self.max_participants > MAX_PARTICIPANTS_CEILING
            || self.min_participants > self.max_participants
        {
            return Err(ValidationError::Participants {
                min: self.min_participants,
                max: self.max_participants,
                min_allowed: MIN_PARTICIPANTS_FLOOR,
                max_allowed: MAX_PARTICIPANTS_CEILING,
            });
        }
        if self.duration_minutes == 0 || self.duration_minutes > MAX_DURATION_MINUTES {
            return Err(ValidationError::Duration {
                max: MAX_DURATION_MINUTES,
                actual: self.duration_minutes,
            });
        }
        Ok(())
    }

    fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            ..self.clone()
        }
    }
}

/// Access details of an active room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomActivationResult {
    #[serde(default)]
    pub access_code: Option<String>,
    #[serde(default)]
    pub invite_link: Option<String>,
    #[serde(default)]
    pub scheduled_end_at: Option<String>,
}

impl RoomActivationResult {
    /// Both the access code and the invite link are present and non-blank.
    pub fn is_active(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.access_code) && present(&self.invite_link)
    }
}

/// What the "room ready" screen shows. Only constructible from an active room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomReadyView {
    pub slug: String,
    pub access_code: String,
    pub invite_link: String,
    pub scheduled_end_at: Option<String>,
}

impl RoomReadyView {
    pub fn from_activation(slug: &str, activation: &RoomActivationResult) -> Option<Self> {
        if !activation.is_active() {
            return None;
        }
        Some(Self {
            slug: slug.to_string(),
            access_code: activation.access_code.clone()?.trim().to_string(),
            invite_link: activation.invite_link.clone()?.trim().to_string(),
            scheduled_end_at: activation.scheduled_end_at.clone(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    black_room_slug: String,
    #[serde(default)]
    payment: Option<PaymentDescriptor>,
    #[serde(flatten)]
    activation: RoomActivationResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateRoomOutcome {
    /// Active right away.
    Active { view: RoomReadyView },
    /// Must be paid for before it opens.
    PendingPayment {
        slug: String,
        payment: PaymentDescriptor,
    },
    /// Created, no payment asked, but no access details yet.
    Inactive { slug: String },
}

impl CreateRoomOutcome {
    pub fn slug(&self) -> &str {
        match self {
            CreateRoomOutcome::Active { view } => &view.slug,
            CreateRoomOutcome::PendingPayment { slug, .. } | CreateRoomOutcome::Inactive { slug } => slug,
        }
    }

    fn from_response(resp: CreateRoomResponse) -> Self {
        if let Some(payment) = resp.payment {
            return CreateRoomOutcome::PendingPayment {
                slug: resp.black_room_slug,
                payment,
            };
        }
        match RoomReadyView::from_activation(&resp.black_room_slug, &resp.activation) {
            Some(view) => CreateRoomOutcome::Active { view },
            None => CreateRoomOutcome::Inactive {
                slug: resp.black_room_slug,
            },
        }
    }
}

/// `GET /black-rooms/{slug}` and the entries of `GET /black-rooms/mine`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlackRoom {
    pub slug: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub participants_count: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(flatten)]
    pub activation: RoomActivationResult,
}

impl ApiClient {
    /// Validate locally, then `POST /black-rooms/private/create`.
    pub async fn create_private_room(&self, draft: &RoomDraft) -> Result<CreateRoomOutcome> {
        draft.validate()?;
        let resp: CreateRoomResponse = self
            .post("/black-rooms/private/create", &draft.trimmed())
            .await?;
        let outcome = CreateRoomOutcome::from_response(resp);
        info!(slug = outcome.slug(), pending_payment = matches!(outcome, CreateRoomOutcome::PendingPayment { .. }), "private room created");
        Ok(outcome)
    }

    pub async fn black_room(&self, slug: &str) -> Result<BlackRoom> {
        self.get(&format!("/black-rooms/{slug}")).await
    }

    pub async fn my_black_rooms(&self) -> Result<Vec<BlackRoom>> {
        self.get("/black-rooms/mine").await
    }

    /// After payment verification: fetch the room and build the ready view,
    /// or `None` if the server has not activated it yet.
    pub async fn room_ready_view(&self, slug: &str) -> Result<Option<RoomReadyView>> {
        let room = self.black_room(slug).await?;
        Ok(RoomReadyView::from_activation(&room.slug, &room.activation))
    }
}

// ---------------------------------------------------------------------------
// Creation flow
// ---------------------------------------------------------------------------

/// Where a private room creation stands after the create request.
#[derive(Debug)]
pub enum CreationStep {
    /// Active: show the ready screen.
    Ready(RoomReadyView),
    /// The server wants a payment first. Drive the modal to `Verified`, then
    /// call [`RoomCreationFlow::after_payment`].
    Payment(PaymentModal),
    /// Created without payment but with no access details yet.
    Inactive { slug: String },
}

/// Create, pay if asked, then fetch the real activation.
///
/// The ready view of a paid room only ever comes from
/// `GET /black-rooms/{slug}` after the modal reports a verified payment.
#[derive(Debug)]
pub struct RoomCreationFlow {
    poll: PollConfig,
    slug: Option<String>,
}

impl RoomCreationFlow {
    pub fn new(poll: PollConfig) -> Self {
        Self { poll, slug: None }
    }

    /// Slug of the created room, once [`start`](Self::start) succeeded.
    pub fn slug(&self) -> Option<&str> {
        self.slug.as_deref()
    }

    /// Validate and send the draft.
    ///
    /// # Returns
    /// A payment modal configured with this flow's poll settings when the
    /// server asks for one. Invalid drafts fail before any request.
    pub async fn start(&mut self, api: &ApiClient, draft: &RoomDraft) -> Result<CreationStep> {
        let outcome = api.create_private_room(draft).await?;
        self.slug = Some(outcome.slug().to_string());
        Ok(match outcome {
            CreateRoomOutcome::Active { view } => CreationStep::Ready(view),
            CreateRoomOutcome::PendingPayment { payment, .. } => {
                CreationStep::Payment(PaymentModal::new(payment, self.poll))
            }
            CreateRoomOutcome::Inactive { slug } => CreationStep::Inactive { slug },
        })
    }

    /// Fetch the room once its payment is verified.
    ///
    /// # Returns
    /// `Ok(None)` when the server has not activated the room yet, and
    /// [`AnosunuError::InvalidState`] without any request when no room was
    /// created or the modal is not `Verified`.
    pub async fn after_payment(&self, api: &ApiClient, modal: &PaymentModal) -> Result<Option<RoomReadyView>> {
        let Some(slug) = &self.slug else {
            return Err(AnosunuError::InvalidState("no room has been created"));
        };
        if modal.state() != ModalState::Verified {
            return Err(AnosunuError::InvalidState("room payment is not verified"));
        }
        let view = api.room_ready_view(slug).await?;
        info!(%slug, active = view.is_some(), "paid room fetched");
        Ok(view)
    }
}
