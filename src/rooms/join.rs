//! Join a black room by its 6-character access code.
//!
//! Two explicit steps: a lookup that shows who invited you and to what,
//! then a confirm that performs the join. The server may let you in, tell
//! you your membership was reactivated, or queue a request for the owner to
//! approve, in which case the flow polls until the owner decides.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::{AnosunuError, Result, ValidationError};
use crate::poll::{poll_until, PollConfig, PollHandle, PollStep};

pub const ACCESS_CODE_LEN: usize = 6;

/// Six ASCII letters or digits, stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AccessCode(String);

impl AccessCode {
    pub fn parse(raw: &str) -> std::result::Result<Self, ValidationError> {
        let s = raw.trim();
        if s.len() == ACCESS_CODE_LEN && s.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(s.to_ascii_uppercase()))
        } else {
            Err(ValidationError::AccessCode(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccessCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of `lookup-by-code`: enough to ask "join this room?".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeLookup {
    #[serde(alias = "slug")]
    pub black_room_slug: String,
    #[serde(alias = "name")]
    pub room_name: String,
    #[serde(default, alias = "inviter_pseudo")]
    pub inviter_name: Option<String>,
    #[serde(default)]
    pub participants_count: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub scheduled_end_at: Option<String>,
    /// Owner must approve newcomers.
    #[serde(default)]
    pub requires_approval: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JoinResponse {
    #[serde(default)]
    pub black_room_slug: Option<String>,
    #[serde(default)]
    pub reactivated: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
    #[serde(other)]
    Unknown,
}

/// `GET /black-rooms/{slug}/my-join-request`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinRequestPayload {
    pub status: JoinRequestStatus,
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

#[derive(Serialize)]
struct JoinRequestBody<'a> {
    code: &'a str,
}

/// The three join endpoints.
pub trait JoinGateway: Sync {
    fn lookup_code(&self, code: &AccessCode) -> impl Future<Output = Result<CodeLookup>> + Send;

    /// Returns the HTTP status with the body: 200 joined, 202 pending approval.
    fn join_by_code(&self, code: &AccessCode) -> impl Future<Output = Result<(u16, JoinResponse)>> + Send;

    fn my_join_request(&self, slug: &str) -> impl Future<Output = Result<JoinRequestPayload>> + Send;
}

impl JoinGateway for ApiClient {
    async fn lookup_code(&self, code: &AccessCode) -> Result<CodeLookup> {
        self.get(&format!("/black-rooms/lookup-by-code/{code}")).await
    }

    async fn join_by_code(&self, code: &AccessCode) -> Result<(u16, JoinResponse)> {
        self.post_with_status("/black-rooms/join-by-code", &JoinRequestBody { code: code.as_str() })
            .await
    }

    async fn my_join_request(&self, slug: &str) -> Result<JoinRequestPayload> {
        self.get(&format!("/black-rooms/{slug}/my-join-request")).await
    }
}

impl<G: JoinGateway + Send> JoinGateway for Arc<G> {
    fn lookup_code(&self, code: &AccessCode) -> impl Future<Output = Result<CodeLookup>> + Send {
        (**self).lookup_code(code)
    }

    fn join_by_code(&self, code: &AccessCode) -> impl Future<Output = Result<(u16, JoinResponse)>> + Send {
        (**self).join_by_code(code)
    }

    fn my_join_request(&self, slug: &str) -> impl Future<Output = Result<JoinRequestPayload>> + Send {
        (**self).my_join_request(slug)
    }
}

// ---------------------------------------------------------------------------
// Error classification
// ---------------------------------------------------------------------------

/// Presentation style for an error dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Warning,
    Error,
}

/// Why a join failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinErrorKind {
    InvalidCode,
    RoomFull,
    RoomExpired,
    AlreadyMember,
    AlreadyRequested,
    Banned,
    Unauthenticated,
    Network,
    Other,
}

/// Phrases the backend uses today in lieu of error codes, checked in order.
const LEGACY_PHRASES: &[(&str, JoinErrorKind)] = &[
    ("déjà membre", JoinErrorKind::AlreadyMember),
    ("already a member", JoinErrorKind::AlreadyMember),
    ("déjà une demande", JoinErrorKind::AlreadyRequested),
    ("already requested", JoinErrorKind::AlreadyRequested),
    ("pleine", JoinErrorKind::RoomFull),
    ("full", JoinErrorKind::RoomFull),
    ("expiré", JoinErrorKind::RoomExpired),
    ("terminée", JoinErrorKind::RoomExpired),
    ("expired", JoinErrorKind::RoomExpired),
    ("bloqué", JoinErrorKind::Banned),
    ("banni", JoinErrorKind::Banned),
    ("banned", JoinErrorKind::Banned),
    ("invalide", JoinErrorKind::InvalidCode),
    ("introuvable", JoinErrorKind::InvalidCode),
    ("invalid", JoinErrorKind::InvalidCode),
    ("not found", JoinErrorKind::InvalidCode),
];

impl JoinErrorKind {
    /// Map a server `error_code`.
    pub fn from_code(code: &str) -> Option<Self> {
        Some(match code {
            "code_invalid" | "room_not_found" => JoinErrorKind::InvalidCode,
            "room_full" => JoinErrorKind::RoomFull,
            "room_expired" => JoinErrorKind::RoomExpired,
            "already_member" => JoinErrorKind::AlreadyMember,
            "already_requested" => JoinErrorKind::AlreadyRequested,
            "banned" => JoinErrorKind::Banned,
            "unauthenticated" => JoinErrorKind::Unauthenticated,
            _ => return None,
        })
    }

    /// Fallback for servers that only send a human message.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        LEGACY_PHRASES
            .iter()
            .find(|(phrase, _)| lower.contains(phrase))
            .map(|(_, kind)| *kind)
            .unwrap_or(JoinErrorKind::Other)
    }

    pub fn tone(self) -> Tone {
        match self {
            JoinErrorKind::AlreadyMember | JoinErrorKind::AlreadyRequested => Tone::Info,
            JoinErrorKind::RoomFull | JoinErrorKind::RoomExpired | JoinErrorKind::Network => Tone::Warning,
            _ => Tone::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinError {
    pub kind: JoinErrorKind,
    pub message: String,
}

impl JoinError {
    pub fn classify(err: &AnosunuError) -> Self {
        let kind = match err {
            AnosunuError::Validation(_) => JoinErrorKind::InvalidCode,
            AnosunuError::Connect { .. } => JoinErrorKind::Network,
            AnosunuError::Http { status: 401, .. } => JoinErrorKind::Unauthenticated,
            AnosunuError::Http { status, .. } => err
                .server_code()
                .and_then(JoinErrorKind::from_code)
                .or_else(|| {
                    err.server_message()
                        .map(JoinErrorKind::from_message)
                        .filter(|k| *k != JoinErrorKind::Other)
                })
                .unwrap_or(if *status == 404 {
                    JoinErrorKind::InvalidCode
                } else {
                    JoinErrorKind::Other
                }),
            _ => JoinErrorKind::Other,
        };
        Self {
            kind,
            message: err.user_message(),
        }
    }

    pub fn tone(&self) -> Tone {
        self.kind.tone()
    }
}

// ---------------------------------------------------------------------------
// Flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum JoinState {
    EnterCode,
    /// Lookup succeeded; waiting for the user to confirm.
    Preview { code: AccessCode, lookup: CodeLookup },
    /// Joined; navigate to the room.
    Joined { slug: String },
    /// Membership reactivated; show the message, then navigate.
    Reactivated { slug: String, message: Option<String> },
    /// Request queued for the owner's approval.
    Pending { slug: String },
    Approved { slug: String },
    Rejected { reason: Option<String> },
    /// Nobody decided within the poll window.
    TimedOut,
    Failed(JoinError),
}

pub struct JoinFlow {
    state: JoinState,
    poll: PollConfig,
    pending_code: Option<AccessCode>,
}

impl JoinFlow {
    pub fn new(poll: PollConfig) -> Self {
        Self {
            state: JoinState::EnterCode,
            poll,
            pending_code: None,
        }
    }

    pub fn state(&self) -> &JoinState {
        &self.state
    }

    /// Code of a join request still awaiting approval.
    pub fn pending_code(&self) -> Option<&AccessCode> {
        self.pending_code.as_ref()
    }

    pub fn reset(&mut self) {
        self.state = JoinState::EnterCode;
        self.pending_code = None;
    }

    fn fail(&mut self, err: AnosunuError) -> AnosunuError {
        self.state = JoinState::Failed(JoinError::classify(&err));
        err
    }

    /// Step 1: resolve the code without joining.
    pub async fn lookup<G: JoinGateway>(&mut self, gateway: &G, raw_code: &str) -> Result<CodeLookup> {
        let code = AccessCode::parse(raw_code).map_err(|e| self.fail(e.into()))?;
        let lookup = gateway.lookup_code(&code).await.map_err(|e| self.fail(e))?;
        self.state = JoinState::Preview {
            code,
            lookup: lookup.clone(),
        };
        Ok(lookup)
    }

    /// Step 2: join the previewed room.
    pub async fn confirm<G: JoinGateway>(&mut self, gateway: &G) -> Result<&JoinState> {
        let JoinState::Preview { code, lookup } = &self.state else {
            return Err(AnosunuError::InvalidState("join confirmed without a looked-up code"));
        };
        let code = code.clone();
        let fallback_slug = lookup.black_room_slug.clone();

        let (status, resp) = gateway.join_by_code(&code).await.map_err(|e| self.fail(e))?;
        let slug = resp.black_room_slug.unwrap_or(fallback_slug);

        self.state = if status == 202 {
            info!(%code, %slug, "join request awaiting approval");
            self.pending_code = Some(code);
            JoinState::Pending { slug }
        } else if resp.reactivated {
            JoinState::Reactivated {
                slug,
                message: resp.message,
            }
        } else {
            JoinState::Joined { slug }
        };
        Ok(&self.state)
    }

    /// Poll the join request until the owner decides or the attempts run out.
    ///
    /// Rejection clears the pending code. Exhaustion moves to `TimedOut` and
    /// returns [`AnosunuError::Timeout`].
    pub async fn wait_for_approval<G: JoinGateway>(&mut self, gateway: &G) -> Result<&JoinState> {
        let JoinState::Pending { slug } = &self.state else {
            return Err(AnosunuError::InvalidState("no join request is pending"));
        };
        let slug = slug.clone();

        let decision = poll_until("join_request", self.poll, |_| {
            let slug = slug.clone();
            async move {
                let payload = gateway.my_join_request(&slug).await?;
                Ok(match payload.status {
                    JoinRequestStatus::Approved | JoinRequestStatus::Rejected => PollStep::Done(payload),
                    _ => PollStep::Pending,
                })
            }
        })
        .await;

        match decision {
            Ok(payload) if payload.status == JoinRequestStatus::Approved => {
                info!(%slug, "join request approved");
                self.pending_code = None;
                self.state = JoinState::Approved { slug };
                Ok(&self.state)
            }
            Ok(payload) => {
                info!(%slug, "join request rejected");
                self.pending_code = None;
                self.state = JoinState::Rejected {
                    reason: payload.rejection_reason,
                };
                Ok(&self.state)
            }
            Err(e @ AnosunuError::Timeout { .. }) => {
                warn!(%slug, "join request still pending after last attempt");
                self.state = JoinState::TimedOut;
                Err(e)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// [`wait_for_approval`](Self::wait_for_approval) on its own task.
    ///
    /// The flow is handed back with the outcome once the owner decides.
    /// Dropping the handle stops polling; the request stays queued
    /// server-side.
    pub fn spawn_approval_wait<G>(mut self, gateway: G) -> PollHandle<(JoinFlow, Result<()>)>
    where
        G: JoinGateway + Send + 'static,
    {
        PollHandle::spawn(async move {
            let outcome = self.wait_for_approval(&gateway).await.map(|_| ());
            (self, outcome)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use rstest::rstest;

    struct FakeJoin {
        lookup_error: Option<AnosunuError>,
        join_status: u16,
        join: JoinResponse,
        decisions: Mutex<VecDeque<JoinRequestStatus>>,
        polls: AtomicU32,
    }

    impl FakeJoin {
        fn new(join_status: u16, decisions: Vec<JoinRequestStatus>) -> Self {
            Self {
                lookup_error: None,
                join_status,
                join: JoinResponse {
                    black_room_slug: Some("salle-7".into()),
                    ..Default::default()
                },
                decisions: Mutex::new(decisions.into()),
                polls: AtomicU32::new(0),
            }
        }
    }

    impl JoinGateway for FakeJoin {
        async fn lookup_code(&self, code: &AccessCode) -> Result<CodeLookup> {
            if let Some(AnosunuError::Http { status, message, code: c, url }) = &self.lookup_error {
                return Err(AnosunuError::Http {
                    status: *status,
                    url: url.clone(),
                    message: message.clone(),
                    code: c.clone(),
                });
            }
            Ok(CodeLookup {
                black_room_slug: "salle-7".into(),
                room_name: format!("Salle {code}"),
                inviter_name: Some("lune".into()),
                participants_count: Some(3),
                max_participants: Some(10),
                scheduled_end_at: None,
                requires_approval: self.join_status == 202,
            })
        }

        async fn join_by_code(&self, _code: &AccessCode) -> Result<(u16, JoinResponse)> {
            Ok((self.join_status, self.join.clone()))
        }

        async fn my_join_request(&self, _slug: &str) -> Result<JoinRequestPayload> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            let status = {
                let mut q = self.decisions.lock().unwrap();
                if q.len() > 1 {
                    q.pop_front().unwrap()
                } else {
                    *q.front().unwrap()
                }
            };
            Ok(JoinRequestPayload {
                status,
                rejection_reason: (status == JoinRequestStatus::Rejected).then(|| "Salle privée".to_string()),
            })
        }
    }

    fn join_poll() -> PollConfig {
        PollConfig::new(Duration::from_secs(3), Some(60))
    }

    async fn pending_flow(gw: &FakeJoin) -> JoinFlow {
        let mut flow = JoinFlow::new(join_poll());
        flow.lookup(gw, "ab12cd").await.unwrap();
        flow.confirm(gw).await.unwrap();
        flow
    }

    #[rstest]
    #[case("AB12CD", Some("AB12CD"))]
    #[case(" ab12cd ", Some("AB12CD"))]
    #[case("AB12C", None)]
    #[case("AB12CDE", None)]
    #[case("AB-2CD", None)]
    fn access_code_parse(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(AccessCode::parse(raw).ok().as_ref().map(AccessCode::as_str), expected);
    }

    #[test]
    fn lookup_accepts_alias_fields() {
        let l: CodeLookup =
            serde_json::from_str(r#"{"slug":"s","name":"Nuit","inviter_pseudo":"lune"}"#).unwrap();
        assert_eq!(l.black_room_slug, "s");
        assert_eq!(l.inviter_name.as_deref(), Some("lune"));
        assert!(!l.requires_approval);
    }

    #[tokio::test]
    async fn invalid_code_fails_before_network() {
        let gw = FakeJoin::new(200, vec![JoinRequestStatus::Pending]);
        let mut flow = JoinFlow::new(join_poll());
        assert!(flow.lookup(&gw, "abc").await.is_err());
        match flow.state() {
            JoinState::Failed(e) => assert_eq!(e.kind, JoinErrorKind::InvalidCode),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn lookup_then_confirm_joins() {
        let gw = FakeJoin::new(200, vec![JoinRequestStatus::Pending]);
        let mut flow = JoinFlow::new(join_poll());
        let lookup = flow.lookup(&gw, "ab12cd").await.unwrap();
        assert_eq!(lookup.room_name, "Salle AB12CD");
        let state = flow.confirm(&gw).await.unwrap();
        assert_eq!(state, &JoinState::Joined { slug: "salle-7".into() });
        assert!(flow.pending_code().is_none());
    }

    #[tokio::test]
    async fn reactivated_carries_message() {
        let mut gw = FakeJoin::new(200, vec![JoinRequestStatus::Pending]);
        gw.join.reactivated = true;
        gw.join.message = Some("Accès réactivé".into());
        let mut flow = JoinFlow::new(join_poll());
        flow.lookup(&gw, "AB12CD").await.unwrap();
        match flow.confirm(&gw).await.unwrap() {
            JoinState::Reactivated { message, .. } => assert_eq!(message.as_deref(), Some("Accès réactivé")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirm_without_lookup_refused() {
        let gw = FakeJoin::new(200, vec![JoinRequestStatus::Pending]);
        let mut flow = JoinFlow::new(join_poll());
        assert!(matches!(flow.confirm(&gw).await, Err(AnosunuError::InvalidState(_))));
    }

    #[tokio::test]
    async fn accepted_202_enters_pending_with_code() {
        let gw = FakeJoin::new(202, vec![JoinRequestStatus::Pending]);
        let flow = pending_flow(&gw).await;
        assert_eq!(flow.state(), &JoinState::Pending { slug: "salle-7".into() });
        assert_eq!(flow.pending_code().map(AccessCode::as_str), Some("AB12CD"));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_times_out_after_sixty_attempts() {
        let gw = FakeJoin::new(202, vec![JoinRequestStatus::Pending]);
        let mut flow = pending_flow(&gw).await;
        let start = tokio::time::Instant::now();
        let err = flow.wait_for_approval(&gw).await.unwrap_err();
        assert!(matches!(err, AnosunuError::Timeout { attempts: 60 }));
        assert_eq!(gw.polls.load(Ordering::SeqCst), 60);
        assert_eq!(start.elapsed(), Duration::from_secs(180));
        assert_eq!(flow.state(), &JoinState::TimedOut);
        assert!(!err.user_message().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejection_on_next_tick_clears_pending_code() {
        let gw = FakeJoin::new(
            202,
            vec![JoinRequestStatus::Pending, JoinRequestStatus::Rejected],
        );
        let mut flow = pending_flow(&gw).await;
        let state = flow.wait_for_approval(&gw).await.unwrap();
        assert_eq!(
            state,
            &JoinState::Rejected {
                reason: Some("Salle privée".into())
            }
        );
        assert_eq!(gw.polls.load(Ordering::SeqCst), 2);
        assert!(flow.pending_code().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn approval_moves_to_approved() {
        let gw = FakeJoin::new(202, vec![JoinRequestStatus::Approved]);
        let mut flow = pending_flow(&gw).await;
        assert_eq!(
            flow.wait_for_approval(&gw).await.unwrap(),
            &JoinState::Approved { slug: "salle-7".into() }
        );
        assert!(flow.pending_code().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_wait_hands_the_flow_back() {
        let gw = Arc::new(FakeJoin::new(
            202,
            vec![JoinRequestStatus::Pending, JoinRequestStatus::Approved],
        ));
        let flow = pending_flow(&gw).await;
        let (flow, outcome) = flow.spawn_approval_wait(Arc::clone(&gw)).wait().await.unwrap();
        assert!(outcome.is_ok());
        assert_eq!(flow.state(), &JoinState::Approved { slug: "salle-7".into() });
        assert_eq!(gw.polls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_spawned_wait_stops_polling() {
        let gw = Arc::new(FakeJoin::new(202, vec![JoinRequestStatus::Pending]));
        let flow = pending_flow(&gw).await;
        let handle = flow.spawn_approval_wait(Arc::clone(&gw));
        tokio::time::sleep(Duration::from_secs(7)).await;
        let seen = gw.polls.load(Ordering::SeqCst);
        assert_eq!(seen, 2);
        drop(handle);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(gw.polls.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn lookup_error_is_classified() {
        let mut gw = FakeJoin::new(200, vec![JoinRequestStatus::Pending]);
        gw.lookup_error = Some(AnosunuError::Http {
            status: 422,
            url: "x".into(),
            message: Some("Cette salle est pleine".into()),
            code: None,
        });
        let mut flow = JoinFlow::new(join_poll());
        assert!(flow.lookup(&gw, "AB12CD").await.is_err());
        match flow.state() {
            JoinState::Failed(e) => {
                assert_eq!(e.kind, JoinErrorKind::RoomFull);
                assert_eq!(e.tone(), Tone::Warning);
                assert_eq!(e.message, "Cette salle est pleine");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn reset_clears_everything() {
        let mut flow = JoinFlow::new(join_poll());
        flow.pending_code = AccessCode::parse("AB12CD").ok();
        flow.state = JoinState::TimedOut;
        flow.reset();
        assert_eq!(flow.state(), &JoinState::EnterCode);
        assert!(flow.pending_code().is_none());
    }

    // -- classification -----------------------------------------------------

    fn http(status: u16, message: Option<&str>, code: Option<&str>) -> AnosunuError {
        AnosunuError::Http {
            status,
            url: "x".into(),
            message: message.map(str::to_string),
            code: code.map(str::to_string),
        }
    }

    #[test]
    fn structured_code_wins_over_message() {
        let e = JoinError::classify(&http(409, Some("Cette salle est pleine"), Some("already_member")));
        assert_eq!(e.kind, JoinErrorKind::AlreadyMember);
        assert_eq!(e.tone(), Tone::Info);
    }

    #[rstest]
    #[case("Vous êtes déjà membre de cette salle", JoinErrorKind::AlreadyMember)]
    #[case("Vous avez déjà une demande en cours", JoinErrorKind::AlreadyRequested)]
    #[case("Cette salle a expiré", JoinErrorKind::RoomExpired)]
    #[case("Code invalide", JoinErrorKind::InvalidCode)]
    #[case("Vous avez été bloqué", JoinErrorKind::Banned)]
    #[case("Room is FULL", JoinErrorKind::RoomFull)]
    #[case("Erreur serveur", JoinErrorKind::Other)]
    fn legacy_phrases(#[case] message: &str, #[case] kind: JoinErrorKind) {
        assert_eq!(JoinErrorKind::from_message(message), kind);
    }

    #[test]
    fn unknown_code_falls_back_to_message() {
        let e = JoinError::classify(&http(422, Some("Code invalide"), Some("E_WHATEVER")));
        assert_eq!(e.kind, JoinErrorKind::InvalidCode);
    }

    #[test]
    fn bare_404_is_invalid_code() {
        assert_eq!(JoinError::classify(&http(404, None, None)).kind, JoinErrorKind::InvalidCode);
    }

    #[test]
    fn unauthorized_is_unauthenticated() {
        assert_eq!(
            JoinError::classify(&http(401, Some("Unauthenticated."), None)).kind,
            JoinErrorKind::Unauthenticated
        );
    }

    #[test]
    fn network_failure_is_warning() {
        let e = JoinError::classify(&AnosunuError::Connect {
            url: "x".into(),
            detail: "refused".into(),
        });
        assert_eq!(e.kind, JoinErrorKind::Network);
        assert_eq!(e.tone(), Tone::Warning);
        assert_eq!(e.message, crate::error::GENERIC_ERROR_MESSAGE);
    }
}
