//! Typed client for the Anosunu anonymous social network.
//!
//! The backend owns every piece of authoritative state. This crate wraps its
//! REST API and drives the multi-step flows that sit on top of it:
//!
//! - [`payment`]: payment descriptor, receipt confirmation and the modal
//!   state machine that polls until the payment is verified
//! - [`rooms`]: room-type subscriptions, private room creation gated on
//!   payment, and the two-step join by access code with approval polling
//! - [`feed`]: posts, comments, likes, topics and onboarding
//! - [`admin`]: moderation dashboards with optimistic updates
//!
//! The `anosunu` binary exposes all of it as a terminal front end.

pub mod admin;
pub mod api;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod feed;
pub mod payment;
pub mod poll;
pub mod rooms;
pub mod session;

pub use api::ApiClient;
pub use config::ClientConfig;
pub use error::{AnosunuError, Result, ValidationError};
pub use payment::{PaymentDescriptor, PaymentModal};
pub use poll::{PollConfig, PollHandle, PollStep};
pub use session::{FileSessionStore, MemorySessionStore, Session, SessionContext, SessionStore};
