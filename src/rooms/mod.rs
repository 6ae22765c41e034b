//! # Module: rooms
//!
//! Black rooms: ephemeral, access-gated chat spaces that are deleted when
//! their time runs out.
//!
//! ## Sub-modules
//! - [`catalog`]: subscribable room types and the local subscription cache
//! - [`create`]: private room creation, gated on payment when required
//! - [`join`]: two-step join by access code, with approval polling

pub mod catalog;
pub mod create;
pub mod join;

pub use catalog::{RoomCatalog, RoomType, SubscribeOutcome};
pub use create::{
    BlackRoom, CreateRoomOutcome, CreationStep, RoomActivationResult, RoomCreationFlow, RoomDraft,
    RoomReadyView,
};
pub use join::{AccessCode, CodeLookup, JoinError, JoinErrorKind, JoinFlow, JoinGateway, JoinState, Tone};
