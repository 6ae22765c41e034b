//! Subscribable room types and the local subscription cache.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ApiClient;
use crate::error::Result;
use crate::payment::{deserialize_amount, PaymentDescriptor};

/// One entry of `GET /black-room-types`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomType {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_amount")]
    pub price: f64,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub max_participants: Option<u32>,
    #[serde(default)]
    pub is_subscribed: bool,
}

/// What the subscribe endpoint asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscribeOutcome {
    /// No money collected: a single action grants access.
    TestMode(PaymentDescriptor),
    /// Pay via the external link, then confirm.
    PaymentRequired(PaymentDescriptor),
}

impl SubscribeOutcome {
    pub fn from_descriptor(descriptor: PaymentDescriptor) -> Self {
        if descriptor.is_test_mode {
            SubscribeOutcome::TestMode(descriptor)
        } else {
            SubscribeOutcome::PaymentRequired(descriptor)
        }
    }

    pub fn descriptor(&self) -> &PaymentDescriptor {
        match self {
            SubscribeOutcome::TestMode(d) | SubscribeOutcome::PaymentRequired(d) => d,
        }
    }

    pub fn into_descriptor(self) -> PaymentDescriptor {
        match self {
            SubscribeOutcome::TestMode(d) | SubscribeOutcome::PaymentRequired(d) => d,
        }
    }
}

impl ApiClient {
    pub async fn room_types(&self) -> Result<Vec<RoomType>> {
        self.get("/black-room-types").await
    }

    pub async fn subscribe_room_type(&self, type_id: u64) -> Result<SubscribeOutcome> {
        let descriptor: PaymentDescriptor = self
            .post_empty(&format!("/black-room-types/{type_id}/subscribe"))
            .await?;
        info!(type_id, code = %descriptor.payment_code, test_mode = descriptor.is_test_mode, "subscription started");
        Ok(SubscribeOutcome::from_descriptor(descriptor))
    }
}

/// Room types plus which ones this user holds a subscription to.
///
/// The server flag is the starting point; a verified payment marks the type
/// locally so the list updates without a refetch.
#[derive(Debug, Clone, Default)]
pub struct RoomCatalog {
    types: BTreeMap<u64, RoomType>,
    subscribed: HashSet<u64>,
}

impl RoomCatalog {
    pub fn new(types: Vec<RoomType>) -> Self {
        let subscribed = types.iter().filter(|t| t.is_subscribed).map(|t| t.id).collect();
        let types = types.into_iter().map(|t| (t.id, t)).collect();
        Self { types, subscribed }
    }

    pub async fn fetch(api: &ApiClient) -> Result<Self> {
        Ok(Self::new(api.room_types().await?))
    }

    /// Types in id order.
    pub fn types(&self) -> impl Iterator<Item = &RoomType> {
        self.types.values()
    }

    pub fn get(&self, id: u64) -> Option<&RoomType> {
        self.types.get(&id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn is_subscribed(&self, id: u64) -> bool {
        self.subscribed.contains(&id)
    }

    /// Record a verified subscription. Unknown ids are ignored.
    pub fn mark_subscribed(&mut self, id: u64) -> bool {
        if self.types.contains_key(&id) {
            self.subscribed.insert(id);
            true
        } else {
            false
        }
    }

    /// Replace the list, keeping local marks the server has not caught up with.
    pub fn refresh(&mut self, types: Vec<RoomType>) {
        let local = std::mem::take(&mut self.subscribed);
        *self = Self::new(types);
        for id in local {
            self.mark_subscribed(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_type(id: u64, subscribed: bool) -> RoomType {
        RoomType {
            id,
            name: format!("Salle {id}"),
            description: None,
            price: 1000.0,
            duration_minutes: Some(60),
            max_participants: Some(10),
            is_subscribed: subscribed,
        }
    }

    #[test]
    fn room_type_accepts_string_price() {
        let t: RoomType =
            serde_json::from_str(r#"{"id":1,"name":"Nuit","price":"2500.00"}"#).unwrap();
        assert_eq!(t.price, 2500.0);
        assert!(!t.is_subscribed);
    }

    #[test]
    fn catalog_seeds_subscriptions_from_server() {
        let cat = RoomCatalog::new(vec![room_type(1, true), room_type(2, false)]);
        assert!(cat.is_subscribed(1));
        assert!(!cat.is_subscribed(2));
        assert_eq!(cat.len(), 2);
    }

    #[test]
    fn catalog_iterates_in_id_order() {
        let cat = RoomCatalog::new(vec![room_type(3, false), room_type(1, false)]);
        let ids: Vec<u64> = cat.types().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn mark_subscribed_ignores_unknown() {
        let mut cat = RoomCatalog::new(vec![room_type(1, false)]);
        assert!(cat.mark_subscribed(1));
        assert!(!cat.mark_subscribed(99));
        assert!(cat.is_subscribed(1));
        assert!(!cat.is_subscribed(99));
    }

    #[test]
    fn refresh_keeps_local_marks() {
        let mut cat = RoomCatalog::new(vec![room_type(1, false), room_type(2, false)]);
        cat.mark_subscribed(2);
        cat.refresh(vec![room_type(1, true), room_type(2, false)]);
        assert!(cat.is_subscribed(1));
        assert!(cat.is_subscribed(2));
    }

    #[test]
    fn refresh_drops_marks_for_removed_types() {
        let mut cat = RoomCatalog::new(vec![room_type(1, false)]);
        cat.mark_subscribed(1);
        cat.refresh(vec![room_type(2, false)]);
        assert!(!cat.is_subscribed(1));
        assert!(cat.get(1).is_none());
    }

    #[test]
    fn subscribe_outcome_splits_on_test_mode() {
        let test: PaymentDescriptor =
            serde_json::from_str(r#"{"payment_code":"T","amount":0,"is_test_mode":true}"#).unwrap();
        let paid: PaymentDescriptor =
            serde_json::from_str(r#"{"payment_code":"P","wave_url":"https://w","amount":100}"#).unwrap();
        assert!(matches!(SubscribeOutcome::from_descriptor(test), SubscribeOutcome::TestMode(_)));
        let outcome = SubscribeOutcome::from_descriptor(paid);
        assert!(matches!(outcome, SubscribeOutcome::PaymentRequired(_)));
        assert_eq!(outcome.descriptor().payment_code, "P");
    }
}
