//! Moderation dashboards: users, posts, topics, payments, moderators.
//!
//! Every list is held in an [`OptimisticList`]: the change shows up at once
//! and is rolled back if the server refuses it.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::{Result, ValidationError};
use crate::payment::{deserialize_amount, PaymentStatus};
use crate::session::UserRole;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

pub trait Identified {
    fn id(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Blocked,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: u64,
    pub pseudo: String,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminPost {
    pub id: u64,
    pub content: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub reports_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminTopic {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub posts_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminPayment {
    pub id: u64,
    pub payment_code: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    pub status: PaymentStatus,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub user_pseudo: Option<String>,
    #[serde(default)]
    pub phone_prefix: Option<String>,
    #[serde(default)]
    pub phone_last2: Option<String>,
    #[serde(default)]
    pub transaction_last4: Option<String>,
    #[serde(default)]
    pub actual_amount_paid: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeratorApplication {
    pub id: u64,
    pub pseudo: String,
    #[serde(default)]
    pub status: ModerationStatus,
    #[serde(default)]
    pub motivation: Option<String>,
}

macro_rules! identified {
    ($($t:ty),* $(,)?) => {
        $(impl Identified for $t {
            fn id(&self) -> u64 {
                self.id
            }
        })*
    };
}

identified!(AdminUser, AdminPost, AdminTopic, AdminPayment, ModeratorApplication);

// ---------------------------------------------------------------------------
// Optimistic list
// ---------------------------------------------------------------------------

/// A list whose edits apply locally first and roll back on server failure.
#[derive(Debug, Clone)]
pub struct OptimisticList<T> {
    items: Vec<T>,
}

impl<T> Default for OptimisticList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Clone + Identified> OptimisticList<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn get(&self, id: u64) -> Option<&T> {
        self.items.iter().find(|i| i.id() == id)
    }

    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Apply `mutate` now, await `request`, restore the previous list on error.
    pub async fn update<M, Fut>(&mut self, mutate: M, request: Fut) -> Result<()>
    where
        M: FnOnce(&mut Vec<T>),
        Fut: Future<Output = Result<()>>,
    {
        let snapshot = self.items.clone();
        mutate(&mut self.items);
        match request.await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "server refused change, rolling back");
                self.items = snapshot;
                Err(e)
            }
        }
    }

    /// Remove the row with `id`, optimistically.
    pub async fn remove<Fut>(&mut self, id: u64, request: Fut) -> Result<()>
    where
        Fut: Future<Output = Result<()>>,
    {
        self.update(|items| items.retain(|i| i.id() != id), request).await
    }

    /// Edit the row with `id` in place, optimistically.
    pub async fn modify<E, Fut>(&mut self, id: u64, edit: E, request: Fut) -> Result<()>
    where
        E: FnOnce(&mut T),
        Fut: Future<Output = Result<()>>,
    {
        self.update(
            |items| {
                if let Some(item) = items.iter_mut().find(|i| i.id() == id) {
                    edit(item);
                }
            },
            request,
        )
        .await
    }
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct NewTopic<'a> {
    name: &'a str,
}

impl ApiClient {
    /// `GET /admin/users`.
    pub async fn admin_users(&self) -> Result<Vec<AdminUser>> {
        self.get("/admin/users").await
    }

    /// `POST /admin/users/{id}/block`.
    pub async fn admin_block_user(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/users/{id}/block"), &serde_json::json!({})).await
    }

    /// `POST /admin/users/{id}/unblock`.
    pub async fn admin_unblock_user(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/users/{id}/unblock"), &serde_json::json!({})).await
    }

    /// `DELETE /admin/users/{id}`. Admins only; moderators get a 403.
    pub async fn admin_delete_user(&self, id: u64) -> Result<()> {
        self.delete(&format!("/admin/users/{id}")).await
    }

    /// `GET /admin/posts`, including reported posts.
    pub async fn admin_posts(&self) -> Result<Vec<AdminPost>> {
        self.get("/admin/posts").await
    }

    /// `POST /admin/posts/{id}/approve`.
    pub async fn admin_approve_post(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/posts/{id}/approve"), &serde_json::json!({})).await
    }

    /// `POST /admin/posts/{id}/reject`.
    pub async fn admin_reject_post(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/posts/{id}/reject"), &serde_json::json!({})).await
    }

    /// `DELETE /admin/posts/{id}`.
    pub async fn admin_delete_post(&self, id: u64) -> Result<()> {
        self.delete(&format!("/admin/posts/{id}")).await
    }

    /// `GET /admin/topics`.
    pub async fn admin_topics(&self) -> Result<Vec<AdminTopic>> {
        self.get("/admin/topics").await
    }

    /// `POST /admin/topics` with the trimmed name.
    ///
    /// # Returns
    /// The created topic with its server id. A blank name is rejected with
    /// [`ValidationError::ContentEmpty`] before any request.
    pub async fn admin_create_topic(&self, name: &str) -> Result<AdminTopic> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::ContentEmpty.into());
        }
        self.post("/admin/topics", &NewTopic { name }).await
    }

    /// `DELETE /admin/topics/{id}`.
    pub async fn admin_delete_topic(&self, id: u64) -> Result<()> {
        self.delete(&format!("/admin/topics/{id}")).await
    }

    /// `GET /admin/payments`: receipts waiting for a manual check.
    pub async fn admin_payments(&self) -> Result<Vec<AdminPayment>> {
        self.get("/admin/payments").await
    }

    /// `POST /admin/payments/{id}/approve`.
    pub async fn admin_approve_payment(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/payments/{id}/approve"), &serde_json::json!({})).await
    }

    /// `POST /admin/payments/{id}/reject`.
    pub async fn admin_reject_payment(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/payments/{id}/reject"), &serde_json::json!({})).await
    }

    /// `GET /admin/moderators`: applications and current moderators.
    pub async fn admin_moderators(&self) -> Result<Vec<ModeratorApplication>> {
        self.get("/admin/moderators").await
    }

    /// `POST /admin/moderators/{id}/approve`.
    pub async fn admin_approve_moderator(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/moderators/{id}/approve"), &serde_json::json!({})).await
    }

    /// `POST /admin/moderators/{id}/reject`.
    pub async fn admin_reject_moderator(&self, id: u64) -> Result<()> {
        self.post_ack(&format!("/admin/moderators/{id}/reject"), &serde_json::json!({})).await
    }

    /// `DELETE /admin/moderators/{id}`.
    pub async fn admin_revoke_moderator(&self, id: u64) -> Result<()> {
        self.delete(&format!("/admin/moderators/{id}")).await
    }
}

// ---------------------------------------------------------------------------
// Panel
// ---------------------------------------------------------------------------

/// All dashboards, each kept in sync optimistically.
pub struct AdminPanel<'a> {
    api: &'a ApiClient,
    pub users: OptimisticList<AdminUser>,
    pub posts: OptimisticList<AdminPost>,
    pub topics: OptimisticList<AdminTopic>,
    pub payments: OptimisticList<AdminPayment>,
    pub moderators: OptimisticList<ModeratorApplication>,
}

impl<'a> AdminPanel<'a> {
    /// Empty dashboards; call the `load_*` methods to fill them.
    pub fn new(api: &'a ApiClient) -> Self {
        Self {
            api,
            users: OptimisticList::default(),
            posts: OptimisticList::default(),
            topics: OptimisticList::default(),
            payments: OptimisticList::default(),
            moderators: OptimisticList::default(),
        }
    }

    /// Replace the user list with the server's.
    ///
    /// # Returns
    /// The fresh rows. On error the previous rows are kept.
    pub async fn load_users(&mut self) -> Result<&[AdminUser]> {
        self.users.replace_all(self.api.admin_users().await?);
        Ok(self.users.items())
    }

    /// Replace the post list with the server's.
    pub async fn load_posts(&mut self) -> Result<&[AdminPost]> {
        self.posts.replace_all(self.api.admin_posts().await?);
        Ok(self.posts.items())
    }

    /// Replace the topic list with the server's.
    pub async fn load_topics(&mut self) -> Result<&[AdminTopic]> {
        self.topics.replace_all(self.api.admin_topics().await?);
        Ok(self.topics.items())
    }

    /// Replace the payment list with the server's.
    pub async fn load_payments(&mut self) -> Result<&[AdminPayment]> {
        self.payments.replace_all(self.api.admin_payments().await?);
        Ok(self.payments.items())
    }

    /// Replace the moderator list with the server's.
    pub async fn load_moderators(&mut self) -> Result<&[ModeratorApplication]> {
        self.moderators.replace_all(self.api.admin_moderators().await?);
        Ok(self.moderators.items())
    }

    /// Mark the user blocked now; restored if the server refuses.
    pub async fn block_user(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.users
            .modify(id, |u| u.status = AccountStatus::Blocked, api.admin_block_user(id))
            .await?;
        info!(id, "user blocked");
        Ok(())
    }

    /// Mark the user active now; restored if the server refuses.
    pub async fn unblock_user(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.users
            .modify(id, |u| u.status = AccountStatus::Active, api.admin_unblock_user(id))
            .await
    }

    /// Drop the row now; it comes back if the server refuses.
    pub async fn delete_user(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.users.remove(id, api.admin_delete_user(id)).await
    }

    /// Optimistic approve.
    pub async fn approve_post(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.posts
            .modify(id, |p| p.status = ModerationStatus::Approved, api.admin_approve_post(id))
            .await
    }

    /// Optimistic reject.
    pub async fn reject_post(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.posts
            .modify(id, |p| p.status = ModerationStatus::Rejected, api.admin_reject_post(id))
            .await
    }

    /// Optimistic delete.
    pub async fn delete_post(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.posts.remove(id, api.admin_delete_post(id)).await
    }

    /// Not optimistic: the id comes from the server.
    pub async fn create_topic(&mut self, name: &str) -> Result<AdminTopic> {
        let topic = self.api.admin_create_topic(name).await?;
        let mut items = self.topics.items().to_vec();
        items.push(topic.clone());
        self.topics.replace_all(items);
        Ok(topic)
    }

    /// Optimistic delete.
    pub async fn delete_topic(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.topics.remove(id, api.admin_delete_topic(id)).await
    }

    /// Mark the payment completed now; restored if the server refuses.
    pub async fn approve_payment(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.payments
            .modify(id, |p| p.status = PaymentStatus::Completed, api.admin_approve_payment(id))
            .await
    }

    /// Mark the payment failed now; restored if the server refuses.
    pub async fn reject_payment(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.payments
            .modify(id, |p| p.status = PaymentStatus::Failed, api.admin_reject_payment(id))
            .await
    }

    pub async fn approve_moderator(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.moderators
            .modify(id, |m| m.status = ModerationStatus::Approved, api.admin_approve_moderator(id))
            .await
    }

    pub async fn reject_moderator(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.moderators
            .modify(id, |m| m.status = ModerationStatus::Rejected, api.admin_reject_moderator(id))
            .await
    }

    /// Remove a moderator. The row disappears now and returns on failure.
    pub async fn revoke_moderator(&mut self, id: u64) -> Result<()> {
        let api = self.api;
        self.moderators.remove(id, api.admin_revoke_moderator(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnosunuError;

    fn user(id: u64) -> AdminUser {
        AdminUser {
            id,
            pseudo: format!("u{id}"),
            status: AccountStatus::Active,
            role: UserRole::User,
            created_at: None,
        }
    }

    fn refused() -> AnosunuError {
        AnosunuError::Http {
            status: 403,
            url: "x".into(),
            message: Some("Action non autorisée".into()),
            code: None,
        }
    }

    #[tokio::test]
    async fn modify_keeps_change_on_success() {
        let mut list = OptimisticList::new(vec![user(1), user(2)]);
        list.modify(2, |u| u.status = AccountStatus::Blocked, async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(list.get(2).unwrap().status, AccountStatus::Blocked);
        assert_eq!(list.get(1).unwrap().status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn modify_rolls_back_on_failure() {
        let mut list = OptimisticList::new(vec![user(1)]);
        let err = list
            .modify(1, |u| u.status = AccountStatus::Blocked, async { Err(refused()) })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Action non autorisée");
        assert_eq!(list.get(1).unwrap().status, AccountStatus::Active);
    }

    #[tokio::test]
    async fn remove_rolls_back_on_failure() {
        let mut list = OptimisticList::new(vec![user(1), user(2)]);
        assert!(list.remove(1, async { Err(refused()) }).await.is_err());
        assert_eq!(list.items().len(), 2);
        list.remove(1, async { Ok(()) }).await.unwrap();
        assert_eq!(list.items().len(), 1);
        assert!(list.get(1).is_none());
    }

    #[test]
    fn admin_payment_parses_string_amount() {
        let p: AdminPayment = serde_json::from_str(
            r#"{"id":9,"payment_code":"P9","amount":"2500.00","status":"pending","transaction_last4":"AB12"}"#,
        )
        .unwrap();
        assert_eq!(p.amount, 2500.0);
        assert_eq!(p.status, PaymentStatus::Pending);
        assert_eq!(p.transaction_last4.as_deref(), Some("AB12"));
    }

    #[test]
    fn default_list_needs_no_default_rows() {
        let list: OptimisticList<AdminPayment> = OptimisticList::default();
        assert!(list.items().is_empty());
        assert!(list.get(1).is_none());
    }

    #[test]
    fn admin_user_defaults() {
        let u: AdminUser = serde_json::from_str(r#"{"id":1,"pseudo":"x"}"#).unwrap();
        assert_eq!(u.status, AccountStatus::Active);
        assert_eq!(u.role, UserRole::User);
    }

    #[test]
    fn moderation_status_lowercase() {
        let s: ModerationStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(s, ModerationStatus::Rejected);
    }
}
