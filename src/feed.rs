//! Posts, comments, likes, topics and onboarding.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::ApiClient;
use crate::error::{Result, ValidationError};

pub const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub posts_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub content: String,
    /// Anonymous alias shown instead of the author's pseudo.
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub topic: Option<Topic>,
    #[serde(default)]
    pub likes_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub liked_by_me: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub content: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LikeState {
    pub liked: bool,
    pub likes_count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PostQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Debug, Serialize)]
struct NewPost<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic_id: Option<u64>,
}

#[derive(Debug, Serialize)]
struct NewComment<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OnboardingRequest<'a> {
    topic_ids: &'a [u64],
}

/// Trimmed, non-empty, at most [`MAX_CONTENT_CHARS`] characters.
pub fn validate_content(raw: &str) -> std::result::Result<&str, ValidationError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(ValidationError::ContentEmpty);
    }
    let chars = s.chars().count();
    if chars > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong {
            max: MAX_CONTENT_CHARS,
            actual: chars,
        });
    }
    Ok(s)
}

impl Post {
    /// Apply a like toggle result locally.
    pub fn apply_like(&mut self, state: LikeState) {
        self.liked_by_me = state.liked;
        self.likes_count = state.likes_count;
    }
}

impl ApiClient {
    pub async fn topics(&self) -> Result<Vec<Topic>> {
        self.get("/topics").await
    }

    pub async fn posts(&self, query: &PostQuery) -> Result<Vec<Post>> {
        self.get_query("/posts", query).await
    }

    pub async fn create_post(&self, content: &str, topic_id: Option<u64>) -> Result<Post> {
        let content = validate_content(content)?;
        self.post("/posts", &NewPost { content, topic_id }).await
    }

    pub async fn comments(&self, post_id: u64) -> Result<Vec<Comment>> {
        self.get(&format!("/posts/{post_id}/comments")).await
    }

    pub async fn add_comment(&self, post_id: u64, content: &str) -> Result<Comment> {
        let content = validate_content(content)?;
        self.post(&format!("/posts/{post_id}/comments"), &NewComment { content })
            .await
    }

    pub async fn toggle_like(&self, post_id: u64) -> Result<LikeState> {
        let state: LikeState = self.post_empty(&format!("/posts/{post_id}/like")).await?;
        debug!(post_id, liked = state.liked, "like toggled");
        Ok(state)
    }

    /// Save the topics chosen during onboarding. At least one is required.
    pub async fn complete_onboarding(&self, topic_ids: &[u64]) -> Result<()> {
        if topic_ids.is_empty() {
            return Err(ValidationError::NoTopics.into());
        }
        self.post_ack("/onboarding/complete", &OnboardingRequest { topic_ids })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_trimmed() {
        assert_eq!(validate_content("  salut  ").unwrap(), "salut");
    }

    #[test]
    fn content_empty_rejected() {
        assert_eq!(validate_content(" \n ").unwrap_err(), ValidationError::ContentEmpty);
    }

    #[test]
    fn content_length_counted_in_chars() {
        assert!(validate_content(&"é".repeat(MAX_CONTENT_CHARS)).is_ok());
        assert!(matches!(
            validate_content(&"é".repeat(MAX_CONTENT_CHARS + 1)),
            Err(ValidationError::ContentTooLong { .. })
        ));
    }

    #[test]
    fn post_defaults_missing_counters() {
        let p: Post = serde_json::from_str(r#"{"id":1,"content":"hey"}"#).unwrap();
        assert_eq!(p.likes_count, 0);
        assert!(!p.liked_by_me);
        assert!(p.topic.is_none());
    }

    #[test]
    fn apply_like_updates_counters() {
        let mut p: Post = serde_json::from_str(r#"{"id":1,"content":"hey","likes_count":4}"#).unwrap();
        p.apply_like(LikeState {
            liked: true,
            likes_count: 5,
        });
        assert!(p.liked_by_me);
        assert_eq!(p.likes_count, 5);
    }

    #[test]
    fn post_query_skips_unset_params() {
        let q = PostQuery {
            topic_id: Some(3),
            page: None,
        };
        let v = serde_json::to_value(&q).unwrap();
        assert_eq!(v, serde_json::json!({"topic_id": 3}));
    }

    #[test]
    fn onboarding_body_shape() {
        let v = serde_json::to_value(OnboardingRequest { topic_ids: &[1, 4] }).unwrap();
        assert_eq!(v, serde_json::json!({"topic_ids": [1, 4]}));
    }
}
