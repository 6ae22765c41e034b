//! Login, logout and profile refresh.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::ApiClient;
use crate::error::Result;
use crate::session::{Session, SessionStore, UserProfile};

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    pseudo: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    user: UserProfile,
}

impl ApiClient {
    /// Authenticate, install the token in the session and persist it.
    pub async fn login<S: SessionStore>(&self, store: &S, pseudo: &str, password: &str) -> Result<UserProfile> {
        let resp: LoginResponse = self
            .post("/auth/login", &LoginRequest { pseudo, password })
            .await?;
        let session = Session {
            token: Some(resp.token),
            user: Some(resp.user.clone()),
        };
        store.save(&session)?;
        self.session().set(session);
        info!(pseudo = %resp.user.pseudo, "logged in");
        Ok(resp.user)
    }

    /// Current profile; also refreshes the cached one.
    pub async fn me(&self) -> Result<UserProfile> {
        let user: UserProfile = self.get("/auth/me").await?;
        self.session().set_user(user.clone());
        Ok(user)
    }

    /// Best-effort server logout; the local session is cleared regardless.
    pub async fn logout<S: SessionStore>(&self, store: &S) -> Result<()> {
        let remote = if self.session().token().is_some() {
            self.post_ack("/auth/logout", &serde_json::json!({})).await
        } else {
            Ok(())
        };
        self.session().clear();
        store.clear()?;
        remote
    }
}
