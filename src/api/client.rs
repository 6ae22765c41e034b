//! HTTP client for the Anosunu backend.

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{AnosunuError, Result};
use crate::session::SessionContext;

/// Unwrap the backend's `{ "data": T }` envelope.
///
/// Accepts a bare `T` as well, since a few admin endpoints answer without
/// the envelope. An empty body decodes as `null`, then as `{}`, so replies
/// whose fields are all optional still succeed.
pub fn decode_data<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    #[derive(Deserialize)]
    struct Envelope<T> {
        data: T,
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return serde_json::from_slice::<T>(b"null")
            .or_else(|_| serde_json::from_slice::<T>(b"{}"))
            .map_err(|e| AnosunuError::Decode {
                field: "body".into(),
                detail: format!("empty response: {e}"),
            });
    }

    match serde_json::from_slice::<Envelope<T>>(bytes) {
        Ok(env) => Ok(env.data),
        Err(envelope_err) => serde_json::from_slice::<T>(bytes).map_err(|_| AnosunuError::Decode {
            field: "data".into(),
            detail: envelope_err.to_string(),
        }),
    }
}

/// Pull `message` and `error_code` out of an error body.
///
/// Looks at the top level first, then inside `data`. Non-JSON bodies yield
/// `(None, None)`.
pub fn extract_error(bytes: &[u8]) -> (Option<String>, Option<String>) {
    let Ok(v) = serde_json::from_slice::<serde_json::Value>(bytes) else {
        return (None, None);
    };
    let pick = |key: &str| -> Option<String> {
        v.get(key)
            .or_else(|| v.get("data").and_then(|d| d.get(key)))
            .and_then(|m| m.as_str())
            .map(str::to_string)
    };
    let message = pick("message").or_else(|| pick("error"));
    let code = pick("error_code").or_else(|| pick("code"));
    (message, code)
}

/// Thin wrapper over `reqwest::Client` bound to one API base URL and session.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    session: SessionContext,
}

impl ApiClient {
    /// Build a client for `config.api_url` with the configured timeouts.
    ///
    /// # Returns
    /// [`AnosunuError::Config`] when the HTTP client cannot be built (a
    /// broken TLS backend, for instance).
    pub fn new(config: &ClientConfig, session: SessionContext) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| AnosunuError::Config(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.api_url.clone(),
            http,
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");
        match self.session.token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Send, then turn transport failures and non-2xx replies into errors.
    async fn send(&self, req: RequestBuilder, url: &str) -> Result<(u16, Vec<u8>)> {
        let resp: Response = req.send().await.map_err(|e| AnosunuError::Connect {
            url: url.to_string(),
            detail: e.to_string(),
        })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| AnosunuError::Decode {
            field: "body".into(),
            detail: e.to_string(),
        })?;
        debug!(url, status = status.as_u16(), len = bytes.len(), "api response");

        if !status.is_success() {
            let (message, code) = extract_error(&bytes);
            return Err(AnosunuError::Http {
                status: status.as_u16(),
                url: url.to_string(),
                message,
                code,
            });
        }
        Ok((status.as_u16(), bytes.to_vec()))
    }

    /// `GET path` and decode the `data` envelope.
    ///
    /// # Returns
    /// [`AnosunuError::Connect`] when the server is unreachable,
    /// [`AnosunuError::Http`] with the server's `message` and `error_code` on
    /// a non-2xx status, [`AnosunuError::Decode`] when the body has the wrong
    /// shape.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let (_, body) = self.send(self.request(Method::GET, &url), &url).await?;
        decode_data(&body)
    }

    /// [`get`](Self::get) with query-string parameters.
    pub async fn get_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let req = self.request(Method::GET, &url).query(query);
        let (_, body) = self.send(req, &url).await?;
        decode_data(&body)
    }

    /// `POST path` with a JSON body and decode the `data` envelope. Errors
    /// as for [`get`](Self::get).
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_with_status(path, body).await.map(|(_, data)| data)
    }

    /// POST and also return the HTTP status, for endpoints whose 200 and 202
    /// replies mean different things.
    pub async fn post_with_status<B, T>(&self, path: &str, body: &B) -> Result<(u16, T)>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let req = self.request(Method::POST, &url).json(body);
        let (status, bytes) = self.send(req, &url).await?;
        Ok((status, decode_data(&bytes)?))
    }

    /// POST without a body, for verb endpoints like `/admin/users/{id}/block`.
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let (_, bytes) = self.send(self.request(Method::POST, &url), &url).await?;
        decode_data(&bytes)
    }

    /// POST whose reply body is irrelevant; any 2xx is success.
    pub async fn post_ack<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        let req = self.request(Method::POST, &url).json(body);
        self.send(req, &url).await.map(|_| ())
    }

    /// `DELETE path`. Any 2xx is success and the body is ignored.
    pub async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        self.send(self.request(Method::DELETE, &url), &url)
            .await
            .map(|_| ())
    }
}
