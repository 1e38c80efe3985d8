//! HTTP implementation of [`ChatBackend`] over `reqwest`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use cartbot_core::config::BackendConfig;
use cartbot_core::types::{Message, Product, SearchCriteria, SendReceipt, Session, SessionId};

use super::ChatBackend;
use crate::auth::AuthProvider;
use crate::error::BackendError;

/// Longest response body echoed back in a decode error.
const BODY_PREVIEW_CHARS: usize = 300;

/// Chat backend reached over HTTP.
///
/// No request timeout is configured: a call resolves, fails, or waits for
/// as long as the server keeps the connection open.
pub struct HttpBackend {
    base_url: String,
    http: reqwest::Client,
    auth: Arc<dyn AuthProvider>,
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    content: &'a str,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, auth: Arc<dyn AuthProvider>) -> Result<Self, BackendError> {
        let http = build_client(config)?;
        Ok(Self {
            base_url: config.base_url.clone(),
            http,
            auth,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    async fn get_json<R: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<R, BackendError> {
        let mut request = self.http.get(self.url(path));
        if !query.is_empty() {
            request = request.query(query);
        }
        let resp = self.auth.authorize(request).send().await?;
        read_json(path, resp).await
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<R, BackendError> {
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let resp = self.auth.authorize(request).send().await?;
        read_json(path, resp).await
    }
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn list_sessions(&self) -> Result<Vec<Session>, BackendError> {
        self.get_json("chat/sessions", &[]).await
    }

    async fn create_session(&self) -> Result<Session, BackendError> {
        self.post_json::<(), _>("chat/sessions", None).await
    }

    async fn list_messages(&self, session: SessionId) -> Result<Vec<Message>, BackendError> {
        self.get_json(&format!("chat/sessions/{}/messages", session), &[])
            .await
    }

    async fn send_message(
        &self,
        session: SessionId,
        content: &str,
    ) -> Result<SendReceipt, BackendError> {
        self.post_json(
            &format!("chat/sessions/{}/messages", session),
            Some(&SendMessageRequest { content }),
        )
        .await
    }

    async fn search_products(
        &self,
        criteria: &SearchCriteria,
    ) -> Result<Vec<Product>, BackendError> {
        self.get_json("products", &criteria.query_params()).await
    }

    async fn list_categories(&self) -> Result<Vec<String>, BackendError> {
        self.get_json("categories", &[]).await
    }
}

pub(crate) fn build_client(config: &BackendConfig) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| BackendError::Transport(format!("failed to build HTTP client: {}", e)))
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Decode a JSON response, mapping non-2xx statuses to
/// [`BackendError::Status`] with the server's `message` when it sent one.
pub(crate) async fn read_json<R: DeserializeOwned>(
    endpoint: &str,
    resp: reqwest::Response,
) -> Result<R, BackendError> {
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| preview(&body));
        return Err(BackendError::Status {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        BackendError::Decode(format!(
            "{endpoint}: {e}; body: {}",
            preview(&body)
        ))
    })
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_slashes() {
        assert_eq!(
            join_url("http://localhost:5000/api", "chat/sessions"),
            "http://localhost:5000/api/chat/sessions"
        );
        assert_eq!(
            join_url("http://localhost:5000/api/", "/products"),
            "http://localhost:5000/api/products"
        );
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let body = "\u{00e9}".repeat(BODY_PREVIEW_CHARS + 10);
        let p = preview(&body);
        assert_eq!(p.chars().count(), BODY_PREVIEW_CHARS);
    }

    #[test]
    fn test_send_request_body_shape() {
        let body = serde_json::to_value(SendMessageRequest { content: "hi" }).unwrap();
        assert_eq!(body, serde_json::json!({ "content": "hi" }));
    }
}
