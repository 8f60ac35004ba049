use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use super::PlaybackTokens;
use crate::error::PlaybackError;

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

/// Client for the external process that holds the client secret and
/// performs the actual token exchange.
pub struct TokenBackend {
    http: Client,
    base_url: String,
}

impl TokenBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Trade an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str) -> Result<PlaybackTokens, PlaybackError> {
        let body = serde_json::json!({ "code": code });
        let resp = self.post("auth", &body).await?;
        let access_token = resp
            .access_token
            .ok_or_else(|| PlaybackError::UnexpectedResponse("missing access_token".into()))?;
        Ok(PlaybackTokens {
            access_token,
            refresh_token: resp.refresh_token,
            obtained_at: Utc::now(),
        })
    }

    /// Get a fresh access token. The backend may rotate the refresh token;
    /// if it does not, the old one is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<PlaybackTokens, PlaybackError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let resp = self.post("refresh", &body).await?;
        let access_token = resp
            .access_token
            .ok_or_else(|| PlaybackError::UnexpectedResponse("missing access_token".into()))?;
        Ok(PlaybackTokens {
            access_token,
            refresh_token: resp
                .refresh_token
                .or_else(|| Some(refresh_token.to_string())),
            obtained_at: Utc::now(),
        })
    }

    async fn post(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<TokenResponse, PlaybackError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.http.post(&url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PlaybackError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn exchange_code_posts_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/auth")
            .match_body(Matcher::Json(serde_json::json!({ "code": "abc" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"at","refresh_token":"rt"}"#)
            .create_async()
            .await;

        let backend = TokenBackend::new(&server.url());
        let tokens = backend.exchange_code("abc").await.unwrap();
        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn refresh_keeps_old_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/refresh")
            .match_body(Matcher::Json(serde_json::json!({ "refresh_token": "rt" })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"new"}"#)
            .create_async()
            .await;

        let backend = TokenBackend::new(&format!("{}/", server.url()));
        let tokens = backend.refresh("rt").await.unwrap();
        assert_eq!(tokens.access_token, "new");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
    }

    #[tokio::test]
    async fn backend_error_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/refresh")
            .with_status(400)
            .with_body("invalid_grant")
            .create_async()
            .await;

        let backend = TokenBackend::new(&server.url());
        match backend.refresh("rt").await {
            Err(PlaybackError::Status { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid_grant");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_access_token_is_unexpected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/auth")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("{}")
            .create_async()
            .await;

        let backend = TokenBackend::new(&server.url());
        assert!(matches!(
            backend.exchange_code("x").await,
            Err(PlaybackError::UnexpectedResponse(_))
        ));
    }
}
