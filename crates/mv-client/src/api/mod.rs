//! REST client.
//!
//! One `ApiClient` per process: it owns the HTTP connection pool, attaches
//! the bearer token to every request, and transparently refreshes an
//! expired access token once before surfacing `Unauthorized`.

mod auth;
mod emails;
mod forensic;
mod rag;
mod search;
mod stats;
mod upload;

pub use forensic::AuditLogFilter;
pub use search::SearchResults;

use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use mv_common::{AppConfig, ClientError, ClientResult};
use mv_protocol::rest::TokenPair;

use crate::auth::TokenStore;

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: &AppConfig, tokens: TokenStore) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.api.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api.url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.tokens.access_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Send a request with auth attached. On a 401 the access token is
    /// refreshed and the request retried once; requests with streaming
    /// bodies cannot be cloned and skip the retry.
    pub(crate) async fn send(&self, builder: RequestBuilder) -> ClientResult<Response> {
        let retry = builder.try_clone();
        let response = self.authorized(builder).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(retry) = retry {
                if self.tokens.refresh_token().is_some() {
                    match self.refresh_tokens().await {
                        Ok(()) => {
                            tracing::debug!("access token refreshed, retrying request");
                            let response = self.authorized(retry).send().await?;
                            return Self::check(response).await;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "token refresh failed, clearing session");
                            self.tokens.clear();
                        }
                    }
                }
            }
        }
        Self::check(response).await
    }

    /// Turn a non-2xx response into an error carrying the server's
    /// `detail` field when present.
    async fn check(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("detail")
                    .and_then(Value::as_str)
                    .map(|s| s.to_string())
            })
            .unwrap_or(body);

        if status == StatusCode::UNAUTHORIZED {
            Err(ClientError::Unauthorized(message))
        } else {
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Exchange the refresh token for a new pair. Bypasses `send` so a 401
    /// here can never recurse into another refresh.
    async fn refresh_tokens(&self) -> ClientResult<()> {
        let refresh = self
            .tokens
            .refresh_token()
            .ok_or_else(|| ClientError::Unauthorized("no refresh token".to_string()))?;
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refresh_token": refresh }))
            .send()
            .await?;
        let response = Self::check(response).await?;
        let pair: TokenPair = response.json().await?;
        self.tokens.set(pair);
        Ok(())
    }

    // ─── JSON helpers ────────────────────────────────────────

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.send(self.http.get(self.url(path))).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn get_json_with<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let response = self
            .send(self.http.get(self.url(path)).query(query))
            .await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self.send(self.http.post(self.url(path)).json(body)).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.send(self.http.post(self.url(path))).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let response = self.send(self.http.put(self.url(path)).json(body)).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(self.http.delete(self.url(path))).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let mut config = AppConfig::default();
        config.api.url = "http://localhost:8000/api/v1/".to_string();
        let client = ApiClient::new(&config, TokenStore::in_memory()).unwrap();
        assert_eq!(
            client.url("/emails"),
            "http://localhost:8000/api/v1/emails"
        );
    }
}
