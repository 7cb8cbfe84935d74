//! Auth endpoints. Login and register store the issued token pair in the
//! shared store; logout clears it whether or not the server call succeeds.

use mv_common::ClientResult;
use mv_protocol::rest::{LoginRequest, LoginResponse, RegisterRequest, User};

use super::ApiClient;

impl ApiClient {
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<User> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self.post_json("/auth/login", &request).await?;
        self.tokens().set(response.tokens);
        Ok(response.user)
    }

    pub async fn register(&self, request: &RegisterRequest) -> ClientResult<User> {
        let response: LoginResponse = self.post_json("/auth/register", request).await?;
        self.tokens().set(response.tokens);
        Ok(response.user)
    }

    /// Best-effort server-side logout; local credentials are dropped even
    /// when the request fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.send(self.http().post(self.url("/auth/logout"))).await;
        self.tokens().clear();
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!(error = %e, "server logout failed, local session cleared anyway");
                Ok(())
            }
        }
    }

    pub async fn current_user(&self) -> ClientResult<User> {
        self.get_json("/auth/me").await
    }
}
