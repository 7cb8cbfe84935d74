//! Conversational RAG endpoints.
//!
//! `chat` asks for one complete answer; `chat_stream` opens the streaming
//! variant and hands back a delta stream. Callers typically run both for a
//! question: stream for responsiveness, then finalize from the complete
//! response, which alone carries sources and model attribution.

use futures_util::StreamExt;

use mv_common::{ClientError, ClientResult};
use mv_protocol::rest::{
    ApiKeyTestRequest, ApiKeyTestResult, ChatRequest, ChatResponse, LlmSettings, LlmSettingsList,
    LlmSettingsUpdate, ProviderList, RagHealth,
};

use super::ApiClient;
use crate::chat::{ChatDeltaStream, ChatStream};

impl ApiClient {
    /// One-shot chat completion. Any `stream` flag on the request is
    /// overridden; this endpoint always answers in full.
    pub async fn chat(&self, request: &ChatRequest) -> ClientResult<ChatResponse> {
        let request = ChatRequest {
            stream: Some(false),
            ..request.clone()
        };
        self.post_json("/rag/chat", &request).await
    }

    /// Open a streaming chat completion. Dropping the returned stream
    /// aborts the request.
    pub async fn chat_stream(&self, request: &ChatRequest) -> ClientResult<ChatDeltaStream> {
        let request = ChatRequest {
            stream: Some(true),
            ..request.clone()
        };
        let response = self
            .send(
                self.http()
                    .post(self.url("/rag/chat/stream"))
                    .json(&request),
            )
            .await?;
        let source = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed();
        Ok(ChatStream::new(source))
    }

    pub async fn providers(&self) -> ClientResult<ProviderList> {
        self.get_json("/rag/providers").await
    }

    pub async fn rag_health(&self) -> ClientResult<RagHealth> {
        self.get_json("/rag/health").await
    }

    pub async fn test_api_key(
        &self,
        request: &ApiKeyTestRequest,
    ) -> ClientResult<ApiKeyTestResult> {
        self.post_json("/rag/test-api-key", request).await
    }

    // ─── Provider settings ───────────────────────────────────

    pub async fn llm_settings(&self) -> ClientResult<LlmSettingsList> {
        self.get_json("/rag/settings").await
    }

    pub async fn update_llm_settings(
        &self,
        provider: &str,
        update: &LlmSettingsUpdate,
    ) -> ClientResult<LlmSettings> {
        self.put_json(&format!("/rag/settings/{provider}"), update)
            .await
    }

    pub async fn delete_llm_settings(&self, provider: &str) -> ClientResult<()> {
        self.delete(&format!("/rag/settings/{provider}")).await
    }

    pub async fn set_default_provider(&self, provider: &str) -> ClientResult<LlmSettings> {
        self.post_empty(&format!("/rag/settings/{provider}/set-default"))
            .await
    }
}
