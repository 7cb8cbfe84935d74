//! REST request/response payloads.
//!
//! These mirror the server's JSON contracts; the client treats them as
//! opaque shapes and does no validation beyond deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ─── Auth ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Analyst,
    Viewer,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

/// Access/refresh token pair issued by the auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub tokens: TokenPair,
}

// ─── Emails ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    Normal,
    High,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Email {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub sender_name: Option<String>,
    pub recipients: Vec<String>,
    #[serde(default)]
    pub cc: Vec<String>,
    #[serde(default)]
    pub bcc: Vec<String>,
    pub date_sent: DateTime<Utc>,
    pub date_received: Option<DateTime<Utc>>,
    pub body_text: Option<String>,
    pub body_html: Option<String>,
    pub has_attachments: bool,
    pub attachment_count: u32,
    pub importance: Importance,
    pub is_read: bool,
    pub conversation_id: Option<String>,
    pub pst_file_id: String,
    pub created_at: DateTime<Utc>,
}

/// Condensed email row used in listings and search results.
///
/// `importance` is `None` when the producing endpoint does not report it
/// (the search surface omits it); the client never fabricates a value.
#[derive(Debug, Clone, Deserialize)]
pub struct EmailSummary {
    pub id: String,
    pub subject: String,
    pub sender: String,
    pub sender_name: Option<String>,
    pub date_sent: DateTime<Utc>,
    pub preview: String,
    pub has_attachments: bool,
    #[serde(default)]
    pub importance: Option<Importance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub email_id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub sha256_hash: String,
    pub created_at: DateTime<Utc>,
}

// ─── PST files & tasks ──────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct PstFile {
    pub id: String,
    pub filename: String,
    pub original_filename: String,
    pub file_size: u64,
    pub sha256_hash: Option<String>,
    pub status: String,
    pub progress: Option<u8>,
    pub current_phase: Option<String>,
    pub email_count: u64,
    pub emails_total: Option<u64>,
    pub attachment_count: u64,
    pub processed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingTask {
    pub id: String,
    pub task_type: String,
    pub status: String,
    pub progress: u8,
    pub message: Option<String>,
    pub result: Option<Map<String, Value>>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Returned when an upload has been accepted for background processing.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadAccepted {
    pub task_id: String,
    pub pst_file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkUploadSession {
    pub upload_id: String,
    pub chunk_size: u64,
}

// ─── Search ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<SearchFilters>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pst_file_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_from: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_attachments: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<Vec<Importance>>,
}

/// Raw search response as the backend shapes it.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchRow>,
    pub total_count: u64,
    pub query: String,
    pub processed_query: Option<Map<String, Value>>,
    pub search_time_ms: f64,
    pub page: u32,
    pub page_size: u32,
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRow {
    pub email_id: String,
    pub subject: String,
    pub sender_email: String,
    pub sender_name: Option<String>,
    pub sent_date: DateTime<Utc>,
    pub snippet: String,
    pub score: f64,
    pub match_type: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub has_attachments: bool,
    pub attachment_count: u32,
    pub folder_path: String,
    pub pst_file_id: String,
}

// ─── RAG ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatHistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_history: Option<Vec<ChatHistoryEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pst_file_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_sources: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    pub query_type: String,
    pub processed_query: Option<Map<String, Value>>,
    pub model_used: String,
    pub provider_used: String,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub email_id: String,
    pub subject: String,
    pub sender: String,
    pub date: String,
    pub relevance_score: f64,
    pub snippet: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProvider {
    pub name: String,
    pub display_name: String,
    pub is_available: bool,
    pub models: Vec<String>,
    pub default_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderList {
    pub providers: Vec<LlmProvider>,
    pub default_provider: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RagHealth {
    pub status: String,
    #[serde(default)]
    pub components: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyTestRequest {
    pub provider: String,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeyTestResult {
    pub success: bool,
    pub provider: String,
    pub model: Option<String>,
    pub message: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LlmSettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub id: String,
    pub provider: String,
    pub user_id: Option<String>,
    pub api_key_set: bool,
    pub api_key_preview: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub is_enabled: bool,
    pub is_default: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettingsList {
    pub settings: Vec<LlmSettings>,
    pub default_provider: Option<String>,
}

// ─── Stats ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardStats {
    pub total_emails: u64,
    pub emails_with_attachments: u64,
    pub total_pst_files: u64,
    pub total_attachments: u64,
    pub completed_tasks: u64,
    pub processing_tasks: u64,
    pub storage_used: u64,
}

// ─── Forensic ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub user_id: String,
    pub user_email: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<Map<String, Value>>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvidenceFile {
    pub id: String,
    pub pst_file_id: String,
    pub filename: String,
    pub sha256_hash: String,
    pub md5_hash: String,
    pub file_size: u64,
    pub registered_at: DateTime<Utc>,
    pub registered_by: String,
    #[serde(default)]
    pub chain_of_custody: Vec<CustodyEntry>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustodyEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub user_id: String,
    pub user_email: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyResult {
    pub is_valid: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimelineEvent {
    pub id: String,
    pub email_id: String,
    pub subject: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub date_sent: DateTime<Utc>,
    pub event_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailAnalysis {
    pub email_id: String,
    #[serde(default)]
    pub headers: Map<String, Value>,
    pub spf_result: Option<String>,
    pub dkim_result: Option<String>,
    pub dmarc_result: Option<String>,
    #[serde(default)]
    pub routing_path: Vec<String>,
    #[serde(default)]
    pub anomalies: Vec<String>,
}

// ─── Pagination ─────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_row_without_importance_leaves_summary_unset() {
        let row = r#"{
            "email_id": "e1", "subject": "s", "sender_email": "a@b.c",
            "sender_name": null, "sent_date": "2024-03-01T12:00:00Z",
            "snippet": "…", "score": 0.9, "match_type": "semantic",
            "highlights": [], "has_attachments": false,
            "attachment_count": 0, "folder_path": "/Inbox", "pst_file_id": "p1"
        }"#;
        let row: SearchRow = serde_json::from_str(row).unwrap();
        assert_eq!(row.email_id, "e1");

        let summary = r#"{
            "id": "e1", "subject": "s", "sender": "a@b.c", "sender_name": null,
            "date_sent": "2024-03-01T12:00:00Z", "preview": "…",
            "has_attachments": false
        }"#;
        let summary: EmailSummary = serde_json::from_str(summary).unwrap();
        assert_eq!(summary.importance, None);
    }

    #[test]
    fn chat_request_omits_unset_fields() {
        let req = ChatRequest {
            question: "who sent the invoice?".to_string(),
            stream: Some(true),
            ..Default::default()
        };
        let text = serde_json::to_string(&req).unwrap();
        assert!(text.contains(r#""stream":true"#));
        assert!(!text.contains("chat_history"));
        assert!(!text.contains("temperature"));
    }
}
