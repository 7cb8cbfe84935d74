//! # mv-client
//!
//! Client library for the MailVault service. Owns the real-time delivery
//! pipeline — the WebSocket event channel with reconnect and subscription
//! replay, typed message dispatch, per-task progress projection, and the
//! streaming chat consumer — plus the REST surface (auth, emails, upload,
//! search, RAG, stats, forensic).

pub mod api;
pub mod auth;
pub mod chat;
pub mod task_progress;
pub mod ws;

pub use api::{ApiClient, AuditLogFilter, SearchResults};
pub use auth::TokenStore;
pub use chat::{ChatDeltaStream, ChatEntry, ChatStream, Role, SseLineDecoder};
pub use task_progress::{TaskProgress, TaskProgressWatcher};
pub use ws::{ChannelGuard, ConnectionState, ListenerGuard, WsClient, WsConfig};
