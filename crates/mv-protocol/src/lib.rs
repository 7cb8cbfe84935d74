//! # mv-protocol
//!
//! Shared protocol types for the MailVault client suite: the WebSocket
//! event-channel frame, the chat stream event envelope, and the REST
//! request/response payloads.

pub mod chat;
pub mod rest;
pub mod ws;

/// Interval between client-sent `ping` frames on the event channel.
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30;

/// WebSocket close code for an intentional client disconnect.
/// Any other code means the connection died and should be re-established.
pub const NORMAL_CLOSE_CODE: u16 = 1000;
