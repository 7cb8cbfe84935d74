pub mod auth;
pub mod chat;
pub mod emails;
pub mod forensic;
pub mod rag;
pub mod search;
pub mod stats;
pub mod tasks;
pub mod upload;
