//! Forensic endpoints: audit trail, evidence registry with chain of
//! custody, message timeline, and per-email header analysis.

use chrono::{DateTime, Utc};

use mv_common::ClientResult;
use mv_protocol::rest::{
    AuditLogEntry, EmailAnalysis, EvidenceFile, Paginated, TimelineEvent, VerifyResult,
};

use super::ApiClient;

/// Optional filters for the audit log listing.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub user_id: Option<String>,
}

impl ApiClient {
    pub async fn audit_logs(
        &self,
        page: u32,
        page_size: u32,
        filter: &AuditLogFilter,
    ) -> ClientResult<Paginated<AuditLogEntry>> {
        let mut query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(action) = &filter.action {
            query.push(("action", action.clone()));
        }
        if let Some(resource_type) = &filter.resource_type {
            query.push(("resource_type", resource_type.clone()));
        }
        if let Some(user_id) = &filter.user_id {
            query.push(("user_id", user_id.clone()));
        }
        self.get_json_with("/forensic/audit-logs", &query).await
    }

    pub async fn evidence(&self) -> ClientResult<Vec<EvidenceFile>> {
        self.get_json("/forensic/evidence").await
    }

    /// Re-hash the stored archive and compare against the registered
    /// fingerprints.
    pub async fn verify_evidence(&self, id: &str) -> ClientResult<VerifyResult> {
        self.post_empty(&format!("/forensic/evidence/{id}/verify"))
            .await
    }

    pub async fn timeline(
        &self,
        pst_file_ids: &[String],
        date_from: Option<DateTime<Utc>>,
        date_to: Option<DateTime<Utc>>,
    ) -> ClientResult<Vec<TimelineEvent>> {
        let mut query = Vec::new();
        if !pst_file_ids.is_empty() {
            query.push(("pst_file_ids", pst_file_ids.join(",")));
        }
        if let Some(from) = date_from {
            query.push(("date_from", from.to_rfc3339()));
        }
        if let Some(to) = date_to {
            query.push(("date_to", to.to_rfc3339()));
        }
        self.get_json_with("/forensic/timeline", &query).await
    }

    pub async fn analyze_email(&self, email_id: &str) -> ClientResult<EmailAnalysis> {
        self.get_json(&format!("/forensic/analyze/{email_id}")).await
    }
}
