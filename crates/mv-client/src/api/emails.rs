//! Email browsing endpoints.

use bytes::Bytes;

use mv_common::ClientResult;
use mv_protocol::rest::{Attachment, Email, EmailSummary, Paginated};

use super::ApiClient;

impl ApiClient {
    pub async fn list_emails(
        &self,
        page: u32,
        page_size: u32,
        pst_file_id: Option<&str>,
    ) -> ClientResult<Paginated<EmailSummary>> {
        let mut query = vec![
            ("page", page.to_string()),
            ("page_size", page_size.to_string()),
        ];
        if let Some(id) = pst_file_id {
            query.push(("pst_file_id", id.to_string()));
        }
        self.get_json_with("/emails", &query).await
    }

    pub async fn get_email(&self, id: &str) -> ClientResult<Email> {
        self.get_json(&format!("/emails/{id}")).await
    }

    pub async fn email_attachments(&self, id: &str) -> ClientResult<Vec<Attachment>> {
        self.get_json(&format!("/emails/{id}/attachments")).await
    }

    pub async fn download_attachment(
        &self,
        email_id: &str,
        attachment_id: &str,
    ) -> ClientResult<Bytes> {
        let path = format!("/emails/{email_id}/attachments/{attachment_id}/download");
        let response = self.send(self.http().get(self.url(&path))).await?;
        Ok(response.bytes().await?)
    }

    /// All messages in one conversation, oldest first.
    pub async fn email_thread(&self, conversation_id: &str) -> ClientResult<Vec<EmailSummary>> {
        self.get_json(&format!("/emails/thread/{conversation_id}"))
            .await
    }
}
