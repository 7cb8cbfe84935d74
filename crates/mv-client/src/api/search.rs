//! Search endpoints.
//!
//! The backend returns rows keyed by `email_id`/`sender_email`/`sent_date`;
//! the client reshapes them into the same summary rows the email listings
//! use. Rows never carry importance, so the summaries keep it unset rather
//! than inventing a value.

use mv_common::ClientResult;
use mv_protocol::rest::{EmailSummary, SearchQuery, SearchResponse};

use super::ApiClient;

/// Search results reshaped for display alongside email listings.
#[derive(Debug, Clone)]
pub struct SearchResults {
    pub emails: Vec<EmailSummary>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub query_time_ms: f64,
}

impl From<SearchResponse> for SearchResults {
    fn from(response: SearchResponse) -> Self {
        let emails = response
            .results
            .into_iter()
            .map(|row| EmailSummary {
                id: row.email_id,
                subject: row.subject,
                sender: row.sender_email,
                sender_name: row.sender_name,
                date_sent: row.sent_date,
                preview: row.snippet,
                has_attachments: row.has_attachments,
                importance: None,
            })
            .collect();
        let total_pages = if response.page_size == 0 {
            0
        } else {
            response
                .total_count
                .div_ceil(response.page_size as u64) as u32
        };
        Self {
            emails,
            total: response.total_count,
            page: response.page,
            page_size: response.page_size,
            total_pages,
            query_time_ms: response.search_time_ms,
        }
    }
}

impl ApiClient {
    pub async fn search(&self, query: &SearchQuery) -> ClientResult<SearchResults> {
        let response: SearchResponse = self.post_json("/search", query).await?;
        Ok(response.into())
    }

    pub async fn advanced_search(&self, query: &SearchQuery) -> ClientResult<SearchResults> {
        let response: SearchResponse = self.post_json("/search/advanced", query).await?;
        Ok(response.into())
    }

    pub async fn search_history(&self) -> ClientResult<Vec<String>> {
        self.get_json("/search/history").await
    }

    pub async fn clear_search_history(&self) -> ClientResult<()> {
        self.delete("/search/history").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_reshape_without_fabricating_importance() {
        let response: SearchResponse = serde_json::from_value(serde_json::json!({
            "results": [{
                "email_id": "e1",
                "subject": "Quarterly numbers",
                "sender_email": "cfo@example.com",
                "sender_name": "CFO",
                "sent_date": "2024-03-01T12:00:00Z",
                "snippet": "attached are the…",
                "score": 0.92,
                "match_type": "semantic",
                "highlights": ["numbers"],
                "has_attachments": true,
                "attachment_count": 1,
                "folder_path": "/Inbox",
                "pst_file_id": "p1"
            }],
            "total_count": 41,
            "query": "numbers",
            "processed_query": null,
            "search_time_ms": 12.5,
            "page": 1,
            "page_size": 20,
            "has_more": true
        }))
        .unwrap();

        let results = SearchResults::from(response);
        assert_eq!(results.total, 41);
        assert_eq!(results.total_pages, 3);
        let row = &results.emails[0];
        assert_eq!(row.id, "e1");
        assert_eq!(row.sender, "cfo@example.com");
        assert_eq!(row.preview, "attached are the…");
        assert_eq!(row.importance, None);
    }
}
