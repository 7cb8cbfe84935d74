//! Dashboard statistics.

use mv_common::ClientResult;
use mv_protocol::rest::DashboardStats;

use super::ApiClient;

impl ApiClient {
    pub async fn dashboard_stats(&self) -> ClientResult<DashboardStats> {
        self.get_json("/stats/dashboard").await
    }
}
