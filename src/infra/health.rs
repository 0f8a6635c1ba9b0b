//! Dependency probes for the health endpoint.

use async_trait::async_trait;

use super::db::Database;

/// A backing service the health endpoint reports on.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Key used in the health report
    fn name(&self) -> &'static str;

    async fn check(&self) -> Result<(), String>;
}

#[async_trait]
impl HealthProbe for Database {
    fn name(&self) -> &'static str {
        "database"
    }

    async fn check(&self) -> Result<(), String> {
        self.ping().await.map_err(|e| e.to_string())
    }
}
