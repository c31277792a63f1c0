//! Request repository port

use async_trait::async_trait;

use crate::domain::result::Result;
use crate::domain::{FeeSchedule, ListFilter, Request};

/// Storage for roadside assistance requests
///
/// Implementations return records already migrated to the current schema:
/// `vehicle` is exactly `{make, model}` and `status` is normalized.
#[async_trait]
pub trait RequestRepository: Send + Sync {
    /// List requests matching `filter`, newest first
    async fn list_requests(&self, filter: &ListFilter) -> Result<Vec<Request>>;

    /// Persist a new request and return the stored shape
    ///
    /// The backend may replace `id` and `created_at` with its own values.
    async fn insert_request(&self, request: &Request) -> Result<Request>;

    /// Delete every request (local list only)
    async fn clear_requests(&self) -> Result<usize>;

    /// Current fee schedule
    async fn fee_schedule(&self) -> Result<FeeSchedule>;
}
