use std::future::Future;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};

/// Run `future`, failing with [`DomainError::Timeout`] once `limit` elapses.
pub async fn bounded<T, F>(operation: &str, limit: Duration, future: F) -> DomainResult<T>
where
    F: Future<Output = DomainResult<T>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(DomainError::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}
