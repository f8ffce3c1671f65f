//! Per-call time bound for collaborator requests.

use std::future::Future;
use std::time::Duration;

use crate::error::CollaboratorError;

/// Awaits a collaborator call, failing with `Timeout` once `limit` elapses.
///
/// Every collaborator in this crate is idempotent by identifier, so a
/// timed-out call may be retried by re-running the whole operation.
pub async fn bounded<T, F>(
    operation: &'static str,
    limit: Duration,
    call: F,
) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation, ?limit, "collaborator call timed out");
            metrics::counter!("collaborator_timeouts_total", "operation" => operation)
                .increment(1);
            Err(CollaboratorError::Timeout {
                operation,
                after: limit,
            })
        }
    }
}
