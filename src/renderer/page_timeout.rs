//! Timeout utilities for page operations
//!
//! Every navigation carries an explicit budget so a hung page produces a
//! `Timeout` error instead of an indefinite wait.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use super::RenderError;

/// Wrap an async page operation with an explicit timeout
///
/// # Arguments
/// * `operation` - The async Future to execute with a timeout
/// * `timeout` - Budget for the operation
/// * `operation_name` - Human-readable name for error messages
///
/// # Returns
/// * `Ok(T)` - Operation completed successfully
/// * `Err(RenderError::Timeout)` - The budget ran out
/// * `Err(RenderError::Navigation)` - The operation itself failed
pub async fn with_page_timeout<F, T, E>(
    operation: F,
    timeout: Duration,
    operation_name: &str,
) -> Result<T, RenderError>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, operation).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(RenderError::Navigation(format!("{operation_name}: {e}"))),
        Err(_) => Err(RenderError::Timeout {
            operation: operation_name.to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_times_out() {
        let result = with_page_timeout(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok::<_, String>(())
            },
            Duration::from_secs(5),
            "navigation",
        )
        .await;
        assert!(matches!(result, Err(RenderError::Timeout { ref operation, .. }) if operation == "navigation"));
    }

    #[tokio::test]
    async fn test_operation_error_is_navigation_failure() {
        let result = with_page_timeout(
            async { Err::<(), _>("net::ERR_NAME_NOT_RESOLVED") },
            Duration::from_secs(5),
            "navigation",
        )
        .await;
        assert!(matches!(result, Err(RenderError::Navigation(ref msg)) if msg.contains("ERR_NAME_NOT_RESOLVED")));
    }
}
