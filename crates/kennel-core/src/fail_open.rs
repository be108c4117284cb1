//! Fail-open utilities for graceful degradation
//!
//! Fetch boundaries that feed a view (availability grid, dashboard lists) must
//! never block rendering on a backend failure. They run their fetch through
//! these helpers, which log the failure and hand back a safe default.
//!
//! Only transient failures (see `KennelError::is_transient`) fail open. A
//! backend verdict such as an expired session is returned to the caller,
//! since showing defaults would hide it.
//!
//! DO NOT use fail-open for:
//! - Reservation create/update (the user must see the rejection)
//! - Form validation
//! - Authentication setup

use std::future::Future;
use tracing::warn;

use crate::Result;

/// Execute an operation that should fail open
///
/// Logs a transient error via `tracing::warn!` and returns `Ok(None)`.
/// Other errors are returned unchanged.
///
/// # Usage
///
/// ```no_run
/// use kennel_core::fail_open::fail_open;
/// use kennel_core::Result;
///
/// async fn fetch_counts() -> Result<u32> {
///     Ok(3)
/// }
///
/// async fn example() -> Result<()> {
///     let counts = fail_open("dashboard_counts", || fetch_counts()).await?;
///     // counts is None if fetch_counts() hit a transient failure
///     Ok(())
/// }
/// ```
pub async fn fail_open<F, Fut, T>(operation_name: &str, f: F) -> Result<Option<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match f().await {
        Ok(val) => Ok(Some(val)),
        Err(e) if e.is_transient() => {
            warn!("{} failed (fail-open): {}", operation_name, e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Like `fail_open` but substitutes a fallback value on failure
///
/// Returns the value together with a flag telling whether the fallback was
/// used, so callers can mark their view as degraded. Non-transient errors
/// are returned unchanged.
///
/// # Usage
///
/// ```no_run
/// use kennel_core::fail_open::fail_open_or_else;
/// use kennel_core::Result;
///
/// async fn fetch_ids() -> Result<Vec<String>> {
///     Ok(vec![])
/// }
///
/// async fn example() -> Result<()> {
///     let (ids, degraded) = fail_open_or_else("list_ids", Vec::new, || fetch_ids()).await?;
///     Ok(())
/// }
/// ```
pub async fn fail_open_or_else<F, Fut, T, D>(
    operation_name: &str,
    fallback: D,
    f: F,
) -> Result<(T, bool)>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
    D: FnOnce() -> T,
{
    Ok(match fail_open(operation_name, f).await? {
        Some(val) => (val, false),
        None => (fallback(), true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KennelError;

    #[tokio::test]
    async fn test_fail_open_success() {
        let result = fail_open("test_op", || async { Ok::<_, KennelError>(42) }).await;
        assert_eq!(result.unwrap(), Some(42));
    }

    #[tokio::test]
    async fn test_fail_open_transient_failure() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(KennelError::Http("connection refused".to_string()))
        })
        .await;
        assert_eq!(result.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fail_open_surfaces_backend_verdicts() {
        let result = fail_open("test_op", || async {
            Err::<i32, _>(KennelError::Unauthorized("token expired".to_string()))
        })
        .await;
        assert!(matches!(result, Err(KennelError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_fail_open_or_else_uses_fallback() {
        let (value, degraded) = fail_open_or_else(
            "test_op",
            || vec![1, 2, 3],
            || async { Err::<Vec<i32>, _>(KennelError::Decode("unexpected shape".to_string())) },
        )
        .await
        .unwrap();
        assert_eq!(value, vec![1, 2, 3]);
        assert!(degraded);
    }

    #[tokio::test]
    async fn test_fail_open_or_else_passes_value_through() {
        let (value, degraded) =
            fail_open_or_else("test_op", Vec::new, || async { Ok::<_, KennelError>(vec![7]) })
                .await
                .unwrap();
        assert_eq!(value, vec![7]);
        assert!(!degraded);
    }

    #[tokio::test]
    async fn test_fail_open_or_else_rejection_is_not_degraded() {
        let result = fail_open_or_else("test_op", Vec::<i32>::new, || async {
            Err(KennelError::Rejected {
                status: 400,
                message: "bad range".to_string(),
            })
        })
        .await;
        assert!(matches!(result, Err(KennelError::Rejected { .. })));
    }
}
