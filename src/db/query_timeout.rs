// Storage deadline protection
use std::{future::Future, time::Duration};

use tokio::time::timeout;

use super::StoreError;

pub struct QueryTimeout;

impl QueryTimeout {
    /// Run a storage call, giving up after `limit` when one is set.
    pub async fn bounded<T, F>(limit: Option<Duration>, query_fn: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match limit {
            None => query_fn.await,
            Some(limit) => match timeout(limit, query_fn).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(limit)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unbounded_calls_run_to_completion() {
        let result = QueryTimeout::bounded(None, async { Ok::<_, StoreError>(42) }).await;
        assert_eq!(result.ok(), Some(42));
    }

    #[tokio::test]
    async fn slow_calls_fail_with_timeout() {
        let limit = Duration::from_millis(10);
        let result = QueryTimeout::bounded(Some(limit), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, StoreError>(())
        })
        .await;

        assert!(matches!(result, Err(StoreError::Timeout(d)) if d == limit));
    }
}
