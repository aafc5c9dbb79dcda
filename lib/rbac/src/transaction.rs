//! Scoped transactions.
//!
//! [`in_transaction`] owns the transaction for its whole lifetime and ends it
//! exactly once: commit when the body produces a value, rollback when it
//! produces nothing or fails.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::future::Future;

/// A unit of work on one dedicated connection.
///
/// `commit` and `rollback` consume the transaction, which returns its
/// connection to the pool.
#[async_trait]
pub trait Transaction: Send + Sized {
    /// Storage error type.
    type Error: std::error::Error + Send + Sync + 'static;

    async fn commit(self) -> Result<(), Self::Error>;

    async fn rollback(self) -> Result<(), Self::Error>;
}

/// Runs `body` inside the transaction produced by `begin`.
///
/// - `Ok(Some(value))` commits and returns the value.
/// - `Ok(None)` rolls back and returns `None`.
/// - `Err(e)` rolls back and returns `e` unchanged. A failing rollback is
///   logged and does not replace the original error.
pub async fn in_transaction<Tx, T, F>(
    begin: impl Future<Output = Result<Tx, Tx::Error>>,
    body: F,
) -> Result<Option<T>, Tx::Error>
where
    Tx: Transaction,
    F: for<'t> FnOnce(&'t mut Tx) -> BoxFuture<'t, Result<Option<T>, Tx::Error>>,
{
    let mut tx = begin.await?;
    let outcome = body(&mut tx).await;

    match outcome {
        Ok(Some(value)) => {
            tx.commit().await?;
            Ok(Some(value))
        }
        Ok(None) => {
            tx.rollback().await?;
            Ok(None)
        }
        Err(error) => {
            if let Err(rollback_error) = tx.rollback().await {
                tracing::warn!(
                    error = %rollback_error,
                    "Rollback failed after transaction error"
                );
            }
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, PartialEq, Eq)]
    struct Boom(&'static str);

    impl fmt::Display for Boom {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Boom {}

    #[derive(Default)]
    struct Journal {
        events: Vec<&'static str>,
        released: usize,
    }

    struct Probe {
        journal: Arc<Mutex<Journal>>,
        fail_rollback: bool,
    }

    impl Probe {
        fn record(&self, event: &'static str) {
            self.journal.lock().expect("journal").events.push(event);
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.journal.lock().expect("journal").released += 1;
        }
    }

    #[async_trait]
    impl Transaction for Probe {
        type Error = Boom;

        async fn commit(self) -> Result<(), Boom> {
            self.record("commit");
            Ok(())
        }

        async fn rollback(self) -> Result<(), Boom> {
            self.record("rollback");
            if self.fail_rollback {
                Err(Boom("rollback"))
            } else {
                Ok(())
            }
        }
    }

    fn begin(
        journal: &Arc<Mutex<Journal>>,
        fail_rollback: bool,
    ) -> impl Future<Output = Result<Probe, Boom>> {
        let journal = Arc::clone(journal);
        async move {
            Ok(Probe {
                journal,
                fail_rollback,
            })
        }
    }

    fn snapshot(journal: &Arc<Mutex<Journal>>) -> (Vec<&'static str>, usize) {
        let journal = journal.lock().expect("journal");
        (journal.events.clone(), journal.released)
    }

    #[tokio::test]
    async fn value_commits() {
        let journal = Arc::default();
        let result = in_transaction(begin(&journal, false), |tx| {
            Box::pin(async move {
                tx.record("work");
                Ok(Some(7))
            })
        })
        .await;

        assert_eq!(result, Ok(Some(7)));
        assert_eq!(snapshot(&journal), (vec!["work", "commit"], 1));
    }

    #[tokio::test]
    async fn nothing_rolls_back() {
        let journal = Arc::default();
        let result: Result<Option<i32>, Boom> =
            in_transaction(begin(&journal, false), |_tx| Box::pin(async { Ok(None) })).await;

        assert_eq!(result, Ok(None));
        assert_eq!(snapshot(&journal), (vec!["rollback"], 1));
    }

    #[tokio::test]
    async fn error_rolls_back_and_keeps_original_error() {
        let journal = Arc::default();
        let result: Result<Option<i32>, Boom> = in_transaction(begin(&journal, true), |_tx| {
            Box::pin(async { Err(Boom("insert")) })
        })
        .await;

        assert_eq!(result, Err(Boom("insert")));
        assert_eq!(snapshot(&journal), (vec!["rollback"], 1));
    }

    #[tokio::test]
    async fn failed_begin_runs_nothing() {
        let journal: Arc<Mutex<Journal>> = Arc::default();
        let result: Result<Option<i32>, Boom> = in_transaction(
            async { Err::<Probe, _>(Boom("connect")) },
            |_tx| Box::pin(async { Ok(Some(1)) }),
        )
        .await;

        assert_eq!(result, Err(Boom("connect")));
        assert_eq!(snapshot(&journal), (Vec::new(), 0));
    }
}
