//! The transaction protocol shared by every backend.
//!
//! Each backend opens its native transaction and hands the resulting context
//! to [`run_transaction`], which owns the ordering:
//! body, then commit or rollback, then release.

use tracing::{debug, error};

use crate::db::{DbResult, Queryable};

/// Native commit/rollback/release for an open transaction context.
pub(crate) trait TransactionControl: Queryable + Sized {
    async fn commit(&self) -> DbResult<()>;

    async fn rollback(&self) -> DbResult<()>;

    /// Give back transaction-scoped native resources. Runs exactly once,
    /// after commit or rollback, whatever the outcome.
    async fn release(self) {}
}

/// Drive one transaction to completion.
///
/// `body` runs exactly once. On success the context is committed; if the
/// body or the commit fails, the context is rolled back and the failure is
/// returned. A failing rollback replaces the original error.
pub(crate) async fn run_transaction<C, T, F>(ctx: C, body: F) -> DbResult<T>
where
    C: TransactionControl,
    F: AsyncFnOnce(&C) -> DbResult<T>,
{
    let backend = ctx.kind().as_str();

    let outcome = match body(&ctx).await {
        Ok(value) => ctx.commit().await.map(|()| value),
        Err(e) => Err(e),
    };

    let result = match outcome {
        Ok(value) => {
            debug!(backend, "Transaction committed");
            Ok(value)
        }
        Err(e) => {
            let rolled_back = ctx.rollback().await;
            error!(backend, error = %e, "Transaction rolled back");
            match rolled_back {
                Ok(()) => Err(e),
                Err(rollback_err) => {
                    error!(backend, error = %rollback_err, "Rollback failed");
                    Err(rollback_err)
                }
            }
        }
    };

    ctx.release().await;
    result
}
