//! 事务辅助：在最外层 runner 上 begin → 执行工作 → commit；失败时 rollback 并返回原始错误。

use crate::error::{QueryError, QueryResult};
use crate::query_runner::QueryRunner;
use futures_util::future::try_join_all;
use std::future::Future;

/// 在事务中执行 `work`。
///
/// `work` 成功后提交；失败时回滚，回滚本身的失败只记录日志，返回的总是 `work` 的错误。
/// 提交失败不会再回滚。
pub async fn execute_in_transaction<T, F, Fut>(outermost: &dyn QueryRunner, work: F) -> QueryResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = QueryResult<T>>,
{
    outermost.execute_begin_transaction().await?;
    match work().await {
        Ok(value) => {
            outermost.execute_commit().await?;
            Ok(value)
        }
        Err(error) => {
            rollback_after(outermost, &error).await;
            Err(error)
        }
    }
}

/// 与 `execute_in_transaction` 相同，但 `work` 返回一组相互独立的 future，一起等待，
/// 结果按输入顺序返回；任一失败即回滚。
pub async fn execute_in_transaction_all<T, F, I, Fut>(outermost: &dyn QueryRunner, work: F) -> QueryResult<Vec<T>>
where
    F: FnOnce() -> I,
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = QueryResult<T>>,
{
    execute_in_transaction(outermost, || try_join_all(work())).await
}

/// 先执行 `first` 再执行 `second`，返回两者的结果。
pub async fn execute_combined<R1, R2, F1, F2, Fut1, Fut2>(first: F1, second: F2) -> QueryResult<(R1, R2)>
where
    F1: FnOnce() -> Fut1,
    F2: FnOnce() -> Fut2,
    Fut1: Future<Output = QueryResult<R1>>,
    Fut2: Future<Output = QueryResult<R2>>,
{
    let r1 = first().await?;
    let r2 = second().await?;
    Ok((r1, r2))
}

async fn rollback_after(outermost: &dyn QueryRunner, cause: &QueryError) {
    if let Err(rollback_error) = outermost.execute_rollback().await {
        tracing::warn!(
            error = %rollback_error,
            cause = %cause,
            "rollback failed, returning the original error"
        );
    }
}
