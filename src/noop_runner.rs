//! NoopQueryRunner：不执行任何语句，所有调用都返回空结果；用于只生成 SQL 的场景。

use crate::database::DatabaseType;
use crate::error::QueryResult;
use crate::query_runner::{QueryRunner, TransactionLevel};
use crate::value::{Param, Row, SqlValue};
use async_trait::async_trait;

#[derive(Debug, Default)]
pub struct NoopQueryRunner {
    database: DatabaseType,
    level: TransactionLevel,
}

impl NoopQueryRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按指定方言生成占位符。
    pub fn with_database(database: DatabaseType) -> Self {
        Self {
            database,
            level: TransactionLevel::new(),
        }
    }
}

#[async_trait(?Send)]
impl QueryRunner for NoopQueryRunner {
    fn database(&self) -> DatabaseType {
        self.database
    }

    async fn execute_select_one_row(&self, _query: &str, _params: &[Param]) -> QueryResult<Option<Row>> {
        Ok(None)
    }

    async fn execute_select_many_rows(&self, _query: &str, _params: &[Param]) -> QueryResult<Vec<Row>> {
        Ok(Vec::new())
    }

    async fn execute_select_one_column_one_row(
        &self,
        _query: &str,
        _params: &[Param],
    ) -> QueryResult<Option<SqlValue>> {
        Ok(None)
    }

    async fn execute_select_one_column_many_rows(
        &self,
        _query: &str,
        _params: &[Param],
    ) -> QueryResult<Vec<SqlValue>> {
        Ok(Vec::new())
    }

    async fn execute_insert(&self, _query: &str, _params: &[Param]) -> QueryResult<u64> {
        Ok(0)
    }

    async fn execute_insert_returning_last_inserted_id(
        &self,
        _query: &str,
        _params: &[Param],
    ) -> QueryResult<SqlValue> {
        Ok(SqlValue::Null)
    }

    async fn execute_insert_returning_multiple_last_inserted_id(
        &self,
        _query: &str,
        _params: &[Param],
    ) -> QueryResult<Vec<SqlValue>> {
        Ok(Vec::new())
    }

    async fn execute_update(&self, _query: &str, _params: &[Param]) -> QueryResult<u64> {
        Ok(0)
    }

    async fn execute_delete(&self, _query: &str, _params: &[Param]) -> QueryResult<u64> {
        Ok(0)
    }

    async fn execute_procedure(&self, _query: &str, _params: &[Param]) -> QueryResult<()> {
        Ok(())
    }

    async fn execute_function(&self, _query: &str, _params: &[Param]) -> QueryResult<SqlValue> {
        Ok(SqlValue::Null)
    }

    async fn execute_begin_transaction(&self) -> QueryResult<()> {
        self.level.begin();
        Ok(())
    }

    async fn execute_commit(&self) -> QueryResult<()> {
        self.level.end()
    }

    async fn execute_rollback(&self) -> QueryResult<()> {
        self.level.end()
    }

    fn is_transaction_active(&self) -> bool {
        self.level.is_active()
    }

    async fn execute_database_schema_modification(
        &self,
        _query: &str,
        _params: &[Param],
    ) -> QueryResult<()> {
        Ok(())
    }
}
