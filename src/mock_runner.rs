//! MockQueryRunner：不连接数据库，把每次调用交给测试提供的 executor 决定结果。
//!
//! executor 收到 `(调用类别, SQL, 参数, 调用序号)`；序号在该 runner 的所有调用（包括事务控制）
//! 之间递增。

use crate::database::{DatabaseType, default_database};
use crate::error::{QueryError, QueryResult};
use crate::query_runner::{QueryRunner, QueryType, TransactionLevel};
use crate::value::{Param, Row, SqlValue};
use async_trait::async_trait;
use std::cell::Cell;

/// executor 返回的原始结果，按调用类别转换为规范形状。
/// 无返回值的调用（事务控制、存储过程、结构变更）忽略结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub enum MockResult {
    /// 未提供结果：计数为 `0`，序列为空，单值为 `None` / `NULL`。
    #[default]
    None,
    Count(u64),
    Value(SqlValue),
    Values(Vec<SqlValue>),
    Row(Row),
    Rows(Vec<Row>),
}

impl From<u64> for MockResult {
    fn from(v: u64) -> Self {
        Self::Count(v)
    }
}

impl From<SqlValue> for MockResult {
    fn from(v: SqlValue) -> Self {
        Self::Value(v)
    }
}

impl From<Vec<SqlValue>> for MockResult {
    fn from(v: Vec<SqlValue>) -> Self {
        Self::Values(v)
    }
}

impl From<Row> for MockResult {
    fn from(v: Row) -> Self {
        Self::Row(v)
    }
}

impl From<Vec<Row>> for MockResult {
    fn from(v: Vec<Row>) -> Self {
        Self::Rows(v)
    }
}

impl From<Option<Row>> for MockResult {
    fn from(v: Option<Row>) -> Self {
        v.map_or(Self::None, Self::Row)
    }
}

impl MockResult {
    fn unexpected(query_type: QueryType, expected: &'static str) -> QueryError {
        QueryError::UnexpectedResult { query_type, expected }
    }

    fn into_optional_row(self, query_type: QueryType) -> QueryResult<Option<Row>> {
        match self {
            Self::None => Ok(None),
            Self::Row(row) => Ok(Some(row)),
            _ => Err(Self::unexpected(query_type, "a row")),
        }
    }

    fn into_rows(self, query_type: QueryType) -> QueryResult<Vec<Row>> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Rows(rows) => Ok(rows),
            _ => Err(Self::unexpected(query_type, "rows")),
        }
    }

    fn into_optional_value(self, query_type: QueryType) -> QueryResult<Option<SqlValue>> {
        match self {
            Self::None | Self::Value(SqlValue::Null) => Ok(None),
            Self::Value(v) => Ok(Some(v)),
            Self::Count(n) => Ok(Some(SqlValue::U64(n))),
            _ => Err(Self::unexpected(query_type, "a value")),
        }
    }

    fn into_value(self, query_type: QueryType) -> QueryResult<SqlValue> {
        match self {
            Self::None => Ok(SqlValue::Null),
            Self::Value(v) => Ok(v),
            Self::Count(n) => Ok(SqlValue::U64(n)),
            _ => Err(Self::unexpected(query_type, "a value")),
        }
    }

    fn into_values(self, query_type: QueryType) -> QueryResult<Vec<SqlValue>> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Values(values) => Ok(values),
            _ => Err(Self::unexpected(query_type, "values")),
        }
    }

    fn into_count(self, query_type: QueryType) -> QueryResult<u64> {
        match self {
            Self::None => Ok(0),
            Self::Count(n) => Ok(n),
            Self::Value(v) => v
                .as_u64()
                .ok_or_else(|| Self::unexpected(query_type, "a row count")),
            _ => Err(Self::unexpected(query_type, "a row count")),
        }
    }
}

/// executor 签名：`(调用类别, SQL, 参数, 调用序号)`。
pub type MockExecutor = dyn Fn(QueryType, &str, &[Param], usize) -> QueryResult<MockResult>;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockRunnerConfig {
    /// 为 `None` 时使用 `default_database()`。
    pub database: Option<DatabaseType>,
}

pub struct MockQueryRunner {
    executor: Box<MockExecutor>,
    database: Cell<DatabaseType>,
    count: Cell<usize>,
    level: TransactionLevel,
}

impl MockQueryRunner {
    pub fn new<F>(executor: F) -> Self
    where
        F: Fn(QueryType, &str, &[Param], usize) -> QueryResult<MockResult> + 'static,
    {
        Self::with_config(executor, MockRunnerConfig::default())
    }

    pub fn with_config<F>(executor: F, config: MockRunnerConfig) -> Self
    where
        F: Fn(QueryType, &str, &[Param], usize) -> QueryResult<MockResult> + 'static,
    {
        Self {
            executor: Box::new(executor),
            database: Cell::new(config.database.unwrap_or_else(default_database)),
            count: Cell::new(0),
            level: TransactionLevel::new(),
        }
    }

    /// 切换方言（影响之后编译的占位符）。
    pub fn use_database(&self, database: DatabaseType) {
        self.database.set(database);
    }

    /// 到目前为止 executor 被调用的次数。
    pub fn call_count(&self) -> usize {
        self.count.get()
    }

    pub fn transaction_level(&self) -> usize {
        self.level.get()
    }

    fn call(&self, query_type: QueryType, query: &str, params: &[Param]) -> QueryResult<MockResult> {
        let index = self.count.get();
        self.count.set(index + 1);
        (self.executor)(query_type, query, params, index)
    }
}

#[async_trait(?Send)]
impl QueryRunner for MockQueryRunner {
    fn database(&self) -> DatabaseType {
        self.database.get()
    }

    async fn execute_select_one_row(&self, query: &str, params: &[Param]) -> QueryResult<Option<Row>> {
        let query_type = QueryType::SelectOneRow;
        self.call(query_type, query, params)?.into_optional_row(query_type)
    }

    async fn execute_select_many_rows(&self, query: &str, params: &[Param]) -> QueryResult<Vec<Row>> {
        let query_type = QueryType::SelectManyRows;
        self.call(query_type, query, params)?.into_rows(query_type)
    }

    async fn execute_select_one_column_one_row(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<Option<SqlValue>> {
        let query_type = QueryType::SelectOneColumnOneRow;
        self.call(query_type, query, params)?.into_optional_value(query_type)
    }

    async fn execute_select_one_column_many_rows(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<Vec<SqlValue>> {
        let query_type = QueryType::SelectOneColumnManyRows;
        self.call(query_type, query, params)?.into_values(query_type)
    }

    async fn execute_insert(&self, query: &str, params: &[Param]) -> QueryResult<u64> {
        let query_type = QueryType::Insert;
        self.call(query_type, query, params)?.into_count(query_type)
    }

    async fn execute_insert_returning_last_inserted_id(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<SqlValue> {
        let query_type = QueryType::InsertReturningLastInsertedId;
        self.call(query_type, query, params)?.into_value(query_type)
    }

    async fn execute_insert_returning_multiple_last_inserted_id(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<Vec<SqlValue>> {
        let query_type = QueryType::InsertReturningMultipleLastInsertedId;
        self.call(query_type, query, params)?.into_values(query_type)
    }

    async fn execute_update(&self, query: &str, params: &[Param]) -> QueryResult<u64> {
        let query_type = QueryType::Update;
        self.call(query_type, query, params)?.into_count(query_type)
    }

    async fn execute_delete(&self, query: &str, params: &[Param]) -> QueryResult<u64> {
        let query_type = QueryType::Delete;
        self.call(query_type, query, params)?.into_count(query_type)
    }

    async fn execute_procedure(&self, query: &str, params: &[Param]) -> QueryResult<()> {
        self.call(QueryType::ExecuteProcedure, query, params)?;
        Ok(())
    }

    async fn execute_function(&self, query: &str, params: &[Param]) -> QueryResult<SqlValue> {
        let query_type = QueryType::ExecuteFunction;
        self.call(query_type, query, params)?.into_value(query_type)
    }

    /// executor 成功后嵌套计数加一。
    async fn execute_begin_transaction(&self) -> QueryResult<()> {
        self.call(QueryType::BeginTransaction, "begin transaction", &[])?;
        self.level.begin();
        Ok(())
    }

    /// 先减计数（没有活动事务时直接失败，不调用 executor）。
    async fn execute_commit(&self) -> QueryResult<()> {
        self.level.end()?;
        self.call(QueryType::Commit, "commit", &[])?;
        Ok(())
    }

    async fn execute_rollback(&self) -> QueryResult<()> {
        self.level.end()?;
        self.call(QueryType::Rollback, "rollback", &[])?;
        Ok(())
    }

    fn is_transaction_active(&self) -> bool {
        self.level.is_active()
    }

    async fn execute_database_schema_modification(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<()> {
        self.call(QueryType::ExecuteDatabaseSchemaModification, query, params)?;
        Ok(())
    }
}
