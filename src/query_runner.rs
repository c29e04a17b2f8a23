//! QueryRunner：执行编译好的 `(SQL, 参数)`，按调用类别返回与方言无关的结果形状，
//! 并维护嵌套事务计数。具体驱动（连接池、协议）通过实现该 trait 接入。

use crate::database::DatabaseType;
use crate::error::{QueryError, QueryResult};
use crate::value::{Param, Row, SqlValue};
use async_trait::async_trait;
use std::cell::Cell;
use std::fmt;

/// 每次执行调用的类别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    SelectOneRow,
    SelectManyRows,
    SelectOneColumnOneRow,
    SelectOneColumnManyRows,
    Insert,
    InsertReturningLastInsertedId,
    InsertReturningMultipleLastInsertedId,
    Update,
    Delete,
    ExecuteProcedure,
    ExecuteFunction,
    BeginTransaction,
    Commit,
    Rollback,
    ExecuteDatabaseSchemaModification,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelectOneRow => "selectOneRow",
            Self::SelectManyRows => "selectManyRows",
            Self::SelectOneColumnOneRow => "selectOneColumnOneRow",
            Self::SelectOneColumnManyRows => "selectOneColumnManyRows",
            Self::Insert => "insert",
            Self::InsertReturningLastInsertedId => "insertReturningLastInsertedId",
            Self::InsertReturningMultipleLastInsertedId => "insertReturningMultipleLastInsertedId",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::ExecuteProcedure => "executeProcedure",
            Self::ExecuteFunction => "executeFunction",
            Self::BeginTransaction => "beginTransaction",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
            Self::ExecuteDatabaseSchemaModification => "executeDatabaseSchemaModification",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 每个 runner 实例一份的事务嵌套计数，永不为负。
#[derive(Debug, Default)]
pub struct TransactionLevel(Cell<usize>);

impl TransactionLevel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    pub fn is_active(&self) -> bool {
        self.0.get() > 0
    }

    pub fn begin(&self) {
        self.0.set(self.0.get() + 1);
    }

    /// commit / rollback 时调用；没有活动事务时报错且计数不变。
    pub fn end(&self) -> QueryResult<()> {
        match self.0.get() {
            0 => Err(QueryError::TransactionNotActive),
            n => {
                self.0.set(n - 1);
                Ok(())
            }
        }
    }
}

/// 单连接 / 单会话的执行器。所有执行方法都是协作式异步调用。
#[async_trait(?Send)]
pub trait QueryRunner {
    fn database(&self) -> DatabaseType;

    async fn execute_select_one_row(&self, query: &str, params: &[Param]) -> QueryResult<Option<Row>>;

    /// 没有行时返回空 `Vec`。
    async fn execute_select_many_rows(&self, query: &str, params: &[Param]) -> QueryResult<Vec<Row>>;

    async fn execute_select_one_column_one_row(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<Option<SqlValue>>;

    async fn execute_select_one_column_many_rows(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<Vec<SqlValue>>;

    /// 返回影响行数。
    async fn execute_insert(&self, query: &str, params: &[Param]) -> QueryResult<u64>;

    async fn execute_insert_returning_last_inserted_id(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<SqlValue>;

    async fn execute_insert_returning_multiple_last_inserted_id(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<Vec<SqlValue>>;

    async fn execute_update(&self, query: &str, params: &[Param]) -> QueryResult<u64>;

    async fn execute_delete(&self, query: &str, params: &[Param]) -> QueryResult<u64>;

    async fn execute_procedure(&self, query: &str, params: &[Param]) -> QueryResult<()>;

    async fn execute_function(&self, query: &str, params: &[Param]) -> QueryResult<SqlValue>;

    async fn execute_begin_transaction(&self) -> QueryResult<()>;

    async fn execute_commit(&self) -> QueryResult<()>;

    async fn execute_rollback(&self) -> QueryResult<()>;

    fn is_transaction_active(&self) -> bool;

    async fn execute_database_schema_modification(
        &self,
        query: &str,
        params: &[Param],
    ) -> QueryResult<()>;

    /// 追加一个参数并返回它在当前方言下的占位符。
    fn add_param(&self, params: &mut Vec<Param>, value: SqlValue) -> String {
        let placeholder = self.database().placeholder(params.len());
        params.push(Param::Value(value));
        placeholder
    }

    /// 追加一个输出参数（只有名字）并返回占位符，位置规则与普通参数相同。
    fn add_out_param(&self, params: &mut Vec<Param>, name: &str) -> String {
        let placeholder = self.database().placeholder(params.len());
        params.push(Param::out(name));
        placeholder
    }
}

/// 记录一次语句执行（builder 与 `Connection` 共用）。
pub(crate) fn log_execution(query_type: QueryType, name: Option<&str>, query: &str, params: &[Param]) {
    tracing::debug!(
        query_type = %query_type,
        name = name.unwrap_or_default(),
        params = params.len(),
        "executing {query}"
    );
}
