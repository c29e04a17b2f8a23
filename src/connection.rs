//! Connection：绑定一个编译器（以及它的 runner），作为创建 builder 与执行杂项语句的入口。

use crate::delete::DeleteBuilder;
use crate::error::{QueryError, QueryResult};
use crate::expr::ValueSource;
use crate::insert::InsertBuilder;
use crate::query_runner::{QueryRunner, QueryType, log_execution};
use crate::select::SelectBuilder;
use crate::sql_builder::{DefaultSqlCompiler, SqlCompiler};
use crate::table::{Table, TableOrView};
use crate::transaction::execute_in_transaction;
use crate::update::UpdateBuilder;
use crate::value::{Param, SqlValue};
use std::future::Future;
use std::panic::Location;
use std::rc::Rc;

#[derive(Clone)]
pub struct Connection {
    compiler: Rc<dyn SqlCompiler>,
}

impl Connection {
    /// 使用 `DefaultSqlCompiler`。
    pub fn new(runner: Rc<dyn QueryRunner>) -> Self {
        Self::with_compiler(Rc::new(DefaultSqlCompiler::new(runner)))
    }

    pub fn with_compiler(compiler: Rc<dyn SqlCompiler>) -> Self {
        Self { compiler }
    }

    pub fn query_runner(&self) -> &Rc<dyn QueryRunner> {
        self.compiler.query_runner()
    }

    pub fn compiler(&self) -> &Rc<dyn SqlCompiler> {
        &self.compiler
    }

    pub fn update(&self, table: &Table) -> UpdateBuilder {
        UpdateBuilder::new(Rc::clone(&self.compiler), table)
    }

    pub fn update_allowing_no_where(&self, table: &Table) -> UpdateBuilder {
        UpdateBuilder::allowing_no_where(Rc::clone(&self.compiler), table)
    }

    pub fn delete_from(&self, table: &Table) -> DeleteBuilder {
        DeleteBuilder::new(Rc::clone(&self.compiler), table)
    }

    pub fn delete_allowing_no_where_from(&self, table: &Table) -> DeleteBuilder {
        DeleteBuilder::allowing_no_where(Rc::clone(&self.compiler), table)
    }

    pub fn insert_into(&self, table: &Table) -> InsertBuilder {
        InsertBuilder::new(Rc::clone(&self.compiler), table)
    }

    pub fn select_from(&self, from: impl Into<TableOrView>) -> SelectBuilder {
        SelectBuilder::new(Rc::clone(&self.compiler), from)
    }

    /// 调用存储过程。
    #[track_caller]
    pub fn execute_procedure(&self, name: &str, args: &[ValueSource]) -> impl Future<Output = QueryResult<()>> {
        let origin = Location::caller();
        let mut params = Vec::new();
        let prepared = self.compiler.build_procedure_call(name, args, &mut params);
        let runner = Rc::clone(self.query_runner());
        async move {
            let run = async {
                let sql = prepared?;
                log_execution(QueryType::ExecuteProcedure, None, &sql, &params);
                runner.execute_procedure(&sql, &params).await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    /// 调用存储函数并返回它的值。
    #[track_caller]
    pub fn execute_function(&self, name: &str, args: &[ValueSource]) -> impl Future<Output = QueryResult<SqlValue>> {
        let origin = Location::caller();
        let mut params = Vec::new();
        let prepared = self.compiler.build_function_call(name, args, &mut params);
        let runner = Rc::clone(self.query_runner());
        async move {
            let run = async {
                let sql = prepared?;
                log_execution(QueryType::ExecuteFunction, None, &sql, &params);
                runner.execute_function(&sql, &params).await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    /// 原样执行 DDL。
    pub async fn execute_database_schema_modification(&self, query: &str, params: &[Param]) -> QueryResult<()> {
        log_execution(QueryType::ExecuteDatabaseSchemaModification, None, query, params);
        self.query_runner()
            .execute_database_schema_modification(query, params)
            .await
    }

    pub async fn begin_transaction(&self) -> QueryResult<()> {
        self.query_runner().execute_begin_transaction().await
    }

    pub async fn commit(&self) -> QueryResult<()> {
        self.query_runner().execute_commit().await
    }

    pub async fn rollback(&self) -> QueryResult<()> {
        self.query_runner().execute_rollback().await
    }

    pub fn is_transaction_active(&self) -> bool {
        self.query_runner().is_transaction_active()
    }

    /// 在事务中执行 `work`，见 `execute_in_transaction`。
    pub async fn transaction<T, F, Fut>(&self, work: F) -> QueryResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        execute_in_transaction(self.query_runner().as_ref(), work).await
    }
}
