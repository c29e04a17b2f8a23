//! InsertBuilder：构建并执行 INSERT 语句。
//!
//! 单行插入复用 UPDATE 的 set 系列方法；多行插入通过 `values` 一次给出全部行，
//! 编译时取所有行列名的并集，缺失的单元格写 `default`。
//!
//! `values` 会清空单行赋值，之后的 set 系列调用又会丢弃 `values` 给出的行；
//! ignore 系列只作用于单行赋值。`values` 给出零行时各 `execute_insert*` 不访问数据库。

use crate::assignments::Assignments;
use crate::customization::Customization;
use crate::cte::Withs;
use crate::error::{QueryError, QueryResult, RowCountViolation};
use crate::expr::ValueSource;
use crate::macros::{impl_query_methods, impl_set_methods};
use crate::query_runner::{QueryType, log_execution};
use crate::sql_builder::SqlCompiler;
use crate::table::Table;
use crate::value::{Param, SqlValue};
use std::future::Future;
use std::panic::Location;
use std::rc::Rc;
use std::slice;

#[derive(Debug, Clone)]
pub struct InsertData {
    pub table: Table,
    /// 单行插入的赋值。
    pub sets: Assignments,
    /// 多行插入；设置后优先于 `sets`。
    pub multiple: Option<Vec<Assignments>>,
    /// 需要返回的自增 id 列。
    pub id_column: Option<String>,
    pub withs: Withs,
    pub customization: Option<Customization>,
}

impl InsertData {
    /// 要插入的所有行。
    pub fn rows(&self) -> &[Assignments] {
        match &self.multiple {
            Some(rows) => rows,
            None => slice::from_ref(&self.sets),
        }
    }

    /// `values` 给出了零行。
    pub fn is_empty_batch(&self) -> bool {
        self.multiple.as_ref().is_some_and(Vec::is_empty)
    }
}

pub struct InsertBuilder {
    compiler: Rc<dyn SqlCompiler>,
    data: InsertData,
    cache: Option<(String, Vec<Param>)>,
}

impl InsertBuilder {
    pub fn new(compiler: Rc<dyn SqlCompiler>, table: &Table) -> Self {
        Self {
            compiler,
            data: InsertData {
                table: table.clone(),
                sets: Assignments::new(),
                multiple: None,
                id_column: None,
                withs: Withs::new(),
                customization: None,
            },
            cache: None,
        }
    }

    pub fn data(&self) -> &InsertData {
        &self.data
    }

    /// 多行插入。
    pub fn values<R, K, V>(&mut self, rows: impl IntoIterator<Item = R>) -> &mut Self
    where
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ValueSource>,
    {
        let rows: Vec<Assignments> = rows.into_iter().map(Assignments::from_iter).collect();
        for row in &rows {
            for value in row.values() {
                self.data.withs.add_from(value);
            }
        }
        self.data.sets = Assignments::new();
        self.data.multiple = Some(rows);
        self.cache = None;
        self
    }

    fn discard_rows(&mut self) {
        self.data.multiple = None;
    }

    /// 指定自增 id 列，用于 `execute_insert_returning_*`。
    pub fn returning_id(&mut self, column: impl Into<String>) -> &mut Self {
        self.data.id_column = Some(column.into());
        self.cache = None;
        self
    }

    /// 执行 INSERT，返回插入的行数。
    #[track_caller]
    pub fn execute_insert(&mut self, min: Option<u64>, max: Option<u64>) -> impl Future<Output = QueryResult<u64>> {
        let origin = Location::caller();
        let prepared = (!self.data.is_empty_batch()).then(|| self.prepare());
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let Some(prepared) = prepared else {
                return Ok(0);
            };
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::Insert, name.as_deref(), &sql, &params);
                let count = runner.execute_insert(&sql, &params).await?;
                RowCountViolation::check("insert", count, min, max)?;
                Ok::<_, QueryError>(count)
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    /// 执行单行 INSERT 并返回生成的 id。
    #[track_caller]
    pub fn execute_insert_returning_last_inserted_id(&mut self) -> impl Future<Output = QueryResult<SqlValue>> {
        let origin = Location::caller();
        let prepared = (!self.data.is_empty_batch()).then(|| self.prepare());
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let Some(prepared) = prepared else {
                return Ok(SqlValue::Null);
            };
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::InsertReturningLastInsertedId, name.as_deref(), &sql, &params);
                runner.execute_insert_returning_last_inserted_id(&sql, &params).await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    /// 执行多行 INSERT 并按行返回生成的 id。
    #[track_caller]
    pub fn execute_insert_returning_multiple_last_inserted_id(
        &mut self,
    ) -> impl Future<Output = QueryResult<Vec<SqlValue>>> {
        let origin = Location::caller();
        let prepared = (!self.data.is_empty_batch()).then(|| self.prepare());
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let Some(prepared) = prepared else {
                return Ok(Vec::new());
            };
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::InsertReturningMultipleLastInsertedId, name.as_deref(), &sql, &params);
                runner
                    .execute_insert_returning_multiple_last_inserted_id(&sql, &params)
                    .await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }
}

impl_query_methods!(InsertBuilder, build_insert);
impl_set_methods!(InsertBuilder, discard_rows);
