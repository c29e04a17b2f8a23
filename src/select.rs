//! SelectBuilder：构建并执行 SELECT 语句，也用来定义 CTE 视图（`for_use_in_query_as`）。

use crate::customization::Customization;
use crate::cte::{WithView, Withs};
use crate::error::{QueryError, QueryResult};
use crate::expr::ValueSource;
use crate::macros::{impl_query_methods, impl_where_methods};
use crate::query_runner::{QueryType, log_execution};
use crate::sql_builder::SqlCompiler;
use crate::table::TableOrView;
use crate::value::{Param, Row, SqlValue};
use std::future::Future;
use std::panic::Location;
use std::rc::Rc;

/// 单列查询的结果列别名。
pub const ONE_COLUMN_ALIAS: &str = "result";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct SelectData {
    pub from: TableOrView,
    /// `(别名, 表达式)`，按选择顺序。
    pub columns: Vec<(String, ValueSource)>,
    pub where_: Option<ValueSource>,
    pub order_by: Vec<(ValueSource, Order)>,
    pub limit: Option<u64>,
    pub withs: Withs,
    pub customization: Option<Customization>,
}

pub struct SelectBuilder {
    compiler: Rc<dyn SqlCompiler>,
    data: SelectData,
    cache: Option<(String, Vec<Param>)>,
}

impl SelectBuilder {
    pub fn new(compiler: Rc<dyn SqlCompiler>, from: impl Into<TableOrView>) -> Self {
        let from = from.into();
        let mut withs = Withs::new();
        from.add_withs(&mut withs);
        Self {
            compiler,
            data: SelectData {
                from,
                columns: Vec::new(),
                where_: None,
                order_by: Vec::new(),
                limit: None,
                withs,
                customization: None,
            },
            cache: None,
        }
    }

    pub fn data(&self) -> &SelectData {
        &self.data
    }

    /// 追加选择列；同名别名覆盖之前的表达式。
    pub fn select<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
    where
        K: Into<String>,
        V: Into<ValueSource>,
    {
        for (alias, value) in columns {
            let alias = alias.into();
            let value = value.into();
            self.data.withs.add_from(&value);
            match self.data.columns.iter_mut().find(|(a, _)| *a == alias) {
                Some((_, v)) => *v = value,
                None => self.data.columns.push((alias, value)),
            }
        }
        self.cache = None;
        self
    }

    /// 只选择一列（别名固定为 `result`），替换之前的选择。
    pub fn select_one_column(&mut self, value: impl Into<ValueSource>) -> &mut Self {
        let value = value.into();
        self.data.withs.add_from(&value);
        self.data.columns = vec![(ONE_COLUMN_ALIAS.to_string(), value)];
        self.cache = None;
        self
    }

    pub fn order_by(&mut self, value: impl Into<ValueSource>, order: Order) -> &mut Self {
        let value = value.into();
        self.data.withs.add_from(&value);
        self.data.order_by.push((value, order));
        self.cache = None;
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.data.limit = Some(limit);
        self.cache = None;
        self
    }

    /// 以当前状态定义一个 CTE 视图；之后对 builder 的修改不影响该视图。
    pub fn for_use_in_query_as(&self, name: impl Into<String>) -> WithView {
        WithView::new(name, self.data.clone())
    }

    #[track_caller]
    pub fn execute_select_none_or_one(&mut self) -> impl Future<Output = QueryResult<Option<Row>>> {
        let origin = Location::caller();
        let prepared = self.prepare();
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::SelectOneRow, name.as_deref(), &sql, &params);
                runner.execute_select_one_row(&sql, &params).await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    /// 与 `execute_select_none_or_one` 相同，但没有结果行时返回 `QueryError::NoResult`。
    #[track_caller]
    pub fn execute_select_one(&mut self) -> impl Future<Output = QueryResult<Row>> {
        let origin = Location::caller();
        let prepared = self.prepare();
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::SelectOneRow, name.as_deref(), &sql, &params);
                runner
                    .execute_select_one_row(&sql, &params)
                    .await?
                    .ok_or(QueryError::NoResult)
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    #[track_caller]
    pub fn execute_select_many(&mut self) -> impl Future<Output = QueryResult<Vec<Row>>> {
        let origin = Location::caller();
        let prepared = self.prepare();
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::SelectManyRows, name.as_deref(), &sql, &params);
                runner.execute_select_many_rows(&sql, &params).await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    /// 单列单行；没有行时为 `None`。
    #[track_caller]
    pub fn execute_select_value_none_or_one(&mut self) -> impl Future<Output = QueryResult<Option<SqlValue>>> {
        let origin = Location::caller();
        let prepared = self.prepare();
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::SelectOneColumnOneRow, name.as_deref(), &sql, &params);
                runner.execute_select_one_column_one_row(&sql, &params).await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }

    #[track_caller]
    pub fn execute_select_values(&mut self) -> impl Future<Output = QueryResult<Vec<SqlValue>>> {
        let origin = Location::caller();
        let prepared = self.prepare();
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::SelectOneColumnManyRows, name.as_deref(), &sql, &params);
                runner.execute_select_one_column_many_rows(&sql, &params).await
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }
}

impl_query_methods!(SelectBuilder, build_select);
impl_where_methods!(SelectBuilder);
