//! DeleteBuilder：构建并执行 DELETE 语句。

use crate::customization::Customization;
use crate::cte::Withs;
use crate::error::{QueryError, QueryResult, RowCountViolation};
use crate::expr::ValueSource;
use crate::macros::{impl_query_methods, impl_where_methods};
use crate::query_runner::{QueryType, log_execution};
use crate::sql_builder::SqlCompiler;
use crate::table::Table;
use crate::value::Param;
use std::future::Future;
use std::panic::Location;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct DeleteData {
    pub table: Table,
    pub where_: Option<ValueSource>,
    pub allow_no_where: bool,
    pub withs: Withs,
    pub customization: Option<Customization>,
}

pub struct DeleteBuilder {
    compiler: Rc<dyn SqlCompiler>,
    data: DeleteData,
    cache: Option<(String, Vec<Param>)>,
}

impl DeleteBuilder {
    pub fn new(compiler: Rc<dyn SqlCompiler>, table: &Table) -> Self {
        Self::with_policy(compiler, table, false)
    }

    /// 允许不带条件（清空整张表）的 DELETE。
    pub fn allowing_no_where(compiler: Rc<dyn SqlCompiler>, table: &Table) -> Self {
        Self::with_policy(compiler, table, true)
    }

    fn with_policy(compiler: Rc<dyn SqlCompiler>, table: &Table, allow_no_where: bool) -> Self {
        Self {
            compiler,
            data: DeleteData {
                table: table.clone(),
                where_: None,
                allow_no_where,
                withs: Withs::new(),
                customization: None,
            },
            cache: None,
        }
    }

    pub fn data(&self) -> &DeleteData {
        &self.data
    }

    /// 执行 DELETE，返回删除的行数；行数越界时报错。
    #[track_caller]
    pub fn execute_delete(&mut self, min: Option<u64>, max: Option<u64>) -> impl Future<Output = QueryResult<u64>> {
        let origin = Location::caller();
        let prepared = self.prepare();
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::Delete, name.as_deref(), &sql, &params);
                let count = runner.execute_delete(&sql, &params).await?;
                RowCountViolation::check("delete", count, min, max)?;
                Ok::<_, QueryError>(count)
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }
}

impl_query_methods!(DeleteBuilder, build_delete);
impl_where_methods!(DeleteBuilder);
