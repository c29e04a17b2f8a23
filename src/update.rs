//! UpdateBuilder：增量构建并执行 UPDATE 语句。
//!
//! builder 只持有状态（赋值、条件、CTE 依赖、定制片段）与一份编译缓存；任何修改都会
//! 让缓存失效，下一次 `query()` / `params()` / `execute_update()` 重新编译。

use crate::assignments::Assignments;
use crate::customization::Customization;
use crate::cte::Withs;
use crate::error::{QueryError, QueryResult, RowCountViolation};
use crate::expr::ValueSource;
use crate::macros::{impl_query_methods, impl_set_methods, impl_where_methods};
use crate::query_runner::{QueryType, log_execution};
use crate::sql_builder::SqlCompiler;
use crate::table::Table;
use crate::value::Param;
use std::future::Future;
use std::panic::Location;
use std::rc::Rc;

/// UPDATE 的全部可编译状态。
#[derive(Debug, Clone)]
pub struct UpdateData {
    pub table: Table,
    pub sets: Assignments,
    pub where_: Option<ValueSource>,
    /// 为 `false` 时缺少（或编译为空的）条件会导致编译失败。
    pub allow_no_where: bool,
    pub withs: Withs,
    pub customization: Option<Customization>,
}

impl UpdateData {
    pub fn new(table: Table, allow_no_where: bool) -> Self {
        Self {
            table,
            sets: Assignments::new(),
            where_: None,
            allow_no_where,
            withs: Withs::new(),
            customization: None,
        }
    }
}

pub struct UpdateBuilder {
    compiler: Rc<dyn SqlCompiler>,
    data: UpdateData,
    cache: Option<(String, Vec<Param>)>,
}

impl UpdateBuilder {
    /// 必须带条件的 UPDATE。
    pub fn new(compiler: Rc<dyn SqlCompiler>, table: &Table) -> Self {
        Self::with_data(compiler, UpdateData::new(table.clone(), false))
    }

    /// 允许不带条件（更新整张表）的 UPDATE。
    pub fn allowing_no_where(compiler: Rc<dyn SqlCompiler>, table: &Table) -> Self {
        Self::with_data(compiler, UpdateData::new(table.clone(), true))
    }

    fn with_data(compiler: Rc<dyn SqlCompiler>, data: UpdateData) -> Self {
        Self {
            compiler,
            data,
            cache: None,
        }
    }

    pub fn data(&self) -> &UpdateData {
        &self.data
    }

    /// 执行 UPDATE，返回影响行数。
    ///
    /// 没有任何赋值时直接返回 `0`，不会编译也不会访问数据库。`min` / `max` 分别校验影响行数的
    /// 下限与上限。所有失败都包装为 `QueryError::Execution`，记录调用位置。
    #[track_caller]
    pub fn execute_update(&mut self, min: Option<u64>, max: Option<u64>) -> impl Future<Output = QueryResult<u64>> {
        let origin = Location::caller();
        let prepared = (!self.data.sets.is_empty()).then(|| self.prepare());
        let runner = Rc::clone(self.compiler.query_runner());
        let name = self.execution_name();
        async move {
            let Some(prepared) = prepared else {
                return Ok(0);
            };
            let run = async {
                let (sql, params) = prepared?;
                log_execution(QueryType::Update, name.as_deref(), &sql, &params);
                let count = runner.execute_update(&sql, &params).await?;
                RowCountViolation::check("update", count, min, max)?;
                Ok::<_, QueryError>(count)
            };
            run.await.map_err(|e| e.executed_at(origin))
        }
    }
}

impl_query_methods!(UpdateBuilder, build_update);
impl_where_methods!(UpdateBuilder);
impl_set_methods!(UpdateBuilder);
