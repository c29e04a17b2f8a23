//! SqlCompiler：把 builder 状态按方言编译成 `(SQL, 参数)`。
//!
//! 编译是纯函数：相同的状态与方言总得到相同的文本与参数。占位符来自 runner 的
//! `add_param`，因此编译结果总与执行它的 runner 一致。

use crate::cte::{Withs, referenced_views};
use crate::customization::{Customization, HookPoint};
use crate::database::DatabaseType;
use crate::delete::DeleteData;
use crate::error::CompileError;
use crate::expr::{FragmentPart, Logic, Node, ValueSource};
use crate::insert::InsertData;
use crate::query_runner::QueryRunner;
use crate::select::{Order, SelectData};
use crate::string_builder::StringBuilder;
use crate::table::TableOrView;
use crate::update::UpdateData;
use crate::value::{Param, SqlValue};
use std::rc::Rc;

/// 编译器契约：每种语句一个入口，外加当前方言的 “是否有值” 判定。
pub trait SqlCompiler {
    fn query_runner(&self) -> &Rc<dyn QueryRunner>;

    /// 值分类：决定 `*_if_value` / `*_has_value` 系列方法是否生效。
    fn is_value(&self, value: &SqlValue) -> bool;

    fn build_update(&self, update: &UpdateData, params: &mut Vec<Param>) -> Result<String, CompileError>;

    fn build_delete(&self, delete: &DeleteData, params: &mut Vec<Param>) -> Result<String, CompileError>;

    fn build_insert(&self, insert: &InsertData, params: &mut Vec<Param>) -> Result<String, CompileError>;

    fn build_select(&self, select: &SelectData, params: &mut Vec<Param>) -> Result<String, CompileError>;

    fn build_procedure_call(
        &self,
        name: &str,
        args: &[ValueSource],
        params: &mut Vec<Param>,
    ) -> Result<String, CompileError>;

    fn build_function_call(
        &self,
        name: &str,
        args: &[ValueSource],
        params: &mut Vec<Param>,
    ) -> Result<String, CompileError>;

    /// 表达式层面的值分类：缺失（`None`）不是值；绑定值按 `is_value` 判定；其它表达式总是值。
    fn is_value_source(&self, value: Option<&ValueSource>) -> bool {
        match value {
            None => false,
            Some(v) => match v.literal() {
                Some(literal) => self.is_value(literal),
                None => true,
            },
        }
    }
}

/// 编译器配置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompilerConfig {
    /// 空字符串是否算作 “有值”。Oracle 总是按 `NULL` 处理空字符串。
    pub allow_empty_string: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            allow_empty_string: true,
        }
    }
}

/// 默认编译器：覆盖全部 `DatabaseType`。
pub struct DefaultSqlCompiler {
    runner: Rc<dyn QueryRunner>,
    config: CompilerConfig,
}

impl DefaultSqlCompiler {
    pub fn new(runner: Rc<dyn QueryRunner>) -> Self {
        Self::with_config(runner, CompilerConfig::default())
    }

    pub fn with_config(runner: Rc<dyn QueryRunner>, config: CompilerConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> CompilerConfig {
        self.config
    }

    fn database(&self) -> DatabaseType {
        self.runner.database()
    }
}

/// 单次编译的上下文：参数列表与 “根表”（根表的列不加前缀）。
struct Ctx<'a> {
    params: &'a mut Vec<Param>,
    root: Option<TableOrView>,
}

impl DefaultSqlCompiler {
    fn append_param(&self, value: &SqlValue, ctx: &mut Ctx<'_>) -> String {
        self.runner.add_param(ctx.params, value.clone())
    }

    fn append_column(&self, source: &TableOrView, name: &str, ctx: &Ctx<'_>) -> String {
        match &ctx.root {
            Some(root) if root.same_as(source) => name.to_string(),
            _ => format!("{}.{}", source.name(), name),
        }
    }

    fn append_constant(&self, b: bool) -> &'static str {
        match (self.database(), b) {
            (DatabaseType::Oracle | DatabaseType::SqlServer, true) => "1=1",
            (DatabaseType::Oracle | DatabaseType::SqlServer, false) => "0=1",
            (_, true) => "true",
            (_, false) => "false",
        }
    }

    /// 渲染表达式；被忽略的 if-value 条件渲染为空串。
    fn append_value(&self, value: &ValueSource, ctx: &mut Ctx<'_>) -> String {
        match value.node() {
            Node::Column { source, name } => self.append_column(source, name, ctx),
            Node::Value(v) => self.append_param(v, ctx),
            Node::Constant(b) => self.append_constant(*b).to_string(),
            Node::Compare { op, left, right } => {
                if value.boolean_kind() == Some(crate::expr::BooleanKind::IfValue)
                    && (!self.is_value_source(Some(left)) || !self.is_value_source(Some(right)))
                {
                    return String::new();
                }
                let l = self.append_value(left, ctx);
                let r = self.append_value(right, ctx);
                format!("{l} {} {r}", op.as_sql())
            }
            Node::NullCheck { operand, negated } => {
                let o = self.append_value(operand, ctx);
                if *negated {
                    format!("{o} is not null")
                } else {
                    format!("{o} is null")
                }
            }
            Node::Logical { op, operands } => {
                let parts: Vec<String> = operands
                    .iter()
                    .map(|o| self.append_logical_operand(*op, o, ctx))
                    .filter(|s| !s.is_empty())
                    .collect();
                let mut buf = StringBuilder::new();
                buf.write_strings(&parts, op.as_sql());
                buf.into_string()
            }
            Node::Not(operand) => {
                let o = self.append_value(operand, ctx);
                if o.is_empty() {
                    o
                } else {
                    format!("not ({o})")
                }
            }
            Node::Arithmetic { op, left, right } => {
                let l = self.append_arithmetic_operand(left, ctx);
                let r = self.append_arithmetic_operand(right, ctx);
                format!("{l} {} {r}", op.as_sql())
            }
            Node::Fragment(parts) => {
                let mut sql = String::new();
                for part in parts {
                    match part {
                        FragmentPart::Sql(s) => sql.push_str(s),
                        FragmentPart::Value(v) => {
                            let rendered = self.append_value(v, ctx);
                            sql.push_str(&rendered);
                        }
                    }
                }
                sql
            }
        }
    }

    fn append_logical_operand(&self, parent: Logic, operand: &ValueSource, ctx: &mut Ctx<'_>) -> String {
        let rendered = self.append_value(operand, ctx);
        match operand.node() {
            Node::Logical { op, operands } if *op != parent && operands.len() > 1 && !rendered.is_empty() => {
                format!("({rendered})")
            }
            _ => rendered,
        }
    }

    fn append_arithmetic_operand(&self, operand: &ValueSource, ctx: &mut Ctx<'_>) -> String {
        let rendered = self.append_value(operand, ctx);
        match operand.node() {
            Node::Arithmetic { .. } => format!("({rendered})"),
            _ => rendered,
        }
    }

    fn append_hooks(&self, custom: Option<&Customization>, point: HookPoint, buf: &mut StringBuilder, ctx: &mut Ctx<'_>) {
        let Some(custom) = custom else {
            return;
        };
        for fragment in custom.at(point) {
            let rendered = self.append_value(fragment, ctx);
            buf.write_leading(&rendered);
        }
    }

    /// `with a as (...), b as (...)`；每个视图只渲染一次。
    fn append_withs(&self, withs: &Withs, buf: &mut StringBuilder, ctx: &mut Ctx<'_>) -> Result<(), CompileError> {
        if withs.is_empty() {
            return Ok(());
        }
        let mut defs = Vec::with_capacity(withs.len());
        for view in withs.iter() {
            let outer_root = ctx.root.take();
            let body = self.append_select_body(view.query(), ctx);
            ctx.root = outer_root;
            defs.push(format!("{} as ({})", view.name(), body?));
        }
        buf.write_leading("with");
        buf.write_leading(&defs.join(", "));
        Ok(())
    }

    fn append_where(
        &self,
        condition: Option<&ValueSource>,
        required: Option<(&'static str, &str)>,
        buf: &mut StringBuilder,
        ctx: &mut Ctx<'_>,
    ) -> Result<(), CompileError> {
        let rendered = match condition {
            Some(c) => self.append_value(c, ctx),
            None => String::new(),
        };
        if rendered.is_empty() {
            if let Some((statement, table)) = required {
                return Err(CompileError::MissingWhere {
                    statement,
                    table: table.to_string(),
                });
            }
            return Ok(());
        }
        buf.write_leading("where");
        buf.write_leading(&rendered);
        Ok(())
    }

    /// 不含 `with` 的 select 主体（也用于 CTE 定义）。
    fn append_select_body(&self, select: &SelectData, ctx: &mut Ctx<'_>) -> Result<String, CompileError> {
        if select.columns.is_empty() {
            return Err(CompileError::NoColumnsSelected(select.from.name().to_string()));
        }
        ctx.root = Some(select.from.clone());
        let custom = select.customization.as_ref();
        let mut buf = StringBuilder::new();
        buf.write_leading("select");
        self.append_hooks(custom, HookPoint::AfterKeyword, &mut buf, ctx);

        let columns: Vec<String> = select
            .columns
            .iter()
            .map(|(alias, v)| format!("{} as {alias}", self.append_value(v, ctx)))
            .collect();
        buf.write_leading(&columns.join(", "));
        buf.write_leading("from");
        buf.write_leading(select.from.name());

        self.append_where(select.where_.as_ref(), None, &mut buf, ctx)?;

        if !select.order_by.is_empty() {
            let order: Vec<String> = select
                .order_by
                .iter()
                .map(|(v, o)| {
                    let rendered = self.append_value(v, ctx);
                    match o {
                        Order::Asc => format!("{rendered} asc"),
                        Order::Desc => format!("{rendered} desc"),
                    }
                })
                .collect();
            buf.write_leading("order by");
            buf.write_leading(&order.join(", "));
        }

        if let Some(limit) = select.limit {
            let placeholder = self.append_param(&SqlValue::U64(limit), ctx);
            match self.database() {
                DatabaseType::Oracle | DatabaseType::SqlServer => {
                    buf.write_leading(&format!("offset 0 rows fetch next {placeholder} rows only"));
                }
                _ => buf.write_leading(&format!("limit {placeholder}")),
            }
        }
        Ok(buf.into_string())
    }

    fn append_call_args(&self, args: &[ValueSource], ctx: &mut Ctx<'_>) -> String {
        args.iter()
            .map(|a| self.append_value(a, ctx))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn unsupported(&self, feature: &'static str) -> CompileError {
        CompileError::Unsupported {
            feature,
            database: self.database().to_string(),
        }
    }
}

impl SqlCompiler for DefaultSqlCompiler {
    fn query_runner(&self) -> &Rc<dyn QueryRunner> {
        &self.runner
    }

    fn is_value(&self, value: &SqlValue) -> bool {
        match value {
            SqlValue::Null => false,
            SqlValue::String(s) if s.is_empty() => {
                self.config.allow_empty_string && self.database() != DatabaseType::Oracle
            }
            _ => true,
        }
    }

    fn build_update(&self, update: &UpdateData, params: &mut Vec<Param>) -> Result<String, CompileError> {
        let table = TableOrView::Table(update.table.clone());
        let mut ctx = Ctx { params, root: None };
        let custom = update.customization.as_ref();
        let mut buf = StringBuilder::new();

        self.append_hooks(custom, HookPoint::BeforeQuery, &mut buf, &mut ctx);
        self.append_withs(&update.withs, &mut buf, &mut ctx)?;
        ctx.root = Some(table);

        buf.write_leading("update");
        self.append_hooks(custom, HookPoint::AfterKeyword, &mut buf, &mut ctx);

        let views = referenced_views(update.sets.values().chain(update.where_.as_ref()));
        let view_names: Vec<&str> = views.iter().map(|v| v.name()).collect();
        if self.database().is_mysql_family() && !view_names.is_empty() {
            buf.write_leading(&format!("{}, {}", update.table.name(), view_names.join(", ")));
        } else {
            buf.write_leading(update.table.name());
        }

        if !update.sets.is_empty() {
            let sets: Vec<String> = update
                .sets
                .iter()
                .map(|(column, v)| format!("{column} = {}", self.append_value(v, &mut ctx)))
                .collect();
            buf.write_leading("set");
            buf.write_leading(&sets.join(", "));
        }

        if !self.database().is_mysql_family() && !view_names.is_empty() {
            buf.write_leading("from");
            buf.write_leading(&view_names.join(", "));
        }

        let required = (!update.allow_no_where).then_some(("update", update.table.name()));
        self.append_where(update.where_.as_ref(), required, &mut buf, &mut ctx)?;
        self.append_hooks(custom, HookPoint::AfterQuery, &mut buf, &mut ctx);
        Ok(buf.into_string())
    }

    fn build_delete(&self, delete: &DeleteData, params: &mut Vec<Param>) -> Result<String, CompileError> {
        let mut ctx = Ctx { params, root: None };
        let custom = delete.customization.as_ref();
        let mut buf = StringBuilder::new();

        self.append_hooks(custom, HookPoint::BeforeQuery, &mut buf, &mut ctx);
        self.append_withs(&delete.withs, &mut buf, &mut ctx)?;
        ctx.root = Some(TableOrView::Table(delete.table.clone()));

        buf.write_leading("delete");
        self.append_hooks(custom, HookPoint::AfterKeyword, &mut buf, &mut ctx);
        buf.write_leading("from");
        buf.write_leading(delete.table.name());

        if self.database() == DatabaseType::PostgreSql {
            let views = referenced_views(delete.where_.as_ref());
            if !views.is_empty() {
                let names: Vec<&str> = views.iter().map(|v| v.name()).collect();
                buf.write_leading("using");
                buf.write_leading(&names.join(", "));
            }
        }

        let required = (!delete.allow_no_where).then_some(("delete", delete.table.name()));
        self.append_where(delete.where_.as_ref(), required, &mut buf, &mut ctx)?;
        self.append_hooks(custom, HookPoint::AfterQuery, &mut buf, &mut ctx);
        Ok(buf.into_string())
    }

    fn build_insert(&self, insert: &InsertData, params: &mut Vec<Param>) -> Result<String, CompileError> {
        let database = self.database();
        let mut ctx = Ctx { params, root: None };
        let custom = insert.customization.as_ref();
        let mut buf = StringBuilder::new();

        self.append_hooks(custom, HookPoint::BeforeQuery, &mut buf, &mut ctx);
        self.append_withs(&insert.withs, &mut buf, &mut ctx)?;
        ctx.root = Some(TableOrView::Table(insert.table.clone()));

        buf.write_leading("insert");
        self.append_hooks(custom, HookPoint::AfterKeyword, &mut buf, &mut ctx);
        buf.write_leading("into");
        buf.write_leading(insert.table.name());

        let rows = insert.rows();
        if rows.is_empty() {
            return Err(CompileError::NoRowsToInsert(insert.table.name().to_string()));
        }
        let mut columns: Vec<&str> = Vec::new();
        for row in rows {
            for column in row.columns() {
                if !columns.contains(&column) {
                    columns.push(column);
                }
            }
        }

        if columns.is_empty() {
            if database.is_mysql_family() {
                buf.write_leading("() values");
                buf.write_leading(&vec!["()"; rows.len()].join(", "));
            } else if rows.len() > 1 {
                return Err(self.unsupported("inserting several rows without columns"));
            } else {
                self.append_insert_output(insert, &mut buf);
                buf.write_leading("default values");
            }
        } else {
            buf.write_leading(&format!("({})", columns.join(", ")));
            self.append_insert_output(insert, &mut buf);
            let mut tuples = Vec::with_capacity(rows.len());
            for row in rows {
                let values: Vec<String> = columns
                    .iter()
                    .map(|c| match row.get(c) {
                        Some(v) => self.append_value(v, &mut ctx),
                        None => "default".to_string(),
                    })
                    .collect();
                tuples.push(format!("({})", values.join(", ")));
            }
            buf.write_leading("values");
            buf.write_leading(&tuples.join(", "));
        }

        if let Some(id) = &insert.id_column {
            match database {
                DatabaseType::PostgreSql | DatabaseType::Sqlite | DatabaseType::MariaDb => {
                    buf.write_leading(&format!("returning {id}"));
                }
                DatabaseType::Oracle => {
                    let out = self.runner.add_out_param(ctx.params, id);
                    buf.write_leading(&format!("returning {id} into {out}"));
                }
                DatabaseType::SqlServer | DatabaseType::MySql | DatabaseType::NoopDb => {}
            }
        }

        self.append_hooks(custom, HookPoint::AfterQuery, &mut buf, &mut ctx);
        Ok(buf.into_string())
    }

    fn build_select(&self, select: &SelectData, params: &mut Vec<Param>) -> Result<String, CompileError> {
        let mut ctx = Ctx { params, root: None };
        let custom = select.customization.as_ref();
        let mut buf = StringBuilder::new();

        self.append_hooks(custom, HookPoint::BeforeQuery, &mut buf, &mut ctx);
        self.append_withs(&select.withs, &mut buf, &mut ctx)?;
        let body = self.append_select_body(select, &mut ctx)?;
        buf.write_leading(&body);
        self.append_hooks(custom, HookPoint::AfterQuery, &mut buf, &mut ctx);
        Ok(buf.into_string())
    }

    fn build_procedure_call(
        &self,
        name: &str,
        args: &[ValueSource],
        params: &mut Vec<Param>,
    ) -> Result<String, CompileError> {
        let mut ctx = Ctx { params, root: None };
        let args = self.append_call_args(args, &mut ctx);
        match self.database() {
            DatabaseType::Sqlite => Err(self.unsupported("stored procedures")),
            DatabaseType::SqlServer if args.is_empty() => Ok(format!("exec {name}")),
            DatabaseType::SqlServer => Ok(format!("exec {name} {args}")),
            DatabaseType::Oracle => Ok(format!("begin {name}({args}); end;")),
            _ => Ok(format!("call {name}({args})")),
        }
    }

    fn build_function_call(
        &self,
        name: &str,
        args: &[ValueSource],
        params: &mut Vec<Param>,
    ) -> Result<String, CompileError> {
        let mut ctx = Ctx { params, root: None };
        let args = self.append_call_args(args, &mut ctx);
        match self.database() {
            DatabaseType::Sqlite => Err(self.unsupported("stored functions")),
            DatabaseType::Oracle => Ok(format!("select {name}({args}) from dual")),
            _ => Ok(format!("select {name}({args})")),
        }
    }
}

impl DefaultSqlCompiler {
    fn append_insert_output(&self, insert: &InsertData, buf: &mut StringBuilder) {
        if self.database() != DatabaseType::SqlServer {
            return;
        }
        if let Some(id) = &insert.id_column {
            buf.write_leading(&format!("output inserted.{id}"));
        }
    }
}
