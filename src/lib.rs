//! halo-query-runner：可组合的 SQL 语句 builder、按方言编译的 SQL 编译器，以及统一的异步执行接口。

pub mod assignments;
pub mod connection;
pub mod cte;
pub mod customization;
pub mod database;
pub mod delete;
pub mod error;
pub mod expr;
#[cfg(test)]
mod expr_tests;
pub mod insert;
pub mod macros;
pub mod mock_runner;
pub mod noop_runner;
pub mod query_runner;
pub mod select;
pub mod sql_builder;
mod string_builder;
pub mod table;
pub mod transaction;
#[cfg(test)]
mod transaction_tests;
pub mod update;
#[cfg(test)]
mod update_tests;
pub mod value;

pub use crate::assignments::Assignments;
pub use crate::connection::Connection;
pub use crate::cte::{WithView, Withs};
pub use crate::customization::{Customization, HookPoint};
pub use crate::database::{
    DatabaseType, DefaultDatabaseGuard, default_database, set_default_database,
    set_default_database_scoped,
};
pub use crate::delete::{DeleteBuilder, DeleteData};
pub use crate::error::{CompileError, QueryError, QueryResult, RowCountViolation, UnknownDatabase};
pub use crate::expr::{
    ArithmeticOp, BooleanKind, CompareOp, FragmentPart, Optionality, ValueSource, ValueType,
};
pub use crate::insert::{InsertBuilder, InsertData};
pub use crate::mock_runner::{MockExecutor, MockQueryRunner, MockResult, MockRunnerConfig};
pub use crate::noop_runner::NoopQueryRunner;
pub use crate::query_runner::{QueryRunner, QueryType, TransactionLevel};
pub use crate::select::{ONE_COLUMN_ALIAS, Order, SelectBuilder, SelectData};
pub use crate::sql_builder::{CompilerConfig, DefaultSqlCompiler, SqlCompiler};
pub use crate::table::{Table, TableOrView};
pub use crate::transaction::{execute_combined, execute_in_transaction, execute_in_transaction_all};
pub use crate::update::{UpdateBuilder, UpdateData};
pub use crate::value::{Param, Row, SqlValue};
