//! 错误类型：编译期（SQL 渲染）错误与执行期错误。

use crate::query_runner::QueryType;
use std::panic::Location;

/// 执行期结果别名。
pub type QueryResult<T> = Result<T, QueryError>;

/// 解析 `DatabaseType` 时遇到未知方言。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown database {0}")]
pub struct UnknownDatabase(pub String);

/// SQL 编译失败。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("no where was specified for the {statement} on {table}")]
    MissingWhere {
        statement: &'static str,
        table: String,
    },
    #[error("no columns were selected from {0}")]
    NoColumnsSelected(String),
    #[error("no rows were given to insert into {0}")]
    NoRowsToInsert(String),
    #[error("{feature} is not supported by {database}")]
    Unsupported {
        feature: &'static str,
        database: String,
    },
}

/// 影响行数越界（`min` / `max` 校验失败）。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowCountViolation {
    #[error("The {statement} operation didn't {statement} the minimum of {min} row(s), it affected {actual}")]
    TooFew {
        statement: &'static str,
        min: u64,
        actual: u64,
    },
    #[error("The {statement} operation affected more than the maximum of {max} row(s), it affected {actual}")]
    TooMany {
        statement: &'static str,
        max: u64,
        actual: u64,
    },
}

impl RowCountViolation {
    /// 依次校验下限与上限；`None` 表示不限制。
    pub fn check(statement: &'static str, actual: u64, min: Option<u64>, max: Option<u64>) -> Result<(), Self> {
        if let Some(min) = min
            && actual < min
        {
            return Err(Self::TooFew { statement, min, actual });
        }
        if let Some(max) = max
            && actual > max
        {
            return Err(Self::TooMany { statement, max, actual });
        }
        Ok(())
    }

    pub fn actual(&self) -> u64 {
        match self {
            Self::TooFew { actual, .. } | Self::TooMany { actual, .. } => *actual,
        }
    }
}

/// 构建与执行过程中的错误。
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// 非法调用顺序，例如未经 `and`/`or` 重复调用 `where_`。
    #[error("Illegal state: {0}")]
    IllegalState(&'static str),

    #[error(transparent)]
    UnknownDatabase(#[from] UnknownDatabase),

    #[error("unable to build the query: {source}")]
    Compile {
        #[from]
        source: CompileError,
    },

    #[error(transparent)]
    RowCount(#[from] RowCountViolation),

    /// 带调用点的执行失败，`source` 保留原始错误。
    #[error("{source} (query executed at {origin})")]
    Execution {
        origin: &'static Location<'static>,
        #[source]
        source: Box<QueryError>,
    },

    /// 底层驱动 / runner 返回的失败。
    #[error("{0}")]
    Driver(String),

    #[error("there is no active transaction")]
    TransactionNotActive,

    #[error("{query_type} returned an unexpected result, expected {expected}")]
    UnexpectedResult {
        query_type: QueryType,
        expected: &'static str,
    },

    #[error("no result returned by the database")]
    NoResult,
}

impl QueryError {
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver(message.into())
    }

    pub(crate) fn executed_at(self, origin: &'static Location<'static>) -> Self {
        Self::Execution {
            origin,
            source: Box::new(self),
        }
    }

    /// 剥掉所有 `Execution` 包装，返回最初的错误。
    pub fn root_cause(&self) -> &QueryError {
        let mut current = self;
        while let Self::Execution { source, .. } = current {
            current = source;
        }
        current
    }

    /// 最外层包装记录的调用点。
    pub fn origin(&self) -> Option<&'static Location<'static>> {
        match self {
            Self::Execution { origin, .. } => Some(*origin),
            _ => None,
        }
    }

    pub fn is_row_count_violation(&self) -> bool {
        matches!(self.root_cause(), Self::RowCount(_))
    }

    pub fn is_illegal_state(&self) -> bool {
        matches!(self.root_cause(), Self::IllegalState(_))
    }
}
