//! DatabaseType（方言）：决定占位符语法，以及编译器里少量的方言差异。

use crate::error::UnknownDatabase;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard};

/// 受支持的数据库方言（封闭集合）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DatabaseType {
    MariaDb,
    MySql,
    #[default]
    NoopDb,
    Oracle,
    PostgreSql,
    Sqlite,
    SqlServer,
}

static DEFAULT_DATABASE: AtomicU8 = AtomicU8::new(DatabaseType::NoopDb as u8);
static DEFAULT_DATABASE_LOCK: Mutex<()> = Mutex::new(());

impl DatabaseType {
    pub const ALL: [DatabaseType; 7] = [
        Self::MariaDb,
        Self::MySql,
        Self::NoopDb,
        Self::Oracle,
        Self::PostgreSql,
        Self::Sqlite,
        Self::SqlServer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::MariaDb => "mariaDB",
            Self::MySql => "mySql",
            Self::NoopDb => "noopDB",
            Self::Oracle => "oracle",
            Self::PostgreSql => "postgreSql",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "sqlServer",
        }
    }

    /// 第 `index`（从 0 开始）个参数的占位符。
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Self::MariaDb | Self::MySql | Self::Sqlite => "?".to_string(),
            Self::NoopDb => format!("${index}"),
            Self::Oracle => format!(":{index}"),
            Self::PostgreSql => format!("${}", index + 1),
            Self::SqlServer => format!("@{index}"),
        }
    }

    pub fn is_mysql_family(self) -> bool {
        matches!(self, Self::MariaDb | Self::MySql)
    }
}

impl TryFrom<u8> for DatabaseType {
    type Error = UnknownDatabase;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        Self::ALL
            .get(v as usize)
            .copied()
            .ok_or_else(|| UnknownDatabase(v.to_string()))
    }
}

impl FromStr for DatabaseType {
    type Err = UnknownDatabase;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|db| db.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownDatabase(s.to_string()))
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 当前进程级默认方言（未显式指定方言的 runner 使用它）。
pub fn default_database() -> DatabaseType {
    DatabaseType::try_from(DEFAULT_DATABASE.load(Ordering::Relaxed)).unwrap_or_default()
}

/// 设置进程级默认方言，返回旧值。
pub fn set_default_database(database: DatabaseType) -> DatabaseType {
    let old = DEFAULT_DATABASE.swap(database as u8, Ordering::Relaxed);
    DatabaseType::try_from(old).unwrap_or_default()
}

/// 修改默认方言的 RAII guard（持有全局锁，避免并行测试互相干扰）。
pub struct DefaultDatabaseGuard {
    _lock: MutexGuard<'static, ()>,
    old: DatabaseType,
}

impl Drop for DefaultDatabaseGuard {
    fn drop(&mut self) {
        set_default_database(self.old);
    }
}

/// 在一个作用域内临时设置默认方言，退出作用域后自动恢复。
pub fn set_default_database_scoped(database: DatabaseType) -> DefaultDatabaseGuard {
    let lock = DEFAULT_DATABASE_LOCK
        .lock()
        .unwrap_or_else(|e| e.into_inner());
    let old = set_default_database(database);
    DefaultDatabaseGuard { _lock: lock, old }
}
