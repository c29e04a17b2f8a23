//! Table / TableOrView：语句目标与列来源的句柄（按引用身份比较）。

use crate::cte::{WithView, Withs};
use crate::expr::{Optionality, ValueSource, ValueType};
use std::rc::Rc;

#[derive(Debug)]
struct TableInner {
    name: String,
}

/// 数据表句柄。克隆共享同一身份。
#[derive(Debug, Clone)]
pub struct Table(Rc<TableInner>);

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(TableInner { name: name.into() }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// 必填列。
    pub fn column(&self, name: impl Into<String>, value_type: ValueType) -> ValueSource {
        ValueSource::column(self.clone().into(), name, value_type, Optionality::Required)
    }

    /// 可空列。
    pub fn optional_column(&self, name: impl Into<String>, value_type: ValueType) -> ValueSource {
        ValueSource::column(self.clone().into(), name, value_type, Optionality::Optional)
    }

    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// 列的来源：普通表或 CTE 视图。
#[derive(Debug, Clone)]
pub enum TableOrView {
    Table(Table),
    View(WithView),
}

impl TableOrView {
    pub fn name(&self) -> &str {
        match self {
            Self::Table(t) => t.name(),
            Self::View(v) => v.name(),
        }
    }

    /// 引用身份相等（不是名字相等）。
    pub fn same_as(&self, other: &TableOrView) -> bool {
        match (self, other) {
            (Self::Table(a), Self::Table(b)) => a.ptr_eq(b),
            (Self::View(a), Self::View(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    pub fn as_view(&self) -> Option<&WithView> {
        match self {
            Self::View(v) => Some(v),
            Self::Table(_) => None,
        }
    }

    pub(crate) fn add_withs(&self, withs: &mut Withs) {
        if let Self::View(v) = self {
            withs.add(v);
        }
    }
}

impl From<Table> for TableOrView {
    fn from(t: Table) -> Self {
        Self::Table(t)
    }
}

impl From<&Table> for TableOrView {
    fn from(t: &Table) -> Self {
        Self::Table(t.clone())
    }
}

impl From<WithView> for TableOrView {
    fn from(v: WithView) -> Self {
        Self::View(v)
    }
}

impl From<&WithView> for TableOrView {
    fn from(v: &WithView) -> Self {
        Self::View(v.clone())
    }
}
