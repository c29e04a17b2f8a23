//! Assignments：`列名 -> 表达式` 的有序映射（键唯一，后写覆盖），以及 set 系列方法的公共逻辑。

use crate::cte::Withs;
use crate::expr::ValueSource;

#[derive(Debug, Clone, Default)]
pub struct Assignments {
    entries: Vec<(String, ValueSource)>,
}

/// set 系列方法对 “已暂存的值” 的前置条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SetMode {
    Always,
    IfSet,
    IfNotSet,
    IfHasValue,
    IfHasNoValue,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&ValueSource> {
        self.entries
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// 写入；已存在的列原位覆盖。
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<ValueSource>) {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some((_, v)) => *v = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn remove(&mut self, column: &str) -> Option<ValueSource> {
        let idx = self.entries.iter().position(|(c, _)| c == column)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn retain(&mut self, mut f: impl FnMut(&str, &ValueSource) -> bool) {
        self.entries.retain(|(c, v)| f(c, v));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValueSource)> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &ValueSource> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// 按 `mode` 合并 `columns`。
    ///
    /// - `mode` 检查的是 **已暂存** 的值（`IfHasValue` 看 `self[column]`，不看新值）；
    /// - `only_values` 额外要求新值本身被 `is_value` 视为有值；
    /// - 被采纳的新值会把它引用的视图折叠进 `withs`。
    pub(crate) fn merge<K, V>(
        &mut self,
        columns: impl IntoIterator<Item = (K, V)>,
        mode: SetMode,
        only_values: bool,
        is_value: &dyn Fn(Option<&ValueSource>) -> bool,
        withs: &mut Withs,
    ) where
        K: Into<String>,
        V: Into<ValueSource>,
    {
        for (column, value) in columns {
            let column = column.into();
            let staged = self.get(&column);
            let accepted = match mode {
                SetMode::Always => true,
                SetMode::IfSet => staged.is_some(),
                SetMode::IfNotSet => staged.is_none(),
                SetMode::IfHasValue => is_value(staged),
                SetMode::IfHasNoValue => !is_value(staged),
            };
            if !accepted {
                continue;
            }
            let value = value.into();
            if only_values && !is_value(Some(&value)) {
                continue;
            }
            withs.add_from(&value);
            self.insert(column, value);
        }
    }
}

impl<K: Into<String>, V: Into<ValueSource>> FromIterator<(K, V)> for Assignments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut sets = Assignments::new();
        for (k, v) in iter {
            sets.insert(k, v);
        }
        sets
    }
}
