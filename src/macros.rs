//! 宏集合：各语句 builder 共享的方法实现，以及构造 `列名 => 表达式` 列表的 `columns!`。
//!
//! 内部宏要求 builder 具备字段 `compiler: Rc<dyn SqlCompiler>`、`data`（带 `withs` /
//! `customization`，按需带 `sets` / `where_`）与 `cache: Option<(String, Vec<Param>)>`。

/// 构造 `Vec<(String, ValueSource)>`，供 `set` / `select` 系列方法使用。
///
/// ```ignore
/// builder.set(columns! { "name" => "Ann", "age" => people.column("age", ValueType::Int).add(1) });
/// ```
#[macro_export]
macro_rules! columns {
    () => {
        Vec::<(String, $crate::expr::ValueSource)>::new()
    };
    ($($name:expr => $value:expr),+ $(,)?) => {
        vec![$((::std::string::String::from($name), $crate::expr::ValueSource::from($value))),+]
    };
}
pub use crate::columns;

/// `query` / `params` / `customize_query` / 缓存失效。`$build` 是 `SqlCompiler` 上对应的编译入口。
macro_rules! impl_query_methods {
    ($builder:ty, $build:ident) => {
        impl $builder {
            fn compiled(&mut self) -> $crate::error::QueryResult<&(String, Vec<$crate::value::Param>)> {
                let compiled = match self.cache.take() {
                    Some(compiled) => compiled,
                    None => {
                        let mut params = Vec::new();
                        let sql = self.compiler.$build(&self.data, &mut params)?;
                        tracing::trace!(params = params.len(), "compiled {sql}");
                        (sql, params)
                    }
                };
                let compiled: &(String, Vec<$crate::value::Param>) = self.cache.insert(compiled);
                Ok(compiled)
            }

            /// 编译后的 SQL；状态未变时直接返回缓存。
            pub fn query(&mut self) -> $crate::error::QueryResult<&str> {
                Ok(self.compiled()?.0.as_str())
            }

            /// 与 `query()` 占位符一一对应的参数列表。
            pub fn params(&mut self) -> $crate::error::QueryResult<&[$crate::value::Param]> {
                Ok(self.compiled()?.1.as_slice())
            }

            /// 挂载定制片段；片段中引用的视图会加入 `with`。
            pub fn customize_query(&mut self, customization: $crate::customization::Customization) -> &mut Self {
                self.data.withs.add_from_customization(&customization);
                self.data.customization = Some(customization);
                self.cache = None;
                self
            }

            fn execution_name(&self) -> Option<String> {
                self.data
                    .customization
                    .as_ref()
                    .and_then(|c| c.name())
                    .map(str::to_string)
            }

            fn prepare(&mut self) -> $crate::error::QueryResult<(String, Vec<$crate::value::Param>)> {
                self.compiled().cloned()
            }
        }
    };
}
pub(crate) use impl_query_methods;

/// `where_` / `and` / `or` / `dynamic_where`。
macro_rules! impl_where_methods {
    ($builder:ty) => {
        impl $builder {
            fn check_condition(
                condition: impl Into<$crate::expr::ValueSource>,
            ) -> $crate::error::QueryResult<$crate::expr::ValueSource> {
                let condition = condition.into();
                if !condition.is_boolean() {
                    return Err($crate::error::QueryError::IllegalState(
                        "the condition is not a boolean expression",
                    ));
                }
                Ok(condition)
            }

            /// 设置条件；已有条件时必须改用 `and` / `or`。
            pub fn where_(
                &mut self,
                condition: impl Into<$crate::expr::ValueSource>,
            ) -> $crate::error::QueryResult<&mut Self> {
                self.cache = None;
                if self.data.where_.is_some() {
                    return Err($crate::error::QueryError::IllegalState(
                        "where already set, use and / or to extend it",
                    ));
                }
                let condition = Self::check_condition(condition)?;
                self.data.withs.add_from(&condition);
                self.data.where_ = Some(condition);
                Ok(self)
            }

            /// 以 `and` 追加条件；还没有条件时等价于 `where_`。
            pub fn and(
                &mut self,
                condition: impl Into<$crate::expr::ValueSource>,
            ) -> $crate::error::QueryResult<&mut Self> {
                let condition = Self::check_condition(condition)?;
                self.data.withs.add_from(&condition);
                self.data.where_ = Some(match self.data.where_.take() {
                    Some(current) => current.and(condition),
                    None => condition,
                });
                self.cache = None;
                Ok(self)
            }

            pub fn or(
                &mut self,
                condition: impl Into<$crate::expr::ValueSource>,
            ) -> $crate::error::QueryResult<&mut Self> {
                let condition = Self::check_condition(condition)?;
                self.data.withs.add_from(&condition);
                self.data.where_ = Some(match self.data.where_.take() {
                    Some(current) => current.or(condition),
                    None => condition,
                });
                self.cache = None;
                Ok(self)
            }

            /// 标记条件部分会被动态拼装，强制下一次 `query()` 重新编译。
            pub fn dynamic_where(&mut self) -> &mut Self {
                self.cache = None;
                self
            }
        }
    };
}
pub(crate) use impl_where_methods;

/// set 系列与 ignore 系列方法（UPDATE / INSERT）。
///
/// 可选的 `$on_set` 在每次 set 系列调用前执行，INSERT 用它丢弃 `values` 给出的多行。
macro_rules! impl_set_methods {
    ($builder:ty $(, $on_set:ident)?) => {
        impl $builder {
            fn merge_sets<K, V>(
                &mut self,
                columns: impl IntoIterator<Item = (K, V)>,
                mode: $crate::assignments::SetMode,
                only_values: bool,
            ) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                $(self.$on_set();)?
                let compiler = &self.compiler;
                self.data.sets.merge(
                    columns,
                    mode,
                    only_values,
                    &|v: Option<&$crate::expr::ValueSource>| compiler.is_value_source(v),
                    &mut self.data.withs,
                );
                self.cache = None;
                self
            }

            fn is_staged_value(&self, column: &str) -> bool {
                self.compiler.is_value_source(self.data.sets.get(column))
            }

            pub fn set<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::Always, false)
            }

            /// 只写入新值 “有值” 的列。
            pub fn set_if_value<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::Always, true)
            }

            /// 只覆盖已经设置过的列。
            pub fn set_if_set<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfSet, false)
            }

            pub fn set_if_set_if_value<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfSet, true)
            }

            /// 只写入尚未设置的列。
            pub fn set_if_not_set<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfNotSet, false)
            }

            pub fn set_if_not_set_if_value<K, V>(
                &mut self,
                columns: impl IntoIterator<Item = (K, V)>,
            ) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfNotSet, true)
            }

            /// 只覆盖当前暂存值 “有值” 的列（判定的是已暂存的值）。
            pub fn set_if_has_value<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfHasValue, false)
            }

            pub fn set_if_has_value_if_value<K, V>(
                &mut self,
                columns: impl IntoIterator<Item = (K, V)>,
            ) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfHasValue, true)
            }

            /// 只覆盖当前暂存值 “无值”（含未设置）的列。
            pub fn set_if_has_no_value<K, V>(&mut self, columns: impl IntoIterator<Item = (K, V)>) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfHasNoValue, false)
            }

            pub fn set_if_has_no_value_if_value<K, V>(
                &mut self,
                columns: impl IntoIterator<Item = (K, V)>,
            ) -> &mut Self
            where
                K: Into<String>,
                V: Into<$crate::expr::ValueSource>,
            {
                self.merge_sets(columns, $crate::assignments::SetMode::IfHasNoValue, true)
            }

            pub fn ignore_if_set<S: AsRef<str>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
                for column in columns {
                    self.data.sets.remove(column.as_ref());
                }
                self.cache = None;
                self
            }

            pub fn ignore_if_has_value<S: AsRef<str>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
                for column in columns {
                    let column = column.as_ref();
                    if self.is_staged_value(column) {
                        self.data.sets.remove(column);
                    }
                }
                self.cache = None;
                self
            }

            pub fn ignore_if_has_no_value<S: AsRef<str>>(
                &mut self,
                columns: impl IntoIterator<Item = S>,
            ) -> &mut Self {
                for column in columns {
                    let column = column.as_ref();
                    if !self.is_staged_value(column) {
                        self.data.sets.remove(column);
                    }
                }
                self.cache = None;
                self
            }

            /// 去掉所有暂存值 “无值” 的列。
            pub fn ignore_any_set_with_no_value(&mut self) -> &mut Self {
                let compiler = &self.compiler;
                self.data.sets.retain(|_, v| compiler.is_value_source(Some(v)));
                self.cache = None;
                self
            }

            /// 标记赋值部分会被动态拼装，强制下一次 `query()` 重新编译。
            pub fn dynamic_set(&mut self) -> &mut Self {
                self.cache = None;
                self
            }

            /// 当前暂存的赋值。
            pub fn sets(&self) -> &$crate::assignments::Assignments {
                &self.data.sets
            }
        }
    };
}
pub(crate) use impl_set_methods;
