//! Customization：在固定挂点向生成的 SQL 注入额外片段。

use crate::expr::ValueSource;
use std::collections::HashMap;

/// 片段挂点。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    /// 整条语句（含 `with`）之前。
    BeforeQuery,
    /// 语句关键字（`update` / `delete` / `insert` / `select`）之后。
    AfterKeyword,
    /// 整条语句之后。
    AfterQuery,
}

impl HookPoint {
    pub const ALL: [HookPoint; 3] = [Self::BeforeQuery, Self::AfterKeyword, Self::AfterQuery];
}

#[derive(Debug, Clone, Default)]
pub struct Customization {
    hooks: HashMap<HookPoint, Vec<ValueSource>>,
    execution_name: Option<String>,
}

impl Customization {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hook(mut self, point: HookPoint, fragment: impl Into<ValueSource>) -> Self {
        self.hooks.entry(point).or_default().push(fragment.into());
        self
    }

    pub fn before_query(self, fragment: impl Into<ValueSource>) -> Self {
        self.hook(HookPoint::BeforeQuery, fragment)
    }

    pub fn after_keyword(self, fragment: impl Into<ValueSource>) -> Self {
        self.hook(HookPoint::AfterKeyword, fragment)
    }

    pub fn after_query(self, fragment: impl Into<ValueSource>) -> Self {
        self.hook(HookPoint::AfterQuery, fragment)
    }

    /// 执行日志里使用的语句名。
    pub fn execution_name(mut self, name: impl Into<String>) -> Self {
        self.execution_name = Some(name.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.execution_name.as_deref()
    }

    pub fn at(&self, point: HookPoint) -> &[ValueSource] {
        self.hooks.get(&point).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// 按挂点顺序遍历全部片段。
    pub fn fragments(&self) -> impl Iterator<Item = &ValueSource> {
        HookPoint::ALL.into_iter().flat_map(move |p| self.at(p).iter())
    }
}
