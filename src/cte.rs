//! CTE（`with`）支持：派生视图 `WithView` 与依赖收集器 `Withs`。
//!
//! 语句上挂的每个表达式、每个定制片段都会把它引用到的视图（以及视图自身的依赖）
//! 追加进 `Withs`；同一视图按引用身份去重，只会出现一次，依赖总排在使用者前面。

use crate::customization::Customization;
use crate::expr::{Optionality, ValueSource, ValueType};
use crate::select::SelectData;
use crate::table::TableOrView;
use std::rc::Rc;

#[derive(Debug)]
struct WithViewInner {
    name: String,
    query: SelectData,
}

/// 由一条 SELECT 定义的命名派生视图。克隆共享同一身份。
#[derive(Debug, Clone)]
pub struct WithView(Rc<WithViewInner>);

impl WithView {
    pub(crate) fn new(name: impl Into<String>, query: SelectData) -> Self {
        Self(Rc::new(WithViewInner {
            name: name.into(),
            query,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// 视图定义。
    pub fn query(&self) -> &SelectData {
        &self.0.query
    }

    /// 视图的一列；类型与可空性取自定义中同名（别名）的列，找不到时为 `Unknown`。
    pub fn column(&self, name: &str) -> ValueSource {
        let (value_type, optionality) = self
            .0
            .query
            .columns
            .iter()
            .find(|(alias, _)| alias == name)
            .map(|(_, v)| (v.value_type(), v.optionality()))
            .unwrap_or((ValueType::Unknown, Optionality::Required));
        ValueSource::column(
            TableOrView::View(self.clone()),
            name,
            value_type,
            optionality,
        )
    }

    pub fn ptr_eq(&self, other: &WithView) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// 有序、按身份去重的 CTE 依赖列表。
#[derive(Debug, Clone, Default)]
pub struct Withs {
    views: Vec<WithView>,
}

impl Withs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, view: &WithView) -> bool {
        self.views.iter().any(|v| v.ptr_eq(view))
    }

    /// 追加视图：先追加它的依赖，再追加它自己；已存在的跳过。
    pub fn add(&mut self, view: &WithView) {
        if self.contains(view) {
            return;
        }
        for dep in view.query().withs.iter() {
            if !self.contains(dep) {
                self.views.push(dep.clone());
            }
        }
        self.views.push(view.clone());
    }

    /// 收集表达式引用到的全部视图。
    pub fn add_from(&mut self, value: &ValueSource) {
        value.visit_views(&mut |view| self.add(view));
    }

    /// 收集定制片段引用到的全部视图。
    pub fn add_from_customization(&mut self, customization: &Customization) {
        for fragment in customization.fragments() {
            self.add_from(fragment);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &WithView> {
        self.views.iter()
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

/// 表达式中 **直接** 引用的视图（不含传递依赖），按首次出现顺序去重。
pub(crate) fn referenced_views<'a>(values: impl IntoIterator<Item = &'a ValueSource>) -> Vec<WithView> {
    let mut views: Vec<WithView> = Vec::new();
    for value in values {
        value.visit_views(&mut |view| {
            if !views.iter().any(|v| v.ptr_eq(view)) {
                views.push(view.clone());
            }
        });
    }
    views
}
