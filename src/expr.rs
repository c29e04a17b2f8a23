//! ValueSource：不可变、可组合的值表达式树。
//!
//! 节点通过 `Rc` 共享，身份即引用身份；builder 只持有引用，从不修改节点。
//! 组合出来的节点，其可空性是所有操作数可空性的并集。

use crate::cte::WithView;
use crate::table::TableOrView;
use crate::value::SqlValue;
use std::rc::Rc;

/// 声明的值类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Boolean,
    Int,
    Double,
    String,
    Bytes,
    DateTime,
    Unknown,
}

impl ValueType {
    fn of(value: &SqlValue) -> Self {
        match value {
            SqlValue::Null => Self::Unknown,
            SqlValue::Bool(_) => Self::Boolean,
            SqlValue::I64(_) | SqlValue::U64(_) => Self::Int,
            SqlValue::F64(_) => Self::Double,
            SqlValue::String(_) => Self::String,
            SqlValue::Bytes(_) => Self::Bytes,
            SqlValue::DateTime(_) => Self::DateTime,
        }
    }
}

/// 可空性标记。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Optionality {
    #[default]
    Required,
    Optional,
}

impl Optionality {
    /// 并集：任一为 `Optional` 则结果为 `Optional`。
    pub fn union(self, other: Optionality) -> Optionality {
        match (self, other) {
            (Self::Required, Self::Required) => Self::Required,
            _ => Self::Optional,
        }
    }
}

/// 布尔节点的子类型：普通布尔，或在比较值缺失时整体被忽略的 “if value” 条件。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BooleanKind {
    Boolean,
    IfValue,
}

impl BooleanKind {
    fn merge(self, other: BooleanKind) -> BooleanKind {
        match (self, other) {
            (Self::Boolean, Self::Boolean) => Self::Boolean,
            _ => Self::IfValue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Equals,
    NotEquals,
    LessThan,
    LessOrEquals,
    GreaterThan,
    GreaterOrEquals,
}

impl CompareOp {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::LessThan => "<",
            Self::LessOrEquals => "<=",
            Self::GreaterThan => ">",
            Self::GreaterOrEquals => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
}

impl ArithmeticOp {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    pub(crate) fn as_sql(self) -> &'static str {
        match self {
            Self::And => " and ",
            Self::Or => " or ",
        }
    }
}

/// SQL 片段的组成部分：原样文本或嵌套表达式。
#[derive(Debug, Clone)]
pub enum FragmentPart {
    Sql(String),
    Value(ValueSource),
}

impl FragmentPart {
    pub fn sql(sql: impl Into<String>) -> Self {
        Self::Sql(sql.into())
    }
}

impl From<&str> for FragmentPart {
    fn from(sql: &str) -> Self {
        Self::Sql(sql.to_string())
    }
}

impl From<ValueSource> for FragmentPart {
    fn from(v: ValueSource) -> Self {
        Self::Value(v)
    }
}

impl From<&ValueSource> for FragmentPart {
    fn from(v: &ValueSource) -> Self {
        Self::Value(v.clone())
    }
}

#[derive(Debug)]
pub(crate) enum Node {
    Column {
        source: TableOrView,
        name: String,
    },
    Value(SqlValue),
    Constant(bool),
    Compare {
        op: CompareOp,
        left: ValueSource,
        right: ValueSource,
    },
    NullCheck {
        operand: ValueSource,
        negated: bool,
    },
    Logical {
        op: Logic,
        operands: Vec<ValueSource>,
    },
    Not(ValueSource),
    Arithmetic {
        op: ArithmeticOp,
        left: ValueSource,
        right: ValueSource,
    },
    Fragment(Vec<FragmentPart>),
}

#[derive(Debug)]
struct Inner {
    node: Node,
    value_type: ValueType,
    optionality: Optionality,
    boolean_kind: Option<BooleanKind>,
}

/// 表达式树节点句柄。`clone` 共享同一节点（同一身份）。
#[derive(Debug, Clone)]
pub struct ValueSource(Rc<Inner>);

impl ValueSource {
    fn new(
        node: Node,
        value_type: ValueType,
        optionality: Optionality,
        boolean_kind: Option<BooleanKind>,
    ) -> Self {
        Self(Rc::new(Inner {
            node,
            value_type,
            optionality,
            boolean_kind,
        }))
    }

    pub(crate) fn column(
        source: TableOrView,
        name: impl Into<String>,
        value_type: ValueType,
        optionality: Optionality,
    ) -> Self {
        let boolean_kind = (value_type == ValueType::Boolean).then_some(BooleanKind::Boolean);
        Self::new(
            Node::Column {
                source,
                name: name.into(),
            },
            value_type,
            optionality,
            boolean_kind,
        )
    }

    /// 绑定值（编译时成为参数占位符）。`NULL` 被标记为可空。
    pub fn value(v: impl Into<SqlValue>) -> Self {
        let v = v.into();
        let optionality = if v.is_null() {
            Optionality::Optional
        } else {
            Optionality::Required
        };
        let value_type = ValueType::of(&v);
        let boolean_kind = (value_type == ValueType::Boolean).then_some(BooleanKind::Boolean);
        Self::new(Node::Value(v), value_type, optionality, boolean_kind)
    }

    /// 可空的绑定值，即使当前值不为 `NULL`。
    pub fn optional_value(v: impl Into<SqlValue>) -> Self {
        let v = v.into();
        let value_type = ValueType::of(&v);
        let boolean_kind = (value_type == ValueType::Boolean).then_some(BooleanKind::Boolean);
        Self::new(Node::Value(v), value_type, Optionality::Optional, boolean_kind)
    }

    /// 恒真 / 恒假条件。
    pub fn constant(b: bool) -> Self {
        Self::new(
            Node::Constant(b),
            ValueType::Boolean,
            Optionality::Required,
            Some(BooleanKind::Boolean),
        )
    }

    /// 原样 SQL 与嵌套表达式交错组成的片段。
    pub fn fragment(parts: impl IntoIterator<Item = FragmentPart>, value_type: ValueType) -> Self {
        let parts: Vec<FragmentPart> = parts.into_iter().collect();
        let optionality = parts
            .iter()
            .filter_map(|p| match p {
                FragmentPart::Value(v) => Some(v.optionality()),
                FragmentPart::Sql(_) => None,
            })
            .fold(Optionality::Required, Optionality::union);
        let boolean_kind = (value_type == ValueType::Boolean).then_some(BooleanKind::Boolean);
        Self::new(Node::Fragment(parts), value_type, optionality, boolean_kind)
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0.node
    }

    pub fn value_type(&self) -> ValueType {
        self.0.value_type
    }

    pub fn optionality(&self) -> Optionality {
        self.0.optionality
    }

    pub fn is_optional(&self) -> bool {
        self.0.optionality == Optionality::Optional
    }

    pub fn boolean_kind(&self) -> Option<BooleanKind> {
        self.0.boolean_kind
    }

    pub fn is_boolean(&self) -> bool {
        self.0.boolean_kind.is_some()
    }

    /// 绑定值节点里的字面量。
    pub fn literal(&self) -> Option<&SqlValue> {
        match &self.0.node {
            Node::Value(v) => Some(v),
            _ => None,
        }
    }

    /// 列名（仅列节点）。
    pub fn column_name(&self) -> Option<&str> {
        match &self.0.node {
            Node::Column { name, .. } => Some(name),
            _ => None,
        }
    }

    /// 表达式的来源表 / 视图：列节点取自身，其它节点取第一个有来源的操作数。
    pub fn source(&self) -> Option<&TableOrView> {
        match &self.0.node {
            Node::Column { source, .. } => Some(source),
            Node::Value(_) | Node::Constant(_) => None,
            Node::Compare { left, right, .. } | Node::Arithmetic { left, right, .. } => {
                left.source().or_else(|| right.source())
            }
            Node::NullCheck { operand, .. } | Node::Not(operand) => operand.source(),
            Node::Logical { operands, .. } => operands.iter().find_map(|o| o.source()),
            Node::Fragment(parts) => parts.iter().find_map(|p| match p {
                FragmentPart::Value(v) => v.source(),
                FragmentPart::Sql(_) => None,
            }),
        }
    }

    /// 引用身份相等。
    pub fn ptr_eq(&self, other: &ValueSource) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn compare_with(&self, op: CompareOp, other: ValueSource, kind: BooleanKind) -> ValueSource {
        let optionality = self.optionality().union(other.optionality());
        Self::new(
            Node::Compare {
                op,
                left: self.clone(),
                right: other,
            },
            ValueType::Boolean,
            optionality,
            Some(kind),
        )
    }

    pub fn compare(&self, op: CompareOp, other: impl Into<ValueSource>) -> ValueSource {
        self.compare_with(op, other.into(), BooleanKind::Boolean)
    }

    /// 比较值不被当前方言视为 “有值” 时，整个条件在编译时被忽略。
    pub fn compare_if_value(&self, op: CompareOp, other: impl Into<ValueSource>) -> ValueSource {
        self.compare_with(op, other.into(), BooleanKind::IfValue)
    }

    pub fn equals(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare(CompareOp::Equals, other)
    }

    pub fn not_equals(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare(CompareOp::NotEquals, other)
    }

    pub fn less_than(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare(CompareOp::LessThan, other)
    }

    pub fn less_or_equals(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare(CompareOp::LessOrEquals, other)
    }

    pub fn greater_than(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare(CompareOp::GreaterThan, other)
    }

    pub fn greater_or_equals(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare(CompareOp::GreaterOrEquals, other)
    }

    pub fn equals_if_value(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare_if_value(CompareOp::Equals, other)
    }

    pub fn not_equals_if_value(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare_if_value(CompareOp::NotEquals, other)
    }

    pub fn less_than_if_value(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare_if_value(CompareOp::LessThan, other)
    }

    pub fn greater_than_if_value(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.compare_if_value(CompareOp::GreaterThan, other)
    }

    pub fn is_null(&self) -> ValueSource {
        self.null_check(false)
    }

    pub fn is_not_null(&self) -> ValueSource {
        self.null_check(true)
    }

    fn null_check(&self, negated: bool) -> ValueSource {
        Self::new(
            Node::NullCheck {
                operand: self.clone(),
                negated,
            },
            ValueType::Boolean,
            Optionality::Required,
            Some(BooleanKind::Boolean),
        )
    }

    fn logical(&self, op: Logic, other: ValueSource) -> ValueSource {
        let mut operands = match &self.0.node {
            Node::Logical { op: own, operands } if *own == op => operands.clone(),
            _ => vec![self.clone()],
        };
        operands.push(other.clone());
        let kind = self
            .boolean_kind()
            .unwrap_or(BooleanKind::Boolean)
            .merge(other.boolean_kind().unwrap_or(BooleanKind::Boolean));
        Self::new(
            Node::Logical { op, operands },
            ValueType::Boolean,
            self.optionality().union(other.optionality()),
            Some(kind),
        )
    }

    pub fn and(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.logical(Logic::And, other.into())
    }

    pub fn or(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.logical(Logic::Or, other.into())
    }

    pub fn negate(&self) -> ValueSource {
        Self::new(
            Node::Not(self.clone()),
            ValueType::Boolean,
            self.optionality(),
            self.boolean_kind().or(Some(BooleanKind::Boolean)),
        )
    }

    fn arithmetic(&self, op: ArithmeticOp, other: ValueSource) -> ValueSource {
        let optionality = self.optionality().union(other.optionality());
        Self::new(
            Node::Arithmetic {
                op,
                left: self.clone(),
                right: other,
            },
            self.value_type(),
            optionality,
            None,
        )
    }

    pub fn add(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.arithmetic(ArithmeticOp::Add, other.into())
    }

    pub fn subtract(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.arithmetic(ArithmeticOp::Subtract, other.into())
    }

    pub fn multiply(&self, other: impl Into<ValueSource>) -> ValueSource {
        self.arithmetic(ArithmeticOp::Multiply, other.into())
    }

    /// 深度优先访问表达式中直接引用的 CTE 视图（可能重复）。
    pub(crate) fn visit_views(&self, f: &mut dyn FnMut(&WithView)) {
        match &self.0.node {
            Node::Column { source, .. } => {
                if let Some(view) = source.as_view() {
                    f(view);
                }
            }
            Node::Value(_) | Node::Constant(_) => {}
            Node::Compare { left, right, .. } | Node::Arithmetic { left, right, .. } => {
                left.visit_views(f);
                right.visit_views(f);
            }
            Node::NullCheck { operand, .. } | Node::Not(operand) => operand.visit_views(f),
            Node::Logical { operands, .. } => {
                for o in operands {
                    o.visit_views(f);
                }
            }
            Node::Fragment(parts) => {
                for p in parts {
                    if let FragmentPart::Value(v) = p {
                        v.visit_views(f);
                    }
                }
            }
        }
    }
}

impl From<&ValueSource> for ValueSource {
    fn from(v: &ValueSource) -> Self {
        v.clone()
    }
}

impl From<SqlValue> for ValueSource {
    fn from(v: SqlValue) -> Self {
        Self::value(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for ValueSource {
    fn from(v: Option<T>) -> Self {
        Self::optional_value(SqlValue::from_option(v))
    }
}

macro_rules! value_source_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ValueSource {
                fn from(v: $ty) -> Self {
                    Self::value(v)
                }
            }
        )*
    };
}

value_source_from!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    &'static str,
    Vec<u8>,
    time::OffsetDateTime,
);
