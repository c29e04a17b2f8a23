#[cfg(test)]
mod tests {
    use crate::{BooleanKind, FragmentPart, Optionality, SqlValue, Table, ValueSource, ValueType};
    use pretty_assertions::assert_eq;

    #[test]
    fn optionality_is_the_union_of_operands() {
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);
        let name = users.optional_column("name", ValueType::String);

        assert_eq!(id.equals(1_i64).optionality(), Optionality::Required);
        assert_eq!(name.equals("Ann").optionality(), Optionality::Optional);
        assert_eq!(id.add(1_i64).optionality(), Optionality::Required);
        assert_eq!(id.add(None::<i64>).optionality(), Optionality::Optional);
        assert_eq!(
            id.equals(1_i64).and(name.equals("Ann")).optionality(),
            Optionality::Optional
        );
        // is null 的结果总是必填
        assert_eq!(name.is_null().optionality(), Optionality::Required);
    }

    #[test]
    fn bound_values_classify_their_type() {
        assert_eq!(ValueSource::value(1_i32).value_type(), ValueType::Int);
        assert_eq!(ValueSource::value("x").value_type(), ValueType::String);
        assert_eq!(ValueSource::value(true).boolean_kind(), Some(BooleanKind::Boolean));
        assert!(ValueSource::value(SqlValue::Null).is_optional());
        assert!(ValueSource::optional_value(5_i64).is_optional());
        assert_eq!(ValueSource::value(5_i64).literal(), Some(&SqlValue::I64(5)));
    }

    #[test]
    fn if_value_kind_propagates_through_logic() {
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);
        let name = users.optional_column("name", ValueType::String);

        let plain = id.equals(1_i64);
        let optional = name.equals_if_value(None::<&'static str>);
        assert_eq!(plain.boolean_kind(), Some(BooleanKind::Boolean));
        assert_eq!(optional.boolean_kind(), Some(BooleanKind::IfValue));
        assert_eq!(plain.and(&optional).boolean_kind(), Some(BooleanKind::IfValue));
        assert_eq!(plain.or(id.is_not_null()).boolean_kind(), Some(BooleanKind::Boolean));
        assert_eq!(optional.negate().boolean_kind(), Some(BooleanKind::IfValue));
        assert!(!id.add(1_i64).is_boolean());
    }

    #[test]
    fn identity_is_reference_identity() {
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);
        let same = id.clone();
        let twin = users.column("id", ValueType::Int);

        assert!(id.ptr_eq(&same));
        assert!(!id.ptr_eq(&twin));

        let other = Table::new("users");
        assert!(!users.ptr_eq(&other));
        assert!(users.ptr_eq(&users.clone()));
    }

    #[test]
    fn column_metadata() {
        let users = Table::new("users");
        let level = users.column("level", ValueType::Int);
        let sum = level.add(1_i64);

        assert_eq!(level.column_name(), Some("level"));
        assert_eq!(sum.column_name(), None);
        assert_eq!(sum.source().map(|s| s.name()), Some("users"));
        assert_eq!(ValueSource::constant(true).source().map(|s| s.name()), None);
    }

    #[test]
    fn fragments_collect_optionality() {
        let users = Table::new("users");
        let name = users.optional_column("name", ValueType::String);
        let fragment = ValueSource::fragment(
            [FragmentPart::sql("lower("), FragmentPart::from(&name), FragmentPart::sql(")")],
            ValueType::String,
        );
        assert!(fragment.is_optional());
        assert_eq!(fragment.source().map(|s| s.name()), Some("users"));
        assert!(!fragment.is_boolean());
    }
}
