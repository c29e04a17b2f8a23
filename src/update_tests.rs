#[cfg(test)]
mod tests {
    use crate::{
        Connection, CompileError, CompilerConfig, Customization, DatabaseType, DefaultSqlCompiler,
        DeleteData, FragmentPart, InsertData, MockQueryRunner, MockResult, MockRunnerConfig,
        NoopQueryRunner, Param, QueryError, QueryRunner, QueryType, SelectData, SqlCompiler,
        SqlValue, Table, UpdateData, ValueSource, ValueType, columns,
    };
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn connection(database: DatabaseType) -> Connection {
        Connection::new(Rc::new(NoopQueryRunner::with_database(database)))
    }

    fn mock(database: DatabaseType, affected: u64) -> (Rc<MockQueryRunner>, Connection) {
        let runner = Rc::new(MockQueryRunner::with_config(
            move |_, _, _, _| Ok(MockResult::Count(affected)),
            MockRunnerConfig {
                database: Some(database),
            },
        ));
        let conn = Connection::new(runner.clone());
        (runner, conn)
    }

    /// 统计 `build_update` 调用次数的编译器。
    struct CountingCompiler {
        inner: DefaultSqlCompiler,
        builds: Cell<usize>,
    }

    impl SqlCompiler for CountingCompiler {
        fn query_runner(&self) -> &Rc<dyn QueryRunner> {
            self.inner.query_runner()
        }

        fn is_value(&self, value: &SqlValue) -> bool {
            self.inner.is_value(value)
        }

        fn build_update(&self, update: &UpdateData, params: &mut Vec<Param>) -> Result<String, CompileError> {
            self.builds.set(self.builds.get() + 1);
            self.inner.build_update(update, params)
        }

        fn build_delete(&self, delete: &DeleteData, params: &mut Vec<Param>) -> Result<String, CompileError> {
            self.inner.build_delete(delete, params)
        }

        fn build_insert(&self, insert: &InsertData, params: &mut Vec<Param>) -> Result<String, CompileError> {
            self.inner.build_insert(insert, params)
        }

        fn build_select(&self, select: &SelectData, params: &mut Vec<Param>) -> Result<String, CompileError> {
            self.inner.build_select(select, params)
        }

        fn build_procedure_call(
            &self,
            name: &str,
            args: &[ValueSource],
            params: &mut Vec<Param>,
        ) -> Result<String, CompileError> {
            self.inner.build_procedure_call(name, args, params)
        }

        fn build_function_call(
            &self,
            name: &str,
            args: &[ValueSource],
            params: &mut Vec<Param>,
        ) -> Result<String, CompileError> {
            self.inner.build_function_call(name, args, params)
        }
    }

    #[test]
    fn update_basic_set_where() {
        let conn = connection(DatabaseType::PostgreSql);
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = conn.update(&users);
        ub.set(columns! { "name" => "Ann", "level" => 10_i64 })
            .where_(id.equals(1234_i64))
            .unwrap();

        assert_eq!(
            ub.query().unwrap(),
            "update users set name = $1, level = $2 where id = $3"
        );
        assert_eq!(
            ub.params().unwrap(),
            &[
                Param::Value(SqlValue::from("Ann")),
                Param::Value(SqlValue::I64(10)),
                Param::Value(SqlValue::I64(1234)),
            ]
        );
    }

    #[test]
    fn later_set_overwrites_in_place() {
        let conn = connection(DatabaseType::MySql);
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = conn.update(&users);
        ub.set(columns! { "name" => "Ann", "level" => 1_i64 })
            .set(columns! { "name" => "Bob" })
            .where_(id.equals(1_i64))
            .unwrap();

        assert_eq!(ub.query().unwrap(), "update users set name = ?, level = ? where id = ?");
        assert_eq!(ub.params().unwrap()[0], Param::Value(SqlValue::from("Bob")));
    }

    #[test]
    fn set_then_ignore_no_value_matches_set_if_value() {
        for database in [DatabaseType::PostgreSql, DatabaseType::Oracle] {
            let conn = connection(database);
            let users = Table::new("users");
            let id = users.column("id", ValueType::Int);
            let values = || {
                columns! {
                    "name" => "Ann",
                    "nickname" => "",
                    "email" => None::<&'static str>,
                    "level" => 3_i64,
                }
            };

            let mut a = conn.update(&users);
            a.set(values()).ignore_any_set_with_no_value().where_(id.equals(1_i64)).unwrap();
            let mut b = conn.update(&users);
            b.set_if_value(values()).where_(id.equals(1_i64)).unwrap();

            assert_eq!(a.query().unwrap(), b.query().unwrap());
            assert_eq!(a.params().unwrap(), b.params().unwrap());
            assert!(!a.sets().contains("email"));
        }
    }

    #[test]
    fn empty_string_is_not_a_value_on_oracle() {
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = connection(DatabaseType::Oracle).update(&users);
        ub.set_if_value(columns! { "name" => "", "level" => 1_i64 })
            .where_(id.equals(1_i64))
            .unwrap();
        assert_eq!(ub.query().unwrap(), "update users set level = :0 where id = :1");

        let mut ub = connection(DatabaseType::Sqlite).update(&users);
        ub.set_if_value(columns! { "name" => "", "level" => 1_i64 })
            .where_(id.equals(1_i64))
            .unwrap();
        assert_eq!(ub.query().unwrap(), "update users set name = ?, level = ? where id = ?");
    }

    #[test]
    fn empty_string_config_disables_values() {
        let runner: Rc<dyn QueryRunner> = Rc::new(NoopQueryRunner::with_database(DatabaseType::PostgreSql));
        let compiler = DefaultSqlCompiler::with_config(
            runner,
            CompilerConfig {
                allow_empty_string: false,
            },
        );
        let conn = Connection::with_compiler(Rc::new(compiler));
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = conn.update(&users);
        ub.set_if_value(columns! { "name" => "" , "level" => 2_i64 })
            .where_(id.equals(1_i64))
            .unwrap();
        assert_eq!(ub.query().unwrap(), "update users set level = $1 where id = $2");
    }

    #[test]
    fn set_if_set_and_if_not_set() {
        let conn = connection(DatabaseType::NoopDb);
        let users = Table::new("users");

        let mut ub = conn.update_allowing_no_where(&users);
        ub.set(columns! { "name" => "Ann" })
            .set_if_set(columns! { "name" => "Bob", "level" => 1_i64 })
            .set_if_not_set(columns! { "name" => "Carl", "email" => "c@x" });

        assert_eq!(ub.query().unwrap(), "update users set name = $0, email = $1");
        assert_eq!(
            ub.params().unwrap(),
            &[
                Param::Value(SqlValue::from("Bob")),
                Param::Value(SqlValue::from("c@x")),
            ]
        );
    }

    #[test]
    fn set_if_has_value_checks_the_staged_value() {
        let conn = connection(DatabaseType::NoopDb);
        let users = Table::new("users");
        let mut ub = conn.update_allowing_no_where(&users);

        ub.set(columns! { "name" => None::<&'static str> })
            .set_if_has_value(columns! { "name" => "Bob", "level" => 1_i64 });
        assert_eq!(ub.sets().get("name").and_then(|v| v.literal()), Some(&SqlValue::Null));
        assert!(!ub.sets().contains("level"));

        // 暂存值有值时，即使新值为 NULL 也会覆盖
        ub.set(columns! { "name" => "Ann" })
            .set_if_has_value(columns! { "name" => None::<&'static str> });
        assert_eq!(ub.sets().get("name").and_then(|v| v.literal()), Some(&SqlValue::Null));

        ub.set(columns! { "name" => "Ann" })
            .set_if_has_value_if_value(columns! { "name" => None::<&'static str> });
        assert_eq!(ub.sets().get("name").and_then(|v| v.literal()), Some(&SqlValue::from("Ann")));
    }

    #[test]
    fn set_if_has_no_value_fills_missing_and_null_columns() {
        let conn = connection(DatabaseType::NoopDb);
        let users = Table::new("users");
        let mut ub = conn.update_allowing_no_where(&users);

        ub.set(columns! { "name" => "Ann", "email" => None::<&'static str> })
            .set_if_has_no_value(columns! { "name" => "Bob", "email" => "a@x", "level" => 1_i64 });

        assert_eq!(ub.query().unwrap(), "update users set name = $0, email = $1, level = $2");
        assert_eq!(
            ub.params().unwrap(),
            &[
                Param::Value(SqlValue::from("Ann")),
                Param::Value(SqlValue::from("a@x")),
                Param::Value(SqlValue::I64(1)),
            ]
        );

        ub.set_if_has_no_value_if_value(columns! { "nickname" => None::<&'static str> });
        assert!(!ub.sets().contains("nickname"));
    }

    #[test]
    fn ignore_family() {
        let conn = connection(DatabaseType::NoopDb);
        let users = Table::new("users");
        let mut ub = conn.update_allowing_no_where(&users);

        ub.set(columns! {
            "name" => "Ann",
            "email" => None::<&'static str>,
            "level" => 1_i64,
            "nickname" => None::<&'static str>,
        });
        ub.ignore_if_set(["level", "missing"]);
        assert_eq!(ub.sets().columns().collect::<Vec<_>>(), ["name", "email", "nickname"]);

        ub.ignore_if_has_value(["name", "email"]);
        assert_eq!(ub.sets().columns().collect::<Vec<_>>(), ["email", "nickname"]);

        ub.ignore_if_has_no_value(["email"]);
        assert_eq!(ub.sets().columns().collect::<Vec<_>>(), ["nickname"]);
    }

    #[test]
    fn mutations_invalidate_the_cache() {
        let runner: Rc<dyn QueryRunner> = Rc::new(NoopQueryRunner::with_database(DatabaseType::PostgreSql));
        let compiler = Rc::new(CountingCompiler {
            inner: DefaultSqlCompiler::new(runner),
            builds: Cell::new(0),
        });
        let conn = Connection::with_compiler(compiler.clone());
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = conn.update(&users);
        ub.set(columns! { "name" => "Ann" }).where_(id.equals(1_i64)).unwrap();
        ub.query().unwrap();
        ub.params().unwrap();
        ub.query().unwrap();
        assert_eq!(compiler.builds.get(), 1);

        ub.set(columns! { "level" => 2_i64 });
        assert_eq!(
            ub.query().unwrap(),
            "update users set name = $1, level = $2 where id = $3"
        );
        assert_eq!(compiler.builds.get(), 2);

        ub.dynamic_set();
        ub.query().unwrap();
        assert_eq!(compiler.builds.get(), 3);

        // 没有实际变化的调用同样使缓存失效
        ub.ignore_if_set(["missing"]);
        ub.query().unwrap();
        assert_eq!(compiler.builds.get(), 4);

        ub.customize_query(Customization::new().execution_name("rename user"));
        ub.query().unwrap();
        assert_eq!(compiler.builds.get(), 5);
    }

    #[test]
    fn rejected_where_still_invalidates_the_cache() {
        let runner: Rc<dyn QueryRunner> = Rc::new(NoopQueryRunner::with_database(DatabaseType::PostgreSql));
        let compiler = Rc::new(CountingCompiler {
            inner: DefaultSqlCompiler::new(runner),
            builds: Cell::new(0),
        });
        let conn = Connection::with_compiler(compiler.clone());
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = conn.update(&users);
        ub.set(columns! { "name" => "Ann" }).where_(id.equals(1_i64)).unwrap();
        ub.query().unwrap();
        assert_eq!(compiler.builds.get(), 1);

        assert!(ub.where_(id.equals(2_i64)).is_err());
        assert_eq!(ub.query().unwrap(), "update users set name = $1 where id = $2");
        assert_eq!(compiler.builds.get(), 2);
    }

    #[test]
    fn where_twice_is_illegal_state() {
        let conn = connection(DatabaseType::PostgreSql);
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = conn.update(&users);
        ub.set(columns! { "name" => "Ann" }).where_(id.equals(1_i64)).unwrap();
        let second = ub.where_(id.equals(2_i64)).map(|_| ());
        assert!(matches!(second, Err(QueryError::IllegalState(_))));

        // and / or 可以继续扩展
        ub.and(id.greater_than(0_i64)).unwrap().or(id.is_null()).unwrap();
        assert_eq!(
            ub.query().unwrap(),
            "update users set name = $1 where (id = $2 and id > $3) or id is null"
        );
    }

    #[test]
    fn where_rejects_non_boolean_conditions() {
        let conn = connection(DatabaseType::PostgreSql);
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut ub = conn.update(&users);
        let result = ub.where_(id.add(1_i64)).map(|_| ());
        assert!(matches!(result, Err(QueryError::IllegalState(_))));
    }

    #[test]
    fn missing_where_fails_to_compile() {
        let conn = connection(DatabaseType::PostgreSql);
        let users = Table::new("users");
        let name = users.optional_column("name", ValueType::String);

        let mut ub = conn.update(&users);
        ub.set(columns! { "name" => "Ann" });
        let err = ub.query().map(str::to_string).unwrap_err();
        assert!(matches!(
            err,
            QueryError::Compile {
                source: CompileError::MissingWhere { statement: "update", .. }
            }
        ));

        // if-value 条件全部被忽略时也算缺少条件
        ub.where_(name.equals_if_value(None::<&'static str>)).unwrap();
        assert!(ub.query().is_err());

        let mut ub = conn.update_allowing_no_where(&users);
        ub.set(columns! { "name" => "Ann" });
        assert_eq!(ub.query().unwrap(), "update users set name = $1");
    }

    #[test]
    fn arithmetic_and_customization() {
        let conn = connection(DatabaseType::PostgreSql);
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);
        let level = users.column("level", ValueType::Int);

        let mut ub = conn.update(&users);
        ub.set(columns! { "level" => level.add(1_i64).multiply(2_i64) })
            .where_(id.equals(7_i64))
            .unwrap()
            .customize_query(
                Customization::new()
                    .before_query(ValueSource::fragment([FragmentPart::sql("/* audit */")], ValueType::Unknown))
                    .after_query(ValueSource::fragment(
                        [FragmentPart::sql("returning "), FragmentPart::from(&level)],
                        ValueType::Int,
                    )),
            );

        assert_eq!(
            ub.query().unwrap(),
            "/* audit */ update users set level = (level + $1) * $2 where id = $3 returning level"
        );
    }

    #[tokio::test]
    async fn execute_with_empty_sets_skips_the_runner() {
        let (runner, conn) = mock(DatabaseType::PostgreSql, 5);
        let users = Table::new("users");

        let mut ub = conn.update(&users);
        assert_eq!(ub.execute_update(None, None).await.unwrap(), 0);

        ub.set_if_value(columns! { "name" => None::<&'static str> });
        assert_eq!(ub.execute_update(Some(1), None).await.unwrap(), 0);
        assert_eq!(runner.call_count(), 0);
    }

    #[tokio::test]
    async fn execute_checks_minimum_rows() {
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        for (affected, ok) in [(1, false), (2, true), (3, true)] {
            let (runner, conn) = mock(DatabaseType::MySql, affected);
            let mut ub = conn.update(&users);
            ub.set(columns! { "name" => "Ann" }).where_(id.greater_than(1_i64)).unwrap();
            let result = ub.execute_update(Some(2), None).await;
            assert_eq!(result.is_ok(), ok, "affected = {affected}");
            if let Err(err) = result {
                assert!(err.is_row_count_violation());
                assert_eq!(
                    err.root_cause().to_string(),
                    "The update operation didn't update the minimum of 2 row(s), it affected 1"
                );
            }
            assert_eq!(runner.call_count(), 1);
        }
    }

    #[tokio::test]
    async fn execute_checks_maximum_rows() {
        let (_runner, conn) = mock(DatabaseType::MySql, 4);
        let users = Table::new("users");

        let mut ub = conn.update_allowing_no_where(&users);
        ub.set(columns! { "name" => "Ann" });
        let err = ub.execute_update(None, Some(3)).await.unwrap_err();
        assert!(matches!(
            err.root_cause(),
            QueryError::RowCount(violation) if violation.actual() == 4
        ));
        assert_eq!(ub.execute_update(Some(4), Some(4)).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn execution_errors_carry_the_call_site() {
        let runner = Rc::new(MockQueryRunner::with_config(
            |query_type, _, _, _| {
                assert_eq!(query_type, QueryType::Update);
                Err(QueryError::driver("deadlock detected"))
            },
            MockRunnerConfig {
                database: Some(DatabaseType::PostgreSql),
            },
        ));
        let conn = Connection::new(runner);
        let users = Table::new("users");

        let mut ub = conn.update_allowing_no_where(&users);
        ub.set(columns! { "name" => "Ann" });
        let err = ub.execute_update(None, None).await.unwrap_err();

        let origin = err.origin().unwrap();
        assert!(origin.file().ends_with("update_tests.rs"));
        assert!(matches!(err.root_cause(), QueryError::Driver(m) if m == "deadlock detected"));
        assert!(err.to_string().contains("query executed at"));
    }

    #[tokio::test]
    async fn compile_errors_are_reported_by_execute() {
        let (runner, conn) = mock(DatabaseType::PostgreSql, 1);
        let users = Table::new("users");

        let mut ub = conn.update(&users);
        ub.set(columns! { "name" => "Ann" });
        let err = ub.execute_update(None, None).await.unwrap_err();
        assert!(matches!(err.root_cause(), QueryError::Compile { .. }));
        assert!(err.origin().is_some());
        assert_eq!(runner.call_count(), 0);
    }
}
