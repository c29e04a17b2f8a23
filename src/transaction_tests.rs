#[cfg(test)]
mod tests {
    use crate::{
        Connection, DatabaseType, MockQueryRunner, MockResult, MockRunnerConfig, QueryError, QueryRunner,
        QueryType, Table, ValueType, columns, execute_combined, execute_in_transaction, execute_in_transaction_all,
    };
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Calls = Rc<RefCell<Vec<QueryType>>>;

    /// 记录调用类别；`failing` 中的类别返回驱动错误。
    fn runner(failing: &'static [QueryType]) -> (Rc<MockQueryRunner>, Calls) {
        let calls: Calls = Rc::default();
        let log = calls.clone();
        let runner = MockQueryRunner::with_config(
            move |query_type, _, _, _| {
                log.borrow_mut().push(query_type);
                if failing.contains(&query_type) {
                    return Err(QueryError::driver(format!("{query_type} failed")));
                }
                Ok(MockResult::Count(1))
            },
            MockRunnerConfig {
                database: Some(DatabaseType::PostgreSql),
            },
        );
        (Rc::new(runner), calls)
    }

    #[tokio::test]
    async fn successful_work_is_committed() {
        let (runner, calls) = runner(&[]);
        let conn = Connection::new(runner.clone());
        let users = Table::new("users");
        let mut ub = conn.update_allowing_no_where(&users);
        ub.set(columns! { "level" => 1_i64 });

        let updated = execute_in_transaction(&*runner, move || async move {
            ub.execute_update(None, None).await
        })
        .await
        .unwrap();

        assert_eq!(updated, 1);
        assert_eq!(
            *calls.borrow(),
            vec![QueryType::BeginTransaction, QueryType::Update, QueryType::Commit]
        );
        assert!(!runner.is_transaction_active());
    }

    #[tokio::test]
    async fn failing_work_is_rolled_back() {
        let (runner, calls) = runner(&[QueryType::Update]);
        let conn = Connection::new(runner.clone());
        let users = Table::new("users");
        let mut ub = conn.update_allowing_no_where(&users);
        ub.set(columns! { "level" => 1_i64 });

        let err = execute_in_transaction(&*runner, move || async move {
            ub.execute_update(None, None).await
        })
        .await
        .unwrap_err();

        assert_eq!(err.root_cause().to_string(), "update failed");
        assert_eq!(
            *calls.borrow(),
            vec![QueryType::BeginTransaction, QueryType::Update, QueryType::Rollback]
        );
    }

    #[tokio::test]
    async fn rollback_failure_keeps_the_original_error() {
        let (runner, calls) = runner(&[QueryType::Rollback]);

        let err = execute_in_transaction(&*runner, || async {
            Err::<(), _>(QueryError::IllegalState("work failed"))
        })
        .await
        .unwrap_err();

        assert!(matches!(err, QueryError::IllegalState("work failed")));
        assert_eq!(*calls.borrow(), vec![QueryType::BeginTransaction, QueryType::Rollback]);
        assert!(!runner.is_transaction_active());
    }

    #[tokio::test]
    async fn failed_begin_skips_the_work() {
        let (runner, calls) = runner(&[QueryType::BeginTransaction]);
        let ran = Rc::new(RefCell::new(false));
        let flag = ran.clone();

        let result = execute_in_transaction(&*runner, move || async move {
            *flag.borrow_mut() = true;
            Ok(())
        })
        .await;

        assert!(result.is_err());
        assert!(!*ran.borrow());
        assert_eq!(*calls.borrow(), vec![QueryType::BeginTransaction]);
    }

    #[tokio::test]
    async fn parallel_work_returns_results_in_order() {
        let (runner, calls) = runner(&[]);
        let conn = Connection::new(runner.clone());
        let users = Table::new("users");
        let id = users.column("id", ValueType::Int);

        let mut first = conn.update(&users);
        first.set(columns! { "level" => 1_i64 }).where_(id.equals(1_i64)).unwrap();
        let mut second = conn.update(&users);
        second.set(columns! { "level" => 2_i64 }).where_(id.equals(2_i64)).unwrap();

        let futures = [first.execute_update(None, None), second.execute_update(None, None)];
        let results = execute_in_transaction_all(&*runner, || futures).await.unwrap();

        assert_eq!(results, vec![1, 1]);
        assert_eq!(
            *calls.borrow(),
            vec![
                QueryType::BeginTransaction,
                QueryType::Update,
                QueryType::Update,
                QueryType::Commit,
            ]
        );
    }

    #[tokio::test]
    async fn parallel_failure_rolls_back() {
        let (runner, calls) = runner(&[QueryType::Delete]);
        let conn = Connection::new(runner.clone());
        let users = Table::new("users");
        let mut first = conn.delete_allowing_no_where_from(&users);
        let mut second = conn.delete_allowing_no_where_from(&users);

        let futures = [first.execute_delete(None, None), second.execute_delete(None, None)];
        let err = execute_in_transaction_all(&*runner, || futures).await.unwrap_err();

        assert!(matches!(err.root_cause(), QueryError::Driver(_)));
        assert_eq!(calls.borrow().last(), Some(&QueryType::Rollback));
        assert!(!calls.borrow().contains(&QueryType::Commit));
    }

    #[tokio::test]
    async fn combined_runs_in_sequence() {
        let (runner, calls) = runner(&[]);
        let conn = Connection::new(runner.clone());
        let users = Table::new("users");
        let mut ub = conn.update_allowing_no_where(&users);
        ub.set(columns! { "level" => 1_i64 });
        let mut db = conn.delete_allowing_no_where_from(&users);

        let (updated, deleted) = execute_combined(
            move || async move { ub.execute_update(None, None).await },
            move || async move { db.execute_delete(None, None).await },
        )
        .await
        .unwrap();

        assert_eq!((updated, deleted), (1, 1));
        assert_eq!(*calls.borrow(), vec![QueryType::Update, QueryType::Delete]);
    }

    #[tokio::test]
    async fn connection_transaction_uses_its_runner() {
        let (runner, calls) = runner(&[]);
        let conn = Connection::new(runner.clone());

        let value = conn.transaction(|| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(*calls.borrow(), vec![QueryType::BeginTransaction, QueryType::Commit]);

        conn.begin_transaction().await.unwrap();
        assert!(conn.is_transaction_active());
        conn.rollback().await.unwrap();
        assert!(!conn.is_transaction_active());
        assert!(matches!(conn.commit().await, Err(QueryError::TransactionNotActive)));
    }
}
