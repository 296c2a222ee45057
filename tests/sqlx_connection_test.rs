//! Transaction handling of the sqlx-backed connection on in-memory SQLite

use recordhaus::prelude::*;
use recordhaus::store_object::Transaction;

async fn connect() -> SqlxConnection {
    let config = DatabaseConfig::new("sqlite::memory:".to_string(), 5, 5);
    let mut conn = SqlxConnection::connect(&config)
        .await
        .expect("in-memory SQLite must be available");
    conn.execute("CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)")
        .await
        .unwrap();
    conn
}

async fn note_count(conn: &mut SqlxConnection) -> i64 {
    let rows = conn.fetch("SELECT COUNT(*) AS n FROM notes").await.unwrap();
    rows[0]["n"].as_i64().unwrap()
}

#[tokio::test]
async fn test_reports_sqlite_dialect() {
    let conn = connect().await;
    assert_eq!(conn.dialect(), Dialect::Sqlite);
    assert!(!conn.in_transaction());
    assert!(!conn.is_lost());
}

#[tokio::test]
async fn test_nested_begin_is_rejected() {
    let mut conn = connect().await;
    conn.begin_transaction().await.unwrap();
    assert!(matches!(
        conn.begin_transaction().await,
        Err(StorehausError::TransactionActive)
    ));

    // the open transaction is unaffected
    assert!(conn.in_transaction());
    conn.execute("INSERT INTO notes (body) VALUES ('kept')").await.unwrap();
    conn.commit().await.unwrap();
    assert!(!conn.in_transaction());
    assert_eq!(note_count(&mut conn).await, 1);
}

#[tokio::test]
async fn test_commit_and_rollback_need_a_transaction() {
    let mut conn = connect().await;
    assert!(matches!(conn.commit().await, Err(StorehausError::NoTransaction)));
    assert!(matches!(conn.rollback().await, Err(StorehausError::NoTransaction)));
    assert!(!conn.is_lost());
}

#[tokio::test]
async fn test_rollback_discards_writes() {
    let mut conn = connect().await;
    conn.begin_transaction().await.unwrap();
    conn.execute("INSERT INTO notes (body) VALUES ('gone')").await.unwrap();
    assert_eq!(conn.last_insert_id(), Some(1));
    conn.rollback().await.unwrap();

    assert!(!conn.in_transaction());
    assert_eq!(note_count(&mut conn).await, 0);
}

#[tokio::test]
async fn test_failed_batch_rolls_back_and_reports_index() {
    let mut conn = connect().await;
    let statements = vec![
        "INSERT INTO notes (body) VALUES ('first')".to_string(),
        "INSERT INTO missing_table (body) VALUES ('second')".to_string(),
        "INSERT INTO notes (body) VALUES ('third')".to_string(),
    ];

    match conn.execute_batch(&statements).await {
        Err(StorehausError::MultiQueryFailed { index, source }) => {
            assert_eq!(index, 1);
            assert!(matches!(*source, StorehausError::QueryFailed { .. }));
        }
        other => panic!("expected a batch failure, got {:?}", other),
    }
    assert!(!conn.in_transaction());
    assert_eq!(note_count(&mut conn).await, 0);
}

#[tokio::test]
async fn test_successful_batch_commits() {
    let mut conn = connect().await;
    let statements = vec![
        "INSERT INTO notes (body) VALUES ('one')".to_string(),
        "INSERT INTO notes (body) VALUES ('two')".to_string(),
    ];
    conn.execute_batch(&statements).await.unwrap();
    assert!(!conn.in_transaction());
    assert_eq!(note_count(&mut conn).await, 2);
}

#[tokio::test]
async fn test_transaction_guard() {
    let mut conn = connect().await;

    let mut tx = Transaction::begin(&mut conn).await.unwrap();
    tx.as_mut()
        .execute("INSERT INTO notes (body) VALUES ('committed')")
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut tx = Transaction::begin(&mut conn).await.unwrap();
    tx.as_mut()
        .execute("INSERT INTO notes (body) VALUES ('rolled back')")
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let rows = conn.fetch("SELECT body FROM notes").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["body"], SqlValue::from("committed"));
}

#[tokio::test]
async fn test_failed_statement_keeps_connection_usable() {
    let mut conn = connect().await;
    let err = conn.execute("INSERT INTO notes (nope) VALUES (1)").await.unwrap_err();
    assert!(matches!(err, StorehausError::QueryFailed { .. }));
    assert!(!conn.is_lost());
    conn.execute("INSERT INTO notes (body) VALUES ('after')").await.unwrap();
    assert_eq!(note_count(&mut conn).await, 1);
}

#[tokio::test]
async fn test_failed_commit_marks_connection_lost() {
    let mut conn = connect().await;
    conn.execute("PRAGMA foreign_keys = ON").await.unwrap();
    conn.execute("CREATE TABLE parents (id INTEGER PRIMARY KEY)").await.unwrap();
    conn.execute(
        "CREATE TABLE kids (id INTEGER PRIMARY KEY, \
         parent_id INTEGER REFERENCES parents (id) DEFERRABLE INITIALLY DEFERRED)",
    )
    .await
    .unwrap();

    conn.begin_transaction().await.unwrap();
    // checked only at COMMIT
    conn.execute("INSERT INTO kids (parent_id) VALUES (99)").await.unwrap();
    assert!(conn.commit().await.is_err());

    assert!(conn.is_lost());
    assert!(!conn.in_transaction());
    assert!(matches!(
        conn.fetch("SELECT 1").await,
        Err(StorehausError::NotConnected)
    ));
}
