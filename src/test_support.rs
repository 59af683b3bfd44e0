use std::{str::FromStr, time::Duration};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::db::Database;
use crate::users::dto::Registration;
use crate::users::services::{register, RegisterOutcome};

/// Fresh in-memory database with the schema applied.
///
/// A single long-lived connection: every new in-memory connection would see
/// an empty database of its own.
pub async fn memory_db() -> Database {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .expect("memory url")
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("open in-memory sqlite");
    let db = Database::from_pool(pool, Duration::from_secs(5));
    db.migrate().await.expect("migrations");
    db
}

/// File-backed database that several connections can share.
pub async fn file_db() -> Database {
    let path = std::env::temp_dir().join(format!("careerhub-test-{}.db", uuid::Uuid::new_v4()));
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("open file sqlite");
    let db = Database::from_pool(pool, Duration::from_secs(10));
    db.migrate().await.expect("migrations");
    db
}

pub fn registration(username: &str, password: &str) -> Registration {
    Registration {
        username: username.to_string(),
        password: password.to_string(),
        first_name: "Test".into(),
        last_name: username.to_string(),
        email: format!("{username}@example.com"),
        city: Some("Phoenix".into()),
        state: Some("AZ".into()),
        birthday: None,
        tagline: None,
        photo: None,
    }
}

/// Register a user and return its id.
pub async fn user(db: &Database, username: &str) -> i64 {
    match register(db, registration(username, "pw")).await.expect("register") {
        RegisterOutcome::Created(id) => id,
        other => panic!("expected Created, got {other:?}"),
    }
}

pub async fn admin(db: &Database, username: &str) -> i64 {
    let id = user(db, username).await;
    assert!(crate::auth::services::grant_admin(db, id).await.expect("grant admin"));
    id
}

pub async fn count(db: &Database, sql: &str, id: i64) -> i64 {
    let (n,): (i64,) = sqlx::query_as(sql)
        .bind(id)
        .fetch_one(db.pool())
        .await
        .expect("count query");
    n
}

/// Row count of a whole table.
pub async fn rows(db: &Database, table: &str) -> i64 {
    let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("count query");
    n
}

/// Install a trigger that aborts the given statement kind, e.g.
/// `"BEFORE DELETE ON interest_groups"`.
pub async fn abort_on(db: &Database, name: &str, event: &str) {
    sqlx::query(&format!(
        "CREATE TRIGGER {name} {event} BEGIN SELECT RAISE(ABORT, 'forced'); END;"
    ))
    .execute(db.pool())
    .await
    .expect("create trigger");
}
