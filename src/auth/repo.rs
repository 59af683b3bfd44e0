use sqlx::SqliteConnection;

use crate::auth::repo_types::{Account, Credential, CredentialPatch};
use crate::sparse::SparseUpdate;

impl Credential {
    /// Every credential row carrying this username.
    pub async fn find_by_username(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<Vec<Credential>, sqlx::Error> {
        sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, user_id, username, password_hash
            FROM credentials
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_all(conn)
        .await
    }

    pub async fn find_by_user(
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> Result<Option<Credential>, sqlx::Error> {
        sqlx::query_as::<_, Credential>(
            r#"
            SELECT id, user_id, username, password_hash
            FROM credentials
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        user_id: i64,
        username: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let res = sqlx::query(
            r#"
            INSERT INTO credentials (user_id, username, password_hash)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(password_hash)
        .execute(conn)
        .await?;
        Ok(res.last_insert_rowid())
    }

    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        patch: CredentialPatch,
    ) -> Result<u64, sqlx::Error> {
        SparseUpdate::new("credentials")
            .set("username", patch.username)
            .set("password_hash", patch.password_hash)
            .execute(conn, id)
            .await
    }

    pub async fn delete_by_user(
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let res = sqlx::query("DELETE FROM credentials WHERE user_id = ?")
            .bind(user_id)
            .execute(conn)
            .await?;
        Ok(res.rows_affected())
    }
}

impl Account {
    pub async fn find(
        conn: &mut SqliteConnection,
        user_id: i64,
    ) -> Result<Option<Account>, sqlx::Error> {
        sqlx::query_as::<_, Account>(
            r#"
            SELECT c.user_id, c.username, u.suspended, (a.user_id IS NOT NULL) AS is_admin
              FROM credentials c
              JOIN users u ON u.id = c.user_id
              LEFT JOIN admins a ON a.user_id = c.user_id
             WHERE c.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(conn)
        .await
    }
}

// ---- Admin markers ----

pub async fn admin_exists(conn: &mut SqliteConnection, user_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM admins WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// Returns 1 when the marker was added, 0 when it already existed.
pub async fn insert_admin(conn: &mut SqliteConnection, user_id: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("INSERT OR IGNORE INTO admins (user_id) VALUES (?)")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete_admin(conn: &mut SqliteConnection, user_id: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM admins WHERE user_id = ?")
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}
