use sqlx::SqliteConnection;

use crate::sparse::SparseUpdate;
use crate::users::dto::Registration;
use crate::users::repo_types::{User, UserPatch, UserSummary};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, city, state, suspended, birthday, tagline, photo";

pub async fn insert_user(
    conn: &mut SqliteConnection,
    reg: &Registration,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query(
        r#"
        INSERT INTO users
            (first_name, last_name, email, city, state, suspended, birthday, tagline, photo)
        VALUES (?, ?, ?, ?, ?, 0, ?, ?, ?)
        "#,
    )
    .bind(&reg.first_name)
    .bind(&reg.last_name)
    .bind(&reg.email)
    .bind(&reg.city)
    .bind(&reg.state)
    .bind(&reg.birthday)
    .bind(&reg.tagline)
    .bind(&reg.photo)
    .execute(conn)
    .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_user(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn list_summaries(conn: &mut SqliteConnection) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT u.id, c.username, u.first_name, u.last_name, u.email, u.suspended,
               (a.user_id IS NOT NULL) AS is_admin
          FROM users u
          LEFT JOIN credentials c ON c.user_id = u.id
          LEFT JOIN admins a ON a.user_id = u.id
         ORDER BY u.id
        "#,
    )
    .fetch_all(conn)
    .await
}

pub async fn update_user(
    conn: &mut SqliteConnection,
    id: i64,
    patch: UserPatch,
) -> Result<u64, sqlx::Error> {
    SparseUpdate::new("users")
        .set("first_name", patch.first_name)
        .set("last_name", patch.last_name)
        .set("email", patch.email)
        .set("city", patch.city)
        .set("state", patch.state)
        .set("suspended", patch.suspended)
        .set("birthday", patch.birthday)
        .set("tagline", patch.tagline)
        .set("photo", patch.photo)
        .execute(conn, id)
        .await
}

pub async fn delete_user(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}
