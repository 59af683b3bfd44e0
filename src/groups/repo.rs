use sqlx::SqliteConnection;

use crate::groups::dto::NewGroup;
use crate::groups::repo_types::{Group, GroupPatch, Member};
use crate::sparse::SparseUpdate;

pub async fn insert_group(conn: &mut SqliteConnection, g: &NewGroup) -> Result<i64, sqlx::Error> {
    let res =
        sqlx::query("INSERT INTO interest_groups (admin_id, name, description) VALUES (?, ?, ?)")
            .bind(g.admin_id)
            .bind(&g.name)
            .bind(&g.description)
            .execute(conn)
            .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_group(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        "SELECT id, admin_id, name, description FROM interest_groups WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(conn)
    .await
}

pub async fn list_groups(conn: &mut SqliteConnection) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        "SELECT id, admin_id, name, description FROM interest_groups ORDER BY name, id",
    )
    .fetch_all(conn)
    .await
}

pub async fn groups_administered_by(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT id FROM interest_groups WHERE admin_id = ? ORDER BY id")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Groups the user is a member of.
pub async fn groups_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT g.id, g.admin_id, g.name, g.description
          FROM interest_groups g
          JOIN users_groups ug ON ug.group_id = g.id
         WHERE ug.user_id = ?
         ORDER BY g.name, g.id
        "#,
    )
    .bind(user_id)
    .fetch_all(conn)
    .await
}

pub async fn group_ids_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT group_id FROM users_groups WHERE user_id = ? ORDER BY group_id")
            .bind(user_id)
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn member_ids(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT user_id FROM users_groups WHERE group_id = ? ORDER BY user_id")
            .bind(group_id)
            .fetch_all(conn)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

pub async fn members(
    conn: &mut SqliteConnection,
    group_id: i64,
) -> Result<Vec<Member>, sqlx::Error> {
    sqlx::query_as::<_, Member>(
        r#"
        SELECT u.id AS user_id, u.first_name, u.last_name
          FROM users_groups ug
          JOIN users u ON u.id = ug.user_id
         WHERE ug.group_id = ?
         ORDER BY u.last_name, u.first_name, u.id
        "#,
    )
    .bind(group_id)
    .fetch_all(conn)
    .await
}

/// Returns 0 when the membership already exists.
pub async fn insert_membership(
    conn: &mut SqliteConnection,
    user_id: i64,
    group_id: i64,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("INSERT OR IGNORE INTO users_groups (user_id, group_id) VALUES (?, ?)")
        .bind(user_id)
        .bind(group_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

pub async fn delete_membership(
    conn: &mut SqliteConnection,
    user_id: i64,
    group_id: i64,
) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM users_groups WHERE user_id = ? AND group_id = ?")
        .bind(user_id)
        .bind(group_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

pub async fn update_group(
    conn: &mut SqliteConnection,
    id: i64,
    patch: GroupPatch,
) -> Result<u64, sqlx::Error> {
    SparseUpdate::new("interest_groups")
        .set("name", patch.name)
        .set("description", patch.description)
        .set("admin_id", patch.admin_id)
        .execute(conn, id)
        .await
}

pub async fn delete_group(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM interest_groups WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}
