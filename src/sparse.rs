//! Presence-aware updates.
//!
//! Every update path in the service only writes the columns a caller actually
//! supplied; everything else keeps its stored value.

use serde::{Deserialize, Deserializer};
use sqlx::{sqlite::Sqlite, Encode, QueryBuilder, SqliteConnection, Type};

/// A single updatable field: either left alone or set to a new value.
///
/// A missing key and an explicit `null` both deserialize to `Unchanged`, so
/// the update path can never clear a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<T> {
    Unchanged,
    Set(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unchanged
    }
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Unchanged => None,
            Field::Set(v) => Some(v),
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Field::Set(v),
            None => Field::Unchanged,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(d).map(Field::from)
    }
}

/// `UPDATE <table> SET ... WHERE id = ?` over the supplied fields only.
pub struct SparseUpdate<'args> {
    query: QueryBuilder<'args, Sqlite>,
    assigned: usize,
}

impl<'args> SparseUpdate<'args> {
    pub fn new(table: &str) -> Self {
        Self {
            query: QueryBuilder::new(format!("UPDATE {table} SET ")),
            assigned: 0,
        }
    }

    pub fn set<T>(mut self, column: &str, field: Field<T>) -> Self
    where
        T: 'args + Encode<'args, Sqlite> + Type<Sqlite> + Send,
    {
        if let Field::Set(value) = field {
            if self.assigned > 0 {
                self.query.push(", ");
            }
            self.query.push(column).push(" = ").push_bind(value);
            self.assigned += 1;
        }
        self
    }

    pub fn assigned(&self) -> usize {
        self.assigned
    }

    /// Returns the number of rows matched. With nothing assigned the
    /// statement degenerates to `SET id = id`, which still reports whether
    /// the row exists.
    pub async fn execute(
        mut self,
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<u64, sqlx::Error> {
        if self.assigned() == 0 {
            self.query.push("id = id");
        }
        self.query.push(" WHERE id = ").push_bind(id);
        let res = self.query.build().execute(conn).await?;
        Ok(res.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::memory_db;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default)]
        name: Field<String>,
        #[serde(default)]
        years: Field<i64>,
    }

    #[test]
    fn missing_and_null_are_unchanged() {
        let p: Patch = serde_json::from_str(r#"{"name": null}"#).unwrap();
        assert_eq!(p.name, Field::Unchanged);
        assert_eq!(p.years, Field::Unchanged);

        let p: Patch = serde_json::from_str(r#"{"years": 4}"#).unwrap();
        assert_eq!(p.years, Field::Set(4));
        assert!(!p.name.is_set());
    }

    #[test]
    fn option_conversions() {
        assert_eq!(Field::from(Some(5)), Field::Set(5));
        assert_eq!(Field::<i64>::from(None), Field::Unchanged);
        assert_eq!(Field::Set(2).into_option(), Some(2));
        assert_eq!(Field::<i64>::Unchanged.into_option(), None);
    }

    async fn seed_skill(conn: &mut SqliteConnection) -> i64 {
        sqlx::query(
            "INSERT INTO users (first_name, last_name, email) \
             VALUES ('Ada', 'Lovelace', 'ada@example.com')",
        )
        .execute(&mut *conn)
        .await
        .unwrap();
        sqlx::query("INSERT INTO skills (user_id, description, years) VALUES (1, 'rust', 3)")
            .execute(&mut *conn)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    async fn read_skill(conn: &mut SqliteConnection, id: i64) -> (String, i64) {
        sqlx::query_as("SELECT description, years FROM skills WHERE id = ?")
            .bind(id)
            .fetch_one(conn)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn empty_update_leaves_row_untouched() {
        let db = memory_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = seed_skill(&mut conn).await;

        let rows = SparseUpdate::new("skills")
            .set("description", Field::<String>::Unchanged)
            .set("years", Field::<i64>::Unchanged)
            .execute(&mut conn, id)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        assert_eq!(read_skill(&mut conn, id).await, ("rust".to_string(), 3));
    }

    #[tokio::test]
    async fn single_field_update_changes_only_that_field() {
        let db = memory_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let id = seed_skill(&mut conn).await;

        let update = SparseUpdate::new("skills")
            .set("description", Field::<String>::Unchanged)
            .set("years", Field::Set(7_i64));
        assert_eq!(update.assigned(), 1);
        update.execute(&mut conn, id).await.unwrap();

        assert_eq!(read_skill(&mut conn, id).await, ("rust".to_string(), 7));
    }

    #[tokio::test]
    async fn missing_row_reports_zero() {
        let db = memory_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let rows = SparseUpdate::new("skills")
            .set("years", Field::Set(1_i64))
            .execute(&mut conn, 404)
            .await
            .unwrap();
        assert_eq!(rows, 0);
    }
}
