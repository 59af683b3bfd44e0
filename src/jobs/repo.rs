use sqlx::{sqlite::Sqlite, QueryBuilder, SqliteConnection};

use crate::jobs::dto::{NewCompany, NewJob, SearchMode};
use crate::jobs::repo_types::{Company, Job, JobPatch};
use crate::sparse::SparseUpdate;

const JOB_COLUMNS: &str = "id, company_id, title, description";

pub async fn insert_job(conn: &mut SqliteConnection, job: &NewJob) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO jobs (company_id, title, description) VALUES (?, ?, ?)")
        .bind(job.company_id)
        .bind(&job.title)
        .bind(&job.description)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn find_job(conn: &mut SqliteConnection, id: i64) -> Result<Option<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn list_jobs(conn: &mut SqliteConnection) -> Result<Vec<Job>, sqlx::Error> {
    sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs ORDER BY id DESC"))
        .fetch_all(conn)
        .await
}

/// `%` and `_` in user input match literally.
pub fn like_pattern(keywords: &str) -> String {
    let mut escaped = String::with_capacity(keywords.len() + 2);
    escaped.push('%');
    for c in keywords.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Substring match of the whole phrase against title and description.
pub async fn search_jobs(
    conn: &mut SqliteConnection,
    keywords: &str,
    mode: SearchMode,
) -> Result<Vec<Job>, sqlx::Error> {
    let pattern = like_pattern(keywords);
    let joiner = match mode {
        SearchMode::Any => " OR ",
        SearchMode::All => " AND ",
    };

    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE "));
    qb.push("title LIKE ")
        .push_bind(pattern.clone())
        .push(" ESCAPE '\\'")
        .push(joiner)
        .push("description LIKE ")
        .push_bind(pattern)
        .push(" ESCAPE '\\'")
        .push(" ORDER BY id DESC");

    qb.build_query_as::<Job>().fetch_all(conn).await
}

pub async fn update_job(
    conn: &mut SqliteConnection,
    id: i64,
    patch: JobPatch,
) -> Result<u64, sqlx::Error> {
    SparseUpdate::new("jobs")
        .set("company_id", patch.company_id)
        .set("title", patch.title)
        .set("description", patch.description)
        .execute(conn, id)
        .await
}

pub async fn delete_job(conn: &mut SqliteConnection, id: i64) -> Result<u64, sqlx::Error> {
    let res = sqlx::query("DELETE FROM jobs WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

// ---- Companies ----

pub async fn insert_company(
    conn: &mut SqliteConnection,
    company: &NewCompany,
) -> Result<i64, sqlx::Error> {
    let res = sqlx::query("INSERT INTO companies (name) VALUES (?)")
        .bind(&company.name)
        .execute(conn)
        .await?;
    Ok(res.last_insert_rowid())
}

pub async fn list_companies(conn: &mut SqliteConnection) -> Result<Vec<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>("SELECT id, name FROM companies ORDER BY name, id")
        .fetch_all(conn)
        .await
}

pub async fn find_company(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Company>, sqlx::Error> {
    sqlx::query_as::<_, Company>("SELECT id, name FROM companies WHERE id = ?")
        .bind(id)
        .fetch_optional(conn)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%"), "%100\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\"), "%c:\\\\%");
    }
}
