use tracing::{debug, info, warn};

use crate::db::{finish_insert, finish_single, is_rejected_row, Database};
use crate::error::ServiceResult;
use crate::jobs::dto::{ApplyResponse, NewCompany, NewJob, SearchMode};
use crate::jobs::repo;
use crate::jobs::repo_types::{Company, Job, JobPatch};

pub async fn list_jobs(db: &Database) -> ServiceResult<Vec<Job>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::list_jobs(&mut conn).await?)
    })
    .await
}

pub async fn get_job(db: &Database, id: i64) -> ServiceResult<Option<Job>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::find_job(&mut conn, id).await?)
    })
    .await
}

/// Every posting whose title or description contains the phrase. A blank
/// phrase lists everything.
pub async fn search_jobs(
    db: &Database,
    keywords: &str,
    mode: SearchMode,
) -> ServiceResult<Vec<Job>> {
    let keywords = keywords.trim();
    debug!(keywords, ?mode, "search_jobs");
    if keywords.is_empty() {
        return list_jobs(db).await;
    }
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::search_jobs(&mut conn, keywords, mode).await?)
    })
    .await
}

/// `None` when the referenced company does not exist.
pub async fn create_job(db: &Database, job: NewJob) -> ServiceResult<Option<i64>> {
    debug!(company_id = job.company_id, title = %job.title, "create_job");
    let id = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let inserted = repo::insert_job(&mut *tx, &job).await;
            finish_insert(tx, inserted).await
        })
        .await?;
    if let Some(id) = id {
        info!(job_id = id, "job created");
    }
    Ok(id)
}

pub async fn update_job(db: &Database, id: i64, patch: JobPatch) -> ServiceResult<bool> {
    debug!(job_id = id, "update_job");
    db.run(async {
        let mut tx = db.pool().begin().await?;
        let rows = match repo::update_job(&mut *tx, id, patch).await {
            Ok(rows) => rows,
            Err(e) if is_rejected_row(&e) => {
                warn!(error = %e, job_id = id, "job update rejected");
                0
            }
            Err(e) => return Err(e.into()),
        };
        let done = finish_single(tx, rows).await?;
        if done {
            info!(job_id = id, "job updated");
        }
        Ok(done)
    })
    .await
}

pub async fn delete_job(db: &Database, id: i64) -> ServiceResult<bool> {
    debug!(job_id = id, "delete_job");
    db.run(async {
        let mut tx = db.pool().begin().await?;
        let rows = repo::delete_job(&mut *tx, id).await?;
        let done = finish_single(tx, rows).await?;
        if done {
            info!(job_id = id, "job deleted");
        }
        Ok(done)
    })
    .await
}

/// Applications are acknowledged only; nothing is recorded.
pub async fn apply_to_job(
    db: &Database,
    job_id: i64,
    user_id: i64,
) -> ServiceResult<Option<ApplyResponse>> {
    let Some(job) = get_job(db, job_id).await? else {
        warn!(job_id, user_id, "apply to missing job");
        return Ok(None);
    };
    info!(job_id, user_id, "application received");
    Ok(Some(ApplyResponse {
        job_id,
        message: format!("Your application for \"{}\" has been received.", job.title),
        title: job.title,
    }))
}

pub async fn list_companies(db: &Database) -> ServiceResult<Vec<Company>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::list_companies(&mut conn).await?)
    })
    .await
}

pub async fn get_company(db: &Database, id: i64) -> ServiceResult<Option<Company>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::find_company(&mut conn, id).await?)
    })
    .await
}

pub async fn create_company(db: &Database, company: NewCompany) -> ServiceResult<Option<i64>> {
    debug!(name = %company.name, "create_company");
    let id = db
        .run(async {
            let mut tx = db.pool().begin().await?;
            let inserted = repo::insert_company(&mut *tx, &company).await;
            finish_insert(tx, inserted).await
        })
        .await?;
    if let Some(id) = id {
        info!(company_id = id, "company created");
    }
    Ok(id)
}
