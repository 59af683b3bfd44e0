use sqlx::SqliteConnection;
use tracing::{debug, error, info, warn};

use crate::auth::password::hash_password;
use crate::auth::repo::{admin_exists, delete_admin};
use crate::auth::repo_types::{Credential, CredentialPatch};
use crate::db::{is_rejected_row, is_unique_violation, Database};
use crate::error::ServiceResult;
use crate::groups::{repo as groups_repo, services::delete_group_cascade};
use crate::profile::repo as profile_repo;
use crate::sparse::Field;
use crate::users::dto::{Profile, Registration, UserUpdate};
use crate::users::repo;
use crate::users::repo_types::{User, UserPatch, UserSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created(i64),
    AlreadyExists,
    Failed,
}

/// Create the user row and its credential in one transaction.
///
/// The username pre-check is backed by the UNIQUE constraint on
/// `credentials.username`; a violation at insert time reports
/// `AlreadyExists` just like the pre-check does.
pub async fn register(db: &Database, reg: Registration) -> ServiceResult<RegisterOutcome> {
    debug!(username = %reg.username, "register");
    let hash = hash_password(&reg.password)?;

    db.run(async {
        let mut tx = db.pool().begin().await?;

        if !Credential::find_by_username(&mut *tx, &reg.username)
            .await?
            .is_empty()
        {
            warn!(username = %reg.username, "username already taken");
            tx.rollback().await?;
            return Ok(RegisterOutcome::AlreadyExists);
        }

        let user_id = match repo::insert_user(&mut *tx, &reg).await {
            Ok(id) => id,
            Err(e) if is_rejected_row(&e) => {
                warn!(error = %e, "user row rejected");
                tx.rollback().await?;
                return Ok(RegisterOutcome::Failed);
            }
            Err(e) => {
                error!(error = %e, "insert user failed");
                return Err(e.into());
            }
        };

        match Credential::create(&mut *tx, user_id, &reg.username, &hash).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                warn!(username = %reg.username, "username claimed concurrently");
                tx.rollback().await?;
                return Ok(RegisterOutcome::AlreadyExists);
            }
            Err(e) if is_rejected_row(&e) => {
                warn!(error = %e, "credential row rejected");
                tx.rollback().await?;
                return Ok(RegisterOutcome::Failed);
            }
            Err(e) => {
                error!(error = %e, "insert credential failed");
                return Err(e.into());
            }
        }

        tx.commit().await?;
        info!(user_id, username = %reg.username, "user registered");
        Ok(RegisterOutcome::Created(user_id))
    })
    .await
}

/// Sparse update of the credential and the user row. A user without a
/// credential cannot be updated.
pub async fn update_user(db: &Database, id: i64, update: UserUpdate) -> ServiceResult<bool> {
    let (username, password, patch) = update.into_parts();
    debug!(
        user_id = id,
        rename = username.is_set(),
        new_password = password.is_set(),
        "update_user"
    );
    let password_hash = match password {
        Field::Set(plain) => Field::Set(hash_password(&plain)?),
        Field::Unchanged => Field::Unchanged,
    };

    db.run(async {
        let mut tx = db.pool().begin().await?;

        let Some(credential) = Credential::find_by_user(&mut *tx, id).await? else {
            warn!(user_id = id, "update_user without credential");
            tx.rollback().await?;
            return Ok(false);
        };

        let cred_patch = CredentialPatch {
            username,
            password_hash,
        };
        match Credential::update(&mut *tx, credential.id, cred_patch).await {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                warn!(user_id = id, "new username already taken");
                tx.rollback().await?;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }

        if repo::update_user(&mut *tx, id, patch).await? != 1 {
            warn!(user_id = id, "update_user matched no user row");
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        info!(user_id = id, "user updated");
        Ok(true)
    })
    .await
}

pub async fn suspend_user(db: &Database, id: i64) -> ServiceResult<bool> {
    set_suspended(db, id, true).await
}

pub async fn unsuspend_user(db: &Database, id: i64) -> ServiceResult<bool> {
    set_suspended(db, id, false).await
}

// Only the flag column is written; credentials are never part of this path.
async fn set_suspended(db: &Database, id: i64, suspended: bool) -> ServiceResult<bool> {
    debug!(user_id = id, suspended, "set_suspended");
    db.run(async {
        let mut tx = db.pool().begin().await?;

        if repo::find_user(&mut *tx, id).await?.is_none() {
            warn!(user_id = id, "set_suspended on missing user");
            tx.rollback().await?;
            return Ok(false);
        }

        let patch = UserPatch {
            suspended: Field::Set(suspended),
            ..Default::default()
        };
        if repo::update_user(&mut *tx, id, patch).await? != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        info!(user_id = id, suspended, "suspension changed");
        Ok(true)
    })
    .await
}

/// Remove a user and everything that references it, all or nothing.
pub async fn delete_user(db: &Database, id: i64) -> ServiceResult<bool> {
    debug!(user_id = id, "delete_user");
    db.run(async {
        let mut tx = db.pool().begin().await?;
        if !delete_user_cascade(&mut *tx, id).await? {
            warn!(user_id = id, "delete_user aborted");
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        info!(user_id = id, "user deleted");
        Ok(true)
    })
    .await
}

/// The eight deletion steps, strictly in this order. Returns `false` when a
/// step finds nothing to delete where a row was required.
async fn delete_user_cascade(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
    // 1. administered groups, each with its memberships
    for group_id in groups_repo::groups_administered_by(&mut *conn, id).await? {
        if !delete_group_cascade(&mut *conn, group_id).await? {
            return Ok(false);
        }
    }
    // 2. memberships in groups run by others
    for group_id in groups_repo::group_ids_for_user(&mut *conn, id).await? {
        if groups_repo::delete_membership(&mut *conn, id, group_id).await? != 1 {
            return Ok(false);
        }
    }
    // 3. admin marker, if any
    delete_admin(&mut *conn, id).await?;
    // 4-6. profile entries
    profile_repo::delete_skills_by_user(&mut *conn, id).await?;
    profile_repo::delete_experience_by_user(&mut *conn, id).await?;
    profile_repo::delete_education_by_user(&mut *conn, id).await?;
    // 7. credential
    Credential::delete_by_user(&mut *conn, id).await?;
    // 8. the user row itself
    Ok(repo::delete_user(&mut *conn, id).await? == 1)
}

pub async fn get_user(db: &Database, id: i64) -> ServiceResult<Option<User>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::find_user(&mut conn, id).await?)
    })
    .await
}

pub async fn get_profile(db: &Database, id: i64) -> ServiceResult<Option<Profile>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        let Some(user) = repo::find_user(&mut conn, id).await? else {
            return Ok(None);
        };
        let username = Credential::find_by_user(&mut conn, id)
            .await?
            .map(|c| c.username);
        Ok(Some(Profile {
            user,
            username,
            is_admin: admin_exists(&mut conn, id).await?,
            skills: profile_repo::skills_by_user(&mut conn, id).await?,
            education: profile_repo::education_by_user(&mut conn, id).await?,
            experience: profile_repo::experience_by_user(&mut conn, id).await?,
            groups: groups_repo::groups_for_user(&mut conn, id).await?,
        }))
    })
    .await
}

pub async fn list_users(db: &Database) -> ServiceResult<Vec<UserSummary>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::list_summaries(&mut conn).await?)
    })
    .await
}
