//! Authorization checks. Every check takes the acting user explicitly and
//! fails closed: a store error reads as "no".

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::auth::password::verify_password;
use crate::auth::repo::{admin_exists, insert_admin};
use crate::auth::repo_types::{Account, Credential};
use crate::db::Database;
use crate::error::ServiceResult;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// The credential for `username` if exactly one row carries it and the
/// password verifies.
pub async fn authenticate(db: &Database, username: &str, password: &str) -> Option<Credential> {
    debug!(username, "authenticate");
    let lookup = db
        .run(async {
            let mut conn = db.pool().acquire().await?;
            Ok(Credential::find_by_username(&mut conn, username).await?)
        })
        .await;

    let mut rows = match lookup {
        Ok(rows) => rows,
        Err(e) => {
            error!(error = %e, username, "credential lookup failed");
            return None;
        }
    };
    if rows.len() != 1 {
        warn!(username, matches = rows.len(), "login unknown or ambiguous username");
        return None;
    }
    let credential = rows.remove(0);
    if !verify_password(password, &credential.password_hash) {
        warn!(username, user_id = credential.user_id, "login invalid password");
        return None;
    }
    Some(credential)
}

pub async fn is_admin(db: &Database, user_id: i64) -> bool {
    let res = db
        .run(async {
            let mut conn = db.pool().acquire().await?;
            Ok(admin_exists(&mut conn, user_id).await?)
        })
        .await;
    match res {
        Ok(admin) => admin,
        Err(e) => {
            error!(error = %e, user_id, "admin lookup failed");
            false
        }
    }
}

pub async fn account(db: &Database, user_id: i64) -> ServiceResult<Option<Account>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(Account::find(&mut conn, user_id).await?)
    })
    .await
}

/// Users edit themselves; admins edit anyone.
pub async fn can_edit_user(db: &Database, target: i64, requester: i64) -> bool {
    requester == target || is_admin(db, requester).await
}

/// Suspension is an admin action that never applies to oneself.
pub async fn can_moderate_user(db: &Database, target: i64, requester: i64) -> bool {
    target != requester && is_admin(db, requester).await
}

/// Deletion is never allowed on oneself, even for admins.
pub async fn can_delete_user(db: &Database, target: i64, requester: i64) -> bool {
    target != requester && can_edit_user(db, target, requester).await
}

/// Mark the user as administrator. `false` when it already was one.
pub async fn grant_admin(db: &Database, user_id: i64) -> ServiceResult<bool> {
    db.run(async {
        let mut tx = db.pool().begin().await?;
        let added = insert_admin(&mut *tx, user_id).await? == 1;
        tx.commit().await?;
        if added {
            info!(user_id, "admin granted");
        }
        Ok(added)
    })
    .await
}
