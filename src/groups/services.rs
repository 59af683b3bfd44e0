use sqlx::SqliteConnection;
use tracing::{debug, info, warn};

use crate::db::{finish_single, is_rejected_row, Database};
use crate::error::ServiceResult;
use crate::groups::dto::NewGroup;
use crate::groups::repo;
use crate::groups::repo_types::{Group, GroupPatch, GroupWithMembers};

/// Insert the group and enrol its admin as the first member.
pub async fn create_group(db: &Database, group: NewGroup) -> ServiceResult<Option<i64>> {
    debug!(admin_id = group.admin_id, name = %group.name, "create_group");
    db.run(async {
        let mut tx = db.pool().begin().await?;

        let id = match repo::insert_group(&mut *tx, &group).await {
            Ok(id) => id,
            Err(e) if is_rejected_row(&e) => {
                warn!(error = %e, admin_id = group.admin_id, "group rejected");
                tx.rollback().await?;
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if repo::insert_membership(&mut *tx, group.admin_id, id).await? != 1 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        info!(group_id = id, admin_id = group.admin_id, "group created");
        Ok(Some(id))
    })
    .await
}

/// Add a membership. Joining twice, or joining a group that does not exist,
/// reports `false` and changes nothing.
pub async fn join_group(db: &Database, user_id: i64, group_id: i64) -> ServiceResult<bool> {
    debug!(user_id, group_id, "join_group");
    db.run(async {
        let mut tx = db.pool().begin().await?;

        if repo::group_ids_for_user(&mut *tx, user_id)
            .await?
            .contains(&group_id)
        {
            warn!(user_id, group_id, "already a member");
            tx.rollback().await?;
            return Ok(false);
        }

        if repo::find_group(&mut *tx, group_id).await?.is_none() {
            warn!(user_id, group_id, "join on missing group");
            tx.rollback().await?;
            return Ok(false);
        }

        // OR IGNORE closes the window between the check above and a
        // concurrent join of the same pair.
        let rows = match repo::insert_membership(&mut *tx, user_id, group_id).await {
            Ok(rows) => rows,
            Err(e) if is_rejected_row(&e) => {
                warn!(error = %e, user_id, group_id, "membership rejected");
                0
            }
            Err(e) => return Err(e.into()),
        };
        let joined = finish_single(tx, rows).await?;
        if joined {
            info!(user_id, group_id, "joined group");
        }
        Ok(joined)
    })
    .await
}

pub async fn leave_group(db: &Database, user_id: i64, group_id: i64) -> ServiceResult<bool> {
    debug!(user_id, group_id, "leave_group");
    db.run(async {
        let mut tx = db.pool().begin().await?;
        let rows = repo::delete_membership(&mut *tx, user_id, group_id).await?;
        let left = finish_single(tx, rows).await?;
        if left {
            info!(user_id, group_id, "left group");
        } else {
            warn!(user_id, group_id, "leave without membership");
        }
        Ok(left)
    })
    .await
}

pub async fn delete_group(db: &Database, id: i64) -> ServiceResult<bool> {
    debug!(group_id = id, "delete_group");
    db.run(async {
        let mut tx = db.pool().begin().await?;
        if !delete_group_cascade(&mut *tx, id).await? {
            warn!(group_id = id, "delete_group aborted");
            tx.rollback().await?;
            return Ok(false);
        }
        tx.commit().await?;
        info!(group_id = id, "group deleted");
        Ok(true)
    })
    .await
}

/// Remove every membership one by one, then the group row. Runs on the
/// caller's transaction; `false` means the caller must roll back.
pub(crate) async fn delete_group_cascade(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<bool, sqlx::Error> {
    for user_id in repo::member_ids(&mut *conn, id).await? {
        if repo::delete_membership(&mut *conn, user_id, id).await? != 1 {
            warn!(group_id = id, user_id, "membership vanished during delete");
            return Ok(false);
        }
    }
    Ok(repo::delete_group(&mut *conn, id).await? == 1)
}

/// Sparse update of name, description and admin. A new admin is enrolled as
/// a member if it was not one already. Ownership is checked by the caller.
pub async fn update_group(db: &Database, id: i64, patch: GroupPatch) -> ServiceResult<bool> {
    debug!(group_id = id, "update_group");
    let new_admin = patch.admin_id.into_option();
    db.run(async {
        let mut tx = db.pool().begin().await?;

        let rows = match repo::update_group(&mut *tx, id, patch).await {
            Ok(rows) => rows,
            Err(e) if is_rejected_row(&e) => {
                warn!(error = %e, group_id = id, "group update rejected");
                0
            }
            Err(e) => return Err(e.into()),
        };
        if rows != 1 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(admin) = new_admin {
            repo::insert_membership(&mut *tx, admin, id).await?;
        }

        tx.commit().await?;
        info!(group_id = id, "group updated");
        Ok(true)
    })
    .await
}

pub async fn list_groups(db: &Database) -> ServiceResult<Vec<Group>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::list_groups(&mut conn).await?)
    })
    .await
}

pub async fn get_group(db: &Database, id: i64) -> ServiceResult<Option<GroupWithMembers>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        let Some(group) = repo::find_group(&mut conn, id).await? else {
            return Ok(None);
        };
        let members = repo::members(&mut conn, id).await?;
        Ok(Some(GroupWithMembers { group, members }))
    })
    .await
}

pub async fn groups_for_user(db: &Database, user_id: i64) -> ServiceResult<Vec<Group>> {
    db.run(async {
        let mut conn = db.pool().acquire().await?;
        Ok(repo::groups_for_user(&mut conn, user_id).await?)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::Field;
    use crate::test_support::{abort_on, admin, count, memory_db, rows, user};

    fn eng(admin_id: i64) -> NewGroup {
        NewGroup {
            admin_id,
            name: "Eng".into(),
            description: "engineering".into(),
        }
    }

    async fn memberships(db: &Database, group_id: i64) -> i64 {
        count(db, "SELECT COUNT(*) FROM users_groups WHERE group_id = ?", group_id).await
    }

    #[tokio::test]
    async fn group_lifecycle_with_two_members() {
        let db = memory_db().await;
        let boss = admin(&db, "boss").await;
        let dev = user(&db, "dev").await;

        let gid = create_group(&db, eng(boss)).await.unwrap().unwrap();
        let group = get_group(&db, gid).await.unwrap().unwrap();
        assert_eq!(group.group.admin_id, boss);
        assert_eq!(group.group.description, "engineering");
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].user_id, boss);

        assert!(join_group(&db, dev, gid).await.unwrap());
        assert_eq!(memberships(&db, gid).await, 2);

        assert!(delete_group(&db, gid).await.unwrap());
        assert_eq!(memberships(&db, gid).await, 0);
        assert!(get_group(&db, gid).await.unwrap().is_none());

        assert!(!join_group(&db, boss, gid).await.unwrap());
        assert!(!join_group(&db, dev, gid).await.unwrap());
        assert_eq!(memberships(&db, gid).await, 0);
    }

    #[tokio::test]
    async fn second_join_fails_and_keeps_single_membership() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;
        let joiner = user(&db, "joiner").await;
        let gid = create_group(&db, eng(owner)).await.unwrap().unwrap();

        assert!(join_group(&db, joiner, gid).await.unwrap());
        assert!(!join_group(&db, joiner, gid).await.unwrap());

        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users_groups WHERE user_id = ? AND group_id = ?")
                .bind(joiner)
                .bind(gid)
                .fetch_one(db.pool())
                .await
                .unwrap();
        assert_eq!(n, 1);
    }

    #[tokio::test]
    async fn creator_join_is_duplicate() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;
        let gid = create_group(&db, eng(owner)).await.unwrap().unwrap();
        assert!(!join_group(&db, owner, gid).await.unwrap());
    }

    #[tokio::test]
    async fn join_by_missing_user_is_false() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;
        let gid = create_group(&db, eng(owner)).await.unwrap().unwrap();
        assert!(!join_group(&db, 9999, gid).await.unwrap());
        assert_eq!(memberships(&db, gid).await, 1);
    }

    #[tokio::test]
    async fn create_with_missing_admin_is_none() {
        let db = memory_db().await;
        assert!(create_group(&db, eng(77)).await.unwrap().is_none());
        assert!(list_groups(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn leave_requires_membership() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;
        let other = user(&db, "other").await;
        let gid = create_group(&db, eng(owner)).await.unwrap().unwrap();

        assert!(!leave_group(&db, other, gid).await.unwrap());
        assert!(join_group(&db, other, gid).await.unwrap());
        assert!(leave_group(&db, other, gid).await.unwrap());
        assert!(groups_for_user(&db, other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_is_sparse() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;
        let gid = create_group(&db, eng(owner)).await.unwrap().unwrap();

        let patch = GroupPatch {
            description: Field::Set("platform engineering".into()),
            ..Default::default()
        };
        assert!(update_group(&db, gid, patch).await.unwrap());
        let g = get_group(&db, gid).await.unwrap().unwrap().group;
        assert_eq!(g.name, "Eng");
        assert_eq!(g.description, "platform engineering");
        assert_eq!(g.admin_id, owner);

        assert!(update_group(&db, gid, GroupPatch::default()).await.unwrap());
        assert!(!update_group(&db, 999, GroupPatch::default()).await.unwrap());
    }

    #[tokio::test]
    async fn new_admin_becomes_member() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;
        let heir = user(&db, "heir").await;
        let gid = create_group(&db, eng(owner)).await.unwrap().unwrap();

        let patch = GroupPatch {
            admin_id: Field::Set(heir),
            ..Default::default()
        };
        assert!(update_group(&db, gid, patch).await.unwrap());
        let g = get_group(&db, gid).await.unwrap().unwrap();
        assert_eq!(g.group.admin_id, heir);
        assert!(g.members.iter().any(|m| m.user_id == heir));

        let dangling = GroupPatch {
            admin_id: Field::Set(12345),
            ..Default::default()
        };
        assert!(!update_group(&db, gid, dangling).await.unwrap());
        assert_eq!(get_group(&db, gid).await.unwrap().unwrap().group.admin_id, heir);
    }

    #[tokio::test]
    async fn delete_missing_group_is_false() {
        let db = memory_db().await;
        assert!(!delete_group(&db, 31337).await.unwrap());
    }

    #[tokio::test]
    async fn failed_group_row_delete_keeps_memberships() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;
        let dev = user(&db, "dev").await;
        let gid = create_group(&db, eng(owner)).await.unwrap().unwrap();
        assert!(join_group(&db, dev, gid).await.unwrap());

        abort_on(&db, "keep_groups", "BEFORE DELETE ON interest_groups").await;

        assert!(delete_group(&db, gid).await.is_err());
        assert_eq!(memberships(&db, gid).await, 2);
        assert!(get_group(&db, gid).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn failed_admin_enrolment_leaves_no_group() {
        let db = memory_db().await;
        let owner = user(&db, "owner").await;

        abort_on(&db, "no_members", "BEFORE INSERT ON users_groups").await;

        assert!(create_group(&db, eng(owner)).await.is_err());
        assert_eq!(rows(&db, "interest_groups").await, 0);
        assert_eq!(rows(&db, "users_groups").await, 0);
    }
}
