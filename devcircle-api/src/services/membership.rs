use diesel::prelude::*;
use uuid::Uuid;

use devcircle_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Group, GroupMember, MemberRole, NewGroup, NewGroupMember};
use crate::schema::{contents, group_members, groups};

pub fn find_group(conn: &mut PgConnection, group_id: Uuid) -> AppResult<Group> {
    groups::table
        .find(group_id)
        .first::<Group>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::GroupNotFound, "group not found"))
}

pub fn find_member(
    conn: &mut PgConnection,
    group_id: Uuid,
    user_id: Uuid,
) -> AppResult<Option<GroupMember>> {
    let member = group_members::table
        .find((user_id, group_id))
        .first::<GroupMember>(conn)
        .optional()?;
    Ok(member)
}

/// Mutations that touch another member's role or membership are gated on
/// the acting user currently holding ADMIN in the group.
fn require_admin(conn: &mut PgConnection, group_id: Uuid, acting_user_id: Uuid) -> AppResult<()> {
    let member = find_member(conn, group_id, acting_user_id)?;
    match member {
        Some(m) if m.role == MemberRole::Admin.as_str() => Ok(()),
        _ => Err(AppError::new(
            ErrorCode::NotGroupAdmin,
            "only group admins can perform this action",
        )),
    }
}

/// The last admin may not walk away from a group that still has other
/// members; the sole remaining member is free to leave.
fn blocks_departure(role: &str, admin_count: i64, member_count: i64) -> bool {
    role == MemberRole::Admin.as_str() && admin_count <= 1 && member_count > 1
}

fn admin_count(conn: &mut PgConnection, group_id: Uuid) -> QueryResult<i64> {
    group_members::table
        .filter(group_members::group_id.eq(group_id))
        .filter(group_members::role.eq(MemberRole::Admin.as_str()))
        .count()
        .get_result(conn)
}

fn member_count(conn: &mut PgConnection, group_id: Uuid) -> QueryResult<i64> {
    group_members::table
        .filter(group_members::group_id.eq(group_id))
        .count()
        .get_result(conn)
}

/// Seed membership rows supplied at group creation.
#[derive(Debug, serde::Deserialize)]
pub struct SeedMember {
    pub user_id: Uuid,
    pub role: MemberRole,
}

/// Membership rows for a freshly created group: the creator always comes
/// first as ADMIN, duplicate or creator-shadowing seed entries are dropped.
fn seed_rows(author_id: Uuid, group_id: Uuid, seed_members: Vec<SeedMember>) -> Vec<NewGroupMember> {
    let mut rows: Vec<NewGroupMember> = vec![NewGroupMember {
        user_id: author_id,
        group_id,
        role: MemberRole::Admin.as_str().to_string(),
    }];
    for seed in seed_members {
        if seed.user_id == author_id {
            continue;
        }
        if rows.iter().any(|r| r.user_id == seed.user_id) {
            continue;
        }
        rows.push(NewGroupMember {
            user_id: seed.user_id,
            group_id,
            role: seed.role.as_str().to_string(),
        });
    }
    rows
}

/// Create the group and its initial membership as one unit: the creator is
/// always seeded as ADMIN and the members_count starts out equal to the
/// rows written.
pub fn create_group(
    conn: &mut PgConnection,
    new_group: NewGroup,
    seed_members: Vec<SeedMember>,
) -> AppResult<Group> {
    conn.transaction::<_, AppError, _>(|conn| {
        let group: Group = diesel::insert_into(groups::table)
            .values(&new_group)
            .get_result(conn)?;

        let rows = seed_rows(group.author_id, group.id, seed_members);

        diesel::insert_into(group_members::table)
            .values(&rows)
            .execute(conn)?;

        let group = diesel::update(groups::table.find(group.id))
            .set(groups::members_count.eq(rows.len() as i32))
            .get_result::<Group>(conn)?;

        tracing::info!(group_id = %group.id, members = rows.len(), "group created");
        Ok(group)
    })
}

pub fn update_group(
    conn: &mut PgConnection,
    group_id: Uuid,
    acting_user_id: Uuid,
    changes: crate::models::UpdateGroup,
) -> AppResult<Group> {
    find_group(conn, group_id)?;
    require_admin(conn, group_id, acting_user_id)?;

    let updated = diesel::update(groups::table.find(group_id))
        .set((&changes, groups::updated_at.eq(chrono::Utc::now())))
        .get_result::<Group>(conn)?;
    Ok(updated)
}

pub fn join_group(conn: &mut PgConnection, group_id: Uuid, user_id: Uuid) -> AppResult<GroupMember> {
    find_group(conn, group_id)?;

    conn.transaction::<_, AppError, _>(|conn| {
        if find_member(conn, group_id, user_id)?.is_some() {
            return Err(AppError::new(
                ErrorCode::AlreadyGroupMember,
                "user is already a member of this group",
            ));
        }

        let member: GroupMember = diesel::insert_into(group_members::table)
            .values(&NewGroupMember {
                user_id,
                group_id,
                role: MemberRole::User.as_str().to_string(),
            })
            .get_result(conn)?;

        diesel::update(groups::table.find(group_id))
            .set(groups::members_count.eq(groups::members_count + 1))
            .execute(conn)?;

        Ok(member)
    })
}

pub fn leave_group(conn: &mut PgConnection, group_id: Uuid, user_id: Uuid) -> AppResult<()> {
    find_group(conn, group_id)?;

    conn.transaction::<_, AppError, _>(|conn| {
        let member = find_member(conn, group_id, user_id)?.ok_or_else(|| {
            AppError::new(ErrorCode::GroupMemberNotFound, "user is not a member of this group")
        })?;

        if blocks_departure(
            &member.role,
            admin_count(conn, group_id)?,
            member_count(conn, group_id)?,
        ) {
            return Err(AppError::new(
                ErrorCode::LastAdmin,
                "assign another admin before leaving the group",
            ));
        }

        remove_membership_row(conn, group_id, user_id)
    })
}

pub fn assign_admin(
    conn: &mut PgConnection,
    group_id: Uuid,
    acting_user_id: Uuid,
    target_user_id: Uuid,
) -> AppResult<GroupMember> {
    find_group(conn, group_id)?;
    require_admin(conn, group_id, acting_user_id)?;

    let target = find_member(conn, group_id, target_user_id)?.ok_or_else(|| {
        AppError::new(ErrorCode::GroupMemberNotFound, "target user is not a member of this group")
    })?;

    if target.role == MemberRole::Admin.as_str() {
        return Err(AppError::new(
            ErrorCode::AlreadyGroupAdmin,
            "target user is already an admin",
        ));
    }

    let updated = diesel::update(group_members::table.find((target_user_id, group_id)))
        .set(group_members::role.eq(MemberRole::Admin.as_str()))
        .get_result::<GroupMember>(conn)?;
    Ok(updated)
}

pub fn remove_admin(
    conn: &mut PgConnection,
    group_id: Uuid,
    acting_user_id: Uuid,
    target_user_id: Uuid,
) -> AppResult<GroupMember> {
    find_group(conn, group_id)?;
    require_admin(conn, group_id, acting_user_id)?;

    let target = find_member(conn, group_id, target_user_id)?.ok_or_else(|| {
        AppError::new(ErrorCode::GroupMemberNotFound, "target user is not a member of this group")
    })?;

    if target.role != MemberRole::Admin.as_str() {
        return Err(AppError::new(ErrorCode::NotAnAdmin, "target user is not an admin"));
    }

    let updated = diesel::update(group_members::table.find((target_user_id, group_id)))
        .set(group_members::role.eq(MemberRole::User.as_str()))
        .get_result::<GroupMember>(conn)?;
    Ok(updated)
}

pub fn remove_member(
    conn: &mut PgConnection,
    group_id: Uuid,
    acting_user_id: Uuid,
    target_user_id: Uuid,
) -> AppResult<()> {
    find_group(conn, group_id)?;
    require_admin(conn, group_id, acting_user_id)?;

    conn.transaction::<_, AppError, _>(|conn| {
        let target = find_member(conn, group_id, target_user_id)?.ok_or_else(|| {
            AppError::new(ErrorCode::GroupMemberNotFound, "target user is not a member of this group")
        })?;

        if blocks_departure(
            &target.role,
            admin_count(conn, group_id)?,
            member_count(conn, group_id)?,
        ) {
            return Err(AppError::new(
                ErrorCode::LastAdmin,
                "assign another admin before removing this member",
            ));
        }

        remove_membership_row(conn, group_id, target_user_id)
    })
}

fn remove_membership_row(conn: &mut PgConnection, group_id: Uuid, user_id: Uuid) -> AppResult<()> {
    diesel::delete(group_members::table.find((user_id, group_id))).execute(conn)?;
    diesel::update(groups::table.find(group_id))
        .set(groups::members_count.eq(groups::members_count - 1))
        .execute(conn)?;
    Ok(())
}

/// Deleting a group is reserved for its original owner, which is stricter
/// than the admin gate. Contents are detached, memberships removed, then
/// the group row goes.
pub fn delete_group(conn: &mut PgConnection, group_id: Uuid, acting_user_id: Uuid) -> AppResult<()> {
    let group = find_group(conn, group_id)?;

    if group.author_id != acting_user_id {
        return Err(AppError::new(
            ErrorCode::NotGroupOwner,
            "only the group owner can delete the group",
        ));
    }

    conn.transaction::<_, AppError, _>(|conn| {
        diesel::update(contents::table.filter(contents::group_id.eq(group_id)))
            .set(contents::group_id.eq(None::<Uuid>))
            .execute(conn)?;
        diesel::delete(group_members::table.filter(group_members::group_id.eq(group_id)))
            .execute(conn)?;
        diesel::delete(groups::table.find(group_id)).execute(conn)?;

        tracing::info!(group_id = %group_id, "group deleted");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creator_is_seeded_as_sole_admin() {
        let author = Uuid::new_v4();
        let group = Uuid::new_v4();
        let rows = seed_rows(author, group, vec![]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].user_id, author);
        assert_eq!(rows[0].role, "ADMIN");
    }

    #[test]
    fn seed_list_cannot_demote_or_duplicate_the_creator() {
        let author = Uuid::new_v4();
        let other = Uuid::new_v4();
        let seeds = vec![
            SeedMember { user_id: author, role: MemberRole::User },
            SeedMember { user_id: other, role: MemberRole::User },
            SeedMember { user_id: other, role: MemberRole::Admin },
        ];
        let rows = seed_rows(author, Uuid::new_v4(), seeds);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].role, "ADMIN");
        assert_eq!(rows[1].user_id, other);
        assert_eq!(rows[1].role, "USER");
    }

    #[test]
    fn last_admin_cannot_leave_populated_group() {
        assert!(blocks_departure("ADMIN", 1, 3));
    }

    #[test]
    fn sole_member_may_leave() {
        assert!(!blocks_departure("ADMIN", 1, 1));
    }

    #[test]
    fn regular_member_may_always_leave() {
        assert!(!blocks_departure("USER", 1, 5));
    }

    #[test]
    fn admin_with_peers_may_leave() {
        assert!(!blocks_departure("ADMIN", 2, 5));
    }
}
