use diesel::prelude::*;
use uuid::Uuid;

use devcircle_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Content, ContentKind, NewContent, Tag, UpdateContent};
use crate::schema::{comment_likes, comments, content_likes, content_tags, contents, groups};
use crate::services::tags;

pub fn find_content(conn: &mut PgConnection, content_id: Uuid) -> AppResult<Content> {
    contents::table
        .find(content_id)
        .first::<Content>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::ContentNotFound, "content not found"))
}

/// Insert the content row, reconcile its tag set, and bump the owning
/// group's content counter — one transaction, so a failed tag write never
/// leaves a half-tagged row behind.
pub fn create_with_tags(
    conn: &mut PgConnection,
    new_content: NewContent,
    tag_titles: &[String],
) -> AppResult<(Content, Vec<Tag>)> {
    conn.transaction::<_, AppError, _>(|conn| {
        let content: Content = diesel::insert_into(contents::table)
            .values(&new_content)
            .get_result(conn)?;

        let delta = tags::reconcile(conn, tag_titles, &[])?;
        tags::apply_delta(conn, content.id, &delta)?;

        if let Some(group_id) = content.group_id {
            diesel::update(groups::table.find(group_id))
                .set(groups::contents_count.eq(groups::contents_count + 1))
                .execute(conn)?;
        }

        let attached = tags::tags_for_content(conn, content.id)?;
        tracing::info!(
            content_id = %content.id,
            content_type = %content.content_type,
            tags = attached.len(),
            "content created"
        );
        Ok((content, attached))
    })
}

/// Update mutable fields and move the attached-tag state to the candidate
/// set: reused titles connect, missing titles are created, stale join rows
/// are dropped. Content type never changes; hitting the wrong typed
/// endpoint is rejected before any write.
pub fn update_with_tags(
    conn: &mut PgConnection,
    content_id: Uuid,
    expected_kind: ContentKind,
    changes: UpdateContent,
    tag_titles: Option<&[String]>,
) -> AppResult<(Content, Vec<Tag>)> {
    conn.transaction::<_, AppError, _>(|conn| {
        let existing = find_content(conn, content_id)?;
        if existing.kind() != Some(expected_kind) {
            return Err(AppError::new(
                ErrorCode::InvalidContentKind,
                format!("content {content_id} is not a {}", expected_kind.as_str()),
            ));
        }

        let updated = diesel::update(contents::table.find(content_id))
            .set((&changes, contents::updated_at.eq(chrono::Utc::now())))
            .get_result::<Content>(conn)?;

        if let Some(titles) = tag_titles {
            let current = tags::tags_for_content(conn, content_id)?;
            let delta = tags::reconcile(conn, titles, &current)?;
            tags::apply_delta(conn, content_id, &delta)?;
        }

        let attached = tags::tags_for_content(conn, content_id)?;
        Ok((updated, attached))
    })
}

/// Author-only delete; removes the join/engagement rows that hang off the
/// content and keeps the group's content counter in step.
pub fn delete_content(conn: &mut PgConnection, content_id: Uuid, acting_user_id: Uuid) -> AppResult<()> {
    let content = find_content(conn, content_id)?;
    if content.author_id != acting_user_id {
        return Err(AppError::new(
            ErrorCode::NotContentAuthor,
            "only the author can delete this content",
        ));
    }

    conn.transaction::<_, AppError, _>(|conn| {
        let comment_ids: Vec<Uuid> = comments::table
            .filter(comments::content_id.eq(content_id))
            .select(comments::id)
            .load(conn)?;

        if !comment_ids.is_empty() {
            diesel::delete(
                comment_likes::table.filter(comment_likes::comment_id.eq_any(&comment_ids)),
            )
            .execute(conn)?;
        }
        diesel::delete(comments::table.filter(comments::content_id.eq(content_id)))
            .execute(conn)?;
        diesel::delete(content_likes::table.filter(content_likes::content_id.eq(content_id)))
            .execute(conn)?;
        diesel::delete(content_tags::table.filter(content_tags::content_id.eq(content_id)))
            .execute(conn)?;
        diesel::delete(contents::table.find(content_id)).execute(conn)?;

        if let Some(group_id) = content.group_id {
            diesel::update(groups::table.find(group_id))
                .set(groups::contents_count.eq(groups::contents_count - 1))
                .execute(conn)?;
        }

        tracing::info!(content_id = %content_id, "content deleted");
        Ok(())
    })
}

/// Single-item read; this is the one read path that counts a view
/// (feeds stay side-effect free).
pub fn view_content(conn: &mut PgConnection, content_id: Uuid) -> AppResult<Content> {
    let updated = diesel::update(contents::table.find(content_id))
        .set(contents::views_count.eq(contents::views_count + 1))
        .get_result::<Content>(conn)
        .optional()?;
    updated.ok_or_else(|| AppError::new(ErrorCode::ContentNotFound, "content not found"))
}
