use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use devcircle_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{Comment, NewComment};
use crate::schema::{comment_likes, comments, contents};
use crate::services::feed::{author_cards, AuthorCard};

fn find_comment(conn: &mut PgConnection, comment_id: Uuid) -> AppResult<Comment> {
    comments::table
        .find(comment_id)
        .first::<Comment>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::CommentNotFound, "comment not found"))
}

/// Replies stay one level deep: a comment may reply to a top-level comment
/// on the same content, never to another reply.
fn check_reply_target(parent: &Comment, content_id: Uuid) -> AppResult<()> {
    if parent.content_id != content_id {
        return Err(AppError::bad_request(
            "reply must target a comment on the same content",
        ));
    }
    if parent.replying_to_id.is_some() {
        return Err(AppError::new(
            ErrorCode::ReplyDepthExceeded,
            "cannot reply to a reply",
        ));
    }
    Ok(())
}

pub fn create_comment(conn: &mut PgConnection, new_comment: NewComment) -> AppResult<Comment> {
    conn.transaction::<_, AppError, _>(|conn| {
        let content_found: i64 = contents::table
            .find(new_comment.content_id)
            .count()
            .get_result(conn)?;
        if content_found == 0 {
            return Err(AppError::new(ErrorCode::ContentNotFound, "content not found"));
        }

        if let Some(parent_id) = new_comment.replying_to_id {
            let parent = find_comment(conn, parent_id)?;
            check_reply_target(&parent, new_comment.content_id)?;
        }

        let comment: Comment = diesel::insert_into(comments::table)
            .values(&new_comment)
            .get_result(conn)?;

        diesel::update(contents::table.find(comment.content_id))
            .set(contents::comments_count.eq(contents::comments_count + 1))
            .execute(conn)?;

        Ok(comment)
    })
}

pub fn update_comment(
    conn: &mut PgConnection,
    comment_id: Uuid,
    acting_user_id: Uuid,
    body: String,
) -> AppResult<Comment> {
    let comment = find_comment(conn, comment_id)?;
    if comment.author_id != acting_user_id {
        return Err(AppError::forbidden("only the author can edit this comment"));
    }

    let updated = diesel::update(comments::table.find(comment_id))
        .set((
            comments::body.eq(body),
            comments::updated_at.eq(Utc::now()),
        ))
        .get_result::<Comment>(conn)?;
    Ok(updated)
}

/// Removes the comment together with its replies and their likes;
/// comments_count drops by the number of comment rows removed.
pub fn delete_comment(conn: &mut PgConnection, comment_id: Uuid, acting_user_id: Uuid) -> AppResult<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        let comment = find_comment(conn, comment_id)?;
        if comment.author_id != acting_user_id {
            return Err(AppError::forbidden("only the author can delete this comment"));
        }

        let mut doomed: Vec<Uuid> = comments::table
            .filter(comments::replying_to_id.eq(comment_id))
            .select(comments::id)
            .load(conn)?;
        doomed.push(comment_id);

        diesel::delete(comment_likes::table.filter(comment_likes::comment_id.eq_any(&doomed)))
            .execute(conn)?;
        let removed = diesel::delete(comments::table.filter(comments::id.eq_any(&doomed)))
            .execute(conn)?;

        diesel::update(contents::table.find(comment.content_id))
            .set(contents::comments_count.eq(contents::comments_count - removed as i32))
            .execute(conn)?;

        Ok(())
    })
}

// --- Threaded read model ---

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub body: String,
    pub author: Option<AuthorCard>,
    pub likes_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub replies: Vec<CommentView>,
}

/// All comments for one content item, top-level first (oldest to newest),
/// replies nested under their parent in the same order.
pub fn comments_for_content(
    conn: &mut PgConnection,
    content_id: Uuid,
    viewer_id: Option<Uuid>,
) -> AppResult<Vec<CommentView>> {
    let rows: Vec<Comment> = comments::table
        .filter(comments::content_id.eq(content_id))
        .order(comments::created_at.asc())
        .load(conn)?;

    let authors = author_cards(conn, rows.iter().map(|c| c.author_id))?;

    let liked: Option<HashSet<Uuid>> = match viewer_id {
        Some(viewer_id) if !rows.is_empty() => {
            let ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();
            let liked: Vec<Uuid> = comment_likes::table
                .filter(comment_likes::user_id.eq(viewer_id))
                .filter(comment_likes::comment_id.eq_any(&ids))
                .select(comment_likes::comment_id)
                .load(conn)?;
            Some(liked.into_iter().collect())
        }
        Some(_) => Some(HashSet::new()),
        None => None,
    };

    Ok(thread_comments(rows, &authors, liked.as_ref()))
}

fn thread_comments(
    rows: Vec<Comment>,
    authors: &HashMap<Uuid, AuthorCard>,
    liked: Option<&HashSet<Uuid>>,
) -> Vec<CommentView> {
    let to_view = |comment: Comment| CommentView {
        id: comment.id,
        body: comment.body,
        author: authors.get(&comment.author_id).cloned(),
        likes_count: comment.likes_count,
        is_liked: liked.map(|set| set.contains(&comment.id)),
        created_at: comment.created_at,
        updated_at: comment.updated_at,
        replies: Vec::new(),
    };

    let mut top_level: Vec<CommentView> = Vec::new();
    let mut index_of: HashMap<Uuid, usize> = HashMap::new();
    let mut replies: Vec<(Uuid, CommentView)> = Vec::new();

    for comment in rows {
        match comment.replying_to_id {
            None => {
                let view = to_view(comment);
                index_of.insert(view.id, top_level.len());
                top_level.push(view);
            }
            Some(parent_id) => replies.push((parent_id, to_view(comment))),
        }
    }

    for (parent_id, reply) in replies {
        if let Some(&idx) = index_of.get(&parent_id) {
            top_level[idx].replies.push(reply);
        }
    }

    top_level
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: Uuid, parent: Option<Uuid>, body: &str) -> Comment {
        Comment {
            id,
            body: body.into(),
            author_id: Uuid::new_v4(),
            content_id: Uuid::new_v4(),
            replying_to_id: parent,
            likes_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn replies_nest_under_their_parent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let rows = vec![
            comment(a, None, "first"),
            comment(b, None, "second"),
            comment(Uuid::new_v4(), Some(a), "re: first"),
            comment(Uuid::new_v4(), Some(a), "re: first again"),
        ];

        let threaded = thread_comments(rows, &HashMap::new(), None);
        assert_eq!(threaded.len(), 2);
        assert_eq!(threaded[0].body, "first");
        assert_eq!(threaded[0].replies.len(), 2);
        assert!(threaded[1].replies.is_empty());
    }

    #[test]
    fn reply_to_reply_is_rejected() {
        let parent = comment(Uuid::new_v4(), Some(Uuid::new_v4()), "i am a reply");
        let err = check_reply_target(&parent, parent.content_id).unwrap_err();
        match err {
            AppError::Known { code, .. } => assert_eq!(code, ErrorCode::ReplyDepthExceeded),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reply_must_stay_on_the_same_content() {
        let parent = comment(Uuid::new_v4(), None, "top level");
        assert!(check_reply_target(&parent, Uuid::new_v4()).is_err());
        assert!(check_reply_target(&parent, parent.content_id).is_ok());
    }
}
