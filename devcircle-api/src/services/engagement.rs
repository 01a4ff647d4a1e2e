use diesel::prelude::*;
use uuid::Uuid;

use devcircle_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewContentLike, NewCommentLike, NewFollow};
use crate::schema::{comment_likes, comments, content_likes, contents, follows, users};

// Every operation here is a paired write: the relation row and the
// denormalized counter commit or fail together, so the counter always
// equals the number of relation rows.

fn content_exists(conn: &mut PgConnection, content_id: Uuid) -> AppResult<()> {
    let found: i64 = contents::table
        .find(content_id)
        .count()
        .get_result(conn)?;
    if found == 0 {
        return Err(AppError::new(ErrorCode::ContentNotFound, "content not found"));
    }
    Ok(())
}

fn user_exists(conn: &mut PgConnection, user_id: Uuid) -> AppResult<()> {
    let found: i64 = users::table.find(user_id).count().get_result(conn)?;
    if found == 0 {
        return Err(AppError::new(ErrorCode::UserNotFound, "user not found"));
    }
    Ok(())
}

pub fn like_content(conn: &mut PgConnection, user_id: Uuid, content_id: Uuid) -> AppResult<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        content_exists(conn, content_id)?;

        let already: i64 = content_likes::table
            .find((user_id, content_id))
            .count()
            .get_result(conn)?;
        if already > 0 {
            return Err(AppError::new(ErrorCode::AlreadyLiked, "content already liked"));
        }

        diesel::insert_into(content_likes::table)
            .values(&NewContentLike { user_id, content_id })
            .execute(conn)?;
        diesel::update(contents::table.find(content_id))
            .set(contents::likes_count.eq(contents::likes_count + 1))
            .execute(conn)?;
        Ok(())
    })
}

pub fn unlike_content(conn: &mut PgConnection, user_id: Uuid, content_id: Uuid) -> AppResult<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        content_exists(conn, content_id)?;

        let removed = diesel::delete(content_likes::table.find((user_id, content_id)))
            .execute(conn)?;
        if removed == 0 {
            return Err(AppError::new(ErrorCode::NotLiked, "content is not liked"));
        }

        diesel::update(contents::table.find(content_id))
            .set(contents::likes_count.eq(contents::likes_count - 1))
            .execute(conn)?;
        Ok(())
    })
}

pub fn like_comment(conn: &mut PgConnection, user_id: Uuid, comment_id: Uuid) -> AppResult<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        let found: i64 = comments::table.find(comment_id).count().get_result(conn)?;
        if found == 0 {
            return Err(AppError::new(ErrorCode::CommentNotFound, "comment not found"));
        }

        let already: i64 = comment_likes::table
            .find((comment_id, user_id))
            .count()
            .get_result(conn)?;
        if already > 0 {
            return Err(AppError::new(ErrorCode::AlreadyLiked, "comment already liked"));
        }

        diesel::insert_into(comment_likes::table)
            .values(&NewCommentLike { comment_id, user_id })
            .execute(conn)?;
        diesel::update(comments::table.find(comment_id))
            .set(comments::likes_count.eq(comments::likes_count + 1))
            .execute(conn)?;
        Ok(())
    })
}

pub fn unlike_comment(conn: &mut PgConnection, user_id: Uuid, comment_id: Uuid) -> AppResult<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        let removed = diesel::delete(comment_likes::table.find((comment_id, user_id)))
            .execute(conn)?;
        if removed == 0 {
            return Err(AppError::new(ErrorCode::NotLiked, "comment is not liked"));
        }

        diesel::update(comments::table.find(comment_id))
            .set(comments::likes_count.eq(comments::likes_count - 1))
            .execute(conn)?;
        Ok(())
    })
}

pub fn follow_user(conn: &mut PgConnection, follower_id: Uuid, following_id: Uuid) -> AppResult<()> {
    if follower_id == following_id {
        return Err(AppError::new(ErrorCode::CannotFollowSelf, "cannot follow yourself"));
    }

    conn.transaction::<_, AppError, _>(|conn| {
        user_exists(conn, follower_id)?;
        user_exists(conn, following_id)?;

        let already: i64 = follows::table
            .find((follower_id, following_id))
            .count()
            .get_result(conn)?;
        if already > 0 {
            return Err(AppError::new(ErrorCode::AlreadyFollowing, "already following this user"));
        }

        diesel::insert_into(follows::table)
            .values(&NewFollow { follower_id, following_id })
            .execute(conn)?;
        diesel::update(users::table.find(follower_id))
            .set(users::following_count.eq(users::following_count + 1))
            .execute(conn)?;
        diesel::update(users::table.find(following_id))
            .set(users::followers_count.eq(users::followers_count + 1))
            .execute(conn)?;
        Ok(())
    })
}

pub fn unfollow_user(
    conn: &mut PgConnection,
    follower_id: Uuid,
    following_id: Uuid,
) -> AppResult<()> {
    conn.transaction::<_, AppError, _>(|conn| {
        let removed = diesel::delete(follows::table.find((follower_id, following_id)))
            .execute(conn)?;
        if removed == 0 {
            return Err(AppError::new(ErrorCode::NotFollowing, "not following this user"));
        }

        diesel::update(users::table.find(follower_id))
            .set(users::following_count.eq(users::following_count - 1))
            .execute(conn)?;
        diesel::update(users::table.find(following_id))
            .set(users::followers_count.eq(users::followers_count - 1))
            .execute(conn)?;
        Ok(())
    })
}
