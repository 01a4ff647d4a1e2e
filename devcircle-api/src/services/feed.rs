use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use diesel::pg::Pg;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use devcircle_shared::errors::{AppError, AppResult};
use devcircle_shared::types::{PageParams, Paginated};

use crate::models::{Content, ContentKind, Group, MemberRole, Tag};
use crate::schema::{content_likes, contents, follows, group_members, groups, users};
use crate::services::tags;

// --- Filter / sort parameters ---

#[derive(Debug, Default, Clone, Copy)]
pub struct ContentFilter {
    pub kind: Option<ContentKind>,
    pub group_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub viewer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSort {
    Recent,
    Popular,
    Following,
}

#[derive(Debug, Default, Clone)]
pub struct GroupFilter {
    pub name_query: Option<String>,
    pub viewer_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupSort {
    Recent,
    Popular,
    Joined,
}

// --- Projections ---

#[derive(Debug, Serialize, Clone)]
pub struct AuthorCard {
    pub user_name: String,
    pub avatar_img: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub tags: Vec<Tag>,
    pub views_count: i32,
    pub likes_count: i32,
    pub comments_count: i32,
    pub author: Option<AuthorCard>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MeetupView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub tags: Vec<Tag>,
    pub meetup_location: Option<String>,
    pub meetup_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct PodcastView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub tags: Vec<Tag>,
    pub author: Option<AuthorCard>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_liked: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct GenericView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub tags: Vec<Tag>,
    pub created_at: DateTime<Utc>,
}

/// Per-type view contract: the same `contents` row projects differently
/// depending on its type. A meetup never exposes engagement counters, a
/// post never exposes meetup fields.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ContentView {
    Post(PostView),
    Meetup(MeetupView),
    Podcast(PodcastView),
    Generic(GenericView),
}

pub fn project_content(
    content: Content,
    kind: Option<ContentKind>,
    tags: Vec<Tag>,
    author: Option<AuthorCard>,
    is_liked: Option<bool>,
) -> ContentView {
    match kind {
        Some(ContentKind::Post) => ContentView::Post(PostView {
            id: content.id,
            title: content.title,
            description: content.description,
            cover_image: content.cover_image,
            tags,
            views_count: content.views_count,
            likes_count: content.likes_count,
            comments_count: content.comments_count,
            author,
            created_at: content.created_at,
            is_liked,
        }),
        Some(ContentKind::Meetup) => ContentView::Meetup(MeetupView {
            id: content.id,
            title: content.title,
            description: content.description,
            cover_image: content.cover_image,
            tags,
            meetup_location: content.meetup_location,
            meetup_date: content.meetup_date,
            is_liked,
        }),
        Some(ContentKind::Podcast) => ContentView::Podcast(PodcastView {
            id: content.id,
            title: content.title,
            description: content.description,
            cover_image: content.cover_image,
            tags,
            author,
            created_at: content.created_at,
            is_liked,
        }),
        None => ContentView::Generic(GenericView {
            id: content.id,
            title: content.title,
            description: content.description,
            cover_image: content.cover_image,
            tags,
            created_at: content.created_at,
        }),
    }
}

// --- Content feed ---

/// The single source of the feed predicate. Both the count and the page
/// fetch go through this function so pagination metadata always agrees
/// with the rows returned. `Following` restricts the predicate (not just
/// the order), so it must flow through here as well.
fn filtered_contents(
    filter: &ContentFilter,
    sort: Option<FeedSort>,
) -> contents::BoxedQuery<'static, Pg> {
    let mut query = contents::table.into_boxed();

    if let Some(kind) = filter.kind {
        query = query.filter(contents::content_type.eq(kind.as_str()));
    }
    if let Some(group_id) = filter.group_id {
        query = query.filter(contents::group_id.eq(group_id));
    }
    if let Some(author_id) = filter.author_id {
        query = query.filter(contents::author_id.eq(author_id));
    }
    if sort == Some(FeedSort::Following) {
        if let Some(viewer_id) = filter.viewer_id {
            query = query.filter(
                contents::author_id.eq_any(
                    follows::table
                        .filter(follows::follower_id.eq(viewer_id))
                        .select(follows::following_id),
                ),
            );
        }
    }

    query
}

pub fn content_feed(
    conn: &mut PgConnection,
    filter: &ContentFilter,
    sort: Option<FeedSort>,
    page: &PageParams,
) -> AppResult<Paginated<ContentView>> {
    if sort == Some(FeedSort::Following) && filter.viewer_id.is_none() {
        return Err(AppError::Validation(
            "sortBy=following requires a viewerId".into(),
        ));
    }

    let total: i64 = filtered_contents(filter, sort).count().get_result(conn)?;

    let mut query = filtered_contents(filter, sort);
    query = match sort {
        Some(FeedSort::Recent) | Some(FeedSort::Following) => {
            query.order(contents::created_at.desc())
        }
        Some(FeedSort::Popular) => query.order(contents::likes_count.desc()),
        None => query,
    };

    let rows: Vec<Content> = query
        .offset(page.offset())
        .limit(page.limit())
        .load(conn)?;

    let items = enrich_contents(conn, rows, filter.kind, filter.viewer_id)?;
    Ok(Paginated::new(items, total, page))
}

/// Batch-load tags, author cards, and the viewer's likes for one feed page,
/// then project each row. Three queries per page, independent of page size.
fn enrich_contents(
    conn: &mut PgConnection,
    rows: Vec<Content>,
    kind: Option<ContentKind>,
    viewer_id: Option<Uuid>,
) -> AppResult<Vec<ContentView>> {
    let content_ids: Vec<Uuid> = rows.iter().map(|c| c.id).collect();
    let mut tag_map = tags::tags_for_contents(conn, &content_ids)?;
    let author_map = author_cards(conn, rows.iter().map(|c| c.author_id))?;
    let liked = viewer_likes(conn, viewer_id, &content_ids)?;

    Ok(rows
        .into_iter()
        .map(|content| {
            let tags = tag_map.remove(&content.id).unwrap_or_default();
            let author = author_map.get(&content.author_id).cloned();
            let is_liked = liked.as_ref().map(|set| set.contains(&content.id));
            // Unfiltered feeds use the generic projection for every row.
            let row_kind = kind.and(content.kind());
            project_content(content, row_kind, tags, author, is_liked)
        })
        .collect())
}

pub fn author_cards(
    conn: &mut PgConnection,
    author_ids: impl Iterator<Item = Uuid>,
) -> QueryResult<HashMap<Uuid, AuthorCard>> {
    let ids: Vec<Uuid> = author_ids.collect();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, String, Option<String>)> = users::table
        .filter(users::id.eq_any(&ids))
        .select((users::id, users::user_name, users::avatar_img))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, user_name, avatar_img)| (id, AuthorCard { user_name, avatar_img }))
        .collect())
}

fn viewer_likes(
    conn: &mut PgConnection,
    viewer_id: Option<Uuid>,
    content_ids: &[Uuid],
) -> QueryResult<Option<HashSet<Uuid>>> {
    let Some(viewer_id) = viewer_id else {
        return Ok(None);
    };
    if content_ids.is_empty() {
        return Ok(Some(HashSet::new()));
    }

    let liked: Vec<Uuid> = content_likes::table
        .filter(content_likes::user_id.eq(viewer_id))
        .filter(content_likes::content_id.eq_any(content_ids))
        .select(content_likes::content_id)
        .load(conn)?;

    Ok(Some(liked.into_iter().collect()))
}

// --- Group feed ---

#[derive(Debug, Serialize)]
pub struct GroupCard {
    pub id: Uuid,
    pub name: String,
    pub bio: String,
    pub profile_image: Option<String>,
    pub cover_image: Option<String>,
    pub members_count: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_preview: Option<Vec<Option<String>>>,
}

const MEMBER_PREVIEW_LEN: usize = 4;

fn filtered_groups(filter: &GroupFilter, sort: Option<GroupSort>) -> groups::BoxedQuery<'static, Pg> {
    let mut query = groups::table.into_boxed();

    if let Some(ref name_query) = filter.name_query {
        let trimmed = name_query.trim();
        if !trimmed.is_empty() {
            query = query.filter(groups::name.ilike(format!("%{trimmed}%")));
        }
    }
    if sort == Some(GroupSort::Joined) {
        if let Some(viewer_id) = filter.viewer_id {
            query = query.filter(
                groups::id.eq_any(
                    group_members::table
                        .filter(group_members::user_id.eq(viewer_id))
                        .select(group_members::group_id),
                ),
            );
        }
    }

    query
}

pub fn group_feed(
    conn: &mut PgConnection,
    filter: &GroupFilter,
    sort: Option<GroupSort>,
    with_members: bool,
    page: &PageParams,
) -> AppResult<Paginated<GroupCard>> {
    if sort == Some(GroupSort::Joined) && filter.viewer_id.is_none() {
        return Err(AppError::Validation(
            "sortBy=joined requires a viewerId".into(),
        ));
    }

    let total: i64 = filtered_groups(filter, sort).count().get_result(conn)?;

    let mut query = filtered_groups(filter, sort);
    query = match sort {
        Some(GroupSort::Recent) | Some(GroupSort::Joined) => {
            query.order(groups::created_at.desc())
        }
        Some(GroupSort::Popular) => query.order(groups::members_count.desc()),
        None => query,
    };

    let rows: Vec<Group> = query
        .offset(page.offset())
        .limit(page.limit())
        .load(conn)?;

    let mut previews = if with_members {
        member_previews(conn, rows.iter().map(|g| g.id).collect())?
    } else {
        HashMap::new()
    };

    let items = rows
        .into_iter()
        .map(|group| GroupCard {
            member_preview: with_members
                .then(|| previews.remove(&group.id).unwrap_or_default()),
            id: group.id,
            name: group.name,
            bio: group.bio,
            profile_image: group.profile_image,
            cover_image: group.cover_image,
            members_count: group.members_count,
            created_at: group.created_at,
        })
        .collect();

    Ok(Paginated::new(items, total, page))
}

/// Up to four member avatars per group, earliest members first.
fn member_previews(
    conn: &mut PgConnection,
    group_ids: Vec<Uuid>,
) -> QueryResult<HashMap<Uuid, Vec<Option<String>>>> {
    if group_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, Option<String>)> = group_members::table
        .inner_join(users::table)
        .filter(group_members::group_id.eq_any(&group_ids))
        .order(group_members::joined_at.asc())
        .select((group_members::group_id, users::avatar_img))
        .load(conn)?;

    let mut grouped: HashMap<Uuid, Vec<Option<String>>> = HashMap::new();
    for (group_id, avatar) in rows {
        let preview = grouped.entry(group_id).or_default();
        if preview.len() < MEMBER_PREVIEW_LEN {
            preview.push(avatar);
        }
    }
    Ok(grouped)
}

// --- Group members page ---

#[derive(Debug, Serialize)]
pub struct MemberCard {
    pub id: Uuid,
    pub user_name: String,
    pub avatar_img: Option<String>,
    pub role: String,
}

pub fn group_members_page(
    conn: &mut PgConnection,
    group_id: Uuid,
    role: Option<MemberRole>,
    page: &PageParams,
) -> AppResult<Paginated<MemberCard>> {
    // Count and page share the same (group_id, role) predicate; the join to
    // users is 1:1 over the membership FK and cannot change the row count.
    let total: i64 = match role {
        Some(role) => group_members::table
            .filter(group_members::group_id.eq(group_id))
            .filter(group_members::role.eq(role.as_str()))
            .count()
            .get_result(conn)?,
        None => group_members::table
            .filter(group_members::group_id.eq(group_id))
            .count()
            .get_result(conn)?,
    };

    let mut query = group_members::table
        .inner_join(users::table)
        .select((
            users::id,
            users::user_name,
            users::avatar_img,
            group_members::role,
        ))
        .filter(group_members::group_id.eq(group_id))
        .into_boxed();
    if let Some(role) = role {
        query = query.filter(group_members::role.eq(role.as_str()));
    }

    let rows: Vec<(Uuid, String, Option<String>, String)> = query
        .order(group_members::joined_at.asc())
        .offset(page.offset())
        .limit(page.limit())
        .load(conn)?;

    let items = rows
        .into_iter()
        .map(|(id, user_name, avatar_img, role)| MemberCard {
            id,
            user_name,
            avatar_img,
            role,
        })
        .collect();

    Ok(Paginated::new(items, total, page))
}

// --- Sidebar projections ---

#[derive(Debug, Serialize)]
pub struct GroupRankCard {
    pub id: Uuid,
    pub name: String,
    pub profile_image: Option<String>,
    pub count: i32,
}

pub fn top_ranked_groups(conn: &mut PgConnection, limit: i64) -> QueryResult<Vec<GroupRankCard>> {
    let rows: Vec<(Uuid, String, Option<String>, i32)> = groups::table
        .order(groups::contents_count.desc())
        .limit(limit)
        .select((groups::id, groups::name, groups::profile_image, groups::contents_count))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, name, profile_image, count)| GroupRankCard { id, name, profile_image, count })
        .collect())
}

pub fn top_active_groups(conn: &mut PgConnection, limit: i64) -> QueryResult<Vec<GroupRankCard>> {
    let rows: Vec<(Uuid, String, Option<String>, i32)> = groups::table
        .order(groups::members_count.desc())
        .limit(limit)
        .select((groups::id, groups::name, groups::profile_image, groups::members_count))
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(id, name, profile_image, count)| GroupRankCard { id, name, profile_image, count })
        .collect())
}

/// Upcoming/most recent meetups inside one group, newest event first.
pub fn group_meetups(
    conn: &mut PgConnection,
    group_id: Uuid,
    limit: i64,
) -> AppResult<Vec<ContentView>> {
    let rows: Vec<Content> = contents::table
        .filter(contents::group_id.eq(group_id))
        .filter(contents::content_type.eq(ContentKind::Meetup.as_str()))
        .order(contents::meetup_date.desc())
        .limit(limit)
        .load(conn)?;

    enrich_contents(conn, rows, Some(ContentKind::Meetup), None)
}

/// Latest items of one kind for the sidebars. Meetups order by the event
/// date, everything else by creation time.
pub fn latest_of_kind(
    conn: &mut PgConnection,
    kind: ContentKind,
    limit: i64,
) -> AppResult<Vec<ContentView>> {
    let query = contents::table
        .filter(contents::content_type.eq(kind.as_str()))
        .limit(limit);

    let rows: Vec<Content> = match kind {
        ContentKind::Meetup => query.order(contents::meetup_date.desc()).load(conn)?,
        _ => query.order(contents::created_at.desc()).load(conn)?,
    };

    enrich_contents(conn, rows, Some(kind), None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(kind: &str) -> Content {
        Content {
            id: Uuid::new_v4(),
            content_type: kind.to_string(),
            title: "Intro to ownership".into(),
            description: "Borrow checker from first principles".into(),
            cover_image: None,
            author_id: Uuid::new_v4(),
            group_id: None,
            views_count: 7,
            likes_count: 3,
            comments_count: 1,
            meetup_location: Some("Belgrade".into()),
            meetup_location_image: None,
            meetup_date: Some(Utc::now()),
            podcast_file: Some("https://cdn.example.com/e1.mp3".into()),
            podcast_title: Some("Episode 1".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn author() -> AuthorCard {
        AuthorCard {
            user_name: "marko".into(),
            avatar_img: None,
        }
    }

    #[test]
    fn post_projection_has_no_meetup_fields() {
        let view = project_content(
            content("POST"),
            Some(ContentKind::Post),
            vec![],
            Some(author()),
            Some(true),
        );
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("meetup_date").is_none());
        assert!(json.get("meetup_location").is_none());
        assert_eq!(json["likes_count"], 3);
        assert_eq!(json["is_liked"], true);
        assert_eq!(json["author"]["user_name"], "marko");
    }

    #[test]
    fn meetup_projection_has_no_engagement_counters() {
        let view = project_content(
            content("MEETUP"),
            Some(ContentKind::Meetup),
            vec![],
            Some(author()),
            None,
        );
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("likes_count").is_none());
        assert!(json.get("views_count").is_none());
        assert!(json.get("author").is_none());
        assert!(json.get("is_liked").is_none());
        assert_eq!(json["meetup_location"], "Belgrade");
        assert!(json.get("meetup_date").is_some());
    }

    #[test]
    fn podcast_projection_exposes_author_and_created_at() {
        let view = project_content(
            content("PODCAST"),
            Some(ContentKind::Podcast),
            vec![],
            Some(author()),
            None,
        );
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("likes_count").is_none());
        assert!(json.get("podcast_file").is_none());
        assert!(json.get("created_at").is_some());
        assert_eq!(json["author"]["user_name"], "marko");
    }

    #[test]
    fn unfiltered_rows_project_generically() {
        // kind filter absent: row type is ignored on purpose
        let row = content("MEETUP");
        let row_kind = None::<ContentKind>.and(row.kind());
        let view = project_content(row, row_kind, vec![], None, None);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("meetup_location").is_none());
        assert!(json.get("likes_count").is_none());
        assert!(json.get("created_at").is_some());
    }

    #[test]
    fn member_preview_is_bounded() {
        let mut grouped: HashMap<Uuid, Vec<Option<String>>> = HashMap::new();
        let gid = Uuid::new_v4();
        for i in 0..10 {
            let preview = grouped.entry(gid).or_default();
            if preview.len() < MEMBER_PREVIEW_LEN {
                preview.push(Some(format!("avatar-{i}")));
            }
        }
        assert_eq!(grouped[&gid].len(), MEMBER_PREVIEW_LEN);
    }
}
